use reqwest::blocking::Client as HttpClient;
use serde_json::json;

use deckhand_contracts::host::{SelectionSnapshot, ShapeKind};
use deckhand_contracts::outcome::AssistError;
use deckhand_contracts::payload::ImagePayload;

use crate::acquire::{bytes_or_transient, AcquireStrategy, Acquired, Placement};
use crate::config::CutoutConfig;
use crate::gateway::DocumentGateway;

/// Client for the background-removal service.
pub struct CutoutClient {
    config: CutoutConfig,
    http: HttpClient,
}

impl CutoutClient {
    pub fn new(config: CutoutConfig) -> Self {
        Self {
            config,
            http: HttpClient::new(),
        }
    }

    fn removebg_endpoint(&self) -> String {
        format!("{}/v1.0/removebg", self.config.api_base)
    }

    /// Sends unprefixed base64 image bytes for background removal. One
    /// outbound call; the 2xx body is the processed raster.
    pub fn remove_background(&self, image_b64: &str) -> Result<Vec<u8>, AssistError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(AssistError::configuration(
                "Background removal needs a removal service API key; none is configured",
            ));
        };
        let endpoint = self.removebg_endpoint();
        let payload = json!({ "image_file_b64": image_b64, "size": "auto" });
        let response = self
            .http
            .post(&endpoint)
            .header("X-Api-Key", api_key)
            .json(&payload)
            .send()
            .map_err(|err| {
                AssistError::transient(format!(
                    "Background removal request failed ({endpoint}): {err}"
                ))
            })?;
        bytes_or_transient("Background removal", response)
    }
}

/// Selected picture → background-removed replacement at the same frame.
///
/// The only strategy that modifies existing content: its placement deletes
/// the source shape and recreates it in place instead of adding a shape.
pub struct CutoutStrategy {
    client: CutoutClient,
}

impl CutoutStrategy {
    pub fn new(config: CutoutConfig) -> Self {
        Self {
            client: CutoutClient::new(config),
        }
    }

    /// Captures the single selected picture. Selection problems are user
    /// errors and must surface before any network call; the capture order
    /// is count, then kind, then bytes, one sync each.
    fn capture_selection(gateway: &DocumentGateway) -> Result<SelectionSnapshot, AssistError> {
        gateway.with_document(|batch| {
            let count = batch.load_selection_count();
            batch.sync()?;
            let count = count.get()?;
            if count == 0 {
                return Err(AssistError::user("Please select an image first"));
            }
            if count > 1 {
                return Err(AssistError::user("Please select only one image"));
            }

            let shape = batch.load_selected_shape(0);
            batch.sync()?;
            let shape = shape.get()?;
            if shape.kind != ShapeKind::Picture {
                return Err(AssistError::user("Selected object is not an image"));
            }

            let image = batch.load_selected_image(0);
            batch.sync()?;
            Ok(SelectionSnapshot {
                shape,
                image_b64: image.get()?,
            })
        })
    }
}

impl AcquireStrategy for CutoutStrategy {
    fn acquire(&self, gateway: &DocumentGateway, _input: &str) -> Result<Acquired, AssistError> {
        let snapshot = Self::capture_selection(gateway)?;
        let bytes = self.client.remove_background(&snapshot.image_b64)?;
        Ok(Acquired {
            payload: ImagePayload::RawBinary(bytes),
            placement: Placement::ReplaceShape {
                slide_index: snapshot.shape.slide_index,
                shape_id: snapshot.shape.id,
                frame: snapshot.shape.frame,
            },
        })
    }
}
