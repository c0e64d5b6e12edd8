use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use deckhand_contracts::actions::Action;
use deckhand_contracts::outcome::AssistError;
use deckhand_contracts::payload::ImagePayload;

use crate::acquire::{json_or_transient, AcquireStrategy, Acquired, Placement};
use crate::config::GenerationConfig;
use crate::gateway::DocumentGateway;

const API_VERSION: &str = "2023-06-01";

/// Client for the markup-generation service.
pub struct GenerationClient {
    config: GenerationConfig,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl GenerationClient {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            config,
            http: HttpClient::new(),
        }
    }

    fn messages_endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.api_base)
    }

    fn markup_prompt(description: &str) -> String {
        format!(
            "Create an SVG icon based on this description: {description}. \
             Return ONLY the SVG code, no explanations. Make it 512x512 with \
             a transparent background."
        )
    }

    /// Requests vector markup for the description. Exactly one outbound
    /// call; the first content block's text is taken as the markup, with
    /// no validation that it actually parses.
    pub fn render_markup(&self, description: &str) -> Result<String, AssistError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(AssistError::configuration(
                "Icon generation needs a generation service API key; none is configured",
            ));
        };
        let endpoint = self.messages_endpoint();
        let payload = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [{ "role": "user", "content": Self::markup_prompt(description) }],
        });
        let response = self
            .http
            .post(&endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .send()
            .map_err(|err| {
                AssistError::transient(format!("Generation request failed ({endpoint}): {err}"))
            })?;
        let parsed: MessageResponse = json_or_transient("Generation", response)?;
        parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AssistError::transient("Generation response contained no markup"))
    }
}

/// Prompt → vector markup, landed as a new shape.
pub struct IconStrategy {
    client: GenerationClient,
}

impl IconStrategy {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            client: GenerationClient::new(config),
        }
    }
}

impl AcquireStrategy for IconStrategy {
    fn acquire(&self, _gateway: &DocumentGateway, input: &str) -> Result<Acquired, AssistError> {
        let description = input.trim();
        if description.is_empty() {
            return Err(AssistError::user(Action::GenerateIcon.spec().blank_message));
        }
        let markup = self.client.render_markup(description)?;
        Ok(Acquired {
            payload: ImagePayload::VectorMarkup(markup),
            placement: Placement::NewShape,
        })
    }
}
