use reqwest::blocking::Client as HttpClient;

use deckhand_contracts::actions::Action;
use deckhand_contracts::outcome::AssistError;
use deckhand_contracts::payload::ImagePayload;

use crate::acquire::{AcquireStrategy, Acquired, Placement};
use crate::config::LogoConfig;
use crate::gateway::DocumentGateway;

const LOGO_LOOKUP_FAILED: &str =
    "Could not find logo. Try a different company name or ensure internet connection.";

/// Client for the public logo-lookup service. No credential involved.
pub struct LogoClient {
    config: LogoConfig,
    http: HttpClient,
}

impl LogoClient {
    pub fn new(config: LogoConfig) -> Self {
        Self {
            config,
            http: HttpClient::new(),
        }
    }

    /// Lowercase, strip all whitespace, append `.com`. Lossy by design;
    /// there is no fallback when the guess is wrong.
    pub fn guess_domain(name: &str) -> String {
        let compact: String = name
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        format!("{compact}.com")
    }

    /// One GET against the lookup endpoint for the guessed domain. Any
    /// non-success status is reported as the logo not being found.
    pub fn fetch_logo(&self, name: &str) -> Result<Vec<u8>, AssistError> {
        let domain = Self::guess_domain(name);
        let url = format!("{}/{domain}", self.config.api_base);
        let response = self.http.get(&url).send().map_err(|err| {
            AssistError::transient(format!("Logo lookup failed ({url}): {err}"))
        })?;
        if !response.status().is_success() {
            return Err(AssistError::transient(LOGO_LOOKUP_FAILED));
        }
        let bytes = response.bytes().map_err(|err| {
            AssistError::transient(format!("Logo response body read failed: {err}"))
        })?;
        Ok(bytes.to_vec())
    }
}

/// Brand name → raster logo, landed as a new shape.
pub struct LogoStrategy {
    client: LogoClient,
}

impl LogoStrategy {
    pub fn new(config: LogoConfig) -> Self {
        Self {
            client: LogoClient::new(config),
        }
    }
}

impl AcquireStrategy for LogoStrategy {
    fn acquire(&self, _gateway: &DocumentGateway, input: &str) -> Result<Acquired, AssistError> {
        let name = input.trim();
        if name.is_empty() {
            return Err(AssistError::user(Action::FetchLogo.spec().blank_message));
        }
        let bytes = self.client.fetch_logo(name)?;
        Ok(Acquired {
            payload: ImagePayload::RawBinary(bytes),
            placement: Placement::NewShape,
        })
    }
}
