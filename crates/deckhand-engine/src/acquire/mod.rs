use reqwest::blocking::Response as HttpResponse;
use serde::de::DeserializeOwned;

use deckhand_contracts::host::{Frame, ShapeId};
use deckhand_contracts::outcome::AssistError;
use deckhand_contracts::payload::ImagePayload;

use crate::gateway::DocumentGateway;

pub mod cutout;
pub mod icon;
pub mod logo;

/// How an acquired image lands in the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Add a new picture shape at the resolved slide target.
    NewShape,
    /// Swap an existing shape for a picture at its original frame on its
    /// original slide.
    ReplaceShape {
        slide_index: usize,
        shape_id: ShapeId,
        frame: Frame,
    },
}

/// Product of one acquisition: the payload plus where it should land.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub payload: ImagePayload,
    pub placement: Placement,
}

/// One way of obtaining image bytes.
///
/// Implementations classify every failure into [`AssistError`] before it
/// crosses this boundary; nothing unclassified reaches the lifecycle
/// controller.
pub trait AcquireStrategy {
    fn acquire(&self, gateway: &DocumentGateway, input: &str) -> Result<Acquired, AssistError>;
}

pub(crate) fn json_or_transient<T>(service: &str, response: HttpResponse) -> Result<T, AssistError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let code = status.as_u16();
    let body = response.text().map_err(|err| {
        AssistError::transient(format!("{service} response body read failed: {err}"))
    })?;
    if !status.is_success() {
        return Err(AssistError::transient(format!(
            "{service} request failed ({code}): {}",
            truncate_text(&body, 512)
        )));
    }
    serde_json::from_str(&body)
        .map_err(|_| AssistError::transient(format!("{service} returned an invalid JSON payload")))
}

pub(crate) fn bytes_or_transient(
    service: &str,
    response: HttpResponse,
) -> Result<Vec<u8>, AssistError> {
    let status = response.status();
    let code = status.as_u16();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(AssistError::transient(format!(
            "{service} request failed ({code}): {}",
            truncate_text(&body, 512)
        )));
    }
    let bytes = response.bytes().map_err(|err| {
        AssistError::transient(format!("{service} response body read failed: {err}"))
    })?;
    Ok(bytes.to_vec())
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use super::truncate_text;

    #[test]
    fn truncate_text_appends_ellipsis_only_when_needed() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc…");
    }
}
