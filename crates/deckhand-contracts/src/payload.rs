use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::outcome::AssistError;

pub const SVG_URI_PREFIX: &str = "data:image/svg+xml;base64,";
pub const PNG_URI_PREFIX: &str = "data:image/png;base64,";

/// Image bytes as an acquisition strategy produced them, before encoding
/// normalization. Consumed exactly once by [`normalize`]; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Vector markup text, e.g. an `<svg>` document.
    VectorMarkup(String),
    /// Raw raster bytes. Canonicalized as PNG downstream regardless of the
    /// actual raster format.
    RawBinary(Vec<u8>),
    /// A string expected to already be a canonical data uri.
    AlreadyEncoded(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMime {
    Svg,
    Png,
}

impl ImageMime {
    pub fn uri_prefix(&self) -> &'static str {
        match self {
            ImageMime::Svg => SVG_URI_PREFIX,
            ImageMime::Png => PNG_URI_PREFIX,
        }
    }
}

/// Canonical embeddable image reference: a data uri the host accepts
/// directly as an image source.
///
/// The uri always begins with the prefix for its mime. Only [`normalize`]
/// constructs values, so the invariant holds for the lifetime of every
/// instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddableImage {
    uri: String,
    mime: ImageMime,
}

impl EmbeddableImage {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mime(&self) -> ImageMime {
        self.mime
    }
}

/// Splits a canonical data uri into its mime and base64 payload. Returns
/// `None` for anything that does not carry a canonical prefix.
pub fn split_canonical_uri(uri: &str) -> Option<(ImageMime, &str)> {
    if let Some(rest) = uri.strip_prefix(SVG_URI_PREFIX) {
        return Some((ImageMime::Svg, rest));
    }
    if let Some(rest) = uri.strip_prefix(PNG_URI_PREFIX) {
        return Some((ImageMime::Png, rest));
    }
    None
}

/// Converts heterogeneous acquisition output into the single canonical
/// embeddable form.
///
/// Pure and deterministic; no network, no document access. The only
/// failure mode is malformed input, which is a contract violation by the
/// producing strategy and fails with [`AssistError::InvalidEncoding`].
pub fn normalize(payload: ImagePayload) -> Result<EmbeddableImage, AssistError> {
    match payload {
        ImagePayload::VectorMarkup(text) => {
            if text.trim().is_empty() {
                return Err(AssistError::invalid_encoding("vector markup is empty"));
            }
            Ok(EmbeddableImage {
                uri: format!("{SVG_URI_PREFIX}{}", BASE64.encode(text.as_bytes())),
                mime: ImageMime::Svg,
            })
        }
        ImagePayload::RawBinary(bytes) => {
            if bytes.is_empty() {
                return Err(AssistError::invalid_encoding("binary payload is empty"));
            }
            Ok(EmbeddableImage {
                uri: format!("{PNG_URI_PREFIX}{}", BASE64.encode(&bytes)),
                mime: ImageMime::Png,
            })
        }
        ImagePayload::AlreadyEncoded(uri) => match split_canonical_uri(&uri) {
            Some((mime, _)) => Ok(EmbeddableImage { uri, mime }),
            None => {
                let preview: String = uri.chars().take(32).collect();
                Err(AssistError::invalid_encoding(format!(
                    "pre-encoded image carries no canonical prefix: {preview}"
                )))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_binary_round_trips_through_png_uri() -> anyhow::Result<()> {
        let bytes = vec![0x89u8, 0x50, 0x4e, 0x47, 0x00, 0xff, 0x10];
        let image = normalize(ImagePayload::RawBinary(bytes.clone()))?;

        assert_eq!(image.mime(), ImageMime::Png);
        let rest = image
            .uri()
            .strip_prefix(PNG_URI_PREFIX)
            .expect("png prefix");
        assert_eq!(BASE64.decode(rest)?, bytes);
        Ok(())
    }

    #[test]
    fn vector_markup_round_trips_through_svg_uri() -> anyhow::Result<()> {
        let markup = "<svg viewBox=\"0 0 512 512\"><circle r=\"10\"/></svg>";
        let image = normalize(ImagePayload::VectorMarkup(markup.to_string()))?;

        assert_eq!(image.mime(), ImageMime::Svg);
        let rest = image
            .uri()
            .strip_prefix(SVG_URI_PREFIX)
            .expect("svg prefix");
        assert_eq!(String::from_utf8(BASE64.decode(rest)?)?, markup);
        Ok(())
    }

    #[test]
    fn already_encoded_passes_through_unchanged() -> anyhow::Result<()> {
        let uri = format!("{PNG_URI_PREFIX}{}", BASE64.encode(b"logo-bytes"));
        let image = normalize(ImagePayload::AlreadyEncoded(uri.clone()))?;

        assert_eq!(image.uri(), uri);
        assert_eq!(image.mime(), ImageMime::Png);
        Ok(())
    }

    #[test]
    fn already_encoded_without_canonical_prefix_is_rejected() {
        let err = normalize(ImagePayload::AlreadyEncoded(
            "data:text/plain;base64,aGk=".to_string(),
        ))
        .unwrap_err();
        assert!(matches!(err, AssistError::InvalidEncoding(_)));
    }

    #[test]
    fn empty_payloads_are_rejected() {
        assert!(matches!(
            normalize(ImagePayload::VectorMarkup("   ".to_string())),
            Err(AssistError::InvalidEncoding(_))
        ));
        assert!(matches!(
            normalize(ImagePayload::RawBinary(Vec::new())),
            Err(AssistError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn split_canonical_uri_recognizes_both_prefixes() {
        assert_eq!(
            split_canonical_uri("data:image/svg+xml;base64,YWJj"),
            Some((ImageMime::Svg, "YWJj"))
        );
        assert_eq!(
            split_canonical_uri("data:image/png;base64,YWJj"),
            Some((ImageMime::Png, "YWJj"))
        );
        assert_eq!(split_canonical_uri("data:image/jpeg;base64,YWJj"), None);
        assert_eq!(split_canonical_uri("plain text"), None);
    }
}
