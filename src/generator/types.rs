//! Core types shared by the generator components.

use crate::error::{ImagenxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed `provider:model` identifier.
///
/// The provider segment selects a backend implementation; the model segment
/// is opaque and passed through to that backend unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelIdentifier {
    provider: String,
    model: String,
}

impl ModelIdentifier {
    /// The provider token (left of the colon).
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The opaque model string (right of the colon).
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl FromStr for ModelIdentifier {
    type Err = ImagenxError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(provider), Some(model), None) if !provider.is_empty() && !model.is_empty() => {
                Ok(Self {
                    provider: provider.to_string(),
                    model: model.to_string(),
                })
            }
            _ => Err(ImagenxError::MalformedIdentifier(s.to_string())),
        }
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Named resolution tags accepted alongside explicit pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTag {
    /// Roughly 1024px on the long edge.
    OneK,
    /// Roughly 2048px on the long edge.
    TwoK,
    /// Roughly 4096px on the long edge.
    FourK,
}

impl ResolutionTag {
    /// The wire form of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

/// A size parameter in valid grammar: a resolution tag or `WIDTHxHEIGHT`.
///
/// Grammar only; whether a given size is accepted is decided by each
/// backend's allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSpec {
    /// A named resolution tag (`1K`, `2K`, `4K`).
    Tag(ResolutionTag),
    /// Explicit pixel dimensions, both positive.
    Pixels {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

impl SizeSpec {
    /// Parses a size string, returning `None` when it fits neither the tag
    /// nor the `WIDTHxHEIGHT` grammar.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1K" => Some(Self::Tag(ResolutionTag::OneK)),
            "2K" => Some(Self::Tag(ResolutionTag::TwoK)),
            "4K" => Some(Self::Tag(ResolutionTag::FourK)),
            _ => {
                let (w, h) = s.split_once('x')?;
                let width: u32 = w.parse().ok().filter(|&v| v > 0)?;
                let height: u32 = h.parse().ok().filter(|&v| v > 0)?;
                Some(Self::Pixels { width, height })
            }
        }
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "{}", tag.as_str()),
            Self::Pixels { width, height } => write!(f, "{}x{}", width, height),
        }
    }
}

/// A single generated image: a hosted URL or raw encoded bytes, exactly as
/// the backend returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOutput {
    /// A URL hosted by the provider (typically short-lived).
    Url(String),
    /// Raw encoded image bytes.
    Bytes(Vec<u8>),
}

impl ImageOutput {
    /// The URL, if this output is URL-shaped.
    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Bytes(_) => None,
        }
    }

    /// The raw bytes, if this output is byte-shaped.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Url(_) => None,
            Self::Bytes(data) => Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_parses_provider_and_model() {
        let id: ModelIdentifier = "doubao:doubao-seedream-4-0-250828".parse().unwrap();
        assert_eq!(id.provider(), "doubao");
        assert_eq!(id.model(), "doubao-seedream-4-0-250828");
        assert_eq!(id.to_string(), "doubao:doubao-seedream-4-0-250828");
    }

    #[test]
    fn test_identifier_rejects_missing_colon() {
        let err = "doubao".parse::<ModelIdentifier>().unwrap_err();
        assert!(matches!(err, ImagenxError::MalformedIdentifier(s) if s == "doubao"));
    }

    #[test]
    fn test_identifier_rejects_extra_colon() {
        let err = "doubao:model:extra".parse::<ModelIdentifier>().unwrap_err();
        assert!(matches!(err, ImagenxError::MalformedIdentifier(_)));
    }

    #[test]
    fn test_identifier_rejects_empty_segments() {
        assert!(":model".parse::<ModelIdentifier>().is_err());
        assert!("doubao:".parse::<ModelIdentifier>().is_err());
        assert!(":".parse::<ModelIdentifier>().is_err());
    }

    #[test]
    fn test_size_spec_tags() {
        assert_eq!(SizeSpec::parse("1K"), Some(SizeSpec::Tag(ResolutionTag::OneK)));
        assert_eq!(SizeSpec::parse("2K"), Some(SizeSpec::Tag(ResolutionTag::TwoK)));
        assert_eq!(SizeSpec::parse("4K"), Some(SizeSpec::Tag(ResolutionTag::FourK)));
        // Tags are case-sensitive wire values
        assert_eq!(SizeSpec::parse("2k"), None);
    }

    #[test]
    fn test_size_spec_pixels() {
        assert_eq!(
            SizeSpec::parse("2048x2048"),
            Some(SizeSpec::Pixels {
                width: 2048,
                height: 2048
            })
        );
        assert_eq!(SizeSpec::parse("0x100"), None);
        assert_eq!(SizeSpec::parse("100x"), None);
        assert_eq!(SizeSpec::parse("axb"), None);
        assert_eq!(SizeSpec::parse("large"), None);
    }

    #[test]
    fn test_size_spec_display_round_trips() {
        assert_eq!(SizeSpec::parse("2K").unwrap().to_string(), "2K");
        assert_eq!(SizeSpec::parse("2304x1728").unwrap().to_string(), "2304x1728");
    }

    #[test]
    fn test_image_output_accessors() {
        let url = ImageOutput::Url("https://example.com/a.png".into());
        assert_eq!(url.as_url(), Some("https://example.com/a.png"));
        assert!(url.as_bytes().is_none());

        let bytes = ImageOutput::Bytes(vec![1, 2, 3]);
        assert_eq!(bytes.as_bytes(), Some(&[1u8, 2, 3][..]));
        assert!(bytes.as_url().is_none());
    }
}
