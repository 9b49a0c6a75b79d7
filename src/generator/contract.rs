//! The capability contract every provider backend implements.

use crate::error::{ImagenxError, Result};
use crate::generator::types::{ImageOutput, SizeSpec};
use async_trait::async_trait;

/// Trait for provider backends.
///
/// One implementing type exists per provider; after resolution the dispatch
/// layer only ever talks to this trait, never to a concrete provider type.
/// Instances are credential-bound and cheap: a client handle plus the
/// resolved model string, no mutable session state.
#[async_trait]
pub trait ImageGenerator: Send + Sync + std::fmt::Debug {
    /// The provider token this backend is registered under.
    fn provider(&self) -> &'static str;

    /// The resolved model string this instance is bound to.
    fn model(&self) -> &str;

    /// Size strings this backend accepts: resolution tags and/or explicit
    /// `WIDTHxHEIGHT` dimensions.
    fn supported_sizes(&self) -> &'static [&'static str];

    /// Generates images from a text prompt.
    ///
    /// Returns the backend's results in order, each a URL or raw bytes.
    async fn text_to_image(&self, prompt: &str, size: &str) -> Result<Vec<ImageOutput>>;

    /// Generates images guided by reference images (paths or URLs).
    ///
    /// Optional capability; backends that do not support it keep this
    /// default body, which the dispatch layer surfaces distinctly from
    /// remote failures.
    async fn image_to_image(
        &self,
        _prompt: &str,
        _images: &[String],
        _size: &str,
    ) -> Result<Vec<ImageOutput>> {
        Err(ImagenxError::CapabilityNotSupported {
            provider: self.provider().to_string(),
            capability: "image_to_image",
        })
    }

    /// Validates a size string against this backend's allow-list.
    fn check_size(&self, size: &str) -> Result<()> {
        if SizeSpec::parse(size).is_some() && self.supported_sizes().contains(&size) {
            Ok(())
        } else {
            Err(ImagenxError::UnsupportedSize {
                provider: self.provider().to_string(),
                size: size.to_string(),
            })
        }
    }
}
