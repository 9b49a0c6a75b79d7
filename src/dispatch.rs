//! Request-time entry point coordinating configuration resolution, backend
//! resolution, and capability invocation.

use crate::config::{self, ResolvedConfig};
use crate::error::{ImagenxError, Result};
use crate::generator::{GeneratorFactory, ImageGenerator, ImageOutput, ProviderRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// The facade request-handling code calls to run a generation.
///
/// Owns the factory (and through it the registry and instance cache); each
/// call resolves configuration for the request at hand, resolves a backend,
/// invokes the requested capability, and normalizes backend failures so no
/// backend-specific error shape reaches the caller.
pub struct Dispatcher {
    factory: GeneratorFactory,
}

impl Dispatcher {
    /// A dispatcher over the built-in provider table.
    pub fn new() -> Self {
        Self {
            factory: GeneratorFactory::new(ProviderRegistry::builtin().clone()),
        }
    }

    /// A dispatcher over a caller-supplied factory. Tests use this to
    /// inject registries of stub backends.
    pub fn with_factory(factory: GeneratorFactory) -> Self {
        Self { factory }
    }

    /// The factory backing this dispatcher.
    pub fn factory(&self) -> &GeneratorFactory {
        &self.factory
    }

    /// Resolves a generator for the given request headers against the
    /// process environment.
    pub fn resolve(&self, headers: &HashMap<String, String>) -> Result<Arc<dyn ImageGenerator>> {
        self.resolve_with_env(headers, &config::process_env())
    }

    /// Resolves a generator from explicit header and environment maps.
    pub fn resolve_with_env(
        &self,
        headers: &HashMap<String, String>,
        env: &HashMap<String, String>,
    ) -> Result<Arc<dyn ImageGenerator>> {
        let ResolvedConfig { model, api_key } = config::resolve(headers, env)?;
        self.factory.resolve(&model, &api_key)
    }

    /// Generates images from a text prompt.
    pub async fn text_to_image(
        &self,
        headers: &HashMap<String, String>,
        prompt: &str,
        size: &str,
    ) -> Result<Vec<ImageOutput>> {
        self.text_to_image_with_env(headers, &config::process_env(), prompt, size)
            .await
    }

    /// `text_to_image` with an explicit environment map.
    pub async fn text_to_image_with_env(
        &self,
        headers: &HashMap<String, String>,
        env: &HashMap<String, String>,
        prompt: &str,
        size: &str,
    ) -> Result<Vec<ImageOutput>> {
        let generator = self.resolve_with_env(headers, env)?;
        generator
            .text_to_image(prompt, size)
            .await
            .map_err(|e| normalize(e, generator.provider()))
    }

    /// Generates images guided by reference images (paths or URLs).
    pub async fn image_to_image(
        &self,
        headers: &HashMap<String, String>,
        prompt: &str,
        images: &[String],
        size: &str,
    ) -> Result<Vec<ImageOutput>> {
        self.image_to_image_with_env(headers, &config::process_env(), prompt, images, size)
            .await
    }

    /// `image_to_image` with an explicit environment map.
    pub async fn image_to_image_with_env(
        &self,
        headers: &HashMap<String, String>,
        env: &HashMap<String, String>,
        prompt: &str,
        images: &[String],
        size: &str,
    ) -> Result<Vec<ImageOutput>> {
        let generator = self.resolve_with_env(headers, env)?;
        generator
            .image_to_image(prompt, images, size)
            .await
            .map_err(|e| normalize(e, generator.provider()))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapses transport-level backend failures into the uniform remote-error
/// shape, preserving the original message. Dispatch-layer kinds (missing
/// configuration, unknown provider, unsupported size, missing capability)
/// pass through unchanged so callers can tell them apart.
fn normalize(err: ImagenxError, provider: &str) -> ImagenxError {
    match err {
        ImagenxError::Network(e) => ImagenxError::remote(provider, e),
        ImagenxError::Json(e) => ImagenxError::remote(provider, e),
        ImagenxError::Decode(message) => ImagenxError::remote(provider, message),
        other => other,
    }
}
