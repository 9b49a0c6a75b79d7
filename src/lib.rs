#![warn(missing_docs)]
//! Imagenx - provider-routed AI image generation gateway.
//!
//! One request surface over multiple image generation backends. Callers name
//! a backend with a `provider:model` identifier, configuration (identifier +
//! API key) is resolved per request from transport headers with environment
//! fallback, and constructed backend instances are cached per
//! `(identifier, api key)` pair.
//!
//! # Quick Start
//!
//! ```no_run
//! use imagenx::Dispatcher;
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> imagenx::Result<()> {
//!     // IMAGENX_MODEL=doubao:doubao-seedream-4-0-250828 and
//!     // IMAGENX_API_KEY must be set in the environment, or supplied
//!     // per request through the header map.
//!     let dispatcher = Dispatcher::new();
//!     let outputs = dispatcher
//!         .text_to_image(&HashMap::new(), "A golden retriever puppy", "2K")
//!         .await?;
//!     println!("{} image(s)", outputs.len());
//!     Ok(())
//! }
//! ```
//!
//! # Providers
//!
//! - `doubao`: Seedream via the Volcengine Ark API (text-to-image and
//!   image-to-image)
//! - `openai`: gpt-image / dall-e via the OpenAI Images API (text-to-image)
//!
//! Additional backends register through [`ProviderRegistry`].

pub mod config;
pub mod dispatch;
mod error;
pub mod generator;
#[doc(hidden)]
pub mod mcp;
pub mod ops;

// Re-export error types at crate root
pub use error::{ImagenxError, Result};

pub use config::{ResolvedConfig, API_KEY_FIELD, MODEL_FIELD};
pub use dispatch::Dispatcher;
pub use generator::{
    Constructor, GeneratorFactory, ImageGenerator, ImageOutput, ModelIdentifier, ProviderRegistry,
    ResolutionTag, SizeSpec,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dispatch::Dispatcher;
    pub use crate::error::{ImagenxError, Result};
    pub use crate::generator::{
        GeneratorFactory, ImageGenerator, ImageOutput, ModelIdentifier, ProviderRegistry, SizeSpec,
    };
}
