//! Provider resolution core: capability contract, registry, and factory.

mod contract;
mod factory;
pub mod providers;
mod registry;
mod types;

pub use contract::ImageGenerator;
pub use factory::GeneratorFactory;
pub use registry::{Constructor, ProviderRegistry};
pub use types::{ImageOutput, ModelIdentifier, ResolutionTag, SizeSpec};
