//! Provider registration table.
//!
//! Backends are registered explicitly under their provider token instead of
//! being discovered by scanning for naming conventions; the table stays open
//! for extension (register a new constructor) without touching dispatch code.
//! An entry is nothing more than its own existence plus a constructor; the
//! registry answers membership, not metadata.

use crate::error::Result;
use crate::generator::contract::ImageGenerator;
use crate::generator::providers;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Constructor for a provider backend.
///
/// Must not perform network I/O beyond building a client handle, and must
/// fail with [`ImagenxError::Configuration`](crate::ImagenxError::Configuration)
/// when either argument is structurally invalid.
pub type Constructor = fn(model: &str, api_key: &str) -> Result<Arc<dyn ImageGenerator>>;

/// Table of known provider backends.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, Constructor>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend constructor under a provider token.
    pub fn register(&mut self, provider: impl Into<String>, constructor: Constructor) {
        self.entries.insert(provider.into(), constructor);
    }

    /// Whether `provider` has a registered backend.
    pub fn is_known(&self, provider: &str) -> bool {
        self.entries.contains_key(provider)
    }

    /// Registered provider tokens, sorted.
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn constructor(&self, provider: &str) -> Option<Constructor> {
        self.entries.get(provider).copied()
    }

    /// The process-wide table of built-in backends.
    ///
    /// Built lazily on the first call and memoized for the process lifetime;
    /// concurrent first access observes exactly one initialization. Providers
    /// do not appear or disappear at runtime.
    pub fn builtin() -> &'static ProviderRegistry {
        static BUILTIN: OnceLock<ProviderRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let mut registry = ProviderRegistry::new();
            registry.register("doubao", providers::doubao::construct);
            registry.register("openai", providers::openai::construct);
            registry
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImagenxError;

    #[test]
    fn test_builtin_membership() {
        let registry = ProviderRegistry::builtin();
        assert!(registry.is_known("doubao"));
        assert!(registry.is_known("openai"));
        assert!(!registry.is_known("midjourney"));
    }

    #[test]
    fn test_builtin_is_memoized() {
        let first = ProviderRegistry::builtin();
        let second = ProviderRegistry::builtin();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.providers(), second.providers());
    }

    #[test]
    fn test_providers_sorted() {
        assert_eq!(ProviderRegistry::builtin().providers(), vec!["doubao", "openai"]);
    }

    #[test]
    fn test_register_custom_backend() {
        fn failing(_model: &str, _api_key: &str) -> Result<Arc<dyn ImageGenerator>> {
            Err(ImagenxError::Configuration("always fails".into()))
        }

        let mut registry = ProviderRegistry::new();
        assert!(!registry.is_known("custom"));
        registry.register("custom", failing);
        assert!(registry.is_known("custom"));
        assert!(registry.constructor("custom").is_some());
        assert!(registry.constructor("other").is_none());
    }
}
