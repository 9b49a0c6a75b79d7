//! Resolution of `provider:model` identifiers into live backend instances.

use crate::error::{ImagenxError, Result};
use crate::generator::contract::ImageGenerator;
use crate::generator::registry::ProviderRegistry;
use crate::generator::types::ModelIdentifier;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Default bound on distinct `(identifier, api_key)` instances kept alive.
///
/// Instances are cheap client wrappers, but header-driven multi-tenant
/// deployments can see many distinct credentials over a long run, so the
/// cache is LRU-bounded rather than unbounded.
const DEFAULT_CACHE_CAPACITY: usize = 64;

/// The single authority that turns an identifier plus credential into a
/// live, cached backend instance.
pub struct GeneratorFactory {
    registry: ProviderRegistry,
    cache: Mutex<LruCache<(String, String), Arc<dyn ImageGenerator>>>,
}

impl GeneratorFactory {
    /// Creates a factory over `registry` with the default cache bound.
    pub fn new(registry: ProviderRegistry) -> Self {
        Self::with_capacity(registry, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a factory with an explicit cache capacity (clamped to >= 1).
    pub fn with_capacity(registry: ProviderRegistry, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            registry,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The registry this factory resolves against.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Resolves `identifier` (`provider:model`) and `api_key` to a backend
    /// instance.
    ///
    /// Memoized by the exact `(identifier, api_key)` tuple: repeated calls
    /// with identical arguments return the identical instance, and the same
    /// identifier with a different credential yields a distinct instance.
    /// Construction runs under the cache lock, so concurrent first access to
    /// an unseen key performs exactly one construction; this is acceptable
    /// because constructors do no I/O.
    ///
    /// An unregistered provider reports as [`ImagenxError::UnknownProvider`];
    /// a constructor rejecting its arguments propagates its own error and is
    /// never cached.
    pub fn resolve(&self, identifier: &str, api_key: &str) -> Result<Arc<dyn ImageGenerator>> {
        let parsed: ModelIdentifier = identifier.parse()?;

        let constructor = self.registry.constructor(parsed.provider()).ok_or_else(|| {
            ImagenxError::UnknownProvider {
                provider: parsed.provider().to_string(),
            }
        })?;

        let key = (identifier.to_string(), api_key.to_string());
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(instance) = cache.get(&key) {
            return Ok(Arc::clone(instance));
        }

        tracing::debug!(
            provider = parsed.provider(),
            model = parsed.model(),
            "constructing generator instance"
        );
        let instance = constructor(parsed.model(), api_key)?;
        cache.put(key, Arc::clone(&instance));
        Ok(instance)
    }

    /// Number of cached instances, for diagnostics.
    pub fn cached_instances(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
