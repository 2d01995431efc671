//! Configuration for the permission resolver.

use std::sync::Arc;

use crate::cache::ResolutionCache;

/// Configuration for the permission resolver.
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Optional resolution cache.
    ///
    /// When present, the resolver will:
    /// 1. Check the cache before walking the inheritance graph
    /// 2. Store the computed result in the cache after a miss
    ///
    /// Cache operations are bounded by a short timeout; a slow or failing
    /// cache degrades to a forced miss, never to a wrong answer.
    pub cache: Option<Arc<ResolutionCache>>,
}

impl ResolverConfig {
    /// Creates a new configuration with caching enabled.
    pub fn with_cache(mut self, cache: Arc<ResolutionCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}
