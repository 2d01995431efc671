//! Permission resolver.
//!
//! Decides whether an authorized resource may perform an action on a target
//! by combining direct permission facts with the authorized resource's
//! ancestor closure.
//!
//! # Algorithm
//!
//! The candidate set is `{authorized} ∪ ancestors_of(authorized)`; the check
//! holds iff any candidate has the direct fact `(candidate, target, action)`.
//! This is an existence check (logical OR), so the first match
//! short-circuits and candidate order is irrelevant. Only the authorized
//! side inherits — the target id must match exactly; callers needing
//! hierarchical targets expand targets themselves.
//!
//! # Caching
//!
//! With a cache configured, the resolver consults it before traversal and
//! populates it after a miss. Cache operations are bounded by a short
//! timeout; a timeout counts as "cache unavailable" and the check falls
//! through to full resolution.

mod config;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rsperm_storage::{RecordStore, ResourceId};
use tokio::time::timeout;

use crate::cache::CacheKey;
use crate::error::{DomainError, DomainResult};
use crate::graph::InheritanceGraph;

pub use config::ResolverConfig;

/// Timeout for cache operations (get/insert).
/// The cache must never block authorization checks; treat timeout as
/// "cache unavailable".
const CACHE_OP_TIMEOUT: Duration = Duration::from_millis(10);

/// Metrics for cache performance monitoring.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Number of cache hits (result found in cache).
    pub hits: AtomicU64,
    /// Number of cache misses (result not in cache, needed graph traversal).
    pub misses: AtomicU64,
    /// Number of cache skips (cache unavailable or timed out).
    pub skips: AtomicU64,
}

impl CacheMetrics {
    /// Returns a snapshot of the current metrics.
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            skips: self.skips.load(Ordering::Relaxed),
        }
    }

    /// Returns the cache hit ratio (hits / (hits + misses)).
    /// Returns 0.0 if no hits or misses have occurred.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// A point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Copy)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub skips: u64,
}

/// Permission resolver over a record store and its inheritance graph.
pub struct PermissionResolver<S> {
    store: Arc<S>,
    graph: InheritanceGraph<S>,
    config: ResolverConfig,
    /// Metrics for cache performance monitoring.
    cache_metrics: CacheMetrics,
}

impl<S: RecordStore> PermissionResolver<S> {
    /// Creates a new resolver without a cache.
    pub fn new(store: Arc<S>, graph: InheritanceGraph<S>) -> Self {
        Self {
            store,
            graph,
            config: ResolverConfig::default(),
            cache_metrics: CacheMetrics::default(),
        }
    }

    /// Creates a new resolver with custom configuration.
    pub fn with_config(store: Arc<S>, graph: InheritanceGraph<S>, config: ResolverConfig) -> Self {
        Self {
            store,
            graph,
            config,
            cache_metrics: CacheMetrics::default(),
        }
    }

    /// Returns the cache metrics for monitoring.
    pub fn cache_metrics(&self) -> &CacheMetrics {
        &self.cache_metrics
    }

    /// Resolves whether `authorized` may perform `action` on `target`.
    ///
    /// Fails with `InvalidArgument` if `action` is empty.
    pub async fn is_authorized(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> DomainResult<bool> {
        if action.is_empty() {
            return Err(DomainError::invalid_argument("action must be non-empty"));
        }

        // The epoch is captured before any store read; if an invalidation
        // runs between that read and the populate below, the populate is
        // discarded instead of resurrecting the pre-write result.
        let cache_and_key = self.config.cache.as_ref().map(|cache| {
            (
                cache,
                CacheKey::new(authorized, target, action),
                cache.invalidation_epoch(),
            )
        });

        // Cache fast path, bounded by CACHE_OP_TIMEOUT.
        if let Some((cache, ref key, _)) = cache_and_key {
            match timeout(CACHE_OP_TIMEOUT, cache.get(key)).await {
                Ok(Some(allowed)) => {
                    self.cache_metrics.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(allowed);
                }
                Ok(None) => {
                    self.cache_metrics.misses.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    // Cache unavailable; forced miss.
                    self.cache_metrics.skips.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let allowed = self.resolve(authorized, target, action).await?;

        // Populate is best-effort; a timed-out insert is dropped silently,
        // and one racing an invalidation is discarded as stale.
        if let Some((cache, key, epoch)) = cache_and_key {
            let _ = timeout(
                CACHE_OP_TIMEOUT,
                cache.insert_unless_invalidated(key, allowed, epoch),
            )
            .await;
        }

        Ok(allowed)
    }

    /// Slow path: direct fact on the authorized resource itself, then on
    /// each member of its ancestor closure, short-circuiting on the first
    /// match.
    async fn resolve(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> DomainResult<bool> {
        // A resource always "inherits from itself".
        if self.store.find_permission(authorized, target, action).await? {
            return Ok(true);
        }

        for candidate in self.graph.ancestors_of(authorized).await? {
            if self.store.find_permission(candidate, target, action).await? {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ResolutionCache, ResolutionCacheConfig};
    use rsperm_storage::MemoryRecordStore;

    fn resolver(store: Arc<MemoryRecordStore>) -> PermissionResolver<MemoryRecordStore> {
        let graph = InheritanceGraph::new(Arc::clone(&store));
        PermissionResolver::new(store, graph)
    }

    #[tokio::test]
    async fn test_direct_permission_authorizes() {
        let store = MemoryRecordStore::new_shared();
        store.insert_permission(1, 100, "read").await.unwrap();

        let resolver = resolver(store);

        assert!(resolver.is_authorized(1, 100, "read").await.unwrap());
        assert!(!resolver.is_authorized(1, 100, "write").await.unwrap());
        assert!(!resolver.is_authorized(2, 100, "read").await.unwrap());
    }

    #[tokio::test]
    async fn test_inherited_permission_authorizes_transitively() {
        let store = MemoryRecordStore::new_shared();
        let graph = InheritanceGraph::new(Arc::clone(&store));

        // 3 inherits from 2 inherits from 1; fact lives on 1
        graph.add_edge(1, 2).await.unwrap();
        graph.add_edge(2, 3).await.unwrap();
        store.insert_permission(1, 100, "write").await.unwrap();

        let resolver = PermissionResolver::new(Arc::clone(&store), graph);

        assert!(resolver.is_authorized(3, 100, "write").await.unwrap());
        assert!(resolver.is_authorized(2, 100, "write").await.unwrap());
        assert!(resolver.is_authorized(1, 100, "write").await.unwrap());
    }

    #[tokio::test]
    async fn test_target_side_does_not_inherit() {
        let store = MemoryRecordStore::new_shared();
        let graph = InheritanceGraph::new(Arc::clone(&store));

        // 200 inherits from target 100; grant is on 100 only
        graph.add_edge(100, 200).await.unwrap();
        store.insert_permission(1, 100, "write").await.unwrap();

        let resolver = PermissionResolver::new(Arc::clone(&store), graph);

        assert!(resolver.is_authorized(1, 100, "write").await.unwrap());
        assert!(!resolver.is_authorized(1, 200, "write").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_action_is_rejected_without_store_access() {
        let store = MemoryRecordStore::new_shared();
        let resolver = resolver(store);

        let err = resolver.is_authorized(1, 100, "").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_traversal() {
        let store = MemoryRecordStore::new_shared();
        let graph = InheritanceGraph::new(Arc::clone(&store));
        let cache = Arc::new(ResolutionCache::new(ResolutionCacheConfig::default()));
        let resolver = PermissionResolver::with_config(
            Arc::clone(&store),
            graph,
            ResolverConfig::default().with_cache(Arc::clone(&cache)),
        );

        store.insert_permission(1, 100, "read").await.unwrap();

        assert!(resolver.is_authorized(1, 100, "read").await.unwrap());
        assert_eq!(resolver.cache_metrics().snapshot().misses, 1);

        // Second call is served from cache even after the fact is deleted
        // out of band; invalidation is the façade's job, not the resolver's.
        store.delete_permission(1, 100, "read").await.unwrap();
        assert!(resolver.is_authorized(1, 100, "read").await.unwrap());
        assert_eq!(resolver.cache_metrics().snapshot().hits, 1);
    }

    #[tokio::test]
    async fn test_negative_results_are_cached_too() {
        let store = MemoryRecordStore::new_shared();
        let graph = InheritanceGraph::new(Arc::clone(&store));
        let cache = Arc::new(ResolutionCache::new(ResolutionCacheConfig::default()));
        let resolver = PermissionResolver::with_config(
            Arc::clone(&store),
            graph,
            ResolverConfig::default().with_cache(Arc::clone(&cache)),
        );

        assert!(!resolver.is_authorized(1, 100, "read").await.unwrap());
        assert_eq!(
            cache.get(&CacheKey::new(1, 100, "read")).await,
            Some(false)
        );
    }

    #[tokio::test]
    async fn test_hit_ratio_reflects_traffic() {
        let store = MemoryRecordStore::new_shared();
        let graph = InheritanceGraph::new(Arc::clone(&store));
        let cache = Arc::new(ResolutionCache::new(ResolutionCacheConfig::default()));
        let resolver = PermissionResolver::with_config(
            Arc::clone(&store),
            graph,
            ResolverConfig::default().with_cache(cache),
        );

        store.insert_permission(1, 100, "read").await.unwrap();

        resolver.is_authorized(1, 100, "read").await.unwrap(); // miss
        resolver.is_authorized(1, 100, "read").await.unwrap(); // hit

        let ratio = resolver.cache_metrics().hit_ratio();
        assert!((ratio - 0.5).abs() < f64::EPSILON);
    }
}
