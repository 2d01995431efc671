//! Resolution result caching with precise per-resource invalidation.
//!
//! This module provides a resolution cache using Moka for concurrent access
//! with built-in TTL-based eviction.
//!
//! # Architecture
//!
//! The cache uses Moka's async Cache which provides:
//! - Lock-free concurrent reads
//! - Automatic TTL-based eviction
//! - Memory-bounded storage
//!
//! A secondary index maps each authorized resource id to the set of cache
//! keys it appears in, so invalidating one resource is O(K) in that
//! resource's entries rather than O(N) in the whole cache.
//!
//! # Consistency
//!
//! Caching here is consistency-critical, not best-effort: a stale positive
//! is an authorization leak and a stale negative is a wrongful denial. The
//! façade invalidates after every committed write; entries are disposable
//! projections and may additionally be evicted at any time (loss of speed,
//! never of correctness). `clear()` is the blunt recovery path for
//! out-of-band bulk mutation by collaborators that bypass the façade.
//!
//! A population computed before an invalidation but inserted after it would
//! resurrect exactly the state the invalidation removed. Every invalidation
//! therefore bumps a monotonic epoch; resolvers capture the epoch before
//! reading the store and populate through
//! [`ResolutionCache::insert_unless_invalidated`], which discards the entry
//! if the epoch moved. Invalidate-then-repopulate is the only supported
//! ordering.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache;
use rsperm_storage::ResourceId;

/// Configuration for the resolution cache.
#[derive(Debug, Clone)]
pub struct ResolutionCacheConfig {
    /// Whether caching is enabled. When disabled, lookups always miss and
    /// population is a no-op.
    pub enabled: bool,
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,
    /// Default TTL for cache entries.
    pub default_ttl: Duration,
}

impl Default for ResolutionCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 100_000,
            default_ttl: Duration::from_secs(300),
        }
    }
}

impl ResolutionCacheConfig {
    /// Enables or disables caching.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Sets the default TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// Cache key that uniquely identifies a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The resource whose authorization was resolved.
    pub authorized: ResourceId,
    /// The target resource of the action.
    pub target: ResourceId,
    /// The action, case-sensitive.
    pub action: String,
}

impl CacheKey {
    /// Creates a new cache key.
    pub fn new(authorized: ResourceId, target: ResourceId, action: impl Into<String>) -> Self {
        Self {
            authorized,
            target,
            action: action.into(),
        }
    }
}

/// Resolution result cache with TTL support.
///
/// Uses Moka's async Cache for lock-free concurrent access with automatic
/// TTL-based eviction, plus a DashMap secondary index for O(K) per-resource
/// invalidation.
///
/// # Thread Safety
///
/// Fully thread-safe; share across tasks without external synchronization.
pub struct ResolutionCache {
    /// The underlying Moka cache storing resolution results.
    cache: Cache<CacheKey, bool>,
    /// Configuration for this cache instance.
    config: ResolutionCacheConfig,
    /// Secondary index: authorized resource id -> keys it appears in.
    by_authorized: DashMap<ResourceId, HashSet<CacheKey>>,
    /// Monotonic count of invalidation events. Populations that observed an
    /// older epoch are stale by definition and get discarded.
    epoch: AtomicU64,
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("config", &self.config)
            .field("entry_count", &self.cache.entry_count())
            .field("index_size", &self.by_authorized.len())
            .finish()
    }
}

impl ResolutionCache {
    /// Creates a new resolution cache with the given configuration.
    pub fn new(config: ResolutionCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.default_ttl)
            .build();

        Self {
            cache,
            config,
            by_authorized: DashMap::new(),
            epoch: AtomicU64::new(0),
        }
    }

    /// Returns the current invalidation epoch.
    ///
    /// Capture this before reading the store, then populate with
    /// [`ResolutionCache::insert_unless_invalidated`]; if any invalidation
    /// runs in between, the populate is discarded as stale.
    pub fn invalidation_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Returns the configuration for this cache.
    pub fn config(&self) -> &ResolutionCacheConfig {
        &self.config
    }

    /// Returns whether caching is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Inserts a resolution result into the cache.
    ///
    /// The entry expires after the configured TTL. Also updates the
    /// secondary index used by [`ResolutionCache::invalidate_resource`].
    ///
    /// Callers whose result may race an invalidation (anything computed
    /// from a store read) must use
    /// [`ResolutionCache::insert_unless_invalidated`] instead.
    pub async fn insert(&self, key: CacheKey, allowed: bool) {
        if !self.config.enabled {
            return;
        }

        self.by_authorized
            .entry(key.authorized)
            .or_default()
            .insert(key.clone());

        self.cache.insert(key, allowed).await;
    }

    /// Inserts a resolution result unless an invalidation ran since
    /// `observed_epoch` was captured.
    ///
    /// A result computed from a store snapshot older than an invalidation
    /// must not land in the cache: the invalidation already removed
    /// whatever that snapshot would reproduce. The entry is inserted and
    /// then the epoch is re-checked; if it moved, the entry is removed
    /// again. An invalidation interleaving with the insert either sees the
    /// entry (and removes it) or is caught by the re-check, so the stale
    /// result cannot survive either way.
    pub async fn insert_unless_invalidated(
        &self,
        key: CacheKey,
        allowed: bool,
        observed_epoch: u64,
    ) {
        if !self.config.enabled || self.epoch.load(Ordering::Acquire) != observed_epoch {
            return;
        }

        self.by_authorized
            .entry(key.authorized)
            .or_default()
            .insert(key.clone());
        self.cache.insert(key.clone(), allowed).await;

        if self.epoch.load(Ordering::Acquire) != observed_epoch {
            if let Some(mut keys) = self.by_authorized.get_mut(&key.authorized) {
                keys.remove(&key);
            }
            self.cache.invalidate(&key).await;
        }
    }

    /// Retrieves a cached resolution result.
    ///
    /// Returns `None` if the key is absent, expired, or caching is disabled.
    ///
    /// # Metrics
    ///
    /// - `rsperm_cache_hits_total` - incremented on cache hit
    /// - `rsperm_cache_misses_total` - incremented on cache miss
    pub async fn get(&self, key: &CacheKey) -> Option<bool> {
        if !self.config.enabled {
            return None;
        }

        let result = self.cache.get(key).await;
        if result.is_some() {
            metrics::counter!("rsperm_cache_hits_total").increment(1);
        } else {
            metrics::counter!("rsperm_cache_misses_total").increment(1);
        }
        result
    }

    /// Invalidates every entry keyed by `resource` as the authorized party.
    ///
    /// Uses the secondary index for O(K) where K is the number of entries
    /// for this resource, instead of O(N) over the whole cache. The index
    /// bucket is removed atomically so an insert racing this call cannot
    /// resurrect an entry the caller meant to drop.
    ///
    /// Callers that need the full invalidation scope of a mutation (the
    /// resource plus everything inheriting from it) expand the affected set
    /// first and call this once per member; the façade does exactly that.
    pub async fn invalidate_resource(&self, resource: ResourceId) {
        // Epoch first: a population that read the store before this
        // invalidation must observe the bump and discard itself.
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if let Some((_, keys)) = self.by_authorized.remove(&resource) {
            for key in &keys {
                self.cache.invalidate(key).await;
            }
        }
    }

    /// Drops all entries unconditionally.
    ///
    /// The recovery path after a collaborator mutates the record store
    /// behind the façade's back (bulk grants, migrations).
    pub async fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.by_authorized.clear();
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Returns the approximate number of entries in the cache.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance tasks.
    ///
    /// This triggers any pending evictions. Useful for testing TTL behavior.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

/// Registers resolution cache metrics descriptions.
///
/// Call once during application startup to register metric descriptions
/// with the metrics recorder. Optional, but gives better documentation in
/// Prometheus/Grafana.
pub fn register_resolution_cache_metrics() {
    metrics::describe_counter!(
        "rsperm_cache_hits_total",
        "Total number of resolution cache hits"
    );
    metrics::describe_counter!(
        "rsperm_cache_misses_total",
        "Total number of resolution cache misses"
    );
}
