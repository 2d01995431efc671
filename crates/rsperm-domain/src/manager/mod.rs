//! Authorization manager façade.
//!
//! Public entry point tying the record store, inheritance graph, resolver
//! and resolution cache together. Each public method is a single atomic
//! unit of work: store write, graph check and cache invalidation all take
//! effect, or nothing does.
//!
//! # Transaction Participation
//!
//! The façade does not manage transaction boundaries itself; the caller
//! (possibly a distributed transaction coordinator) wraps each call. Cache
//! invalidation is registered with [`RecordStore::on_commit`] so it runs
//! strictly after durable commit — a rolled-back transaction leaves the
//! cache untouched, and invalidation never runs speculatively for writes
//! that may still fail.
//!
//! # Invalidation Scope
//!
//! A mutation touching resource R can change what R and everything
//! inheriting from R resolve to, so the affected set is
//! `{R} ∪ descendants_of(R)`. The set is expanded inside the post-commit
//! action, over committed state; if that scan fails the action degrades to
//! a full `clear()` — over-invalidation is safe, under-invalidation is not.

use std::sync::Arc;

use rsperm_storage::{PostCommitAction, RecordStore, ResourceId};
use tokio::sync::Mutex;
use tracing::warn;

use crate::cache::{ResolutionCache, ResolutionCacheConfig};
use crate::error::{DomainError, DomainResult};
use crate::graph::{GraphConfig, InheritanceGraph};
use crate::resolver::{PermissionResolver, ResolverConfig};

/// Configuration for the authorization manager.
#[derive(Debug, Clone, Default)]
pub struct ManagerConfig {
    /// Resolution cache configuration.
    pub cache: ResolutionCacheConfig,
    /// Inheritance graph traversal configuration.
    pub graph: GraphConfig,
}

/// Authorization manager façade.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct AuthorizationManager<S> {
    store: Arc<S>,
    graph: InheritanceGraph<S>,
    resolver: PermissionResolver<S>,
    cache: Arc<ResolutionCache>,
    /// Serializes structural writes so concurrent cycle pre-checks cannot
    /// interleave into an inconsistent graph.
    write_serial: Mutex<()>,
}

impl<S: RecordStore> AuthorizationManager<S> {
    /// Creates a manager over the given store with default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, ManagerConfig::default())
    }

    /// Creates a manager with custom cache and graph configuration.
    pub fn with_config(store: Arc<S>, config: ManagerConfig) -> Self {
        let cache = Arc::new(ResolutionCache::new(config.cache));
        let graph = InheritanceGraph::with_config(Arc::clone(&store), config.graph);
        let resolver = PermissionResolver::with_config(
            Arc::clone(&store),
            graph.clone(),
            ResolverConfig::default().with_cache(Arc::clone(&cache)),
        );
        Self {
            store,
            graph,
            resolver,
            cache,
            write_serial: Mutex::new(()),
        }
    }

    /// Returns the resolution cache (for metrics and diagnostics).
    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// Returns the resolver (for cache metrics).
    pub fn resolver(&self) -> &PermissionResolver<S> {
        &self.resolver
    }

    /// Returns the inheritance graph view.
    pub fn graph(&self) -> &InheritanceGraph<S> {
        &self.graph
    }

    /// Grants `authorized` the right to perform `action` on `target`.
    ///
    /// Idempotent: granting an existing permission is a no-op success and
    /// registers no invalidation (state did not change). Fails with
    /// `InvalidArgument` if `action` is empty.
    pub async fn add_permission(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> DomainResult<()> {
        validate_action(action)?;

        if self.store.find_permission(authorized, target, action).await? {
            return Ok(());
        }

        self.store
            .insert_permission(authorized, target, action)
            .await?;
        self.register_invalidation(authorized).await
    }

    /// Removes a permission. No-op success if it was never granted.
    pub async fn remove_permission(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> DomainResult<()> {
        validate_action(action)?;

        if !self.store.find_permission(authorized, target, action).await? {
            return Ok(());
        }

        self.store
            .delete_permission(authorized, target, action)
            .await?;
        self.register_invalidation(authorized).await
    }

    /// Declares that `child` inherits every permission of `parent`.
    ///
    /// Propagates `InvalidArgument` for self-loops and `CycleDetected`
    /// when the edge would make a resource its own ancestor. Idempotent.
    pub async fn add_permission_inheritance(
        &self,
        parent: ResourceId,
        child: ResourceId,
    ) -> DomainResult<()> {
        let _guard = self.write_serial.lock().await;

        if self.store.find_edge(parent, child).await? {
            return Ok(());
        }

        self.graph.add_edge(parent, child).await?;
        self.register_invalidation(child).await
    }

    /// Removes a permission inheritance. No-op success if absent.
    pub async fn remove_permission_inheritance(
        &self,
        parent: ResourceId,
        child: ResourceId,
    ) -> DomainResult<()> {
        let _guard = self.write_serial.lock().await;

        if !self.store.find_edge(parent, child).await? {
            return Ok(());
        }

        self.graph.remove_edge(parent, child).await?;
        self.register_invalidation(child).await
    }

    /// Resolves whether `authorized` may perform `action` on `target`.
    pub async fn is_authorized(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> DomainResult<bool> {
        self.resolver.is_authorized(authorized, target, action).await
    }

    /// Drops every cached resolution unconditionally.
    ///
    /// Needed only after a collaborator bulk-updates the permission or
    /// inheritance facts behind the façade's back.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Registers a post-commit action invalidating `resource` and every
    /// resource that inherits from it.
    ///
    /// The descendant set is expanded when the action runs, i.e. over
    /// committed state; a failed scan degrades to a full cache clear.
    async fn register_invalidation(&self, resource: ResourceId) -> DomainResult<()> {
        let graph = self.graph.clone();
        let cache = Arc::clone(&self.cache);

        let action: PostCommitAction = Box::pin(async move {
            match graph.descendants_of(resource).await {
                Ok(descendants) => {
                    cache.invalidate_resource(resource).await;
                    for descendant in descendants {
                        cache.invalidate_resource(descendant).await;
                    }
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        resource,
                        "descendant scan failed during invalidation, clearing cache"
                    );
                    cache.clear().await;
                }
            }
        });

        self.store.on_commit(action).await?;
        Ok(())
    }
}

fn validate_action(action: &str) -> DomainResult<()> {
    if action.is_empty() {
        return Err(DomainError::invalid_argument("action must be non-empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
