//! RecordStore trait definition.

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::StorageResult;

/// Opaque identifier for any authorizable or authorizing entity.
///
/// The store owns no entity metadata; a resource id may denote a user,
/// role, group, document or anything else the caller models.
pub type ResourceId = i64;

/// Deferred action the store runs once the ambient transaction commits.
///
/// If the transaction rolls back, registered actions are dropped unrun.
pub type PostCommitAction = BoxFuture<'static, ()>;

/// Abstract storage interface for authorization facts.
///
/// Two fact sets live behind this trait: direct permissions
/// `(authorized, target, action)` and inheritance edges `(parent, child)`.
/// Both have set semantics — duplicate inserts and deletes of absent facts
/// are no-ops.
///
/// Implementations must be thread-safe (Send + Sync). All operations
/// participate in whatever ambient transaction the caller controls; reads
/// observe a single consistent snapshot and never mix pre- and post-commit
/// facts of another transaction.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    // Permission facts

    /// Returns whether the exact permission fact exists.
    async fn find_permission(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> StorageResult<bool>;

    /// Inserts a permission fact. Idempotent.
    async fn insert_permission(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> StorageResult<()>;

    /// Deletes a permission fact. No-op if absent.
    async fn delete_permission(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> StorageResult<()>;

    // Inheritance edges

    /// Returns whether the inheritance edge exists.
    async fn find_edge(&self, parent: ResourceId, child: ResourceId) -> StorageResult<bool>;

    /// Inserts an inheritance edge. Idempotent.
    async fn insert_edge(&self, parent: ResourceId, child: ResourceId) -> StorageResult<()>;

    /// Deletes an inheritance edge. No-op if absent.
    async fn delete_edge(&self, parent: ResourceId, child: ResourceId) -> StorageResult<()>;

    /// Lists the children of `parent` (resources inheriting from it).
    async fn scan_edges_from(&self, parent: ResourceId) -> StorageResult<Vec<ResourceId>>;

    /// Lists the parents of `child` (resources it inherits from).
    async fn scan_edges_to(&self, child: ResourceId) -> StorageResult<Vec<ResourceId>>;

    // Transaction participation

    /// Registers an action to run after the ambient transaction commits.
    ///
    /// Autocommit implementations run the action before returning. A
    /// transactional implementation buffers it and runs it on commit, or
    /// drops it on rollback.
    async fn on_commit(&self, action: PostCommitAction) -> StorageResult<()>;
}
