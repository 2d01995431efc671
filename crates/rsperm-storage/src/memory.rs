//! In-memory record store for testing and embedded use.
//!
//! Uses `HashSet` buckets behind `DashMap` shards for O(1) insert, delete
//! and membership tests on both fact sets. Edges are indexed in both
//! directions so `scan_edges_from` and `scan_edges_to` are O(degree)
//! instead of O(total edges).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::instrument;

use crate::error::StorageResult;
use crate::traits::{PostCommitAction, RecordStore, ResourceId};

/// A stored permission fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PermissionRecord {
    authorized: ResourceId,
    target: ResourceId,
    action: String,
}

/// In-memory implementation of RecordStore.
///
/// # Performance Characteristics
///
/// - **Insert/delete/find permission**: O(1) average (HashSet per authorized id)
/// - **Insert/delete/find edge**: O(1) average, both direction indices updated
/// - **Scan edges**: O(degree) clone of the relevant index bucket
///
/// # Transaction Semantics
///
/// Autocommit: every write is its own committed transaction, so post-commit
/// actions registered via [`RecordStore::on_commit`] run inline before the
/// call returns. Transactional backends buffer them instead.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    /// Permission facts bucketed by authorized resource id.
    permissions: DashMap<ResourceId, HashSet<PermissionRecord>>,
    /// Edge index: parent -> children (resources inheriting from parent).
    children: DashMap<ResourceId, HashSet<ResourceId>>,
    /// Edge index: child -> parents (resources the child inherits from).
    parents: DashMap<ResourceId, HashSet<ResourceId>>,
}

impl MemoryRecordStore {
    /// Creates a new in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory record store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the number of stored permission facts. Test helper.
    pub fn permission_count(&self) -> usize {
        self.permissions.iter().map(|b| b.value().len()).sum()
    }

    /// Returns the number of stored inheritance edges. Test helper.
    pub fn edge_count(&self) -> usize {
        self.children.iter().map(|b| b.value().len()).sum()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_permission(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> StorageResult<bool> {
        let found = self
            .permissions
            .get(&authorized)
            .map(|bucket| {
                bucket.contains(&PermissionRecord {
                    authorized,
                    target,
                    action: action.to_string(),
                })
            })
            .unwrap_or(false);
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn insert_permission(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> StorageResult<()> {
        // HashSet::insert handles duplicates (idempotent)
        self.permissions
            .entry(authorized)
            .or_default()
            .insert(PermissionRecord {
                authorized,
                target,
                action: action.to_string(),
            });
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_permission(
        &self,
        authorized: ResourceId,
        target: ResourceId,
        action: &str,
    ) -> StorageResult<()> {
        if let Some(mut bucket) = self.permissions.get_mut(&authorized) {
            bucket.remove(&PermissionRecord {
                authorized,
                target,
                action: action.to_string(),
            });
        }
        Ok(())
    }

    async fn find_edge(&self, parent: ResourceId, child: ResourceId) -> StorageResult<bool> {
        let found = self
            .children
            .get(&parent)
            .map(|bucket| bucket.contains(&child))
            .unwrap_or(false);
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn insert_edge(&self, parent: ResourceId, child: ResourceId) -> StorageResult<()> {
        self.children.entry(parent).or_default().insert(child);
        self.parents.entry(child).or_default().insert(parent);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_edge(&self, parent: ResourceId, child: ResourceId) -> StorageResult<()> {
        if let Some(mut bucket) = self.children.get_mut(&parent) {
            bucket.remove(&child);
        }
        if let Some(mut bucket) = self.parents.get_mut(&child) {
            bucket.remove(&parent);
        }
        Ok(())
    }

    async fn scan_edges_from(&self, parent: ResourceId) -> StorageResult<Vec<ResourceId>> {
        Ok(self
            .children
            .get(&parent)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn scan_edges_to(&self, child: ResourceId) -> StorageResult<Vec<ResourceId>> {
        Ok(self
            .parents
            .get(&child)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn on_commit(&self, action: PostCommitAction) -> StorageResult<()> {
        // Autocommit: the preceding write already committed, run now.
        action.await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_find_permission() {
        let store = MemoryRecordStore::new();

        store.insert_permission(1, 2, "read").await.unwrap();

        assert!(store.find_permission(1, 2, "read").await.unwrap());
        assert!(!store.find_permission(1, 2, "write").await.unwrap());
        assert!(!store.find_permission(2, 1, "read").await.unwrap());
    }

    #[tokio::test]
    async fn test_permission_insert_is_idempotent() {
        let store = MemoryRecordStore::new();

        store.insert_permission(1, 2, "read").await.unwrap();
        store.insert_permission(1, 2, "read").await.unwrap();

        assert_eq!(store.permission_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_absent_permission_is_noop() {
        let store = MemoryRecordStore::new();

        store.delete_permission(1, 2, "read").await.unwrap();

        assert_eq!(store.permission_count(), 0);
    }

    #[tokio::test]
    async fn test_actions_are_case_sensitive() {
        let store = MemoryRecordStore::new();

        store.insert_permission(1, 2, "Read").await.unwrap();

        assert!(store.find_permission(1, 2, "Read").await.unwrap());
        assert!(!store.find_permission(1, 2, "read").await.unwrap());
    }

    #[tokio::test]
    async fn test_edge_indices_stay_in_sync() {
        let store = MemoryRecordStore::new();

        store.insert_edge(10, 20).await.unwrap();
        store.insert_edge(10, 30).await.unwrap();
        store.insert_edge(40, 20).await.unwrap();

        let mut children = store.scan_edges_from(10).await.unwrap();
        children.sort_unstable();
        assert_eq!(children, vec![20, 30]);

        let mut parents = store.scan_edges_to(20).await.unwrap();
        parents.sort_unstable();
        assert_eq!(parents, vec![10, 40]);

        store.delete_edge(10, 20).await.unwrap();
        assert!(!store.find_edge(10, 20).await.unwrap());
        assert_eq!(store.scan_edges_to(20).await.unwrap(), vec![40]);
    }

    #[tokio::test]
    async fn test_edge_insert_is_idempotent() {
        let store = MemoryRecordStore::new();

        store.insert_edge(10, 20).await.unwrap();
        store.insert_edge(10, 20).await.unwrap();

        assert_eq!(store.edge_count(), 1);
    }

    #[tokio::test]
    async fn test_on_commit_runs_action_inline() {
        let store = MemoryRecordStore::new();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let flag = Arc::clone(&ran);
        store
            .on_commit(Box::pin(async move {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
            }))
            .await
            .unwrap();

        assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
