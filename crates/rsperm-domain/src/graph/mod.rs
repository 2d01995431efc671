//! Inheritance graph over the record store's edge facts.
//!
//! The graph is a queryable view, not a copy: every query reads the edge
//! facts through [`RecordStore`], so closure results always reflect the
//! snapshot the ambient transaction provides.
//!
//! # Invariant
//!
//! The edge set must remain acyclic. [`InheritanceGraph::add_edge`] enforces
//! this with a single reachability query before the insert; a violating edge
//! fails with [`DomainError::CycleDetected`] and mutates nothing.
//!
//! # Traversal Safety
//!
//! Closures are computed by BFS with a visited set. Cycles are structurally
//! impossible once the invariant holds, but traversal is still bounded by
//! [`GraphConfig::visit_limit`] against store-level corruption.

#[cfg(test)]
mod acyclicity_proptest;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use rsperm_storage::{RecordStore, ResourceId};

use crate::error::{DomainError, DomainResult};

/// Configuration for inheritance graph traversal.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Maximum number of nodes a single closure traversal may visit.
    pub visit_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            visit_limit: 1_000_000,
        }
    }
}

impl GraphConfig {
    /// Creates a configuration with the specified visit limit.
    pub fn with_visit_limit(mut self, visit_limit: usize) -> Self {
        self.visit_limit = visit_limit;
        self
    }
}

/// Traversal direction over the edge facts.
#[derive(Debug, Clone, Copy)]
enum Direction {
    /// child -> parents ("is inherited from"), yields ancestors.
    Up,
    /// parent -> children, yields descendants.
    Down,
}

/// Directed acyclic inheritance graph view over a record store.
///
/// Cheap to clone (holds an `Arc` to the store); clones observe the same
/// underlying facts.
#[derive(Debug)]
pub struct InheritanceGraph<S> {
    store: Arc<S>,
    config: GraphConfig,
}

impl<S> Clone for InheritanceGraph<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: RecordStore> InheritanceGraph<S> {
    /// Creates a graph view over the given store with default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            config: GraphConfig::default(),
        }
    }

    /// Creates a graph view with custom configuration.
    pub fn with_config(store: Arc<S>, config: GraphConfig) -> Self {
        Self { store, config }
    }

    /// Adds the inheritance edge `parent -> child` (child inherits every
    /// permission of parent).
    ///
    /// - `InvalidArgument` if `parent == child` (self-loops are meaningless).
    /// - No-op success if the edge already exists.
    /// - `CycleDetected` if `child` is already an ancestor of `parent`:
    ///   the new edge would make `child` inherit from itself.
    pub async fn add_edge(&self, parent: ResourceId, child: ResourceId) -> DomainResult<()> {
        if parent == child {
            return Err(DomainError::invalid_argument(format!(
                "resource {parent} cannot inherit from itself"
            )));
        }
        if self.store.find_edge(parent, child).await? {
            return Ok(());
        }
        // One reachability query upward from parent, short-circuiting on
        // child, instead of materializing the full ancestor closure.
        if self.reaches(parent, child, Direction::Up).await? {
            return Err(DomainError::CycleDetected { parent, child });
        }
        self.store.insert_edge(parent, child).await?;
        Ok(())
    }

    /// Removes the inheritance edge `parent -> child`. No-op if absent.
    pub async fn remove_edge(&self, parent: ResourceId, child: ResourceId) -> DomainResult<()> {
        self.store.delete_edge(parent, child).await?;
        Ok(())
    }

    /// Returns the ancestor closure of `resource`: every resource it
    /// transitively inherits from. Does not include `resource` itself.
    ///
    /// Duplicate-free and deterministic for a fixed graph state; iteration
    /// order of the returned set is unspecified.
    pub async fn ancestors_of(&self, resource: ResourceId) -> DomainResult<HashSet<ResourceId>> {
        self.closure(resource, Direction::Up).await
    }

    /// Returns the descendant closure of `resource`: every resource that
    /// transitively inherits from it. Does not include `resource` itself.
    pub async fn descendants_of(&self, resource: ResourceId) -> DomainResult<HashSet<ResourceId>> {
        self.closure(resource, Direction::Down).await
    }

    async fn scan(&self, node: ResourceId, direction: Direction) -> DomainResult<Vec<ResourceId>> {
        let next = match direction {
            Direction::Up => self.store.scan_edges_to(node).await?,
            Direction::Down => self.store.scan_edges_from(node).await?,
        };
        Ok(next)
    }

    /// Breadth-first closure from `start`, excluding `start` itself.
    async fn closure(
        &self,
        start: ResourceId,
        direction: Direction,
    ) -> DomainResult<HashSet<ResourceId>> {
        let mut visited: HashSet<ResourceId> = HashSet::new();
        let mut queue: VecDeque<ResourceId> = VecDeque::new();
        queue.push_back(start);

        while let Some(node) = queue.pop_front() {
            for next in self.scan(node, direction).await? {
                if next != start && visited.insert(next) {
                    if visited.len() > self.config.visit_limit {
                        return Err(DomainError::VisitLimitExceeded {
                            limit: self.config.visit_limit,
                        });
                    }
                    queue.push_back(next);
                }
            }
        }

        Ok(visited)
    }

    /// Reachability query: is `goal` reachable from `start`? Short-circuits
    /// on the first hit instead of completing the closure.
    async fn reaches(
        &self,
        start: ResourceId,
        goal: ResourceId,
        direction: Direction,
    ) -> DomainResult<bool> {
        let mut visited: HashSet<ResourceId> = HashSet::new();
        let mut queue: VecDeque<ResourceId> = VecDeque::new();
        queue.push_back(start);

        while let Some(node) = queue.pop_front() {
            for next in self.scan(node, direction).await? {
                if next == goal {
                    return Ok(true);
                }
                if visited.insert(next) {
                    if visited.len() > self.config.visit_limit {
                        return Err(DomainError::VisitLimitExceeded {
                            limit: self.config.visit_limit,
                        });
                    }
                    queue.push_back(next);
                }
            }
        }

        Ok(false)
    }
}
