//! rsperm-domain: Core authorization domain logic
//!
//! This crate contains the core permission-resolution logic including:
//! - Inheritance graph with cycle prevention and closure queries
//! - Permission resolver for authorized-side transitive checks
//! - Resolution result caching with precise invalidation
//! - Authorization manager façade tying writes to post-commit invalidation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rsperm-domain                  │
//! ├─────────────────────────────────────────────┤
//! │  graph/    - Inheritance graph & closures   │
//! │  resolver/ - Permission resolution engine   │
//! │  cache/    - Resolution result caching      │
//! │  manager/  - Authorization manager façade   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod graph;
pub mod manager;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use cache::{CacheKey, ResolutionCache, ResolutionCacheConfig};
pub use error::{DomainError, DomainResult};
pub use graph::{GraphConfig, InheritanceGraph};
pub use manager::{AuthorizationManager, ManagerConfig};
pub use resolver::{PermissionResolver, ResolverConfig};
