//! rsperm-storage: Record store abstraction layer
//!
//! This crate provides the durable-storage abstraction for rsperm, including:
//! - RecordStore trait for permission and inheritance-edge facts
//! - In-memory implementation for testing and embedded use
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rsperm-storage                 │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - RecordStore trait definition │
//! │  memory.rs   - In-memory implementation     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Production SQL backends implement the same trait; the façade in
//! rsperm-domain only ever talks to `RecordStore`.

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryRecordStore;
pub use traits::{PostCommitAction, RecordStore, ResourceId};
