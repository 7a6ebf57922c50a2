//! Validated, transactional entity store for the cube hierarchy.
//!
//! Entities are persisted as JSON documents in named collections, one per
//! [`EntityKind`](cubegrid_types::EntityKind), each with the secondary
//! indices declared by [`StoreSchema`]. The store itself is generic over a
//! [`DocumentBackend`]; two are provided.
//!
//! # Architecture
//!
//! ```text
//! caller
//!     |
//!     +-- EntityStore (validate -> originID check -> key -> transaction)
//!         |
//!         +-- MemoryBackend    (process-local, staged commits)
//!         +-- PostgresBackend  (JSONB documents + expression indices)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- [`EntityStore`], hierarchy and matrix batch writes, window snapshots
//! - [`schema`] -- Collections and secondary index definitions
//! - [`validate`] -- Per-kind structural validation and derived fields
//! - [`backend`] -- The persistent-store contract
//! - [`memory`] -- In-memory backend
//! - [`postgres`] -- `PostgreSQL` backend and connection pool
//! - [`error`] -- Shared error types

pub mod backend;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;
pub mod store;
pub mod validate;

// Re-export primary types for convenience.
pub use backend::{BackendTransaction, DocumentBackend};
pub use error::{BackendError, StoreError, ValidationError, ValidationReason};
pub use memory::{MemoryBackend, MemoryTransaction};
pub use postgres::{PostgresBackend, PostgresConfig, PostgresTransaction};
pub use schema::{CollectionSpec, IndexSpec, StoreSchema};
pub use store::{EntityStore, HierarchyBundle, MatrixUpdate, StoreInfo, WindowSnapshot};
pub use validate::validate_document;
