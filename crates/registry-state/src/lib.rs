//! Registry-State: metadata model and backend adapters for XDS stored queries
//!
//! This crate owns everything the stored query engine treats as an external
//! collaborator: the registry entities it reads and the backend that answers
//! relational lookups over them.
//!
//! ## Key Components
//!
//! - `RegistryObject` / `Association`: immutable registry metadata records
//! - `RegistryBackend`: the async adapter contract the query core consumes
//! - `MemoryRegistryBackend`: in-memory adapter seeded from a `RegistrySnapshot`
//! - `SurrealRegistryBackend`: SurrealDB-backed adapter with schema migrations

mod error;
pub mod fakes;
mod handle;
pub mod metadata;
mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_backend;

pub use error::{StateError, StorageError};
pub use fakes::MemoryRegistryBackend;
pub use handle::{connect_cloud, connect_from_env, connect_in_memory, CloudConfig};
pub use metadata::{
    Association, AssociationType, Classification, Facet, ObjectKind, RegistryObject,
    RegistrySnapshot, UNIQUE_ID_ATTRIBUTE,
};
pub use storage_traits::{MemberFilters, RegistryBackend, StorageResult};
pub use surreal_backend::{ImportSummary, SurrealRegistryBackend};

/// Result type for connection and schema setup
pub type Result<T> = std::result::Result<T, StateError>;
