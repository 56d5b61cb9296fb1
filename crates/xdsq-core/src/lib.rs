//! XDSQ Core Library
//!
//! Stored query execution for an IHE XDS document registry: parameter
//! validation, root resolution, relation gathering and association closure,
//! producing a self-consistent bundle of registry metadata.

pub mod bundle;
pub mod closure;
pub mod config;
pub mod domain;
pub mod engine;
pub mod gather;
pub mod obs;
pub mod queries;
pub mod resolve;
pub mod response;
pub mod telemetry;

pub use bundle::{DanglingReference, MetadataBundle, QueryResult};
pub use closure::{close, ClosureError, DEFAULT_MAX_CLOSURE_ROUNDS};
pub use config::{ConfigError, EngineConfig};
pub use domain::{
    parse_slot_value, validate_params, ErrorCategory, ParamParseError, ParamRule, ParamValue,
    ParameterSet, QueryError, RawParamValue, RawParams, RawScalar, Result, ValidationError,
    ValidationErrorKind, ValueType,
};
pub use engine::{QueryObserver, QueryOutcome, QueryPhase, QueryRequest, StoredQueryEngine};
pub use gather::GatherFn;
pub use obs::{emit_phase, emit_query_failed, emit_query_finished, emit_query_started, query_span};
pub use queries::{
    canonical_id, lookup, StoredQueryDef, GET_DOCUMENTS_AND_ASSOCIATIONS, GET_FOLDER_AND_CONTENTS,
    GET_SUBMISSION_SET_AND_CONTENTS, STORED_QUERIES,
};
pub use resolve::{resolve_root, Resolution, RootKey, RootSpec};
pub use response::{AdhocQueryResponse, RegistryError, ResponseStatus, ReturnType, Severity};
pub use telemetry::init_tracing;

pub use registry_state::{
    Association, AssociationType, Facet, MemoryRegistryBackend, ObjectKind, RegistryBackend,
    RegistryObject, RegistrySnapshot, StorageError, SurrealRegistryBackend,
};
