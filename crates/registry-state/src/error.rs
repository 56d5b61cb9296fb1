//! Error types for registry-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the registry database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors returned by `RegistryBackend` calls.
///
/// The query core treats every variant as an opaque backend failure and
/// carries it upward as the cause.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The store is unreachable or rejected the query
    #[error("backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A stored record violates the metadata model
    #[error("invalid record {record_id}: {reason}")]
    InvalidRecord { record_id: String, reason: String },

    /// A coded value is outside its closed vocabulary
    #[error("unknown {vocabulary} value: {value}")]
    UnknownVocabulary {
        vocabulary: &'static str,
        value: String,
    },
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_record_displays_id_and_reason() {
        let err = StorageError::InvalidRecord {
            record_id: "urn:uuid:1".to_string(),
            reason: "association endpoint is empty".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("urn:uuid:1"));
        assert!(msg.contains("endpoint is empty"));
    }

    #[test]
    fn test_state_error_converts_to_backend() {
        let err: StorageError = StateError::Connection("refused".to_string()).into();
        assert!(matches!(err, StorageError::Backend(ref m) if m.contains("refused")));
    }
}
