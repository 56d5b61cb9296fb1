//! Registry response assembly.
//!
//! Maps a query outcome or error onto the shape of an ebXML
//! `AdhocQueryResponse`: a status, the result in the requested return type,
//! and registry error entries carrying XDS error codes.

use std::fmt;
use std::str::FromStr;

use registry_state::{Association, RegistryObject};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, EngineConfig};
use crate::domain::{QueryError, ValidationErrorKind};
use crate::engine::QueryOutcome;

pub const XDS_REGISTRY_ERROR: &str = "XDSRegistryError";
pub const XDS_UNKNOWN_STORED_QUERY: &str = "XDSUnknownStoredQuery";
pub const XDS_STORED_QUERY_PARAM_NUMBER: &str = "XDSStoredQueryParamNumber";
pub const XDS_REGISTRY_OUT_OF_RESOURCES: &str = "XDSRegistryOutOfResources";

/// How much of each result entry to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnType {
    /// Full records.
    #[default]
    LeafClass,
    /// Ids only.
    ObjectRef,
}

impl ReturnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::LeafClass => "LeafClass",
            ReturnType::ObjectRef => "ObjectRef",
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReturnType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leafclass" => Ok(ReturnType::LeafClass),
            "objectref" => Ok(ReturnType::ObjectRef),
            _ => Err(ConfigError::InvalidValue {
                name: "return type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseStatus {
    Success,
    Failure,
}

impl ResponseStatus {
    pub fn urn(&self) -> &'static str {
        match self {
            ResponseStatus::Success => "urn:oasis:names:tc:ebxml-regrep:ResponseStatusType:Success",
            ResponseStatus::Failure => "urn:oasis:names:tc:ebxml-regrep:ResponseStatusType:Failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// One entry of a registry error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryError {
    pub error_code: &'static str,
    pub code_context: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl RegistryError {
    pub fn error(error_code: &'static str, code_context: impl Into<String>) -> Self {
        Self {
            error_code,
            code_context: code_context.into(),
            severity: Severity::Error,
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl From<&QueryError> for RegistryError {
    fn from(err: &QueryError) -> Self {
        let code = match err {
            QueryError::UnknownQuery { .. } => XDS_UNKNOWN_STORED_QUERY,
            QueryError::Validation { source, .. } => match source.kind {
                ValidationErrorKind::MissingRequired | ValidationErrorKind::MutuallyExclusive => {
                    XDS_STORED_QUERY_PARAM_NUMBER
                }
                ValidationErrorKind::CardinalityMismatch | ValidationErrorKind::TypeMismatch => {
                    XDS_REGISTRY_ERROR
                }
            },
            QueryError::Backend { .. }
            | QueryError::ClosureDidNotConverge { .. }
            | QueryError::Inconsistency { .. } => XDS_REGISTRY_ERROR,
        };
        RegistryError::error(code, err.to_string()).with_location(err.query_id())
    }
}

/// A complete stored query response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdhocQueryResponse {
    pub status: ResponseStatus,
    pub return_type: ReturnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<RegistryObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<Association>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub object_refs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RegistryError>,
}

impl AdhocQueryResponse {
    pub fn from_result(result: &Result<QueryOutcome, QueryError>, config: &EngineConfig) -> Self {
        match result {
            Ok(outcome) => Self::success(outcome, config),
            Err(err) => Self::failure(config.return_type(), vec![RegistryError::from(err)]),
        }
    }

    pub fn success(outcome: &QueryOutcome, config: &EngineConfig) -> Self {
        let return_type = config.return_type();
        let size = outcome.result.len();
        if let Some(limit) = config.max_results().filter(|limit| size > *limit) {
            let mut response = Self::failure(
                return_type,
                vec![RegistryError::error(
                    XDS_REGISTRY_OUT_OF_RESOURCES,
                    format!("result holds {size} entries, limit is {limit}"),
                )
                .with_location(outcome.query_id.as_str())],
            );
            response.request_id = Some(outcome.request_id.to_string());
            return response;
        }

        let mut response = Self {
            status: ResponseStatus::Success,
            return_type,
            request_id: Some(outcome.request_id.to_string()),
            objects: Vec::new(),
            associations: Vec::new(),
            object_refs: Vec::new(),
            errors: Vec::new(),
        };
        match return_type {
            ReturnType::LeafClass => {
                response.objects = outcome.result.objects.clone();
                response.associations = outcome.result.associations.clone();
            }
            ReturnType::ObjectRef => {
                response.object_refs = outcome.result.ids().into_iter().map(String::from).collect();
            }
        }
        response
    }

    pub fn failure(return_type: ReturnType, errors: Vec<RegistryError>) -> Self {
        Self {
            status: ResponseStatus::Failure,
            return_type,
            request_id: None,
            objects: Vec::new(),
            associations: Vec::new(),
            object_refs: Vec::new(),
            errors,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Number of returned entries in either return type.
    pub fn result_count(&self) -> usize {
        self.objects.len() + self.associations.len() + self.object_refs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::QueryResult;
    use crate::domain::ValidationError;
    use crate::engine::QueryPhase;
    use registry_state::{AssociationType, ObjectKind, StorageError};
    use uuid::Uuid;

    fn outcome() -> QueryOutcome {
        QueryOutcome {
            query_id: "urn:uuid:q".to_string(),
            request_id: Uuid::new_v4(),
            phase: QueryPhase::Done,
            result: QueryResult {
                objects: vec![
                    RegistryObject::new("d1", ObjectKind::DocumentEntry),
                    RegistryObject::new("ss1", ObjectKind::SubmissionSet),
                ],
                associations: vec![Association::new(
                    "a1",
                    AssociationType::HasMember,
                    "ss1",
                    "d1",
                )],
            },
        }
    }

    #[test]
    fn test_leaf_class_returns_records() {
        let response = AdhocQueryResponse::success(&outcome(), &EngineConfig::default());
        assert!(response.is_success());
        assert_eq!(response.objects.len(), 2);
        assert_eq!(response.associations.len(), 1);
        assert!(response.object_refs.is_empty());
        assert_eq!(response.result_count(), 3);
    }

    #[test]
    fn test_object_ref_returns_ids_only() {
        let config = EngineConfig::default().with_return_type(ReturnType::ObjectRef);
        let response = AdhocQueryResponse::success(&outcome(), &config);
        assert!(response.objects.is_empty());
        assert!(response.associations.is_empty());
        assert_eq!(response.object_refs, vec!["d1", "ss1", "a1"]);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["returnType"], "ObjectRef");
        assert!(json.get("objects").is_none());
    }

    #[test]
    fn test_oversize_result_is_out_of_resources() {
        let config = EngineConfig::default().with_max_results(Some(2));
        let response = AdhocQueryResponse::success(&outcome(), &config);
        assert!(!response.is_success());
        assert_eq!(response.result_count(), 0);
        assert_eq!(response.errors[0].error_code, XDS_REGISTRY_OUT_OF_RESOURCES);

        let config = EngineConfig::default().with_max_results(Some(3));
        assert!(AdhocQueryResponse::success(&outcome(), &config).is_success());
    }

    #[test]
    fn test_error_code_mapping() {
        let code = |err: QueryError| RegistryError::from(&err).error_code;

        assert_eq!(
            code(QueryError::UnknownQuery {
                query_id: "x".to_string()
            }),
            XDS_UNKNOWN_STORED_QUERY
        );
        let validation = |kind| QueryError::Validation {
            query_id: "q".to_string(),
            source: ValidationError::new(kind, ["$P"], "bad"),
        };
        assert_eq!(
            code(validation(ValidationErrorKind::MissingRequired)),
            XDS_STORED_QUERY_PARAM_NUMBER
        );
        assert_eq!(
            code(validation(ValidationErrorKind::MutuallyExclusive)),
            XDS_STORED_QUERY_PARAM_NUMBER
        );
        assert_eq!(
            code(validation(ValidationErrorKind::TypeMismatch)),
            XDS_REGISTRY_ERROR
        );
        assert_eq!(
            code(QueryError::Backend {
                query_id: "q".to_string(),
                cause: StorageError::Backend("down".to_string()),
            }),
            XDS_REGISTRY_ERROR
        );
    }

    #[test]
    fn test_failure_response_serializes_errors() {
        let err = QueryError::UnknownQuery {
            query_id: "urn:uuid:nope".to_string(),
        };
        let response = AdhocQueryResponse::from_result(&Err(err), &EngineConfig::default());
        assert_eq!(response.status, ResponseStatus::Failure);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "Failure");
        assert_eq!(json["errors"][0]["errorCode"], XDS_UNKNOWN_STORED_QUERY);
        assert_eq!(json["errors"][0]["severity"], "Error");
        assert_eq!(json["errors"][0]["location"], "urn:uuid:nope");
    }

    #[test]
    fn test_return_type_parsing() {
        assert_eq!("ObjectRef".parse::<ReturnType>().unwrap(), ReturnType::ObjectRef);
        assert_eq!(" leafclass ".parse::<ReturnType>().unwrap(), ReturnType::LeafClass);
        assert!("Everything".parse::<ReturnType>().is_err());
        assert_eq!(
            ResponseStatus::Success.urn(),
            "urn:oasis:names:tc:ebxml-regrep:ResponseStatusType:Success"
        );
    }
}
