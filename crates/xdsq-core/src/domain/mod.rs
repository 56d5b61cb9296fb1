//! Request-side domain types for stored queries.
//!
//! - `RawParams` / `ParameterSet`: untrusted and validated parameters
//! - `ParamRule`: one row of a query's parameter rule table
//! - `QueryError`: the failure taxonomy of the pipeline

pub mod error;
pub mod params;
pub mod validation;

pub use error::{
    ErrorCategory, ParamParseError, QueryError, Result, ValidationError, ValidationErrorKind,
};
pub use params::{parse_slot_value, ParamValue, ParameterSet, RawParamValue, RawParams, RawScalar};
pub use validation::{validate_params, ParamRule, ValueType};
