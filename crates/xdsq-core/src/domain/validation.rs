//! Rule-table validation of stored query parameters.
//!
//! Each stored query declares a `&'static [ParamRule]`. Validation runs
//! before any backend access and either yields a [`ParameterSet`] or the
//! first rule violation found, checking rules in table order.

use std::collections::BTreeMap;

use tracing::debug;

use super::error::{ValidationError, ValidationErrorKind};
use super::params::{ParamValue, ParameterSet, RawParamValue, RawParams};

/// What a parameter's values must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Quoted text only.
    String,
    /// Text or number; kept in textual form.
    Opaque,
}

/// One row of a query's parameter rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRule {
    pub name: &'static str,
    pub required: bool,
    pub repeatable: bool,
    pub value_type: ValueType,
    /// Another repeatable parameter that must carry as many values.
    pub same_size_as: Option<&'static str>,
    /// Exactly one of `name` and `alternative` must be supplied.
    pub alternative: Option<&'static str>,
}

impl ParamRule {
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            repeatable: false,
            value_type: ValueType::String,
            same_size_as: None,
            alternative: None,
        }
    }

    pub const fn required(name: &'static str) -> Self {
        Self {
            required: true,
            ..Self::optional(name)
        }
    }

    pub const fn repeatable(self) -> Self {
        Self {
            repeatable: true,
            ..self
        }
    }

    pub const fn opaque(self) -> Self {
        Self {
            value_type: ValueType::Opaque,
            ..self
        }
    }

    pub const fn same_size_as(self, other: &'static str) -> Self {
        Self {
            same_size_as: Some(other),
            ..self
        }
    }

    pub const fn alternative(self, other: &'static str) -> Self {
        Self {
            alternative: Some(other),
            ..self
        }
    }
}

fn supplied<'a>(raw: &'a RawParams, name: &str) -> Option<&'a RawParamValue> {
    raw.get(name).filter(|value| !value.is_empty_list())
}

/// Validate `raw` against `rules`.
///
/// # Errors
///
/// - `MutuallyExclusive`: both parameters of an alternative pair supplied.
/// - `MissingRequired`: a required parameter, or both of a required
///   alternative pair, absent.
/// - `CardinalityMismatch`: a list for a non-repeatable parameter, or
///   `same_size_as` partners of different lengths.
/// - `TypeMismatch`: a number where quoted text is expected.
pub fn validate_params(
    rules: &[ParamRule],
    raw: &RawParams,
) -> Result<ParameterSet, ValidationError> {
    let mut values = BTreeMap::new();

    for rule in rules {
        let value = supplied(raw, rule.name);

        match rule.alternative {
            Some(other) => {
                let other_value = supplied(raw, other);
                match (value.is_some(), other_value.is_some()) {
                    (true, true) => {
                        return Err(ValidationError::new(
                            ValidationErrorKind::MutuallyExclusive,
                            [rule.name, other],
                            "supply exactly one of these parameters",
                        ))
                    }
                    (false, false) if rule.required => {
                        return Err(ValidationError::new(
                            ValidationErrorKind::MissingRequired,
                            [rule.name, other],
                            "one of these parameters is required",
                        ))
                    }
                    _ => {}
                }
            }
            None if rule.required && value.is_none() => {
                return Err(ValidationError::new(
                    ValidationErrorKind::MissingRequired,
                    [rule.name],
                    "parameter is required",
                ));
            }
            None => {}
        }

        if let Some(value) = value {
            values.insert(rule.name.to_string(), check_value(rule, value)?);
        }
    }

    for rule in rules {
        if let Some(other) = rule.same_size_as {
            let len = |name: &str| match values.get(name) {
                Some(ParamValue::Multiple(items)) => items.len(),
                Some(ParamValue::Single(_)) => 1,
                None => 0,
            };
            let (ours, theirs) = (len(rule.name), len(other));
            if ours != theirs {
                return Err(ValidationError::new(
                    ValidationErrorKind::CardinalityMismatch,
                    [rule.name, other],
                    format!("expected the same number of values, got {ours} and {theirs}"),
                ));
            }
        }
    }

    for name in raw.names() {
        if !rules.iter().any(|rule| rule.name == name) {
            debug!(parameter = %name, "ignoring parameter not used by this query");
        }
    }

    Ok(ParameterSet::from_validated(values))
}

fn check_value(rule: &ParamRule, value: &RawParamValue) -> Result<ParamValue, ValidationError> {
    if !rule.repeatable && matches!(value, RawParamValue::List(_)) {
        return Err(ValidationError::new(
            ValidationErrorKind::CardinalityMismatch,
            [rule.name],
            "parameter takes a single value, not a list",
        ));
    }

    if rule.value_type == ValueType::String && !value.scalars().iter().all(|s| s.is_text()) {
        return Err(ValidationError::new(
            ValidationErrorKind::TypeMismatch,
            [rule.name],
            "expected quoted text",
        ));
    }

    let mut strings = value.clone().into_strings();
    if rule.repeatable {
        return Ok(ParamValue::Multiple(strings));
    }
    match strings.pop() {
        Some(single) => Ok(ParamValue::Single(single)),
        None => Err(ValidationError::new(
            ValidationErrorKind::CardinalityMismatch,
            [rule.name],
            "parameter has no value",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::params::RawScalar;

    const A: &str = "$XDSSubmissionSetEntryUUID";
    const B: &str = "$XDSSubmissionSetUniqueId";
    const CODES: &str = "$XDSDocumentEntryFormatCode";
    const SCHEMES: &str = "$XDSDocumentEntryFormatCodeScheme";

    const RULES: &[ParamRule] = &[
        ParamRule::required(A).alternative(B),
        ParamRule::required(B).alternative(A),
        ParamRule::optional(CODES).repeatable(),
        ParamRule::optional(SCHEMES).repeatable().same_size_as(CODES),
    ];

    #[test]
    fn test_exactly_one_alternative_passes() {
        let by_uuid = validate_params(RULES, &RawParams::new().with_text(A, "urn:uuid:1")).unwrap();
        assert_eq!(by_uuid.get_str(A), Some("urn:uuid:1"));
        assert!(!by_uuid.contains(B));

        let by_key = validate_params(RULES, &RawParams::new().with_text(B, "1.2.3")).unwrap();
        assert_eq!(by_key.get_str(B), Some("1.2.3"));
    }

    #[test]
    fn test_both_alternatives_rejected() {
        let raw = RawParams::new().with_text(A, "urn:uuid:1").with_text(B, "1.2.3");
        let err = validate_params(RULES, &raw).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MutuallyExclusive);
        assert_eq!(err.parameters, vec![A, B]);
    }

    #[test]
    fn test_neither_alternative_rejected() {
        let err = validate_params(RULES, &RawParams::new()).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingRequired);
        assert!(err.parameters.contains(&A.to_string()));
        assert!(err.parameters.contains(&B.to_string()));
    }

    #[test]
    fn test_plain_required_missing() {
        const ONE: &[ParamRule] = &[ParamRule::required("$Only")];
        let err = validate_params(ONE, &RawParams::new()).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingRequired);
        assert_eq!(err.parameter(), "$Only");
    }

    #[test]
    fn test_list_for_single_value_is_cardinality_mismatch() {
        let raw = RawParams::new().with_texts(A, ["urn:uuid:1"]);
        let err = validate_params(RULES, &raw).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::CardinalityMismatch);
        assert_eq!(err.parameter(), A);
    }

    #[test]
    fn test_number_for_string_is_type_mismatch() {
        let mut raw = RawParams::new();
        raw.insert(A, RawParamValue::Single(RawScalar::Number(7)));
        let err = validate_params(RULES, &raw).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::TypeMismatch);
    }

    #[test]
    fn test_opaque_accepts_numbers() {
        const OPAQUE: &[ParamRule] = &[ParamRule::optional("$Time").opaque()];
        let mut raw = RawParams::new();
        raw.insert("$Time", RawParamValue::Single(RawScalar::Number(2004)));
        let set = validate_params(OPAQUE, &raw).unwrap();
        assert_eq!(set.get_str("$Time"), Some("2004"));
    }

    #[test]
    fn test_repeatable_single_value_becomes_list() {
        let raw = RawParams::new().with_text(A, "urn:uuid:1").with_text(CODES, "pdf");
        let err = validate_params(RULES, &raw).unwrap_err();
        // the scheme partner is absent, so sizes differ
        assert_eq!(err.kind, ValidationErrorKind::CardinalityMismatch);

        const NO_PARTNER: &[ParamRule] = &[ParamRule::optional(CODES).repeatable()];
        let set = validate_params(NO_PARTNER, &RawParams::new().with_text(CODES, "pdf")).unwrap();
        assert_eq!(set.get(CODES), Some(&ParamValue::Multiple(vec!["pdf".to_string()])));
    }

    #[test]
    fn test_same_size_partners() {
        let raw = RawParams::new()
            .with_text(A, "urn:uuid:1")
            .with_texts(CODES, ["pdf", "cda"])
            .with_texts(SCHEMES, ["s1", "s2"]);
        assert!(validate_params(RULES, &raw).is_ok());

        let raw = RawParams::new()
            .with_text(A, "urn:uuid:1")
            .with_texts(CODES, ["pdf", "cda"])
            .with_texts(SCHEMES, ["s1"]);
        let err = validate_params(RULES, &raw).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::CardinalityMismatch);
        assert_eq!(err.parameters, vec![SCHEMES, CODES]);
    }

    #[test]
    fn test_empty_list_means_absent() {
        let raw = RawParams::new()
            .with_text(A, "urn:uuid:1")
            .with_texts(CODES, Vec::<String>::new());
        let set = validate_params(RULES, &raw).unwrap();
        assert!(set.get_list(CODES).is_empty());
        assert!(!set.contains(CODES));
    }

    #[test]
    fn test_unknown_parameters_ignored() {
        let raw = RawParams::new()
            .with_text(A, "urn:uuid:1")
            .with_text("$SomethingElse", "x");
        let set = validate_params(RULES, &raw).unwrap();
        assert!(!set.contains("$SomethingElse"));
        assert_eq!(set.len(), 1);
    }
}
