//! Raw and validated stored query parameters.
//!
//! Requests carry parameters as slot text in the registry query language:
//! a quoted string `'abc'`, an integer `42`, or a parenthesised list
//! `('a', 'b')`. A doubled quote inside a string stands for one quote.
//! [`RawParams`] keeps what the caller sent; [`ParameterSet`] is only ever
//! produced by validation.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

use serde::Serialize;

use super::error::ParamParseError;

/// One scalar as it appeared in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawScalar {
    Text(String),
    Number(i64),
}

impl RawScalar {
    pub fn text(value: impl Into<String>) -> Self {
        RawScalar::Text(value.into())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, RawScalar::Text(_))
    }

    fn into_string(self) -> String {
        match self {
            RawScalar::Text(s) => s,
            RawScalar::Number(n) => n.to_string(),
        }
    }
}

/// A parameter value before validation.
///
/// List syntax always yields `List`, even with a single element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawParamValue {
    Single(RawScalar),
    List(Vec<RawScalar>),
}

impl RawParamValue {
    pub fn is_empty_list(&self) -> bool {
        matches!(self, RawParamValue::List(items) if items.is_empty())
    }

    pub fn scalars(&self) -> &[RawScalar] {
        match self {
            RawParamValue::Single(s) => std::slice::from_ref(s),
            RawParamValue::List(items) => items,
        }
    }

    pub(crate) fn into_strings(self) -> Vec<String> {
        match self {
            RawParamValue::Single(s) => vec![s.into_string()],
            RawParamValue::List(items) => items.into_iter().map(RawScalar::into_string).collect(),
        }
    }
}

/// Parameters exactly as the caller supplied them, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams {
    values: BTreeMap<String, RawParamValue>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: RawParamValue) {
        self.values.insert(name.into(), value);
    }

    /// Builder form of a single text value.
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, RawParamValue::Single(RawScalar::text(value)));
        self
    }

    /// Builder form of a text list.
    pub fn with_texts<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = values.into_iter().map(RawScalar::text).collect();
        self.insert(name, RawParamValue::List(items));
        self
    }

    /// Parse one slot and store it under `name`.
    ///
    /// A slot may carry several value strings; more than one, or any list
    /// syntax, produces a `List` holding every element in order.
    pub fn insert_slot<S: AsRef<str>>(
        &mut self,
        name: impl Into<String>,
        slot_values: &[S],
    ) -> Result<(), ParamParseError> {
        let name = name.into();
        let mut items = Vec::new();
        let mut saw_list = slot_values.len() != 1;
        for text in slot_values {
            match parse_slot_value(&name, text.as_ref())? {
                RawParamValue::Single(scalar) => items.push(scalar),
                RawParamValue::List(list) => {
                    saw_list = true;
                    items.extend(list);
                }
            }
        }
        let value = match (saw_list, items.pop()) {
            (false, Some(only)) => RawParamValue::Single(only),
            (_, last) => {
                items.extend(last);
                RawParamValue::List(items)
            }
        };
        self.values.insert(name, value);
        Ok(())
    }

    /// Build from `(name, slot values)` pairs.
    pub fn from_slots<I, N, S>(slots: I) -> Result<Self, ParamParseError>
    where
        I: IntoIterator<Item = (N, Vec<S>)>,
        N: Into<String>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for (name, values) in slots {
            params.insert_slot(name, &values)?;
        }
        Ok(params)
    }

    pub fn get(&self, name: &str) -> Option<&RawParamValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A validated parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Parameters that satisfied a query's rules.
///
/// Repeatable parameters are always `Multiple`; everything else is `Single`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    pub(crate) fn from_validated(values: BTreeMap<String, ParamValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::Single(s)) => Some(s),
            _ => None,
        }
    }

    /// Values of a repeatable parameter; empty when absent.
    pub fn get_list(&self, name: &str) -> &[String] {
        match self.values.get(name) {
            Some(ParamValue::Multiple(items)) => items,
            Some(ParamValue::Single(s)) => std::slice::from_ref(s),
            None => &[],
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse one slot value string.
pub fn parse_slot_value(name: &str, text: &str) -> Result<RawParamValue, ParamParseError> {
    let mut scanner = Scanner::new(name, text);
    scanner.skip_ws();
    let value = match scanner.peek() {
        None => {
            return Err(ParamParseError::Empty {
                name: name.to_string(),
            })
        }
        Some('(') => {
            scanner.bump();
            RawParamValue::List(scanner.list()?)
        }
        Some(_) => RawParamValue::Single(scanner.scalar()?),
    };
    scanner.skip_ws();
    match scanner.peek() {
        None => Ok(value),
        Some(c) => Err(scanner.unexpected(c)),
    }
}

struct Scanner<'a> {
    name: &'a str,
    text: &'a str,
    chars: Peekable<Chars<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(name: &'a str, text: &'a str) -> Self {
        Self {
            name,
            text,
            chars: text.chars().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn list(&mut self) -> Result<Vec<RawScalar>, ParamParseError> {
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(items);
        }
        loop {
            self.skip_ws();
            items.push(self.scalar()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(')') => return Ok(items),
                Some(c) => return Err(self.unexpected(c)),
                None => return Err(self.unterminated()),
            }
        }
    }

    fn scalar(&mut self) -> Result<RawScalar, ParamParseError> {
        match self.peek() {
            Some('\'') => {
                self.bump();
                self.quoted().map(RawScalar::Text)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => self.number().map(RawScalar::Number),
            Some(c) => Err(self.unexpected(c)),
            None => Err(self.unterminated()),
        }
    }

    fn quoted(&mut self) -> Result<String, ParamParseError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.bump();
                    out.push('\'');
                }
                Some('\'') => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(self.unterminated()),
            }
        }
    }

    fn number(&mut self) -> Result<i64, ParamParseError> {
        let mut digits = String::new();
        if self.peek() == Some('-') {
            self.bump();
            digits.push('-');
        }
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            self.bump();
            digits.push(c);
        }
        digits
            .parse()
            .map_err(|_| ParamParseError::InvalidNumber {
                name: self.name.to_string(),
                text: self.text.to_string(),
            })
    }

    fn unexpected(&self, found: char) -> ParamParseError {
        ParamParseError::Unexpected {
            name: self.name.to_string(),
            found,
            text: self.text.to_string(),
        }
    }

    fn unterminated(&self) -> ParamParseError {
        ParamParseError::Unterminated {
            name: self.name.to_string(),
            text: self.text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<RawParamValue, ParamParseError> {
        parse_slot_value("$P", text)
    }

    #[test]
    fn test_parse_quoted_string() {
        assert_eq!(
            parse("'urn:uuid:abc'").unwrap(),
            RawParamValue::Single(RawScalar::text("urn:uuid:abc"))
        );
        assert_eq!(
            parse("  'O''Brien' ").unwrap(),
            RawParamValue::Single(RawScalar::text("O'Brien"))
        );
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(
            parse("20041225").unwrap(),
            RawParamValue::Single(RawScalar::Number(20041225))
        );
        assert_eq!(
            parse("-3").unwrap(),
            RawParamValue::Single(RawScalar::Number(-3))
        );
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse("('a', 'b,c' ,'d')").unwrap(),
            RawParamValue::List(vec![
                RawScalar::text("a"),
                RawScalar::text("b,c"),
                RawScalar::text("d"),
            ])
        );
        assert_eq!(
            parse("('only')").unwrap(),
            RawParamValue::List(vec![RawScalar::text("only")])
        );
        assert_eq!(parse("()").unwrap(), RawParamValue::List(vec![]));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("   "), Err(ParamParseError::Empty { .. })));
        assert!(matches!(
            parse("'open"),
            Err(ParamParseError::Unterminated { .. })
        ));
        assert!(matches!(
            parse("('a', 'b'"),
            Err(ParamParseError::Unterminated { .. })
        ));
        assert!(matches!(
            parse("bare"),
            Err(ParamParseError::Unexpected { found: 'b', .. })
        ));
        assert!(matches!(
            parse("'a' 'b'"),
            Err(ParamParseError::Unexpected { found: '\'', .. })
        ));
        assert!(matches!(
            parse("-"),
            Err(ParamParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_multi_value_slot_concatenates() {
        let mut params = RawParams::new();
        params
            .insert_slot("$XDSDocumentEntryFormatCode", &["('a', 'b')", "'c'"])
            .unwrap();
        assert_eq!(
            params.get("$XDSDocumentEntryFormatCode"),
            Some(&RawParamValue::List(vec![
                RawScalar::text("a"),
                RawScalar::text("b"),
                RawScalar::text("c"),
            ]))
        );

        params.insert_slot("$Single", &["'x'"]).unwrap();
        assert_eq!(
            params.get("$Single"),
            Some(&RawParamValue::Single(RawScalar::text("x")))
        );
    }

    #[test]
    fn test_from_slots_reports_bad_slot() {
        let err = RawParams::from_slots(vec![
            ("$Good", vec!["'ok'"]),
            ("$Bad", vec!["'broken"]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("$Bad"));
    }

    #[test]
    fn test_parameter_set_accessors() {
        let mut values = BTreeMap::new();
        values.insert("$A".to_string(), ParamValue::Single("x".to_string()));
        values.insert(
            "$B".to_string(),
            ParamValue::Multiple(vec!["1".to_string(), "2".to_string()]),
        );
        let set = ParameterSet::from_validated(values);

        assert_eq!(set.get_str("$A"), Some("x"));
        assert_eq!(set.get_str("$B"), None);
        assert_eq!(set.get_list("$B"), ["1", "2"]);
        assert!(set.get_list("$C").is_empty());
        assert_eq!(set.len(), 2);
    }
}
