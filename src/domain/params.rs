//! Untyped request parameters and the coercion rules shared by both entry
//! points.
//!
//! The structured endpoint hands over JSON values, the raw endpoint hands over
//! query-string text. Both are wrapped in [`RawParam`] so that every range and
//! type rule lives in exactly one place.

use std::{collections::BTreeMap, ops::RangeInclusive};

use serde_json::{Map, Value};

use super::error::ValidationError;

/// One parameter as it arrived on the wire.
#[derive(Debug, Clone, Copy)]
pub enum RawParam<'a> {
    Json(&'a Value),
    Text(&'a str),
}

impl<'a> RawParam<'a> {
    pub fn string(self, field: &'static str) -> Result<&'a str, ValidationError> {
        match self {
            Self::Json(Value::String(value)) => Ok(value.as_str()),
            Self::Json(_) => Err(ValidationError::invalid(field, "a string")),
            Self::Text(value) => Ok(value),
        }
    }

    pub fn integer(
        self,
        field: &'static str,
        range: RangeInclusive<i64>,
    ) -> Result<i64, ValidationError> {
        let expected = || {
            format!(
                "an integer between {} and {}",
                range.start(),
                range.end()
            )
        };
        let value = match self {
            Self::Json(value) => value.as_i64(),
            Self::Text(value) => value.parse::<i64>().ok(),
        }
        .ok_or_else(|| ValidationError::invalid(field, expected()))?;

        if range.contains(&value) {
            Ok(value)
        } else {
            Err(ValidationError::invalid(field, expected()))
        }
    }

    /// A real number in the half-open interval `(min, max]`.
    pub fn number_above(
        self,
        field: &'static str,
        min_exclusive: f64,
        max: f64,
    ) -> Result<f64, ValidationError> {
        let expected = || format!("a number greater than {min_exclusive} and at most {max}");
        let value = match self {
            Self::Json(value) => value.as_f64(),
            Self::Text(value) => value.parse::<f64>().ok(),
        }
        .ok_or_else(|| ValidationError::invalid(field, expected()))?;

        // NaN fails both comparisons.
        if value > min_exclusive && value <= max {
            Ok(value)
        } else {
            Err(ValidationError::invalid(field, expected()))
        }
    }

    pub fn boolean(self, field: &'static str) -> Result<bool, ValidationError> {
        match self {
            Self::Json(Value::Bool(value)) => Ok(*value),
            Self::Json(_) => Err(ValidationError::invalid(field, "a boolean")),
            Self::Text(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ValidationError::invalid(field, "a boolean")),
            },
        }
    }
}

/// A set of named parameters that is consumed field by field; whatever is
/// left afterwards is unknown to the schema.
#[derive(Debug, Default)]
pub struct RawParams<'a> {
    entries: BTreeMap<&'a str, RawParam<'a>>,
}

impl<'a> RawParams<'a> {
    pub fn from_json_object(object: &'a Map<String, Value>) -> Self {
        let entries = object
            .iter()
            .map(|(key, value)| (key.as_str(), RawParam::Json(value)))
            .collect();
        Self { entries }
    }

    /// Surrounding whitespace is stripped from every value, whatever type it
    /// is later coerced to.
    pub fn from_query_pairs(pairs: &'a [(String, String)]) -> Result<Self, ValidationError> {
        let mut entries = BTreeMap::new();
        for (key, value) in pairs {
            if entries
                .insert(key.as_str(), RawParam::Text(value.trim()))
                .is_some()
            {
                return Err(ValidationError::Duplicate { field: key.clone() });
            }
        }
        Ok(Self { entries })
    }

    pub fn take(&mut self, field: &str) -> Option<RawParam<'a>> {
        self.entries.remove(field)
    }

    /// Fail on the first parameter nobody asked for.
    pub fn finish(self) -> Result<(), ValidationError> {
        match self.entries.into_keys().next() {
            Some(field) => Err(ValidationError::UnknownField {
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }
}
