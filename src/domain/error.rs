use thiserror::Error;

use super::format::OutputFormat;

/// A request that was rejected before any file was written or process spawned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("`{field}` is required")]
    Missing { field: &'static str },
    #[error("unknown field `{field}`")]
    UnknownField { field: String },
    #[error("`{field}` was supplied more than once")]
    Duplicate { field: String },
    #[error("`{field}` must be {expected}")]
    Invalid {
        field: &'static str,
        expected: String,
    },
    #[error("unsupported format `{value}`; expected one of png, jpeg, svg, pdf")]
    UnknownFormat { value: String },
    #[error("only {format} format supports {field}")]
    UnsupportedForFormat {
        field: &'static str,
        format: OutputFormat,
    },
}

impl ValidationError {
    pub fn invalid(field: &'static str, expected: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            expected: expected.into(),
        }
    }

    /// The request field the error refers to, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Missing { field }
            | Self::Invalid { field, .. }
            | Self::UnsupportedForFormat { field, .. } => Some(field),
            Self::UnknownField { field } | Self::Duplicate { field } => Some(field.as_str()),
            Self::UnknownFormat { .. } => Some("format"),
            Self::MalformedBody(_) | Self::NotAnObject => None,
        }
    }
}
