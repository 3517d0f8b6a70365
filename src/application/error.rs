use axum::response::Response;
use thiserror::Error;

use crate::{application::convert::ConvertError, infra::error::InfraError};

/// Diagnostic detail attached to an error response so the logging middleware
/// can report the cause without re-deriving it from the body.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    /// Failure class, e.g. `validation` or `resource_exhausted`.
    pub kind: &'static str,
    pub detail: String,
}

impl ErrorReport {
    pub fn new(kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Errors that abort the process before or while serving.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
