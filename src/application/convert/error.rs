use thiserror::Error;

use super::outcome::RenderFailure;
use crate::domain::ValidationError;

/// Everything that can stop a conversion request, from a bad field to a
/// renderer that never started.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no acceptable output format; accepted types: {accepted}")]
    NotAcceptable { accepted: String },
    #[error(transparent)]
    Render(#[from] RenderFailure),
}

impl ConvertError {
    pub fn not_acceptable(accepted: impl Into<String>) -> Self {
        Self::NotAcceptable {
            accepted: accepted.into(),
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotAcceptable { .. } => "not_acceptable",
            Self::Render(failure) => failure.kind.as_str(),
        }
    }
}
