use bytes::Bytes;
use thiserror::Error;

use crate::domain::OutputFormat;

/// Result of handing one request to the renderer.
pub type RenderOutcome = Result<RenderedFile, RenderFailure>;

/// A rendered file, fully read into memory before its job directory was
/// removed.
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub bytes: Bytes,
    pub file_name: String,
    pub format: OutputFormat,
}

impl RenderedFile {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The renderer rejected the document or produced no output.
    Conversion,
    /// The renderer ran out of memory.
    ResourceExhausted,
    /// The service could not run the renderer at all: the virtual display
    /// never came up, the process hung, or the job directory failed.
    Infrastructure,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conversion => "conversion",
            Self::ResourceExhausted => "resource_exhausted",
            Self::Infrastructure => "infrastructure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RenderFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl RenderFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Conversion, message)
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ResourceExhausted, message)
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Infrastructure, message)
    }
}
