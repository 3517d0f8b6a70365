//! Diagram conversion pipeline: argument building, the per-request job
//! directory, and the renderer invocation with its failure classification.

pub mod command;
mod error;
mod invoker;
mod job;
mod outcome;

pub use command::{NO_SANDBOX_FLAG, build_args};
pub use error::ConvertError;
pub use invoker::{
    DEFAULT_MAX_ATTEMPTS, DISPLAY_START_FAILURE, ProcessOutput, RenderInvoker, Renderer,
    RendererError,
};
pub use job::RenderJob;
pub use outcome::{FailureKind, RenderFailure, RenderOutcome, RenderedFile};
