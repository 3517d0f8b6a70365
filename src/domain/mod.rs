//! Request model for a single diagram conversion: output formats, typed
//! parameters and their validation.

pub mod error;
pub mod format;
pub mod params;
pub mod request;

pub use error::ValidationError;
pub use format::OutputFormat;
pub use request::{ConversionRequest, RenderOptions};
