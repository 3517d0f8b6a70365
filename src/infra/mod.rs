pub mod error;
pub mod http;
pub mod process;
pub mod telemetry;
