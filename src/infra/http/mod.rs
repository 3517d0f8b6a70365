mod convert;
pub mod docs;
pub mod error;
mod middleware;
pub mod negotiate;
mod serve;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::convert::RenderInvoker;

use middleware::{log_responses, set_request_context};
pub use serve::serve_with_grace;

#[derive(Clone)]
pub struct HttpState {
    pub invoker: RenderInvoker,
}

impl HttpState {
    pub fn new(invoker: RenderInvoker) -> Self {
        Self { invoker }
    }
}

/// Assemble the public router. Bodies larger than `body_limit` bytes are
/// rejected with 413 before any conversion work starts.
pub fn build_router(state: HttpState, body_limit: usize) -> Router {
    Router::new()
        .route("/convert", post(convert::convert_json))
        .route("/convert_file", post(convert::convert_upload))
        .route("/docs", get(docs::openapi))
        .route("/_health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
