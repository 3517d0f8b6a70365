use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics::counter;
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const TARGET: &str = "drawio_renderer::http::response";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tag each request with an id and run the rest of the stack inside a span
/// carrying it, so renderer logs can be tied back to their request.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let span = info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path()
    );
    let mut response = next.run(request).instrument(span).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Log every 4xx/5xx with the failure kind the handler attached, and count
/// it. Responses that never reached a handler (unknown route, wrong method)
/// are logged as `routing`.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let elapsed_ms = start.elapsed().as_millis() as u64;
    let report = response
        .extensions_mut()
        .remove::<ErrorReport>()
        .unwrap_or_else(|| ErrorReport::new("routing", "no handler produced this response"));

    counter!(
        "drawio_renderer_http_failures_total",
        "kind" => report.kind,
        "status" => status.as_str().to_owned()
    )
    .increment(1);

    // Infrastructure trouble is ours to fix; everything else is the caller's.
    if status.is_server_error() {
        error!(
            target = TARGET,
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            kind = report.kind,
            elapsed_ms,
            detail = %report.detail,
            "conversion failed"
        );
    } else {
        warn!(
            target = TARGET,
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            kind = report.kind,
            elapsed_ms,
            detail = %report.detail,
            "conversion request rejected"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::{Method, StatusCode},
        middleware::from_fn,
        response::IntoResponse,
        routing::get,
    };
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        application::convert::{ConvertError, RenderFailure},
        infra::http::error::ApiError,
    };

    async fn out_of_memory() -> Result<StatusCode, ApiError> {
        Err(ConvertError::from(RenderFailure::resource_exhausted("ENOMEM")).into())
    }

    fn failure_counts(method: Method, uri: &str) -> Vec<(Vec<(String, String)>, u64)> {
        let router = Router::new()
            .route("/oom", get(out_of_memory))
            .layer(from_fn(log_responses));
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request");

        let response = metrics::with_local_recorder(&recorder, || {
            runtime.block_on(router.oneshot(request))
        })
        .expect("router should respond");
        assert!(response.extensions().get::<ErrorReport>().is_none());

        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, ..)| key.key().name() == "drawio_renderer_http_failures_total")
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(count) => Some((
                    key.key()
                        .labels()
                        .map(|label| (label.key().to_owned(), label.value().to_owned()))
                        .collect(),
                    count,
                )),
                _ => None,
            })
            .collect()
    }

    fn labels(kind: &str, status: &str) -> Vec<(String, String)> {
        vec![
            ("kind".to_owned(), kind.to_owned()),
            ("status".to_owned(), status.to_owned()),
        ]
    }

    #[test]
    fn failures_are_counted_by_render_kind() {
        assert_eq!(
            failure_counts(Method::GET, "/oom"),
            vec![(labels("resource_exhausted", "413"), 1)]
        );
    }

    #[test]
    fn wrong_method_is_counted_as_routing() {
        assert_eq!(
            failure_counts(Method::POST, "/oom"),
            vec![(labels("routing", "405"), 1)]
        );
    }

    #[test]
    fn successful_responses_are_not_counted() {
        let router = Router::new()
            .route("/ok", get(|| async { StatusCode::OK.into_response() }))
            .layer(from_fn(log_responses));
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let request = Request::builder()
            .uri("/ok")
            .body(Body::empty())
            .expect("request");

        metrics::with_local_recorder(&recorder, || runtime.block_on(router.oneshot(request)))
            .expect("router should respond");

        assert!(snapshotter.snapshot().into_vec().is_empty());
    }
}
