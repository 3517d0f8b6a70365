use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register metric descriptions with whichever recorder is installed.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "drawio_renderer_conversions_total",
            Unit::Count,
            "Total number of conversion requests handed to the renderer, by format and result."
        );
        describe_counter!(
            "drawio_renderer_render_attempts_total",
            Unit::Count,
            "Total number of renderer processes started, including retries."
        );
        describe_counter!(
            "drawio_renderer_display_retries_total",
            Unit::Count,
            "Total number of retries caused by the virtual display failing to start."
        );
        describe_counter!(
            "drawio_renderer_http_failures_total",
            Unit::Count,
            "Total number of error responses, by failure kind and status code."
        );
        describe_histogram!(
            "drawio_renderer_render_ms",
            Unit::Milliseconds,
            "End-to-end render latency in milliseconds, including retries."
        );
    });
}
