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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "vivadoc_render_jobs_total",
            Unit::Count,
            "Total number of render jobs scheduled."
        );
        describe_counter!(
            "vivadoc_render_failures_total",
            Unit::Count,
            "Total number of render jobs that reached a non-success terminal state."
        );
        describe_histogram!(
            "vivadoc_render_pass_ms",
            Unit::Milliseconds,
            "Per-backend render pass latency in milliseconds."
        );
        describe_counter!(
            "vivadoc_publish_total",
            Unit::Count,
            "Total number of publish pipeline runs, labeled by outcome."
        );
        describe_counter!(
            "vivadoc_docs_requests_total",
            Unit::Count,
            "Total number of documentation artifact requests served."
        );
    });
}
