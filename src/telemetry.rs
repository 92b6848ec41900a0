//! Metrics and logging setup
//!
//! Counters and histograms for key validations and chat turns, recorded
//! through the `metrics` facade into a Prometheus recorder that the shell can
//! render on demand.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Global Prometheus handle; `None` if another recorder was already installed
static PROMETHEUS_HANDLE: Lazy<Option<PrometheusHandle>> = Lazy::new(|| {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "keychat_validations_total",
        "Total number of key validations by outcome"
    );
    metrics::describe_histogram!(
        "keychat_validation_duration_seconds",
        "Key validation duration in seconds"
    );
    metrics::describe_counter!(
        "keychat_chat_turns_total",
        "Total chat turns by reply source"
    );
    metrics::describe_counter!(
        "keychat_stream_fragments_total",
        "Total text fragments received from streams"
    );
    metrics::describe_histogram!(
        "keychat_chat_turn_duration_seconds",
        "Chat turn duration in seconds"
    );
}

/// Current metrics in Prometheus text format
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.as_ref().map(|handle| handle.render())
}

/// Record a key validation
pub fn record_validation(status: &str, duration_secs: f64) {
    metrics::counter!("keychat_validations_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("keychat_validation_duration_seconds").record(duration_secs);
}

/// Record a completed chat turn
pub fn record_turn(source: &str, model: &str, duration_secs: f64) {
    metrics::counter!(
        "keychat_chat_turns_total",
        "source" => source.to_string(),
        "model" => model.to_string()
    )
    .increment(1);
    metrics::histogram!("keychat_chat_turn_duration_seconds", "model" => model.to_string())
        .record(duration_secs);
}

/// Record fragments received in one turn
pub fn record_fragments(model: &str, count: u64) {
    metrics::counter!("keychat_stream_fragments_total", "model" => model.to_string())
        .increment(count);
}

/// Install the global tracing subscriber; logs go to stderr so they never
/// interleave with streamed replies on stdout
pub fn init_tracing(format: LogFormat, verbose: bool) {
    let default_filter = if verbose { "keychat=debug" } else { "keychat=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .init(),
    }
}
