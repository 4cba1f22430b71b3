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
            "headway_cache_hit_total",
            Unit::Count,
            "Read-through lookups answered from the cache."
        );
        describe_counter!(
            "headway_cache_miss_total",
            Unit::Count,
            "Read-through lookups that ran the wrapped operation."
        );
        describe_counter!(
            "headway_cache_bypass_total",
            Unit::Count,
            "Read-through lookups that skipped an unavailable cache."
        );
        describe_counter!(
            "headway_cache_store_error_total",
            Unit::Count,
            "Cache store operations that failed and were contained."
        );
        describe_counter!(
            "headway_cache_invalidated_keys_total",
            Unit::Count,
            "Keys removed by write-side invalidation."
        );
        describe_histogram!(
            "headway_origin_request_ms",
            Unit::Milliseconds,
            "WordPress GraphQL request latency in milliseconds."
        );
    });
}
