use std::sync::Once;

use metrics::{Unit, describe_counter};
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
            "starling_feed_index_hit_total",
            Unit::Count,
            "Total number of feed reads that found a cached feed index."
        );
        describe_counter!(
            "starling_feed_index_miss_total",
            Unit::Count,
            "Total number of feed reads that fell back to full store hydration."
        );
        describe_counter!(
            "starling_feed_field_hit_total",
            Unit::Count,
            "Total number of cached post-field values served, labelled by field."
        );
        describe_counter!(
            "starling_feed_field_miss_total",
            Unit::Count,
            "Total number of post-field gaps filled from the store, labelled by field."
        );
        describe_counter!(
            "starling_feed_gap_fetch_total",
            Unit::Count,
            "Total number of batched store fetches issued by gap fill, labelled by field."
        );
        describe_counter!(
            "starling_profile_hit_total",
            Unit::Count,
            "Total number of profile reads served from cache."
        );
        describe_counter!(
            "starling_profile_miss_total",
            Unit::Count,
            "Total number of profile reads that fell back to the store."
        );
    });
}
