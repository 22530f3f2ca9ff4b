//! Prometheus Metrics Module
//!
//! Exposes ingestion and store metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Ingestion**: Accepted and rejected records per refresh
//! - **Stores**: Refresh outcomes and current generation sizes
//! - **Upstream**: Fetch latency by mode
//! - **Poller**: Tick count
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! functions are no-ops until [`init_metrics`] installs the recorder.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::application::ports::FetchMode;
use crate::domain::normalization::{RejectReason, RejectionObserver};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if another global recorder is already installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "wind_telemetry_records_accepted_total",
        "Readings accepted by the normalizer"
    );
    describe_counter!(
        "wind_telemetry_records_rejected_total",
        "Raw records rejected by the normalizer, by reason"
    );
    describe_counter!(
        "wind_telemetry_refreshes_total",
        "Store refresh attempts by store and outcome"
    );
    describe_gauge!(
        "wind_telemetry_store_readings",
        "Readings held by the current store generation"
    );
    describe_histogram!(
        "wind_telemetry_fetch_seconds",
        "Upstream fetch latency by mode"
    );
    describe_counter!("wind_telemetry_poller_ticks_total", "Realtime poller ticks");
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Historical store.
    Historical,
    /// Realtime store.
    Realtime,
}

impl StoreKind {
    /// Get the label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Realtime => "realtime",
        }
    }
}

/// Outcome label for refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcomeLabel {
    /// The store was replaced.
    Ok,
    /// The fetch failed and the store was left unchanged.
    Error,
}

impl RefreshOutcomeLabel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Record a store refresh.
pub fn record_refresh(store: StoreKind, outcome: RefreshOutcomeLabel) {
    counter!(
        "wind_telemetry_refreshes_total",
        "store" => store.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record readings accepted into a new generation.
pub fn record_accepted(store: StoreKind, count: usize) {
    counter!(
        "wind_telemetry_records_accepted_total",
        "store" => store.as_str()
    )
    .increment(count as u64);
}

/// Update the generation size gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_store_readings(store: StoreKind, count: usize) {
    gauge!(
        "wind_telemetry_store_readings",
        "store" => store.as_str()
    )
    .set(count as f64);
}

/// Record a normalizer rejection.
pub fn record_rejection(reason: &RejectReason) {
    counter!(
        "wind_telemetry_records_rejected_total",
        "reason" => reason.code()
    )
    .increment(1);
}

/// Record upstream fetch latency.
pub fn record_fetch_duration(mode: FetchMode, duration: Duration) {
    histogram!(
        "wind_telemetry_fetch_seconds",
        "mode" => mode.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Record a poller tick.
pub fn record_poller_tick() {
    counter!("wind_telemetry_poller_ticks_total").increment(1);
}

// =============================================================================
// Rejection Observer
// =============================================================================

/// Logs each rejected record and counts it by reason.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsRejectionObserver;

impl RejectionObserver for MetricsRejectionObserver {
    fn on_rejected(&self, record_id: &str, reason: &RejectReason) {
        tracing::warn!(
            record_id,
            reason = reason.code(),
            details = %reason,
            "Discarding invalid record"
        );
        record_rejection(reason);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_as_str() {
        assert_eq!(StoreKind::Historical.as_str(), "historical");
        assert_eq!(StoreKind::Realtime.as_str(), "realtime");
    }

    #[test]
    fn outcome_as_str() {
        assert_eq!(RefreshOutcomeLabel::Ok.as_str(), "ok");
        assert_eq!(RefreshOutcomeLabel::Error.as_str(), "error");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_rejection(&RejectReason::MissingField("position"));
        record_refresh(StoreKind::Realtime, RefreshOutcomeLabel::Ok);
        MetricsRejectionObserver.on_rejected("1", &RejectReason::InvalidDate("timestamp"));
    }
}
