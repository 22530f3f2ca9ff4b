//! Realtime Store
//!
//! Holds the most recent batch for exactly one instrument model. A refresh
//! swaps the readings and the active instrument tag together, so a window
//! query never pairs one model's readings with another model's label.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, TimeDelta, Utc};

use crate::application::ports::{FetchError, FetchMode, TelemetrySourcePort};
use crate::domain::normalization::RecordNormalizer;
use crate::domain::query::QueryResult;
use crate::domain::reading::{DEFAULT_INSTRUMENT_MODEL, Reading, resolve_instrument_model};
use crate::infrastructure::metrics::{self, RefreshOutcomeLabel, StoreKind};

/// Window applied when the requested window is missing or invalid.
pub const DEFAULT_WINDOW_SECS: f64 = 5.0;

/// Use `requested` if it is a positive finite number of seconds.
#[must_use]
pub fn effective_window(requested: f64) -> f64 {
    if requested.is_finite() && requested > 0.0 {
        requested
    } else {
        DEFAULT_WINDOW_SECS
    }
}

/// Realtime refresh failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// The upstream fetch failed; the store was left unchanged.
    #[error("failed to refresh realtime readings for {instrument_model}: {source}")]
    Fetch {
        /// Instrument model the refresh was requested for.
        instrument_model: String,
        /// Underlying fetch failure.
        #[source]
        source: FetchError,
    },
}

/// One committed realtime batch and the model it belongs to.
#[derive(Debug, Clone)]
pub struct RealtimeGeneration {
    /// Active instrument tag.
    pub instrument_model: String,
    /// Readings in fetch order.
    pub readings: Vec<Reading>,
    /// When the batch was committed; `None` before the first refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Default for RealtimeGeneration {
    fn default() -> Self {
        Self {
            instrument_model: DEFAULT_INSTRUMENT_MODEL.to_string(),
            readings: Vec::new(),
            refreshed_at: None,
        }
    }
}

/// Single-tenant store of the latest readings.
pub struct RealtimeStore {
    source: Arc<dyn TelemetrySourcePort>,
    normalizer: RecordNormalizer,
    generation: ArcSwap<RealtimeGeneration>,
}

impl std::fmt::Debug for RealtimeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let generation = self.generation.load();
        f.debug_struct("RealtimeStore")
            .field("instrument_model", &generation.instrument_model)
            .field("readings", &generation.readings.len())
            .finish_non_exhaustive()
    }
}

impl RealtimeStore {
    /// Create an empty store tagged with the default instrument model.
    #[must_use]
    pub fn new(source: Arc<dyn TelemetrySourcePort>, normalizer: RecordNormalizer) -> Self {
        Self {
            source,
            normalizer,
            generation: ArcSwap::from_pointee(RealtimeGeneration::default()),
        }
    }

    /// Fetch the latest batch and replace the readings and tag together.
    ///
    /// Concurrent refreshes are last-write-wins.
    ///
    /// # Errors
    ///
    /// Returns `RefreshError::Fetch` if the upstream fetch fails. The store is
    /// left unchanged in that case.
    pub async fn refresh(
        &self,
        instrument_model: Option<&str>,
    ) -> Result<DateTime<Utc>, RefreshError> {
        let model = resolve_instrument_model(instrument_model);

        let raw = match self.source.fetch(FetchMode::Latest, &model).await {
            Ok(raw) => raw,
            Err(source) => {
                metrics::record_refresh(StoreKind::Realtime, RefreshOutcomeLabel::Error);
                return Err(RefreshError::Fetch {
                    instrument_model: model,
                    source,
                });
            }
        };

        let readings = self.normalizer.normalize_batch(&raw, &model);
        let count = readings.len();
        let refreshed_at = Utc::now();

        self.install(RealtimeGeneration {
            instrument_model: model,
            readings,
            refreshed_at: Some(refreshed_at),
        });
        metrics::record_accepted(StoreKind::Realtime, count);
        metrics::record_refresh(StoreKind::Realtime, RefreshOutcomeLabel::Ok);

        Ok(refreshed_at)
    }

    /// Replace the whole generation in one swap.
    pub fn install(&self, generation: RealtimeGeneration) {
        tracing::debug!(
            instrument_model = %generation.instrument_model,
            readings = generation.readings.len(),
            "Realtime generation installed"
        );
        metrics::set_store_readings(StoreKind::Realtime, generation.readings.len());
        self.generation.store(Arc::new(generation));
    }

    /// Readings no older than `window_secs` before now.
    #[must_use]
    pub fn query_recent_window(&self, instrument_model: &str, window_secs: f64) -> QueryResult {
        self.query_recent_window_at(instrument_model, window_secs, Utc::now())
    }

    /// Readings with `timestamp >= now - window_secs`.
    ///
    /// Empty with `model_mismatch` if the store holds a different model.
    /// A non-positive or non-finite window falls back to
    /// [`DEFAULT_WINDOW_SECS`].
    #[must_use]
    pub fn query_recent_window_at(
        &self,
        instrument_model: &str,
        window_secs: f64,
        now: DateTime<Utc>,
    ) -> QueryResult {
        let generation = self.generation.load();

        if generation.instrument_model != instrument_model {
            tracing::debug!(
                requested = instrument_model,
                active = %generation.instrument_model,
                "Window query for inactive instrument model"
            );
            return QueryResult::model_mismatch();
        }

        let limit = window_start(now, effective_window(window_secs));
        let matches = generation
            .readings
            .iter()
            .filter(|r| r.timestamp >= limit)
            .cloned()
            .collect();

        QueryResult::from_matches(matches)
    }

    /// The current generation.
    #[must_use]
    pub fn generation(&self) -> Arc<RealtimeGeneration> {
        self.generation.load_full()
    }

    /// The active instrument tag.
    #[must_use]
    pub fn active_instrument_model(&self) -> String {
        self.generation.load().instrument_model.clone()
    }

    /// Number of readings in the current generation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generation.load().readings.len()
    }

    /// Whether the current generation holds no readings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[allow(clippy::cast_possible_truncation)]
fn window_start(now: DateTime<Utc>, window_secs: f64) -> DateTime<Utc> {
    let millis = (window_secs * 1000.0).round() as i64;
    TimeDelta::try_milliseconds(millis)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::ports::MockTelemetrySourcePort;
    use crate::domain::normalization::RawRecord;
    use crate::domain::query::QueryStatus;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn reading(model: &str, secs_ago: i64) -> Reading {
        Reading::new(model, "A1", 3.0, now() - TimeDelta::seconds(secs_ago))
    }

    fn store_with(source: MockTelemetrySourcePort) -> RealtimeStore {
        RealtimeStore::new(Arc::new(source), RecordNormalizer::default())
    }

    fn seeded(model: &str, readings: Vec<Reading>) -> RealtimeStore {
        let store = store_with(MockTelemetrySourcePort::new());
        store.install(RealtimeGeneration {
            instrument_model: model.to_string(),
            readings,
            refreshed_at: Some(now()),
        });
        store
    }

    #[test]
    fn window_fallback() {
        assert!((effective_window(2.5) - 2.5).abs() < f64::EPSILON);
        assert!((effective_window(0.0) - DEFAULT_WINDOW_SECS).abs() < f64::EPSILON);
        assert!((effective_window(-1.0) - DEFAULT_WINDOW_SECS).abs() < f64::EPSILON);
        assert!((effective_window(f64::NAN) - DEFAULT_WINDOW_SECS).abs() < f64::EPSILON);
    }

    #[test]
    fn starts_empty_with_default_tag() {
        let store = store_with(MockTelemetrySourcePort::new());
        assert!(store.is_empty());
        assert_eq!(store.active_instrument_model(), DEFAULT_INSTRUMENT_MODEL);
        assert!(store.generation().refreshed_at.is_none());

        let result = store.query_recent_window(DEFAULT_INSTRUMENT_MODEL, 5.0);
        assert_eq!(result.status, QueryStatus::NoData);
    }

    #[tokio::test]
    async fn refresh_swaps_tag_and_readings() {
        let mut source = MockTelemetrySourcePort::new();
        source
            .expect_fetch()
            .withf(|mode, model| *mode == FetchMode::Latest && model == "WS-200")
            .times(1)
            .returning(|_, _| {
                let payload = json!({
                    "position": "N",
                    "wind_speed": 7.5,
                    "timestamp": Utc::now().to_rfc3339(),
                });
                Ok(vec![RawRecord::individual(1, payload.to_string())])
            });
        let store = store_with(source);

        let refreshed_at = store.refresh(Some("WS-200")).await.unwrap();

        let generation = store.generation();
        assert_eq!(generation.instrument_model, "WS-200");
        assert_eq!(generation.readings.len(), 1);
        assert_eq!(generation.refreshed_at, Some(refreshed_at));
        assert_eq!(generation.readings[0].instrument_model, "WS-200");
    }

    #[tokio::test]
    async fn failed_refresh_leaves_store_untouched() {
        let mut source = MockTelemetrySourcePort::new();
        source
            .expect_fetch()
            .returning(|_, _| Err(FetchError::Server { status: 502 }));
        let store = store_with(source);
        store.install(RealtimeGeneration {
            instrument_model: "WS-200".to_string(),
            readings: vec![reading("WS-200", 1)],
            refreshed_at: Some(now()),
        });

        let err = store.refresh(Some("other")).await.unwrap_err();

        assert_eq!(
            err,
            RefreshError::Fetch {
                instrument_model: "other".to_string(),
                source: FetchError::Server { status: 502 },
            }
        );
        assert_eq!(store.active_instrument_model(), "WS-200");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn window_keeps_readings_at_or_after_limit() {
        let store = seeded(
            "WS-200",
            vec![reading("WS-200", 10), reading("WS-200", 5), reading("WS-200", 2)],
        );

        let result = store.query_recent_window_at("WS-200", 5.0, now());

        assert_eq!(result.status, QueryStatus::Ok);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn invalid_window_uses_default() {
        let store = seeded("WS-200", vec![reading("WS-200", 4), reading("WS-200", 30)]);
        let result = store.query_recent_window_at("WS-200", -3.0, now());
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn mismatched_model_yields_nothing() {
        let store = seeded("WS-200", vec![reading("WS-200", 1)]);

        let result = store.query_recent_window_at("WS-300", 60.0, now());

        assert!(result.is_empty());
        assert_eq!(result.status, QueryStatus::ModelMismatch);
    }

    #[test]
    fn stale_readings_yield_no_data() {
        let store = seeded("WS-200", vec![reading("WS-200", 3600)]);
        let result = store.query_recent_window_at("WS-200", 5.0, now());
        assert_eq!(result.status, QueryStatus::NoData);
    }

    #[test]
    fn huge_window_does_not_overflow() {
        let store = seeded("WS-200", vec![reading("WS-200", 3600)]);
        let result = store.query_recent_window_at("WS-200", f64::MAX, now());
        assert_eq!(result.len(), 1);
    }
}
