//! Historical Store
//!
//! Holds the full set of readings fetched in historical mode. Every refresh
//! replaces the whole generation with a single atomic pointer swap, so range
//! queries always see one complete batch and never a partially written one.
//!
//! A failed fetch leaves the previous generation in place: stale data stays
//! available rather than being replaced by nothing.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};

use crate::application::ports::{FetchError, FetchMode, TelemetrySourcePort};
use crate::domain::normalization::RecordNormalizer;
use crate::domain::query::QueryResult;
use crate::domain::reading::{Reading, parse_instant, resolve_instrument_model};
use crate::infrastructure::metrics::{self, RefreshOutcomeLabel, StoreKind};

/// Number of readings returned by a latest query without a usable count.
pub const DEFAULT_LATEST_COUNT: usize = 10;

/// One committed batch of historical readings.
#[derive(Debug, Clone, Default)]
pub struct HistoricalGeneration {
    /// Readings in fetch order.
    pub readings: Vec<Reading>,
    /// When the batch was committed; `None` before the first refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Result of a historical refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoricalRefresh {
    /// The store now holds a new generation.
    Replaced {
        /// Readings in the new generation.
        readings: usize,
    },
    /// The fetch failed; the previous generation was kept.
    Unchanged {
        /// Why the fetch failed.
        error: FetchError,
    },
}

/// In-memory store for historical range queries.
pub struct HistoricalStore {
    source: Arc<dyn TelemetrySourcePort>,
    normalizer: RecordNormalizer,
    generation: ArcSwap<HistoricalGeneration>,
}

impl std::fmt::Debug for HistoricalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricalStore")
            .field("readings", &self.len())
            .finish_non_exhaustive()
    }
}

impl HistoricalStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(source: Arc<dyn TelemetrySourcePort>, normalizer: RecordNormalizer) -> Self {
        Self {
            source,
            normalizer,
            generation: ArcSwap::from_pointee(HistoricalGeneration::default()),
        }
    }

    /// Fetch the full history and replace the stored generation.
    ///
    /// An empty successful fetch replaces the store with an empty generation.
    /// A failed fetch is logged and leaves the store unchanged.
    pub async fn refresh(&self, instrument_model: Option<&str>) -> HistoricalRefresh {
        let model = resolve_instrument_model(instrument_model);

        match self.source.fetch(FetchMode::Historical, &model).await {
            Ok(raw) => {
                let readings = self.normalizer.normalize_batch(&raw, &model);
                let count = readings.len();

                match (readings.first(), readings.last()) {
                    (Some(first), Some(last)) => tracing::info!(
                        instrument_model = %model,
                        readings = count,
                        first = %first.timestamp,
                        last = %last.timestamp,
                        "Historical readings refreshed"
                    ),
                    _ => tracing::info!(
                        instrument_model = %model,
                        "Historical refresh returned no readings"
                    ),
                }

                self.replace(readings);
                metrics::record_accepted(StoreKind::Historical, count);
                metrics::record_refresh(StoreKind::Historical, RefreshOutcomeLabel::Ok);

                HistoricalRefresh::Replaced { readings: count }
            }
            Err(error) => {
                tracing::warn!(
                    instrument_model = %model,
                    error = %error,
                    kept = self.len(),
                    "Historical refresh failed, keeping previous readings"
                );
                metrics::record_refresh(StoreKind::Historical, RefreshOutcomeLabel::Error);

                HistoricalRefresh::Unchanged { error }
            }
        }
    }

    /// Replace the current generation wholesale.
    pub fn replace(&self, readings: Vec<Reading>) {
        metrics::set_store_readings(StoreKind::Historical, readings.len());
        self.generation.store(Arc::new(HistoricalGeneration {
            readings,
            refreshed_at: Some(Utc::now()),
        }));
    }

    /// Readings whose timestamp falls in `[from, to]`.
    ///
    /// Bounds that do not parse yield an empty `invalid_input` result.
    /// Results are in store order, not chronological order.
    #[must_use]
    pub fn query_range(&self, from: &str, to: &str) -> QueryResult {
        match (parse_instant(from), parse_instant(to)) {
            (Some(from), Some(to)) => self.query_between(from, to),
            _ => {
                tracing::debug!(from, to, "Ignoring range query with invalid bounds");
                QueryResult::invalid_input()
            }
        }
    }

    /// Readings whose timestamp falls in `[from, to]`.
    #[must_use]
    pub fn query_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> QueryResult {
        let generation = self.generation.load();
        let matches: Vec<Reading> = generation
            .readings
            .iter()
            .filter(|r| r.is_within(from, to))
            .cloned()
            .collect();

        tracing::debug!(%from, %to, matched = matches.len(), "Range query");
        QueryResult::from_matches(matches)
    }

    /// The last `n` readings in insertion order.
    ///
    /// `n` is clamped to the store size; a missing or non-positive `n`
    /// selects [`DEFAULT_LATEST_COUNT`].
    #[must_use]
    pub fn query_latest(&self, n: Option<i64>) -> QueryResult {
        let generation = self.generation.load();
        let len = generation.readings.len();

        let count = match n {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX).min(len),
            _ => DEFAULT_LATEST_COUNT,
        };

        let start = len.saturating_sub(count);
        QueryResult::from_matches(generation.readings[start..].to_vec())
    }

    /// The current generation.
    #[must_use]
    pub fn generation(&self) -> Arc<HistoricalGeneration> {
        self.generation.load_full()
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
