//! Reading Types
//!
//! A `Reading` is one validated wind observation: which instrument took it,
//! where the sensor sits, the measured speed and the instant it was captured.
//! Every reading held by a store satisfies the field constraints enforced by
//! the normalizer, so consumers never re-validate.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Label stamped on readings when the caller supplies no instrument model.
pub const DEFAULT_READING_MODEL: &str = "Extech 45170";

/// Store tag used when a refresh is requested without an instrument model.
pub const DEFAULT_INSTRUMENT_MODEL: &str = "default";

/// Naive date-time layouts accepted in addition to RFC 3339.
///
/// Naive values carry no offset and are interpreted as UTC.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

// =============================================================================
// Reading
// =============================================================================

/// One validated sensor observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Identifier of the measuring device.
    pub instrument_model: String,
    /// Identifier of the sensor placement. Never empty.
    pub position: String,
    /// Wind speed magnitude. Always finite.
    pub speed: f64,
    /// Capture instant, normalized to UTC.
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Create a new reading.
    #[must_use]
    pub fn new(
        instrument_model: impl Into<String>,
        position: impl Into<String>,
        speed: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument_model: instrument_model.into(),
            position: position.into(),
            speed,
            timestamp,
        }
    }

    /// Check whether the reading falls inside `[from, to]` (both inclusive).
    #[must_use]
    pub fn is_within(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.timestamp >= from && self.timestamp <= to
    }
}

// =============================================================================
// Instrument Models
// =============================================================================

/// Resolve a requested instrument model into a store tag.
///
/// Surrounding whitespace is trimmed; a missing or blank model falls back to
/// [`DEFAULT_INSTRUMENT_MODEL`].
#[must_use]
pub fn resolve_instrument_model(requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .unwrap_or(DEFAULT_INSTRUMENT_MODEL)
        .to_string()
}

// =============================================================================
// Instant Parsing
// =============================================================================

/// Parse an instant string.
///
/// Accepts RFC 3339 (any offset, normalized to UTC), naive ISO date-times
/// (interpreted as UTC) and plain `YYYY-MM-DD` dates (midnight UTC).
/// Returns `None` for anything else.
#[must_use]
pub fn parse_instant(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Convert epoch milliseconds into an instant.
#[must_use]
pub fn instant_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
