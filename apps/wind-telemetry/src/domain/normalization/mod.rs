//! Record Normalizer
//!
//! Converts raw upstream records into [`Reading`]s. Upstream delivers a loose
//! envelope whose `reading_data` field carries the actual observation as an
//! embedded JSON document, so every record is decoded twice: once as part of
//! the batch, and once on its own here.
//!
//! # Policy
//!
//! - Records whose `record_type` is not `individual_reading` are skipped
//!   without notice.
//! - A record that fails validation is dropped and reported to the
//!   [`RejectionObserver`] with its identifier and a [`RejectReason`].
//! - One bad record never affects the rest of the batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::reading::{DEFAULT_READING_MODEL, Reading, instant_from_millis, parse_instant};

/// Discriminant marking a record as an individual reading.
pub const INDIVIDUAL_READING: &str = "individual_reading";

/// Identifier logged for records that carry no usable `id`.
const UNKNOWN_RECORD_ID: &str = "<unknown>";

// =============================================================================
// Raw Records
// =============================================================================

/// One unvalidated record from the upstream telemetry API.
///
/// All fields are kept as loose JSON so that a record with unexpected types
/// still reaches the normalizer and gets a precise rejection reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Upstream record identifier (string or number).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Record kind discriminant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<Value>,
    /// Observation payload, serialized as a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_data: Option<Value>,
    /// Instant the upstream gateway captured the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_timestamp: Option<Value>,
}

impl RawRecord {
    /// Build an individual-reading record around a serialized payload.
    #[must_use]
    pub fn individual(id: impl Into<Value>, reading_data: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            record_type: Some(Value::String(INDIVIDUAL_READING.to_string())),
            reading_data: Some(Value::String(reading_data.into())),
            capture_timestamp: None,
        }
    }

    /// Set the envelope capture timestamp.
    #[must_use]
    pub fn with_capture_timestamp(mut self, capture_timestamp: impl Into<Value>) -> Self {
        self.capture_timestamp = Some(capture_timestamp.into());
        self
    }

    /// Read a record out of an arbitrary JSON value.
    ///
    /// Non-object values produce an empty record, which the normalizer skips.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| value.get(name).filter(|v| !v.is_null()).cloned();
        Self {
            id: field("id"),
            record_type: field("record_type"),
            reading_data: field("reading_data"),
            capture_timestamp: field("capture_timestamp"),
        }
    }

    /// Identifier used when reporting this record.
    #[must_use]
    pub fn record_id(&self) -> String {
        match &self.id {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Null) | None => UNKNOWN_RECORD_ID.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Whether the discriminant marks this record as an individual reading.
    #[must_use]
    pub fn is_individual_reading(&self) -> bool {
        self.record_type.as_ref().and_then(Value::as_str) == Some(INDIVIDUAL_READING)
    }
}

// =============================================================================
// Rejections
// =============================================================================

/// Why a record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// A required field is absent, null or empty.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// The embedded payload is not valid JSON.
    #[error("malformed JSON payload: {0}")]
    MalformedJson(String),
    /// The wind speed is not a finite number.
    #[error("invalid number in `{0}`")]
    InvalidNumber(&'static str),
    /// No timestamp parses to a valid instant.
    #[error("invalid date in `{0}`")]
    InvalidDate(&'static str),
}

impl RejectReason {
    /// Reason category, used as a metric label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::MalformedJson(_) => "malformed_json",
            Self::InvalidNumber(_) => "invalid_number",
            Self::InvalidDate(_) => "invalid_date",
        }
    }
}

/// Receives every rejected record.
///
/// Production code logs and counts rejections; tests collect them.
pub trait RejectionObserver: Send + Sync {
    /// Called once per rejected record.
    fn on_rejected(&self, record_id: &str, reason: &RejectReason);
}

/// Observer that discards rejections.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreRejections;

impl RejectionObserver for IgnoreRejections {
    fn on_rejected(&self, _record_id: &str, _reason: &RejectReason) {}
}

// =============================================================================
// Normalization
// =============================================================================

/// Outcome of normalizing a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// The record is a valid reading.
    Accepted(Reading),
    /// The record is not an individual reading.
    Skipped,
    /// The record is an individual reading but failed validation.
    Rejected(RejectReason),
}

/// Classify one raw record.
///
/// `instrument_model` overrides the reading's model when non-empty;
/// otherwise [`DEFAULT_READING_MODEL`] is used.
#[must_use]
pub fn classify(raw: &RawRecord, instrument_model: &str) -> Normalized {
    if !raw.is_individual_reading() {
        return Normalized::Skipped;
    }

    match build_reading(raw, instrument_model) {
        Ok(reading) => Normalized::Accepted(reading),
        Err(reason) => Normalized::Rejected(reason),
    }
}

fn build_reading(raw: &RawRecord, instrument_model: &str) -> Result<Reading, RejectReason> {
    let payload = decode_payload(raw.reading_data.as_ref())?;

    let position = payload
        .get("position")
        .and_then(scalar_to_string)
        .filter(|p| !p.trim().is_empty())
        .ok_or(RejectReason::MissingField("position"))?;

    let speed = parse_speed(payload.get("wind_speed"))?;

    let timestamp = resolve_timestamp(
        payload.get("timestamp"),
        raw.capture_timestamp.as_ref(),
    )?;

    let model = if instrument_model.trim().is_empty() {
        DEFAULT_READING_MODEL
    } else {
        instrument_model
    };

    Ok(Reading::new(model, position, speed, timestamp))
}

fn decode_payload(reading_data: Option<&Value>) -> Result<Value, RejectReason> {
    match reading_data {
        Some(Value::String(text)) => serde_json::from_str(text)
            .map_err(|e| RejectReason::MalformedJson(e.to_string())),
        Some(Value::Null) | None => Err(RejectReason::MissingField("reading_data")),
        Some(other) => Err(RejectReason::MalformedJson(format!(
            "expected a serialized JSON string, got {}",
            json_kind(other)
        ))),
    }
}

fn parse_speed(value: Option<&Value>) -> Result<f64, RejectReason> {
    let speed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => leading_number(s),
        Some(Value::Null) | None => return Err(RejectReason::MissingField("wind_speed")),
        Some(_) => None,
    };

    speed
        .filter(|s| s.is_finite())
        .ok_or(RejectReason::InvalidNumber("wind_speed"))
}

/// Leading decimal number of `text`; trailing text such as a unit suffix
/// is ignored (`"12.5 km/h"` reads as `12.5`).
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(text.len());
    (1..=end).rev().find_map(|len| text[..len].parse::<f64>().ok())
}

/// Prefer the payload's own timestamp; fall back to the envelope's capture
/// timestamp when the payload has none or it does not parse.
fn resolve_timestamp(
    payload: Option<&Value>,
    capture: Option<&Value>,
) -> Result<DateTime<Utc>, RejectReason> {
    match (present(payload), present(capture)) {
        (None, None) => Err(RejectReason::MissingField("timestamp")),
        (payload, capture) => payload
            .and_then(value_to_instant)
            .or_else(|| capture.and_then(value_to_instant))
            .ok_or(RejectReason::InvalidDate("timestamp")),
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null() && v.as_str() != Some(""))
}

fn value_to_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_instant(s),
        Value::Number(n) => n.as_i64().and_then(instant_from_millis),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Record Normalizer
// =============================================================================

/// Normalizes raw batches, reporting rejections to an observer.
#[derive(Clone)]
pub struct RecordNormalizer {
    observer: Arc<dyn RejectionObserver>,
}

impl std::fmt::Debug for RecordNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordNormalizer").finish_non_exhaustive()
    }
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(IgnoreRejections))
    }
}

impl RecordNormalizer {
    /// Create a normalizer reporting to `observer`.
    #[must_use]
    pub fn new(observer: Arc<dyn RejectionObserver>) -> Self {
        Self { observer }
    }

    /// Normalize one record.
    ///
    /// Returns `None` for skipped and rejected records; rejections are
    /// reported to the observer.
    #[must_use]
    pub fn normalize(&self, raw: &RawRecord, instrument_model: &str) -> Option<Reading> {
        match classify(raw, instrument_model) {
            Normalized::Accepted(reading) => Some(reading),
            Normalized::Skipped => None,
            Normalized::Rejected(reason) => {
                self.observer.on_rejected(&raw.record_id(), &reason);
                None
            }
        }
    }

    /// Normalize a batch, preserving input order.
    ///
    /// Never fails as a whole: the result holds every record that passed.
    #[must_use]
    pub fn normalize_batch(&self, raw: &[RawRecord], instrument_model: &str) -> Vec<Reading> {
        let readings: Vec<Reading> = raw
            .iter()
            .filter_map(|record| self.normalize(record, instrument_model))
            .collect();

        tracing::debug!(
            received = raw.len(),
            accepted = readings.len(),
            instrument_model,
            "Normalized batch"
        );

        readings
    }
}
