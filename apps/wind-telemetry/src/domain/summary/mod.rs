//! Reading Summaries
//!
//! Mean speed, sample count, time span and latest position over a set of
//! readings. Pure apart from the generation timestamp.
//!
//! Ordering is derived from timestamps rather than from the position of a
//! reading in its slice: the "latest" position belongs to the reading with
//! the greatest timestamp and the span runs from the smallest to the greatest
//! timestamp. Newest-first input therefore gives the same answer as reading
//! the first and last elements.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::reading::Reading;

/// Position reported when there are no readings.
pub const UNKNOWN_POSITION: &str = "unknown";

/// Inclusive time range covered by a set of readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSpan {
    /// Oldest timestamp.
    pub start: DateTime<Utc>,
    /// Newest timestamp.
    pub end: DateTime<Utc>,
}

impl TimeSpan {
    /// A span collapsed to a single instant.
    #[must_use]
    pub const fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }
}

/// Summary statistics for one instrument model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Instrument model the summary was requested for.
    pub instrument_model: String,
    /// Arithmetic mean of all speeds, rounded to two decimals.
    pub mean_speed: f64,
    /// Position of the most recent reading.
    pub position: String,
    /// Time span covered by the readings.
    pub span: TimeSpan,
    /// Number of readings summarized.
    pub sample_count: usize,
    /// Instant the summary was computed.
    pub generated_at: DateTime<Utc>,
}

/// Summarize `readings` as of now.
#[must_use]
pub fn summarize(instrument_model: &str, readings: &[Reading]) -> Summary {
    summarize_at(instrument_model, readings, Utc::now())
}

/// Summarize `readings` with an explicit generation instant.
///
/// An empty slice yields a zero summary with an `unknown` position and a
/// span collapsed to `now`.
#[must_use]
pub fn summarize_at(instrument_model: &str, readings: &[Reading], now: DateTime<Utc>) -> Summary {
    let Some(first) = readings.first() else {
        return Summary {
            instrument_model: instrument_model.to_string(),
            mean_speed: 0.0,
            position: UNKNOWN_POSITION.to_string(),
            span: TimeSpan::instant(now),
            sample_count: 0,
            generated_at: now,
        };
    };

    // First occurrence wins on timestamp ties.
    let (newest, oldest) = readings.iter().fold((first, first), |(newest, oldest), r| {
        (
            if r.timestamp > newest.timestamp { r } else { newest },
            if r.timestamp < oldest.timestamp { r } else { oldest },
        )
    });

    let total: f64 = readings.iter().map(|r| r.speed).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = total / readings.len() as f64;

    Summary {
        instrument_model: instrument_model.to_string(),
        mean_speed: round_to_cents(mean),
        position: newest.position.clone(),
        span: TimeSpan {
            start: oldest.timestamp,
            end: newest.timestamp,
        },
        sample_count: readings.len(),
        generated_at: now,
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn reading(position: &str, speed: f64, offset_secs: i64) -> Reading {
        Reading::new("WS-200", position, speed, base() + TimeDelta::seconds(offset_secs))
    }

    #[test]
    fn empty_input_yields_zero_summary() {
        let now = base();
        let summary = summarize_at("WS-200", &[], now);

        assert_eq!(summary.sample_count, 0);
        assert!(summary.mean_speed.abs() < f64::EPSILON);
        assert_eq!(summary.position, UNKNOWN_POSITION);
        assert_eq!(summary.span.start, summary.span.end);
        assert_eq!(summary.span.start, now);
        assert_eq!(summary.generated_at, now);
    }

    #[test]
    fn mean_is_rounded_to_two_decimals() {
        let readings = vec![
            reading("A1", 1.0, 0),
            reading("A1", 2.0, 1),
            reading("A1", 2.0, 2),
        ];
        let summary = summarize_at("WS-200", &readings, base());
        assert!((summary.mean_speed - 1.67).abs() < 1e-9);
        assert_eq!(summary.sample_count, 3);
    }

    #[test]
    fn newest_first_input_matches_positional_convention() {
        let readings = vec![
            reading("A3", 3.0, 20),
            reading("A2", 2.0, 10),
            reading("A1", 1.0, 0),
        ];
        let summary = summarize_at("WS-200", &readings, base());

        assert_eq!(summary.position, "A3");
        assert_eq!(summary.span.start, readings[2].timestamp);
        assert_eq!(summary.span.end, readings[0].timestamp);
    }

    #[test]
    fn unordered_input_uses_timestamps() {
        let readings = vec![
            reading("B", 2.0, 10),
            reading("C", 3.0, 30),
            reading("A", 1.0, -5),
        ];
        let summary = summarize_at("WS-200", &readings, base());

        assert_eq!(summary.position, "C");
        assert_eq!(summary.span.start, base() - TimeDelta::seconds(5));
        assert_eq!(summary.span.end, base() + TimeDelta::seconds(30));
    }

    #[test]
    fn ties_keep_first_reading() {
        let readings = vec![reading("first", 1.0, 0), reading("second", 1.0, 0)];
        let summary = summarize_at("WS-200", &readings, base());
        assert_eq!(summary.position, "first");
    }

    #[test]
    fn summary_serializes_camel_case() {
        let summary = summarize_at("WS-200", &[reading("A1", 4.0, 0)], base());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["instrumentModel"], "WS-200");
        assert_eq!(json["meanSpeed"], 4.0);
        assert_eq!(json["sampleCount"], 1);
        assert_eq!(json["span"]["start"], "2024-06-01T12:00:00Z");
    }
}
