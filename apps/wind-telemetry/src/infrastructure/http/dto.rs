//! Request and response types for the query API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::query::QueryStatus;
use crate::domain::reading::Reading;
use crate::domain::summary::Summary;

/// `?instrumentModel=`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelQuery {
    /// Requested instrument model.
    pub instrument_model: Option<String>,
}

/// `?from=&to=`, plus `format=` for exports.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeQuery {
    /// Lower bound.
    pub from: Option<String>,
    /// Upper bound.
    pub to: Option<String>,
    /// Export format.
    pub format: Option<String>,
}

impl RangeQuery {
    /// Both bounds, if present and non-blank.
    #[must_use]
    pub fn bounds(&self) -> Option<(&str, &str)> {
        fn non_blank(value: Option<&String>) -> Option<&str> {
            value.map(String::as_str).map(str::trim).filter(|v| !v.is_empty())
        }

        Some((non_blank(self.from.as_ref())?, non_blank(self.to.as_ref())?))
    }
}

/// `?n=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestQuery {
    /// Requested count; anything that is not an integer uses the default.
    pub n: Option<String>,
}

impl LatestQuery {
    /// Parsed count.
    #[must_use]
    pub fn count(&self) -> Option<i64> {
        self.n.as_deref().and_then(|n| n.trim().parse().ok())
    }
}

/// `?instrumentModel=&intervalSecs=`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollerStartQuery {
    /// Model to poll.
    pub instrument_model: Option<String>,
    /// Tick interval in seconds.
    pub interval_secs: Option<String>,
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Acknowledgement text.
    pub message: String,
}

/// Result of a manual realtime refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeRefreshResponse {
    /// Acknowledgement text.
    pub message: String,
    /// Model now held by the realtime store.
    pub instrument_model: String,
    /// Commit instant of the new generation.
    pub refreshed_at: DateTime<Utc>,
}

/// Recent readings and their summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeLatestResponse {
    /// Requested instrument model.
    pub instrument_model: String,
    /// Readings inside the recency window.
    pub readings: Vec<Reading>,
    /// Summary of `readings`.
    pub summary: Summary,
    /// Query status.
    pub status: QueryStatus,
}

/// Poller stop acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct PollerStopResponse {
    /// Whether a running timer was cancelled.
    pub stopped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_bounds_are_missing() {
        let query = RangeQuery {
            from: Some("2024-01-01".to_string()),
            to: Some("  ".to_string()),
            format: None,
        };
        assert!(query.bounds().is_none());
        assert!(RangeQuery::default().bounds().is_none());
    }

    #[test]
    fn bounds_are_trimmed() {
        let query = RangeQuery {
            from: Some(" 2024-01-01 ".to_string()),
            to: Some("2024-01-02".to_string()),
            format: None,
        };
        assert_eq!(query.bounds(), Some(("2024-01-01", "2024-01-02")));
    }

    #[test]
    fn latest_count_is_lenient() {
        let count = |n: &str| LatestQuery { n: Some(n.to_string()) }.count();
        assert_eq!(count("5"), Some(5));
        assert_eq!(count("-2"), Some(-2));
        assert_eq!(count("many"), None);
        assert_eq!(LatestQuery::default().count(), None);
    }
}
