//! Query Results
//!
//! Read paths degrade to an empty result instead of failing. The status
//! field keeps the reason for an empty result observable: no matching data,
//! unparseable input, or a realtime store holding another instrument model.

use serde::Serialize;

use crate::domain::reading::Reading;

/// Why a query returned what it returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// At least one reading matched.
    Ok,
    /// Inputs were valid but nothing matched, or the store is empty.
    NoData,
    /// A bound or parameter could not be parsed.
    InvalidInput,
    /// The realtime store holds data for a different instrument model.
    ModelMismatch,
}

impl QueryStatus {
    /// Get the status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NoData => "no_data",
            Self::InvalidInput => "invalid_input",
            Self::ModelMismatch => "model_mismatch",
        }
    }
}

/// Readings returned by a store query together with their status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Matching readings. Empty unless `status` is [`QueryStatus::Ok`].
    pub readings: Vec<Reading>,
    /// Outcome of the query.
    pub status: QueryStatus,
}

impl QueryResult {
    /// Build a result from matching readings.
    #[must_use]
    pub fn from_matches(readings: Vec<Reading>) -> Self {
        let status = if readings.is_empty() {
            QueryStatus::NoData
        } else {
            QueryStatus::Ok
        };
        Self { readings, status }
    }

    /// Empty result for unparseable input.
    #[must_use]
    pub const fn invalid_input() -> Self {
        Self::empty(QueryStatus::InvalidInput)
    }

    /// Empty result for an instrument model the store does not hold.
    #[must_use]
    pub const fn model_mismatch() -> Self {
        Self::empty(QueryStatus::ModelMismatch)
    }

    const fn empty(status: QueryStatus) -> Self {
        Self {
            readings: Vec::new(),
            status,
        }
    }

    /// Number of readings returned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether no readings were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn status_follows_matches() {
        assert_eq!(QueryResult::from_matches(vec![]).status, QueryStatus::NoData);

        let reading = Reading::new("m", "A1", 1.0, Utc::now());
        let result = QueryResult::from_matches(vec![reading]);
        assert_eq!(result.status, QueryStatus::Ok);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn status_serialization() {
        assert_eq!(
            serde_json::to_string(&QueryStatus::InvalidInput).unwrap(),
            "\"invalid_input\""
        );
        assert_eq!(
            serde_json::to_string(&QueryStatus::ModelMismatch).unwrap(),
            "\"model_mismatch\""
        );
        assert_eq!(QueryStatus::NoData.as_str(), "no_data");
    }
}
