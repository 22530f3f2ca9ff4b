//! HTTP Telemetry Source
//!
//! Fetches raw records from the upstream telemetry API with `reqwest`.
//!
//! The upstream answers with a JSON envelope `{ "readings": [ ... ] }`. An
//! envelope without a `readings` array, or a body that is not JSON at all, is
//! treated as "no data" rather than an error: only transport failures and
//! non-success statuses surface as [`FetchError`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::application::ports::{FetchError, FetchMode, TelemetrySourcePort};
use crate::domain::normalization::RawRecord;
use crate::infrastructure::config::UpstreamSettings;
use crate::infrastructure::metrics;

/// Telemetry source backed by the upstream HTTP API.
#[derive(Debug, Clone)]
pub struct HttpTelemetrySource {
    client: Client,
    historical_url: Option<String>,
    latest_url: Option<String>,
}

impl HttpTelemetrySource {
    /// Create a source from upstream settings.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` if the HTTP client cannot be built.
    pub fn new(settings: &UpstreamSettings) -> Result<Self, FetchError> {
        Self::with_urls(
            settings.historical_url.clone(),
            settings.latest_url.clone(),
            settings.timeout,
        )
    }

    /// Create a source with explicit URLs.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` if the HTTP client cannot be built.
    pub fn with_urls(
        historical_url: Option<String>,
        latest_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            historical_url,
            latest_url,
        })
    }

    fn url_for(&self, mode: FetchMode) -> Option<&str> {
        match mode {
            FetchMode::Historical => self.historical_url.as_deref(),
            FetchMode::Latest => self.latest_url.as_deref(),
        }
    }

    async fn get(&self, url: &str) -> Result<Vec<RawRecord>, FetchError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(map_reqwest)?;
        Ok(decode_envelope(&body))
    }
}

#[async_trait]
impl TelemetrySourcePort for HttpTelemetrySource {
    async fn fetch(
        &self,
        mode: FetchMode,
        instrument_model: &str,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let Some(url) = self.url_for(mode) else {
            tracing::error!(mode = mode.as_str(), "Upstream URL not configured");
            return Ok(Vec::new());
        };

        let started = Instant::now();
        let result = self.get(url).await;
        metrics::record_fetch_duration(mode, started.elapsed());

        match &result {
            Ok(records) => tracing::debug!(
                mode = mode.as_str(),
                instrument_model,
                records = records.len(),
                "Fetched upstream records"
            ),
            Err(e) => tracing::warn!(
                mode = mode.as_str(),
                instrument_model,
                category = e.category(),
                error = %e,
                "Upstream fetch failed"
            ),
        }

        result
    }
}

fn map_reqwest(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = error.status() {
        FetchError::from_status(status.as_u16())
    } else {
        FetchError::Transport {
            message: error.to_string(),
        }
    }
}

/// Decode the `{ "readings": [...] }` envelope.
///
/// Anything structurally invalid yields an empty sequence.
#[must_use]
pub fn decode_envelope(body: &[u8]) -> Vec<RawRecord> {
    let envelope: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Upstream body is not JSON");
            return Vec::new();
        }
    };

    let Some(readings) = envelope.get("readings").and_then(Value::as_array) else {
        tracing::warn!("Upstream body has no readings array");
        return Vec::new();
    };

    readings.iter().map(RawRecord::from_value).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_readings_array() {
        let body = json!({
            "readings": [
                { "id": 1, "record_type": "individual_reading", "reading_data": "{}" },
                { "id": "b", "record_type": "summary" },
                "not an object"
            ]
        });
        let records = decode_envelope(body.to_string().as_bytes());

        assert_eq!(records.len(), 3);
        assert!(records[0].is_individual_reading());
        assert_eq!(records[1].record_id(), "b");
        assert_eq!(records[2], RawRecord::default());
    }

    #[test]
    fn invalid_structure_is_empty() {
        assert!(decode_envelope(b"<html>").is_empty());
        assert!(decode_envelope(b"{}").is_empty());
        assert!(decode_envelope(br#"{"readings": {"id": 1}}"#).is_empty());
        assert!(decode_envelope(b"[]").is_empty());
    }

    #[tokio::test]
    async fn missing_url_yields_empty() {
        let source = HttpTelemetrySource::new(&UpstreamSettings::default()).unwrap();
        let records = source.fetch(FetchMode::Latest, "default").await.unwrap();
        assert!(records.is_empty());
    }
}
