//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use serde_json::json;

use wind_telemetry::{FetchError, FetchMode, RawRecord, TelemetrySourcePort};

/// Source that serves a fixed response and counts calls per mode.
#[derive(Debug)]
pub struct FakeSource {
    response: Mutex<Result<Vec<RawRecord>, FetchError>>,
    historical_calls: AtomicUsize,
    latest_calls: AtomicUsize,
}

impl FakeSource {
    pub fn serving(records: Vec<RawRecord>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(records)),
            historical_calls: AtomicUsize::new(0),
            latest_calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: FetchError) -> Arc<Self> {
        let source = Self::serving(Vec::new());
        source.set_response(Err(error));
        source
    }

    pub fn set_response(&self, response: Result<Vec<RawRecord>, FetchError>) {
        *self.response.lock() = response;
    }

    pub fn calls(&self, mode: FetchMode) -> usize {
        match mode {
            FetchMode::Historical => self.historical_calls.load(Ordering::SeqCst),
            FetchMode::Latest => self.latest_calls.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl TelemetrySourcePort for FakeSource {
    async fn fetch(
        &self,
        mode: FetchMode,
        _instrument_model: &str,
    ) -> Result<Vec<RawRecord>, FetchError> {
        match mode {
            FetchMode::Historical => self.historical_calls.fetch_add(1, Ordering::SeqCst),
            FetchMode::Latest => self.latest_calls.fetch_add(1, Ordering::SeqCst),
        };
        self.response.lock().clone()
    }
}

/// A valid individual-reading record taken `secs_ago` seconds before now.
pub fn recent_record(id: u32, position: &str, speed: f64, secs_ago: i64) -> RawRecord {
    let timestamp = Utc::now() - TimeDelta::seconds(secs_ago);
    record_at(id, position, speed, &timestamp.to_rfc3339())
}

/// A valid individual-reading record with an explicit timestamp.
pub fn record_at(id: u32, position: &str, speed: f64, timestamp: &str) -> RawRecord {
    let payload = json!({
        "position": position,
        "wind_speed": speed,
        "timestamp": timestamp,
    });
    RawRecord::individual(id, payload.to_string())
}
