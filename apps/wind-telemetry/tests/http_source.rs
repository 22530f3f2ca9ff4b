//! Upstream HTTP Source Integration Tests
//!
//! Runs the reqwest adapter against a local wiremock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wind_telemetry::application::services::HistoricalRefresh;
use wind_telemetry::{
    FetchError, FetchMode, HistoricalStore, HttpTelemetrySource, QueryStatus, RecordNormalizer,
    TelemetrySourcePort,
};

fn reading(id: u32, position: &str, speed: f64, timestamp: &str) -> Value {
    json!({
        "id": id,
        "record_type": "individual_reading",
        "reading_data": json!({
            "position": position,
            "wind_speed": speed,
            "unit": "km/h",
            "timestamp": timestamp,
        })
        .to_string(),
    })
}

fn envelope() -> Value {
    json!({
        "readings": [
            reading(1, "N", 10.0, "2024-05-01T10:00:00Z"),
            { "id": 2, "record_type": "daily_summary" },
            reading(3, "NE", 12.5, "2024-05-01T10:01:00Z"),
            { "id": 4, "record_type": "individual_reading", "reading_data": "{not json" },
            reading(5, "E", 8.0, "2024-05-01T10:02:00Z"),
        ]
    })
}

async fn source_for(server: &MockServer, timeout: Duration) -> HttpTelemetrySource {
    HttpTelemetrySource::with_urls(
        Some(format!("{}/history", server.uri())),
        Some(format!("{}/latest", server.uri())),
        timeout,
    )
    .unwrap()
}

#[tokio::test]
async fn historical_refresh_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let source = Arc::new(source_for(&server, Duration::from_secs(5)).await);
    let store = HistoricalStore::new(source, RecordNormalizer::default());

    let outcome = store.refresh(Some("Extech 45170")).await;
    assert_eq!(outcome, HistoricalRefresh::Replaced { readings: 3 });

    let result = store.query_range("2024-05-01T10:00:30Z", "2024-05-01T10:02:00Z");
    assert_eq!(result.status, QueryStatus::Ok);
    let positions: Vec<&str> = result.readings.iter().map(|r| r.position.as_str()).collect();
    assert_eq!(positions, vec!["NE", "E"]);
    assert!(result.readings.iter().all(|r| r.instrument_model == "Extech 45170"));
}

#[tokio::test]
async fn latest_mode_uses_latest_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5)).await;
    let records = source.fetch(FetchMode::Latest, "default").await.unwrap();

    assert_eq!(records.len(), 5);
    assert_eq!(records[1].record_id(), "2");
}

#[tokio::test]
async fn invalid_structure_is_empty_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5)).await;

    assert!(source.fetch(FetchMode::Historical, "m").await.unwrap().is_empty());
    assert!(source.fetch(FetchMode::Latest, "m").await.unwrap().is_empty());
}

#[tokio::test]
async fn status_codes_map_to_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5)).await;

    assert_eq!(
        source.fetch(FetchMode::Historical, "m").await.unwrap_err(),
        FetchError::NotFound
    );
    assert_eq!(
        source.fetch(FetchMode::Latest, "m").await.unwrap_err(),
        FetchError::Server { status: 503 }
    );
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_millis(200)).await;

    assert_eq!(
        source.fetch(FetchMode::Latest, "m").await.unwrap_err(),
        FetchError::Timeout
    );
}

#[tokio::test]
async fn failed_refresh_keeps_previous_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = Arc::new(source_for(&server, Duration::from_secs(5)).await);
    let store = HistoricalStore::new(source, RecordNormalizer::default());

    store.refresh(None).await;
    let outcome = store.refresh(None).await;

    assert_eq!(
        outcome,
        HistoricalRefresh::Unchanged {
            error: FetchError::Server { status: 500 }
        }
    );
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn unreachable_upstream_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = HttpTelemetrySource::with_urls(
        Some(format!("http://{addr}/history")),
        None,
        Duration::from_secs(2),
    )
    .unwrap();

    let err = source.fetch(FetchMode::Historical, "m").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }), "{err:?}");
}
