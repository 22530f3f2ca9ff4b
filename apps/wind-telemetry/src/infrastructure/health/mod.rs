//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, store status reporting, and Prometheus
//! metrics. Served on its own port so probes keep working while the query
//! API is saturated.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (a store holds a committed generation)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::{HistoricalStore, Poller, PollerStatus, RealtimeStore};
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Historical store status.
    pub historical: StoreInfo,
    /// Realtime store status.
    pub realtime: RealtimeInfo,
    /// Poller status.
    pub poller: PollerStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Poller running and realtime data committed.
    Healthy,
    /// Serving, but realtime data is not being kept fresh.
    Degraded,
    /// No data and no poller.
    Unhealthy,
}

/// Store generation status.
#[derive(Debug, Clone, Serialize)]
pub struct StoreInfo {
    /// Readings in the current generation.
    pub readings: usize,
    /// Commit instant of the current generation.
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Realtime store status.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInfo {
    /// Active instrument tag.
    pub instrument_model: String,
    /// Readings in the current generation.
    pub readings: usize,
    /// Commit instant of the current generation.
    pub refreshed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    historical: Arc<HistoricalStore>,
    realtime: Arc<RealtimeStore>,
    poller: Arc<Poller>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(
        version: String,
        historical: Arc<HistoricalStore>,
        realtime: Arc<RealtimeStore>,
        poller: Arc<Poller>,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            historical,
            realtime,
            poller,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = create_health_router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

/// Router serving the health, readiness and metrics endpoints.
pub fn create_health_router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);

    let is_ready =
        response.historical.refreshed_at.is_some() || response.realtime.refreshed_at.is_some();

    if is_ready {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let historical = state.historical.generation();
    let realtime = state.realtime.generation();
    let poller = state.poller.status();

    let historical = StoreInfo {
        readings: historical.readings.len(),
        refreshed_at: historical.refreshed_at,
    };
    let realtime = RealtimeInfo {
        instrument_model: realtime.instrument_model.clone(),
        readings: realtime.readings.len(),
        refreshed_at: realtime.refreshed_at,
    };

    HealthResponse {
        status: determine_health_status(&historical, &realtime, &poller),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        historical,
        realtime,
        poller,
    }
}

fn determine_health_status(
    historical: &StoreInfo,
    realtime: &RealtimeInfo,
    poller: &PollerStatus,
) -> HealthStatus {
    let realtime_fresh = realtime.refreshed_at.is_some();

    if poller.running && realtime_fresh {
        HealthStatus::Healthy
    } else if poller.running || realtime_fresh || historical.refreshed_at.is_some() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Unhealthy
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
