//! Query API routes.
//!
//! # Endpoints
//!
//! - `GET /api/historics/refresh` - Start a historical refresh in the background
//! - `GET /api/historics/range` - Readings within `[from, to]`
//! - `GET /api/historics/latest` - Last `n` historical readings
//! - `GET /api/historics/export` - Range as a CSV or spreadsheet attachment
//! - `GET /api/realtime/refresh` - Refresh the realtime store and wait for it
//! - `GET /api/realtime/latest` - Refresh, then recent readings with a summary
//! - `GET /api/realtime/poller` - Poller status
//! - `POST /api/realtime/poller/start` - (Re)start the poller
//! - `POST /api/realtime/poller/stop` - Stop the poller

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::dto::{
    LatestQuery, MessageResponse, ModelQuery, PollerStartQuery, PollerStopResponse, RangeQuery,
    RealtimeLatestResponse, RealtimeRefreshResponse,
};
use super::error::ApiError;
use crate::application::ports::{ExportFormat, ExportRequest};
use crate::application::services::{HistoricalStore, Poller, PollerStatus, RealtimeStore};
use crate::domain::query::QueryResult;
use crate::domain::reading::resolve_instrument_model;
use crate::domain::summary::summarize;
use crate::infrastructure::export::ExportRenderers;

/// State shared by all API handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Historical store.
    pub historical: Arc<HistoricalStore>,
    /// Realtime store.
    pub realtime: Arc<RealtimeStore>,
    /// Realtime poller.
    pub poller: Arc<Poller>,
    /// Export renderers.
    pub renderers: ExportRenderers,
    /// Recency window for `/api/realtime/latest`, in seconds.
    pub window_secs: f64,
    /// Interval used when a start request does not name one.
    pub poll_interval_secs: f64,
}

/// Create the query API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/historics/refresh", get(historics_refresh))
        .route("/api/historics/range", get(historics_range))
        .route("/api/historics/latest", get(historics_latest))
        .route("/api/historics/export", get(historics_export))
        .route("/api/realtime/refresh", get(realtime_refresh))
        .route("/api/realtime/latest", get(realtime_latest))
        .route("/api/realtime/poller", get(poller_status))
        .route("/api/realtime/poller/start", post(poller_start))
        .route("/api/realtime/poller/stop", post(poller_stop))
        .with_state(state)
}

// =============================================================================
// Historical
// =============================================================================

async fn historics_refresh(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Json<MessageResponse> {
    let historical = Arc::clone(&state.historical);
    tokio::spawn(async move {
        historical.refresh(query.instrument_model.as_deref()).await;
    });

    Json(MessageResponse {
        message: "Historical refresh started".to_string(),
    })
}

async fn historics_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<QueryResult>, ApiError> {
    let (from, to) = query
        .bounds()
        .ok_or_else(|| ApiError::bad_request("query parameters \"from\" and \"to\" are required"))?;

    Ok(Json(state.historical.query_range(from, to)))
}

async fn historics_latest(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Json<QueryResult> {
    Json(state.historical.query_latest(query.count()))
}

async fn historics_export(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (from, to) = query
        .bounds()
        .ok_or_else(|| ApiError::bad_request("query parameters \"from\" and \"to\" are required"))?;

    let format = ExportFormat::parse(query.format.as_deref());
    let result = state.historical.query_range(from, to);
    let request = ExportRequest::new(from, to);

    let rendered = state
        .renderers
        .get(format)
        .render(&result.readings, &request)
        .map_err(|e| {
            tracing::error!(format = format.as_str(), error = %e, "Export failed");
            ApiError::internal("failed to generate export", e)
        })?;

    tracing::info!(
        format = format.as_str(),
        readings = result.len(),
        file_name = %rendered.file_name,
        "Export generated"
    );

    Ok((
        [
            (header::CONTENT_TYPE, rendered.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", rendered.file_name),
            ),
        ],
        rendered.bytes,
    ))
}

// =============================================================================
// Realtime
// =============================================================================

async fn realtime_refresh(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Result<Json<RealtimeRefreshResponse>, ApiError> {
    let model = resolve_instrument_model(query.instrument_model.as_deref());

    let refreshed_at = state.realtime.refresh(Some(model.as_str())).await.map_err(|e| {
        tracing::error!(error = %e, "Manual realtime refresh failed");
        ApiError::internal("failed to refresh realtime readings", e)
    })?;

    Ok(Json(RealtimeRefreshResponse {
        message: "Realtime readings refreshed".to_string(),
        instrument_model: model,
        refreshed_at,
    }))
}

async fn realtime_latest(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Result<Json<RealtimeLatestResponse>, ApiError> {
    let model = query
        .instrument_model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map_or_else(|| state.realtime.active_instrument_model(), str::to_string);

    state.realtime.refresh(Some(model.as_str())).await.map_err(|e| {
        tracing::error!(error = %e, "Realtime refresh before window query failed");
        ApiError::internal("failed to fetch realtime readings", e)
    })?;

    let result = state.realtime.query_recent_window(&model, state.window_secs);
    let summary = summarize(&model, &result.readings);

    Ok(Json(RealtimeLatestResponse {
        instrument_model: model,
        readings: result.readings,
        summary,
        status: result.status,
    }))
}

async fn poller_status(State(state): State<AppState>) -> Json<PollerStatus> {
    Json(state.poller.status())
}

async fn poller_start(
    State(state): State<AppState>,
    Query(query): Query<PollerStartQuery>,
) -> Json<PollerStatus> {
    let interval_secs = query
        .interval_secs
        .as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(state.poll_interval_secs);

    state
        .poller
        .start(query.instrument_model.as_deref(), interval_secs);

    Json(state.poller.status())
}

async fn poller_stop(State(state): State<AppState>) -> Json<PollerStopResponse> {
    Json(PollerStopResponse {
        stopped: state.poller.stop(),
    })
}
