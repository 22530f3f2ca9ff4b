#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Wind Telemetry - Sensor Ingestion and Time-Series Service
//!
//! Fetches wind speed readings from an external telemetry API, validates and
//! normalizes them, and serves them back through historical range queries,
//! file exports and a continuously refreshed realtime window.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure types and rules
//!   - `reading`: The canonical `Reading` and timestamp parsing
//!   - `normalization`: Raw record validation and conversion
//!   - `summary`: Mean speed, span and latest position
//!   - `query`: Query results with an explicit status
//!
//! - **Application**: Ports and stateful services
//!   - `ports`: Telemetry source and export renderer interfaces
//!   - `services`: Historical store, realtime store, poller
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `source`: HTTP client for the upstream API
//!   - `export`: CSV and spreadsheet renderers
//!   - `http`: Query API server
//!   - `health`: Health check and metrics endpoint
//!   - `config`, `metrics`, `telemetry`: Ambient plumbing
//!
//! # Data Flow
//!
//! ```text
//!                   ┌────────────┐     ┌──────────────────┐
//! Upstream API ───► │ Normalizer │ ──► │ Historical Store │ ──► range / export
//!   (reqwest)       └────────────┘  │  └──────────────────┘
//!                                   │  ┌──────────────────┐
//!                     Poller tick ──┴► │  Realtime Store  │ ──► window + summary
//!                                      └──────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Readings, normalization and aggregation.
pub mod domain;

/// Application layer - Ports and store services.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::normalization::{RawRecord, RecordNormalizer, RejectReason, RejectionObserver};
pub use domain::query::{QueryResult, QueryStatus};
pub use domain::reading::Reading;
pub use domain::summary::{Summary, summarize};

// Ports and services
pub use application::ports::{FetchError, FetchMode, TelemetrySourcePort};
pub use application::services::{HistoricalStore, Poller, PollerStatus, RealtimeStore};

// Infrastructure config
pub use infrastructure::config::{ConfigError, ServiceConfig};

// Servers
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};
pub use infrastructure::http::{ApiServer, AppState, HttpServerError, create_router};

// Upstream client
pub use infrastructure::source::HttpTelemetrySource;

// Metrics
pub use infrastructure::metrics::{MetricsRejectionObserver, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
