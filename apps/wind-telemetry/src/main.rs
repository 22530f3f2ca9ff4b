//! Wind Telemetry Binary
//!
//! Starts the query API, the health server and the realtime poller.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin wind-telemetry
//! ```
//!
//! # Environment Variables
//!
//! - `API_URL_HISTORICAL` (or `API_URL_Historical`): Upstream URL for the full history
//! - `API_URL_LATEST` (or `API_URL_Lastest`): Upstream URL for the most recent batch
//! - `FETCH_TIMEOUT_MS`: Upstream request timeout (default: 5000)
//! - `HTTP_PORT` or `PORT`: Query API port (default: 3000)
//! - `HEALTH_PORT`: Health check and metrics port (default: 8082)
//! - `POLL_INTERVAL_SECS`: Realtime poll interval (default: 5)
//! - `REALTIME_WINDOW_SECS`: Realtime recency window (default: 5)
//! - `DEFAULT_INSTRUMENT_MODEL`: Model polled at startup (default: default)
//! - `POLLER_AUTOSTART`: Start polling at boot (default: true)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use wind_telemetry::infrastructure::export::ExportRenderers;
use wind_telemetry::infrastructure::telemetry;
use wind_telemetry::{
    ApiServer, AppState, HealthServer, HealthServerState, HistoricalStore, HttpTelemetrySource,
    MetricsRejectionObserver, Poller, RealtimeStore, RecordNormalizer, ServiceConfig,
    init_metrics,
};

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting wind telemetry service");

    let _metrics_handle = init_metrics();

    let config = ServiceConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let source = Arc::new(
        HttpTelemetrySource::new(&config.upstream).context("failed to build upstream client")?,
    );
    let normalizer = RecordNormalizer::new(Arc::new(MetricsRejectionObserver));

    let historical = Arc::new(HistoricalStore::new(source.clone(), normalizer.clone()));
    let realtime = Arc::new(RealtimeStore::new(source, normalizer));
    let poller = Arc::new(Poller::new(Arc::clone(&realtime)));

    if config.realtime.autostart {
        poller.start(
            Some(config.realtime.default_instrument_model.as_str()),
            config.realtime.poll_interval_secs,
        );
    }

    let api_server = ApiServer::new(
        config.server.http_port,
        AppState {
            historical: Arc::clone(&historical),
            realtime: Arc::clone(&realtime),
            poller: Arc::clone(&poller),
            renderers: ExportRenderers::default(),
            window_secs: config.realtime.window_secs,
            poll_interval_secs: config.realtime.poll_interval_secs,
        },
        shutdown_token.clone(),
    );

    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        historical,
        realtime,
        Arc::clone(&poller),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );

    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run().await {
            tracing::error!(error = %e, "API server error");
        }
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    tracing::info!("Wind telemetry service ready");

    await_shutdown(shutdown_token).await;
    poller.stop();

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let _ = tokio::join!(api_task, health_task);
    })
    .await
    .is_err()
    {
        tracing::warn!("Servers did not stop within the shutdown timeout");
    }

    tracing::info!("Wind telemetry service stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        health_port = config.server.health_port,
        poll_interval_secs = config.realtime.poll_interval_secs,
        window_secs = config.realtime.window_secs,
        instrument_model = %config.realtime.default_instrument_model,
        autostart = config.realtime.autostart,
        "Configuration loaded"
    );
    tracing::debug!(
        historical_url = ?config.upstream.historical_url,
        latest_url = ?config.upstream.latest_url,
        timeout_ms = config.upstream.timeout.as_millis(),
        "Upstream endpoints"
    );

    if config.upstream.historical_url.is_none() {
        tracing::warn!("API_URL_HISTORICAL is not set, historical refreshes will be empty");
    }
    if config.upstream.latest_url.is_none() {
        tracing::warn!("API_URL_LATEST is not set, realtime refreshes will be empty");
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
