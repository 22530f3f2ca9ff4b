//! Realtime Poller
//!
//! Drives periodic refreshes of the [`RealtimeStore`]. At most one timer is
//! live at a time: starting while running cancels the previous timer before
//! the new one is armed.
//!
//! Stopping only prevents future ticks. A refresh already in flight when the
//! timer is cancelled still completes and still replaces the store.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::realtime_store::RealtimeStore;
use crate::domain::reading::resolve_instrument_model;
use crate::infrastructure::metrics;

/// Interval applied when the requested interval is missing or invalid.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Use `requested_secs` if it is a positive finite number of seconds.
///
/// Values too small to survive conversion to a non-zero [`Duration`] count
/// as invalid, since a zero period cannot drive a timer.
#[must_use]
pub fn effective_interval(requested_secs: f64) -> Duration {
    if requested_secs.is_finite() && requested_secs > 0.0 {
        Duration::try_from_secs_f64(requested_secs)
            .ok()
            .filter(|interval| !interval.is_zero())
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    } else {
        DEFAULT_POLL_INTERVAL
    }
}

/// Snapshot of the poller state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollerStatus {
    /// Whether a timer is armed.
    pub running: bool,
    /// Model being polled, if running.
    pub instrument_model: Option<String>,
    /// Tick interval in seconds, if running.
    pub interval_secs: Option<f64>,
}

struct PollHandle {
    instrument_model: String,
    interval: Duration,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Owner of the realtime refresh timer.
pub struct Poller {
    store: Arc<RealtimeStore>,
    active: Mutex<Option<PollHandle>>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Poller {
    /// Create a stopped poller for `store`.
    #[must_use]
    pub const fn new(store: Arc<RealtimeStore>) -> Self {
        Self {
            store,
            active: Mutex::new(None),
        }
    }

    /// Start polling `instrument_model` every `interval_secs` seconds.
    ///
    /// The first refresh runs immediately. A previously armed timer is
    /// cancelled first. Must be called from within a Tokio runtime.
    ///
    /// Returns the interval actually used.
    pub fn start(&self, instrument_model: Option<&str>, interval_secs: f64) -> Duration {
        let model = resolve_instrument_model(instrument_model);
        let interval = effective_interval(interval_secs);

        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.cancel();
            tracing::debug!(
                instrument_model = %previous.instrument_model,
                "Replacing realtime poller"
            );
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.store),
            model.clone(),
            interval,
            cancel.clone(),
        ));

        tracing::info!(
            instrument_model = %model,
            interval_secs = interval.as_secs_f64(),
            "Realtime poller started"
        );

        *active = Some(PollHandle {
            instrument_model: model,
            interval,
            cancel,
            task,
        });

        interval
    }

    /// Cancel the timer. Returns `false` if it was already stopped.
    pub fn stop(&self) -> bool {
        let Some(handle) = self.active.lock().take() else {
            return false;
        };

        handle.cancel();
        tracing::info!(
            instrument_model = %handle.instrument_model,
            "Realtime poller stopped"
        );
        true
    }

    /// Whether a timer is armed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|h| !h.task.is_finished())
    }

    /// Current tick interval, if running.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.active.lock().as_ref().map(|h| h.interval)
    }

    /// Model being polled, if running.
    #[must_use]
    pub fn instrument_model(&self) -> Option<String> {
        self.active.lock().as_ref().map(|h| h.instrument_model.clone())
    }

    /// Snapshot of the poller state.
    #[must_use]
    pub fn status(&self) -> PollerStatus {
        let active = self.active.lock();
        PollerStatus {
            running: active.as_ref().is_some_and(|h| !h.task.is_finished()),
            instrument_model: active.as_ref().map(|h| h.instrument_model.clone()),
            interval_secs: active.as_ref().map(|h| h.interval.as_secs_f64()),
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(handle) = self.active.get_mut().take() {
            handle.cancel();
        }
    }
}

async fn run_loop(
    store: Arc<RealtimeStore>,
    instrument_model: String,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(instrument_model = %instrument_model, "Poller loop cancelled");
                break;
            }
            _ = ticker.tick() => {}
        }

        // Outside the select so cancellation never aborts a refresh midway.
        metrics::record_poller_tick();
        match store.refresh(Some(instrument_model.as_str())).await {
            Ok(refreshed_at) => tracing::debug!(
                instrument_model = %instrument_model,
                %refreshed_at,
                readings = store.len(),
                "Poller tick refreshed realtime store"
            ),
            Err(e) => tracing::warn!(error = %e, "Poller tick failed"),
        }
    }
}
