//! Application Services
//!
//! - `HistoricalStore`: Full history, replaced on demand, queried by range
//! - `RealtimeStore`: Latest batch for one instrument model, queried by window
//! - `Poller`: Refreshes the realtime store on a fixed interval

mod historical_store;
mod poller;
mod realtime_store;

pub use historical_store::{DEFAULT_LATEST_COUNT, HistoricalGeneration, HistoricalRefresh, HistoricalStore};
pub use poller::{DEFAULT_POLL_INTERVAL, Poller, PollerStatus, effective_interval};
pub use realtime_store::{
    DEFAULT_WINDOW_SECS, RealtimeGeneration, RealtimeStore, RefreshError, effective_window,
};
