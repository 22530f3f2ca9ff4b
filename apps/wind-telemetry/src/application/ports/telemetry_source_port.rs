//! Telemetry Source Port (Driven Port)
//!
//! Interface for fetching raw records from the upstream telemetry API.

use async_trait::async_trait;

use crate::domain::normalization::RawRecord;

/// Which upstream feed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// Full history, used by the historical store.
    Historical,
    /// Most recent batch, used by the realtime store.
    Latest,
}

impl FetchMode {
    /// Get the mode name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Latest => "latest",
        }
    }
}

/// Transport-level failure talking to the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("upstream request timed out")]
    Timeout,

    /// The upstream endpoint does not exist.
    #[error("upstream endpoint not found")]
    NotFound,

    /// The upstream server failed.
    #[error("upstream server error: HTTP {status}")]
    Server {
        /// HTTP status code.
        status: u16,
    },

    /// Any other non-success status.
    #[error("unexpected upstream status: HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Connection or protocol failure.
    #[error("upstream transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },
}

impl FetchError {
    /// Map a non-success HTTP status to an error.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            500..=599 => Self::Server { status },
            _ => Self::Status { status },
        }
    }

    /// Error category, used as a metric label.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::NotFound => "not_found",
            Self::Server { .. } => "server",
            Self::Status { .. } => "status",
            Self::Transport { .. } => "transport",
        }
    }
}

/// Fetch capability for raw upstream records.
///
/// Structurally invalid responses are not errors: implementations return an
/// empty sequence for them and reserve `Err` for transport failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetrySourcePort: Send + Sync {
    /// Fetch raw records for `instrument_model` in the given mode.
    async fn fetch(
        &self,
        mode: FetchMode,
        instrument_model: &str,
    ) -> Result<Vec<RawRecord>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(FetchError::from_status(404), FetchError::NotFound);
        assert_eq!(FetchError::from_status(503), FetchError::Server { status: 503 });
        assert_eq!(FetchError::from_status(401), FetchError::Status { status: 401 });
    }

    #[test]
    fn categories() {
        assert_eq!(FetchError::Timeout.category(), "timeout");
        assert_eq!(
            FetchError::Transport {
                message: "reset".to_string()
            }
            .category(),
            "transport"
        );
        assert_eq!(FetchMode::Latest.as_str(), "latest");
    }
}
