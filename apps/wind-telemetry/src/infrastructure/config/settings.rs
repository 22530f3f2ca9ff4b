//! Service Configuration Settings
//!
//! Configuration types for the telemetry service, loaded from environment
//! variables.

use std::time::Duration;

use reqwest::Url;

use crate::domain::reading::DEFAULT_INSTRUMENT_MODEL;

/// Upstream telemetry API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSettings {
    /// URL serving the full history.
    pub historical_url: Option<String>,
    /// URL serving the most recent batch.
    pub latest_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            historical_url: None,
            latest_url: None,
            timeout: Duration::from_millis(5_000),
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Query API port.
    pub http_port: u16,
    /// Health check and metrics port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 3000,
            health_port: 8082,
        }
    }
}

/// Realtime polling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeSettings {
    /// Poller interval in seconds.
    pub poll_interval_secs: f64,
    /// Recency window for the realtime endpoint, in seconds.
    pub window_secs: f64,
    /// Model polled at startup.
    pub default_instrument_model: String,
    /// Start the poller at boot.
    pub autostart: bool,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5.0,
            window_secs: 5.0,
            default_instrument_model: DEFAULT_INSTRUMENT_MODEL.to_string(),
            autostart: true,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceConfig {
    /// Upstream API settings.
    pub upstream: UpstreamSettings,
    /// Server port settings.
    pub server: ServerSettings,
    /// Realtime polling settings.
    pub realtime: RealtimeSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an upstream URL is not an `http`/`https` URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// Unset, empty or unparseable values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an upstream URL is not an `http`/`https` URL.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        // The first key set wins; later keys are legacy spellings.
        let url = |keys: &[&'static str]| {
            keys.iter()
                .find_map(|key| get(*key).map(|value| (*key, value)))
                .map(|(key, value)| validate_url(key, value))
                .transpose()
        };

        let upstream = UpstreamSettings {
            historical_url: url(&HISTORICAL_URL_KEYS)?,
            latest_url: url(&LATEST_URL_KEYS)?,
            timeout: get("FETCH_TIMEOUT_MS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map_or(UpstreamSettings::default().timeout, Duration::from_millis),
        };

        let server = ServerSettings {
            http_port: parse_or(
                get("HTTP_PORT").or_else(|| get("PORT")),
                ServerSettings::default().http_port,
            ),
            health_port: parse_or(get("HEALTH_PORT"), ServerSettings::default().health_port),
        };

        let defaults = RealtimeSettings::default();
        let realtime = RealtimeSettings {
            poll_interval_secs: positive_or(get("POLL_INTERVAL_SECS"), defaults.poll_interval_secs),
            window_secs: positive_or(get("REALTIME_WINDOW_SECS"), defaults.window_secs),
            default_instrument_model: get("DEFAULT_INSTRUMENT_MODEL")
                .unwrap_or(defaults.default_instrument_model),
            autostart: get("POLLER_AUTOSTART").map_or(defaults.autostart, |v| parse_bool(&v)),
        };

        Ok(Self {
            upstream,
            server,
            realtime,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An upstream URL is malformed or not HTTP(S).
    #[error("{key} must be an http or https URL, got {value:?}")]
    InvalidUrl {
        /// Environment variable name.
        key: &'static str,
        /// Supplied value.
        value: String,
    },
}

/// Environment keys for the historical URL, preferred first.
const HISTORICAL_URL_KEYS: [&str; 2] = ["API_URL_HISTORICAL", "API_URL_Historical"];

/// Environment keys for the latest URL, preferred first.
const LATEST_URL_KEYS: [&str; 2] = ["API_URL_LATEST", "API_URL_Lastest"];

fn validate_url(key: &'static str, value: String) -> Result<String, ConfigError> {
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value),
        _ => Err(ConfigError::InvalidUrl { key, value }),
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn positive_or(value: Option<String>, default: f64) -> f64 {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.upstream.timeout, Duration::from_secs(5));
        assert_eq!(config.server.http_port, 3000);
        assert_eq!(config.server.health_port, 8082);
        assert_eq!(config.realtime.default_instrument_model, "default");
        assert!(config.realtime.autostart);
    }

    #[test]
    fn reads_all_values() {
        let config = config(&[
            ("API_URL_HISTORICAL", "https://sensors.example/history"),
            ("API_URL_LATEST", "http://localhost:9000/latest"),
            ("FETCH_TIMEOUT_MS", "1500"),
            ("HTTP_PORT", "8080"),
            ("HEALTH_PORT", "9091"),
            ("POLL_INTERVAL_SECS", "2.5"),
            ("REALTIME_WINDOW_SECS", "30"),
            ("DEFAULT_INSTRUMENT_MODEL", "WS-200"),
            ("POLLER_AUTOSTART", "false"),
        ])
        .unwrap();

        assert_eq!(
            config.upstream.historical_url.as_deref(),
            Some("https://sensors.example/history")
        );
        assert_eq!(config.upstream.timeout, Duration::from_millis(1500));
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.server.health_port, 9091);
        assert!((config.realtime.poll_interval_secs - 2.5).abs() < f64::EPSILON);
        assert!((config.realtime.window_secs - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.realtime.default_instrument_model, "WS-200");
        assert!(!config.realtime.autostart);
    }

    #[test]
    fn port_falls_back_to_port_variable() {
        let config = config(&[("PORT", "4000")]).unwrap();
        assert_eq!(config.server.http_port, 4000);
    }

    #[test]
    fn invalid_numbers_use_defaults() {
        let config = config(&[
            ("POLL_INTERVAL_SECS", "-1"),
            ("REALTIME_WINDOW_SECS", "soon"),
            ("FETCH_TIMEOUT_MS", "0"),
            ("HTTP_PORT", "99999"),
        ])
        .unwrap();

        assert!((config.realtime.poll_interval_secs - 5.0).abs() < f64::EPSILON);
        assert!((config.realtime.window_secs - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.upstream.timeout, Duration::from_secs(5));
        assert_eq!(config.server.http_port, 3000);
    }

    #[test]
    fn rejects_non_http_urls() {
        let err = config(&[("API_URL_LATEST", "ftp://example.com/x")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                key: "API_URL_LATEST",
                ..
            }
        ));

        assert!(config(&[("API_URL_HISTORICAL", "not a url")]).is_err());
    }

    #[test]
    fn legacy_url_keys_are_accepted() {
        let config = config(&[
            ("API_URL_Historical", "https://sensors.example/history"),
            ("API_URL_Lastest", "https://sensors.example/latest"),
        ])
        .unwrap();

        assert_eq!(
            config.upstream.historical_url.as_deref(),
            Some("https://sensors.example/history")
        );
        assert_eq!(
            config.upstream.latest_url.as_deref(),
            Some("https://sensors.example/latest")
        );
    }

    #[test]
    fn canonical_url_key_wins_over_legacy() {
        let preferred = config(&[
            ("API_URL_LATEST", "https://new.example/latest"),
            ("API_URL_Lastest", "https://old.example/latest"),
        ])
        .unwrap();
        assert_eq!(
            preferred.upstream.latest_url.as_deref(),
            Some("https://new.example/latest")
        );

        let err = config(&[("API_URL_Lastest", "ftp://old.example")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                key: "API_URL_Lastest",
                ..
            }
        ));
    }
}
