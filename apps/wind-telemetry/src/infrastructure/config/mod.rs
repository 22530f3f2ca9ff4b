//! Configuration Module
//!
//! Configuration loading for the telemetry service.

mod settings;

pub use settings::{
    ConfigError, RealtimeSettings, ServerSettings, ServiceConfig, UpstreamSettings,
};
