//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the HTTP servers and the ambient
//! logging, metrics and configuration plumbing.

/// Configuration loading.
pub mod config;

/// CSV and spreadsheet export renderers.
pub mod export;

/// Health check HTTP endpoint.
pub mod health;

/// Query API HTTP server.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Upstream telemetry API client.
pub mod source;

/// Logging and OpenTelemetry tracing integration.
pub mod telemetry;
