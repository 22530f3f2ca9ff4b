//! Application Layer - Stores, polling and port definitions.
//!
//! This layer wires the domain normalizer to the upstream telemetry source
//! and holds the in-memory generations that queries read from.

/// Port interfaces for external systems (telemetry source, export renderer).
pub mod ports;

/// Historical store, realtime store and poller.
pub mod services;
