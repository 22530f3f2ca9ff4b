//! Domain Layer - Readings, normalization and aggregation.
//!
//! This layer contains the core types for wind sensor telemetry with no
//! I/O. Everything here is a pure function of its input (plus the wall
//! clock where a generation timestamp is required).

/// Canonical reading type and instant parsing.
pub mod reading;

/// Query results with an observable status.
pub mod query;

/// Raw record validation and conversion into readings.
pub mod normalization;

/// Summary statistics over a set of readings.
pub mod summary;
