//! Port Interfaces
//!
//! Contracts that infrastructure adapters implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `TelemetrySourcePort`: Fetches raw records from the upstream API
//! - `ExportRendererPort`: Renders readings into a downloadable file

mod export_port;
mod telemetry_source_port;

pub use export_port::{ExportFormat, ExportRendererPort, ExportRequest, RenderError, RenderedExport};
#[cfg(test)]
pub use telemetry_source_port::MockTelemetrySourcePort;
pub use telemetry_source_port::{FetchError, FetchMode, TelemetrySourcePort};
