//! Export Renderers
//!
//! Adapters for the export renderer port, one per [`ExportFormat`].

mod delimited;
mod spreadsheet;

use std::sync::Arc;

pub use delimited::CsvRenderer;
pub use spreadsheet::SpreadsheetRenderer;

use crate::application::ports::{ExportFormat, ExportRendererPort};

/// Timestamp layout used in exported rows.
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column headers shared by every export format.
pub const EXPORT_COLUMNS: [&str; 4] = ["Instrument", "Position", "Wind Speed (km/h)", "Timestamp"];

/// Renderer lookup by format.
#[derive(Clone)]
pub struct ExportRenderers {
    csv: Arc<dyn ExportRendererPort>,
    spreadsheet: Arc<dyn ExportRendererPort>,
}

impl std::fmt::Debug for ExportRenderers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportRenderers").finish_non_exhaustive()
    }
}

impl Default for ExportRenderers {
    fn default() -> Self {
        Self::new(Arc::new(CsvRenderer), Arc::new(SpreadsheetRenderer))
    }
}

impl ExportRenderers {
    /// Create a registry from explicit renderers.
    #[must_use]
    pub fn new(csv: Arc<dyn ExportRendererPort>, spreadsheet: Arc<dyn ExportRendererPort>) -> Self {
        Self { csv, spreadsheet }
    }

    /// Renderer for `format`.
    #[must_use]
    pub fn get(&self, format: ExportFormat) -> &dyn ExportRendererPort {
        match format {
            ExportFormat::Csv => self.csv.as_ref(),
            ExportFormat::Spreadsheet => self.spreadsheet.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_matches_format() {
        let renderers = ExportRenderers::default();
        assert_eq!(renderers.get(ExportFormat::Csv).format(), ExportFormat::Csv);
        assert_eq!(
            renderers.get(ExportFormat::Spreadsheet).format(),
            ExportFormat::Spreadsheet
        );
    }
}
