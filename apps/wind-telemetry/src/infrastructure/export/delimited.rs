//! CSV export.
//!
//! Text fields are always quoted; the speed column is written bare so
//! spreadsheet tools import it as a number.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::{EXPORT_COLUMNS, EXPORT_TIMESTAMP_FORMAT};
use crate::application::ports::{
    ExportFormat, ExportRendererPort, ExportRequest, RenderError, RenderedExport,
};
use crate::domain::reading::Reading;

/// Renders readings as comma-separated values.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvRenderer;

impl ExportRendererPort for CsvRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn render(
        &self,
        readings: &[Reading],
        request: &ExportRequest,
    ) -> Result<RenderedExport, RenderError> {
        let bytes = write_rows(readings).map_err(|message| RenderError::Failed {
            format: ExportFormat::Csv.as_str(),
            message,
        })?;

        Ok(RenderedExport {
            content_type: "text/csv; charset=utf-8",
            file_name: request.file_name("csv"),
            bytes,
        })
    }
}

fn write_rows(readings: &[Reading]) -> Result<Vec<u8>, String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(64 + readings.len() * 64));

    writer
        .write_record(EXPORT_COLUMNS)
        .map_err(|e| e.to_string())?;

    for r in readings {
        let speed = r.speed.to_string();
        let timestamp = r.timestamp.format(EXPORT_TIMESTAMP_FORMAT).to_string();
        writer
            .write_record([
                r.instrument_model.as_str(),
                r.position.as_str(),
                speed.as_str(),
                timestamp.as_str(),
            ])
            .map_err(|e| e.to_string())?;
    }

    writer.into_inner().map_err(|e| e.to_string())
}
