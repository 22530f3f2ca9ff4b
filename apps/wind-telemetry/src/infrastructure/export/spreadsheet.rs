//! Spreadsheet export.
//!
//! Writes an Office Open XML (`.xlsx`) workbook with a single worksheet: a
//! styled header row, one bordered row per reading, then a footer block
//! describing the export.

use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatPattern, Workbook, Worksheet, XlsxError,
};

use super::{EXPORT_COLUMNS, EXPORT_TIMESTAMP_FORMAT};
use crate::application::ports::{
    ExportFormat, ExportRendererPort, ExportRequest, RenderError, RenderedExport,
};
use crate::domain::reading::{Reading, parse_instant};

const WORKSHEET_NAME: &str = "Wind Readings";

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const COLUMN_WIDTHS: [f64; 4] = [20.0, 20.0, 25.0, 25.0];

const HEADER_FILL: u32 = 0x0044_72C4;

/// Renders readings as a spreadsheet workbook.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpreadsheetRenderer;

impl ExportRendererPort for SpreadsheetRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Spreadsheet
    }

    fn render(
        &self,
        readings: &[Reading],
        request: &ExportRequest,
    ) -> Result<RenderedExport, RenderError> {
        let bytes = write_workbook(readings, request).map_err(|e| RenderError::Failed {
            format: ExportFormat::Spreadsheet.as_str(),
            message: e.to_string(),
        })?;

        Ok(RenderedExport {
            content_type: XLSX_CONTENT_TYPE,
            file_name: request.file_name("xlsx"),
            bytes,
        })
    }
}

fn write_workbook(readings: &[Reading], request: &ExportRequest) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(WORKSHEET_NAME)?;

    write_sheet(worksheet, readings, request)?;

    workbook.save_to_buffer()
}

fn write_sheet(
    worksheet: &mut Worksheet,
    readings: &[Reading],
    request: &ExportRequest,
) -> Result<(), XlsxError> {
    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_pattern(FormatPattern::Solid)
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);
    let cell = Format::new()
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);
    let label = Format::new().set_bold();

    for (col, (title, width)) in (0u16..).zip(EXPORT_COLUMNS.iter().zip(COLUMN_WIDTHS)) {
        worksheet.set_column_width(col, width)?;
        worksheet.write_string_with_format(0, col, *title, &header)?;
    }

    let mut row: u32 = 1;
    for r in readings {
        worksheet.write_string_with_format(row, 0, r.instrument_model.as_str(), &cell)?;
        worksheet.write_string_with_format(row, 1, r.position.as_str(), &cell)?;
        worksheet.write_number_with_format(row, 2, r.speed, &cell)?;
        worksheet.write_string_with_format(
            row,
            3,
            r.timestamp.format(EXPORT_TIMESTAMP_FORMAT).to_string(),
            &cell,
        )?;
        row += 1;
    }

    // One blank row between the data and the footer.
    row += 1;
    worksheet.write_string_with_format(row, 0, "Range:", &label)?;
    worksheet.write_string(
        row,
        1,
        format!("{} - {}", display_bound(&request.from), display_bound(&request.to)),
    )?;

    worksheet.write_string_with_format(row + 1, 0, "Total records:", &label)?;
    worksheet.write_number(row + 1, 1, u32::try_from(readings.len()).unwrap_or(u32::MAX))?;

    worksheet.write_string_with_format(row + 2, 0, "Generated at:", &label)?;
    worksheet.write_string(
        row + 2,
        1,
        request.generated_at.format(EXPORT_TIMESTAMP_FORMAT).to_string(),
    )?;

    Ok(())
}

/// Bounds that parse are shown in the export layout, others verbatim.
fn display_bound(bound: &str) -> String {
    parse_instant(bound).map_or_else(
        || bound.to_string(),
        |at| at.format(EXPORT_TIMESTAMP_FORMAT).to_string(),
    )
}
