//! Export Renderer Port (Driven Port)
//!
//! Interface for rendering readings into a downloadable file.

use chrono::{DateTime, Utc};

use crate::domain::reading::Reading;

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Comma-separated values.
    Csv,
    /// Spreadsheet workbook (the default).
    #[default]
    Spreadsheet,
}

impl ExportFormat {
    /// Parse a requested format. Only `csv` selects CSV.
    #[must_use]
    pub fn parse(requested: Option<&str>) -> Self {
        match requested.map(|f| f.trim().to_lowercase()) {
            Some(f) if f == "csv" => Self::Csv,
            _ => Self::Spreadsheet,
        }
    }

    /// Get the format name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Spreadsheet => "excel",
        }
    }
}

/// Range the export was requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Lower bound as supplied by the caller.
    pub from: String,
    /// Upper bound as supplied by the caller.
    pub to: String,
    /// Instant the export was generated.
    pub generated_at: DateTime<Utc>,
}

impl ExportRequest {
    /// Create a request generated now.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            generated_at: Utc::now(),
        }
    }

    /// Attachment file name for the given extension.
    ///
    /// `:` and `T` in the bounds become `-`; anything outside
    /// `[A-Za-z0-9._-]` is dropped so the name is safe both on disk and
    /// inside a quoted `Content-Disposition` parameter.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!(
            "readings_{}_to_{}.{extension}",
            file_safe(&self.from),
            file_safe(&self.to)
        )
    }
}

fn file_safe(bound: &str) -> String {
    bound
        .chars()
        .filter_map(|c| match c {
            ':' | 'T' => Some('-'),
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            _ => None,
        })
        .collect()
}

/// A rendered export ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedExport {
    /// MIME type of `bytes`.
    pub content_type: &'static str,
    /// Suggested attachment file name.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Rendering failure.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The document could not be written.
    #[error("failed to render {format} export: {message}")]
    Failed {
        /// Requested format name.
        format: &'static str,
        /// Error details.
        message: String,
    },
}

/// Render capability for exports.
pub trait ExportRendererPort: Send + Sync {
    /// Format this renderer produces.
    fn format(&self) -> ExportFormat;

    /// Render `readings` for `request`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the document cannot be produced.
    fn render(
        &self,
        readings: &[Reading],
        request: &ExportRequest,
    ) -> Result<RenderedExport, RenderError>;
}
