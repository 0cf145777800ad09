//! Error types for workbook conversion

use thiserror::Error;

/// Result type alias for sheetzip operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Main error type for all conversion operations
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Input bytes are not a recognizable spreadsheet container
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Recognized container whose internal structure cannot be read
    #[error("Corrupt workbook: {0}")]
    CorruptWorkbook(String),

    /// Workbook holds no worksheets
    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,

    /// A single cell could not be rendered as text.
    ///
    /// Never returned from a conversion; the cell is written as an empty
    /// field and the issue is reported alongside the archive.
    #[error("Cannot render cell {cell} in sheet '{sheet}': {reason}")]
    Encoding {
        sheet: String,
        cell: String,
        reason: String,
    },

    /// Sheet does not fit the plate-reader layout
    #[error("Plate layout failed for sheet '{sheet}': {reason}")]
    PlateLayout { sheet: String, reason: String },

    /// The caller raised the cancel flag
    #[error("Conversion cancelled")]
    Cancelled,

    /// ZIP container could not be written or read
    #[error("Archive error: {0}")]
    Archive(String),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// True for failures caused by the input bytes themselves
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ConvertError::UnsupportedFormat(_)
                | ConvertError::CorruptWorkbook(_)
                | ConvertError::EmptyWorkbook
                | ConvertError::PlateLayout { .. }
        )
    }
}

impl From<calamine::Error> for ConvertError {
    fn from(err: calamine::Error) -> Self {
        ConvertError::CorruptWorkbook(err.to_string())
    }
}

impl From<calamine::XlsxError> for ConvertError {
    fn from(err: calamine::XlsxError) -> Self {
        ConvertError::CorruptWorkbook(err.to_string())
    }
}

impl From<calamine::XlsError> for ConvertError {
    fn from(err: calamine::XlsError) -> Self {
        ConvertError::CorruptWorkbook(err.to_string())
    }
}

impl From<calamine::XlsbError> for ConvertError {
    fn from(err: calamine::XlsbError) -> Self {
        ConvertError::CorruptWorkbook(err.to_string())
    }
}

impl From<calamine::OdsError> for ConvertError {
    fn from(err: calamine::OdsError) -> Self {
        ConvertError::CorruptWorkbook(err.to_string())
    }
}
