//! Format detection for spreadsheet files.
//!
//! Content always decides; a filename is only a hint, used when a ZIP64
//! container cannot be listed and for debug logging.

use crate::archive::reader::has_zip64_locator;
use crate::archive::ArchiveReader;
use crate::error::{ConvertError, Result};
use std::fmt;
use std::path::Path;

/// OLE2 compound document magic bytes (legacy `.xls`)
const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// ZIP file magic bytes: PK\x03\x04
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Empty ZIP archive magic bytes: PK\x05\x06
const EMPTY_ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];

const ODS_MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

/// Largest `mimetype` entry worth reading
const MIMETYPE_LIMIT: u64 = 256;

/// Detected spreadsheet format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpreadsheetFormat {
    /// Legacy binary workbook (BIFF inside OLE2)
    Xls,
    /// Office Open XML workbook
    Xlsx,
    /// Office Open XML binary workbook
    Xlsb,
    /// OpenDocument spreadsheet
    Ods,
}

impl SpreadsheetFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            SpreadsheetFormat::Xls => "xls",
            SpreadsheetFormat::Xlsx => "xlsx",
            SpreadsheetFormat::Xlsb => "xlsb",
            SpreadsheetFormat::Ods => "ods",
        }
    }

    /// Returns a human-readable name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            SpreadsheetFormat::Xls => "Excel 97-2003 Workbook",
            SpreadsheetFormat::Xlsx => "Excel Workbook",
            SpreadsheetFormat::Xlsb => "Excel Binary Workbook",
            SpreadsheetFormat::Ods => "OpenDocument Spreadsheet",
        }
    }

    /// Guess a format from a file name's extension
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xls" | "xla" => Some(SpreadsheetFormat::Xls),
            "xlsx" | "xlsm" | "xltx" | "xltm" | "xlam" => Some(SpreadsheetFormat::Xlsx),
            "xlsb" => Some(SpreadsheetFormat::Xlsb),
            "ods" => Some(SpreadsheetFormat::Ods),
            _ => None,
        }
    }
}

impl fmt::Display for SpreadsheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the spreadsheet format of `data`.
///
/// # Example
///
/// ```no_run
/// use sheetzip::detect::{detect_format, SpreadsheetFormat};
///
/// let data = std::fs::read("report.xlsx")?;
/// let format = detect_format(&data, Some("report.xlsx"))?;
/// assert_eq!(format, SpreadsheetFormat::Xlsx);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn detect_format(data: &[u8], hint: Option<&str>) -> Result<SpreadsheetFormat> {
    let hinted = hint.and_then(SpreadsheetFormat::from_file_name);

    let detected = if data.starts_with(&OLE_MAGIC) {
        SpreadsheetFormat::Xls
    } else if data.starts_with(&ZIP_MAGIC) {
        detect_zip_format(data, hinted)?
    } else if data.starts_with(&EMPTY_ZIP_MAGIC) {
        return Err(ConvertError::UnsupportedFormat(
            "empty ZIP archive".to_string(),
        ));
    } else if data.is_empty() {
        return Err(ConvertError::UnsupportedFormat("empty input".to_string()));
    } else {
        return Err(ConvertError::UnsupportedFormat(
            "not a spreadsheet file (no OLE2 or ZIP signature)".to_string(),
        ));
    };

    if let Some(hinted) = hinted {
        if hinted != detected {
            log::debug!(
                "file name suggests {} but content is {}; using content",
                hinted,
                detected
            );
        }
    }

    Ok(detected)
}

/// Classify a ZIP container by its entry names
fn detect_zip_format(
    data: &[u8],
    hinted: Option<SpreadsheetFormat>,
) -> Result<SpreadsheetFormat> {
    let mut archive = match ArchiveReader::new(data) {
        Ok(archive) => archive,
        Err(_) if has_zip64_locator(data) => {
            let guess = hinted
                .filter(|f| *f != SpreadsheetFormat::Xls)
                .unwrap_or(SpreadsheetFormat::Xlsx);
            log::debug!("ZIP64 container, assuming {}", guess);
            return Ok(guess);
        }
        Err(e) => {
            return Err(ConvertError::CorruptWorkbook(format!(
                "damaged ZIP container: {}",
                e
            )))
        }
    };

    let has = |name: &str| archive.entries().iter().any(|e| e.name == name);

    if has("xl/workbook.xml") {
        return Ok(SpreadsheetFormat::Xlsx);
    }
    if has("xl/workbook.bin") {
        return Ok(SpreadsheetFormat::Xlsb);
    }
    if has("content.xml") && has("mimetype") {
        let entry = archive
            .find_entry("mimetype")
            .filter(|e| e.uncompressed_size <= MIMETYPE_LIMIT)
            .cloned();
        if let Some(entry) = entry {
            let mimetype = archive
                .read_entry_with_limit(&entry, MIMETYPE_LIMIT)
                .map_err(|e| ConvertError::CorruptWorkbook(e.to_string()))?;
            if String::from_utf8_lossy(&mimetype).trim() == ODS_MIMETYPE {
                return Ok(SpreadsheetFormat::Ods);
            }
        }
    }

    Err(ConvertError::UnsupportedFormat(
        "ZIP archive does not contain a workbook".to_string(),
    ))
}
