//! Workbook to CSV archive conversion
//!
//! Parses every worksheet, renders each one as CSV and packs the results
//! into a ZIP archive, one `<sheet>.csv` entry per sheet in workbook order.

use crate::archive::ArchiveWriter;
use crate::csv_writer::{render_sheet, RenderedSheet};
use crate::detect::SpreadsheetFormat;
use crate::error::{ConvertError, Result};
use crate::naming::{sanitize_sheet_name, EntryNamer};
use crate::options::ConvertOptions;
use crate::plate::plate_layout;
use crate::reader::read_workbook;
use crate::types::{CellIssue, Sheet, Workbook};
use std::borrow::Cow;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Summary of one archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    /// Sheet name as stored in the workbook
    pub sheet_name: String,
    /// File name inside the archive
    pub entry_name: String,
    /// Number of CSV records written
    pub rows: usize,
    /// Cells written as empty fields because they could not be rendered
    pub degraded_cells: usize,
}

/// Archive bytes together with what went into them
#[derive(Debug, Clone)]
pub struct Conversion {
    pub archive: Vec<u8>,
    /// `None` when converting an in-memory [`Workbook`]
    pub format: Option<SpreadsheetFormat>,
    pub entries: Vec<EntryReport>,
    pub issues: Vec<CellIssue>,
}

impl Conversion {
    /// Entry names in archive order
    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.entry_name.as_str()).collect()
    }
}

/// Converts workbook bytes into a ZIP of CSV files
///
/// # Examples
///
/// ```no_run
/// use sheetzip::{ConvertOptions, LineEnding, WorkbookConverter};
///
/// let data = std::fs::read("sales.xlsx").unwrap();
/// let converter = WorkbookConverter::with_options(
///     ConvertOptions::new().line_ending(LineEnding::CrLf),
/// );
/// let archive = converter.convert_named(&data, "sales.xlsx").unwrap();
/// std::fs::write("sales_csv.zip", archive).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkbookConverter {
    options: ConvertOptions,
}

impl WorkbookConverter {
    /// Converter with default options
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConvertOptions) -> Self {
        WorkbookConverter { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert workbook bytes; the format is sniffed from content
    pub fn convert(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.convert_with_report(data, None).map(|c| c.archive)
    }

    /// Convert workbook bytes, passing the original file name as a format hint
    pub fn convert_named(&self, data: &[u8], file_name: &str) -> Result<Vec<u8>> {
        self.convert_with_report(data, Some(file_name))
            .map(|c| c.archive)
    }

    /// Convert and report per-entry details
    pub fn convert_with_report(&self, data: &[u8], hint: Option<&str>) -> Result<Conversion> {
        let parsed = read_workbook(data, hint, self.options.cancel.as_ref())?;

        let mut conversion = self.convert_workbook(&parsed.workbook)?;
        conversion.format = Some(parsed.format);

        for issue in &parsed.issues {
            if let Some(entry) = conversion.entries.get_mut(issue.sheet_index) {
                entry.degraded_cells += 1;
            }
        }
        let mut issues = parsed.issues;
        issues.append(&mut conversion.issues);
        conversion.issues = issues;

        Ok(conversion)
    }

    /// Convert an already parsed workbook.
    ///
    /// A workbook without sheets is rejected with [`ConvertError::EmptyWorkbook`].
    pub fn convert_workbook(&self, workbook: &Workbook) -> Result<Conversion> {
        if workbook.is_empty() {
            return Err(ConvertError::EmptyWorkbook);
        }

        let rendered = self.render_sheets(workbook)?;

        let mut namer = EntryNamer::new();
        let mut archive = ArchiveWriter::new(self.options.compression_level);
        let mut entries = Vec::with_capacity(rendered.len());
        let mut issues = Vec::new();

        for (index, (sheet, rendered)) in workbook.sheets().iter().zip(rendered).enumerate() {
            let sanitized = sanitize_sheet_name(&sheet.name, index, self.options.strip_spaces);
            let entry_name = namer.entry_name(&sanitized);

            archive.start_entry(&entry_name)?;
            archive.write_data(&rendered.bytes)?;

            log::debug!(
                "wrote '{}' ({} rows, {} bytes)",
                entry_name,
                rendered.rows,
                rendered.bytes.len()
            );

            entries.push(EntryReport {
                sheet_name: sheet.name.clone(),
                entry_name,
                rows: rendered.rows,
                degraded_cells: rendered.issues.len(),
            });
            issues.extend(rendered.issues);
        }

        let archive = archive.finish()?;
        log::info!(
            "converted {} sheet(s) into {} byte archive",
            entries.len(),
            archive.len()
        );

        Ok(Conversion {
            archive,
            format: None,
            entries,
            issues,
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn render_sheets(&self, workbook: &Workbook) -> Result<Vec<RenderedSheet>> {
        workbook
            .sheets()
            .iter()
            .enumerate()
            .map(|(index, sheet)| self.render_one(sheet, index))
            .collect()
    }

    /// Sheets render concurrently; `collect` keeps workbook order
    #[cfg(feature = "parallel")]
    fn render_sheets(&self, workbook: &Workbook) -> Result<Vec<RenderedSheet>> {
        workbook
            .sheets()
            .par_iter()
            .enumerate()
            .map(|(index, sheet)| self.render_one(sheet, index))
            .collect()
    }

    fn render_one(&self, sheet: &Sheet, index: usize) -> Result<RenderedSheet> {
        if self.options.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }

        let sheet = match self.options.plate {
            Some(orientation) => Cow::Owned(plate_layout(sheet, orientation)?),
            None => Cow::Borrowed(sheet),
        };
        render_sheet(&sheet, index, self.options.line_ending)
    }
}

/// Convert workbook bytes with default options.
///
/// ```no_run
/// let data = std::fs::read("book.xlsx").unwrap();
/// let archive = sheetzip::convert(&data).unwrap();
/// std::fs::write("book_csv.zip", archive).unwrap();
/// ```
pub fn convert(data: &[u8]) -> Result<Vec<u8>> {
    WorkbookConverter::new().convert(data)
}
