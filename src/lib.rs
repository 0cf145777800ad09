//! # sheetzip
//!
//! Convert spreadsheet workbooks into a ZIP archive holding one CSV file per sheet.
//!
//! ## Features
//!
//! - **Format sniffing**: XLSX, XLS, XLSB and ODS are recognized from content, not file names
//! - **Faithful grids**: rows and columns keep their positions, anchored at cell A1
//! - **RFC 4180 CSV**: quotes only where needed, LF or CRLF records, UTF-8 without BOM
//! - **Lenient cells**: a cell that cannot be rendered becomes an empty field and is reported
//! - **Deterministic output**: identical input yields a byte-identical archive
//! - **Plate layout**: optionally reshape plate-reader exports (D8:S199) into ratio grids
//! - **Parallel rendering**: enable the `parallel` feature to render sheets on rayon
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("sales.xlsx")?;
//! let archive = sheetzip::convert(&data)?;
//! std::fs::write(sheetzip::naming::archive_file_name("sales.xlsx"), archive)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Inspecting the result
//!
//! ```rust,no_run
//! use sheetzip::WorkbookConverter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("sales.xlsx")?;
//! let conversion = WorkbookConverter::new().convert_with_report(&data, Some("sales.xlsx"))?;
//!
//! for entry in &conversion.entries {
//!     println!("{} -> {} ({} rows)", entry.sheet_name, entry.entry_name, entry.rows);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Log records are emitted through the `log` facade; install any logger to see them.

pub mod archive;
pub mod converter;
pub mod csv_writer;
pub mod detect;
pub mod error;
pub mod naming;
pub mod options;
pub mod plate;
pub mod reader;
pub mod types;

pub use archive::{ArchiveReader, ArchiveWriter};
pub use converter::{convert, Conversion, EntryReport, WorkbookConverter};
pub use detect::SpreadsheetFormat;
pub use error::{ConvertError, Result};
pub use options::{CancelFlag, ConvertOptions, LineEnding};
pub use plate::PlateOrientation;
pub use types::{CellIssue, CellValue, Sheet, Workbook};
