//! Type definitions for workbook data

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use std::borrow::Cow;
use std::fmt;

/// Integral numbers below this magnitude are written without a fraction
const INTEGRAL_RENDER_LIMIT: f64 = 1e15;

/// Represents a single cell value in a worksheet
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell
    Empty,
    /// Text value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Date and time value
    DateTime(NaiveDateTime),
    /// Time of day without a date part
    Time(NaiveTime),
}

impl CellValue {
    /// Render the cell as a CSV field.
    ///
    /// Fails only for values with no textual form (NaN, infinities).
    pub fn render(&self) -> Result<Cow<'_, str>, String> {
        match self {
            CellValue::Empty => Ok(Cow::Borrowed("")),
            CellValue::Text(s) => Ok(Cow::Borrowed(s.as_str())),
            CellValue::Number(n) => render_number(*n).map(Cow::Owned),
            CellValue::Boolean(true) => Ok(Cow::Borrowed("True")),
            CellValue::Boolean(false) => Ok(Cow::Borrowed("False")),
            CellValue::DateTime(dt) => Ok(Cow::Owned(render_datetime(dt))),
            CellValue::Time(t) => Ok(Cow::Owned(render_time(t))),
        }
    }

    /// Check if cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

fn render_number(n: f64) -> Result<String, String> {
    if !n.is_finite() {
        return Err(format!("non-finite number {}", n));
    }

    if n.fract() == 0.0 && n.abs() < INTEGRAL_RENDER_LIMIT {
        let mut buffer = itoa::Buffer::new();
        return Ok(buffer.format(n as i64).to_string());
    }

    Ok(n.to_string())
}

fn render_datetime(dt: &NaiveDateTime) -> String {
    let pattern = if dt.nanosecond() == 0 {
        "%Y-%m-%d %H:%M:%S"
    } else {
        "%Y-%m-%d %H:%M:%S%.6f"
    };
    dt.format(pattern).to_string()
}

fn render_time(t: &NaiveTime) -> String {
    let pattern = if t.nanosecond() == 0 {
        "%H:%M:%S"
    } else {
        "%H:%M:%S%.6f"
    };
    t.format(pattern).to_string()
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(text) => f.write_str(&text),
            Err(_) => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Number(i as f64)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Number(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl From<NaiveTime> for CellValue {
    fn from(t: NaiveTime) -> Self {
        CellValue::Time(t)
    }
}

/// Get Excel-style cell reference (e.g., "A1", "B2") for 0-based indices
pub fn cell_reference(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letter(col), row + 1)
}

/// Convert column index to Excel letter (0 -> A, 25 -> Z, 26 -> AA)
fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut col = col + 1;

    while col > 0 {
        col -= 1;
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        col /= 26;
    }

    result
}

/// A cell that could not be represented and was written as an empty field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellIssue {
    /// Position of the sheet in the workbook
    pub sheet_index: usize,
    pub sheet: String,
    /// A1-style reference
    pub cell: String,
    pub reason: String,
}

impl From<CellIssue> for crate::error::ConvertError {
    fn from(issue: CellIssue) -> Self {
        crate::error::ConvertError::Encoding {
            sheet: issue.sheet,
            cell: issue.cell,
            reason: issue.reason,
        }
    }
}

/// One named worksheet holding a grid of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    /// Sheet name as stored in the workbook
    pub name: String,
    /// Rows in source order
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    /// Create an empty sheet
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Build a sheet from anything convertible into rows of cells
    pub fn from_rows<R, C>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<CellValue>,
    {
        let mut sheet = Sheet::new(name);
        for row in rows {
            sheet.push_row(row.into_iter().map(Into::into).collect());
        }
        sheet
    }

    /// Append a row
    pub fn push_row(&mut self, cells: Vec<CellValue>) {
        self.rows.push(cells);
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Drop trailing all-empty rows and trailing empty cells of each row,
    /// then pad every row to the remaining width.
    pub fn trim_trailing_empty(&mut self) {
        for row in &mut self.rows {
            let used = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
            row.truncate(used);
        }

        let used_rows = self
            .rows
            .iter()
            .rposition(|r| !r.is_empty())
            .map_or(0, |i| i + 1);
        self.rows.truncate(used_rows);

        let width = self.width();
        for row in &mut self.rows {
            row.resize(width, CellValue::Empty);
        }
    }
}

/// An ordered collection of sheets parsed from one input file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Create a workbook with no sheets
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet, keeping workbook order
    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    /// Sheets in workbook order
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// Names of all sheets in workbook order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of sheets
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// Check if the workbook has no sheets
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

impl FromIterator<Sheet> for Workbook {
    fn from_iter<I: IntoIterator<Item = Sheet>>(iter: I) -> Self {
        Workbook {
            sheets: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_cell_reference() {
        assert_eq!(cell_reference(0, 0), "A1");
        assert_eq!(cell_reference(0, 25), "Z1");
        assert_eq!(cell_reference(9, 26), "AA10");
    }

    #[test]
    fn test_render_numbers() {
        assert_eq!(CellValue::Number(10.0).render().unwrap(), "10");
        assert_eq!(CellValue::Number(-3.0).render().unwrap(), "-3");
        assert_eq!(CellValue::Number(1234.56).render().unwrap(), "1234.56");
        assert_eq!(CellValue::Number(0.1).render().unwrap(), "0.1");
        assert_eq!(CellValue::from(42i64).render().unwrap(), "42");
        assert!(CellValue::Number(f64::NAN).render().is_err());
        assert!(CellValue::Number(f64::INFINITY).render().is_err());
    }

    #[test]
    fn test_render_text_bool_empty() {
        assert_eq!(CellValue::from("a,\"b\",c").render().unwrap(), "a,\"b\",c");
        assert_eq!(CellValue::Boolean(true).render().unwrap(), "True");
        assert_eq!(CellValue::Boolean(false).render().unwrap(), "False");
        assert_eq!(CellValue::Empty.render().unwrap(), "");
    }

    #[test]
    fn test_render_datetimes() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let midnight = date.and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(
            CellValue::DateTime(midnight).render().unwrap(),
            "2024-01-15 00:00:00"
        );

        let with_millis = date.and_hms_milli_opt(10, 30, 5, 250).unwrap();
        assert_eq!(
            CellValue::DateTime(with_millis).render().unwrap(),
            "2024-01-15 10:30:05.250000"
        );

        let early = NaiveDate::from_ymd_opt(1899, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            CellValue::DateTime(early).render().unwrap(),
            "1899-12-31 00:00:00"
        );
    }

    #[test]
    fn test_render_times() {
        let t = NaiveTime::from_hms_opt(12, 30, 0).unwrap();
        assert_eq!(CellValue::from(t).render().unwrap(), "12:30:00");

        let t = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap();
        assert_eq!(CellValue::Time(t).render().unwrap(), "23:59:59.999000");
    }

    #[test]
    fn test_trim_trailing_empty() {
        let mut sheet = Sheet::new("S");
        sheet.push_row(vec!["a".into(), CellValue::Empty, CellValue::Empty]);
        sheet.push_row(vec![CellValue::Empty, "b".into(), CellValue::Empty]);
        sheet.push_row(vec![CellValue::Empty, CellValue::Empty, CellValue::Empty]);

        sheet.trim_trailing_empty();

        assert_eq!(sheet.height(), 2);
        assert_eq!(sheet.width(), 2);
        assert_eq!(sheet.rows[0], vec!["a".into(), CellValue::Empty]);
    }

    #[test]
    fn test_trim_keeps_leading_empties() {
        let mut sheet = Sheet::new("S");
        sheet.push_row(vec![CellValue::Empty, CellValue::Empty]);
        sheet.push_row(vec![CellValue::Empty, "x".into()]);

        sheet.trim_trailing_empty();

        assert_eq!(sheet.height(), 2);
        assert_eq!(sheet.rows[0], vec![CellValue::Empty, CellValue::Empty]);
    }

    #[test]
    fn test_workbook_order() {
        let workbook: Workbook = vec![Sheet::new("B"), Sheet::new("A")]
            .into_iter()
            .collect();
        assert_eq!(workbook.sheet_names(), vec!["B", "A"]);
        assert_eq!(workbook.len(), 2);
        assert!(Workbook::new().is_empty());
    }
}
