//! Workbook reading through calamine
//!
//! Parses an in-memory workbook into [`Workbook`], mapping calamine's cell
//! data onto [`CellValue`] at the boundary. Cells that cannot be mapped are
//! kept as empty cells and reported as [`CellIssue`]s.

use crate::detect::{detect_format, SpreadsheetFormat};
use crate::error::{ConvertError, Result};
use crate::options::CancelFlag;
use crate::types::{cell_reference, CellIssue, CellValue, Sheet, Workbook};
use calamine::{Data, ExcelDateTime, Ods, Range, Reader, SheetType, Sheets, Xls, Xlsb, Xlsx};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::any::Any;
use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const LAST_MILLI_OF_DAY: u32 = 86_399_999;

/// Result of parsing one input file
#[derive(Debug, Clone)]
pub struct ParsedWorkbook {
    pub workbook: Workbook,
    pub format: SpreadsheetFormat,
    /// Cells replaced by empty values while parsing
    pub issues: Vec<CellIssue>,
}

/// Workbook reader over a byte slice
pub struct WorkbookReader<'a> {
    sheets: Sheets<Cursor<&'a [u8]>>,
    format: SpreadsheetFormat,
}

impl<'a> WorkbookReader<'a> {
    /// Detect the format of `data` and open it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sheetzip::reader::WorkbookReader;
    ///
    /// let data = std::fs::read("data.xlsx").unwrap();
    /// let reader = WorkbookReader::open(&data, Some("data.xlsx")).unwrap();
    /// println!("Worksheets: {:?}", reader.sheet_names());
    /// ```
    pub fn open(data: &'a [u8], hint: Option<&str>) -> Result<Self> {
        let format = detect_format(data, hint)?;
        let sheets = guard("opening the workbook", || open_sheets(data, format))?;

        log::debug!("opened {} ({} bytes)", format, data.len());
        Ok(WorkbookReader { sheets, format })
    }

    /// Detected container format
    pub fn format(&self) -> SpreadsheetFormat {
        self.format
    }

    /// Names of worksheets in workbook order.
    ///
    /// Chart, dialog and macro sheets hold no cell grid and are not listed.
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets
            .sheets_metadata()
            .iter()
            .filter(|s| matches!(s.typ, SheetType::WorkSheet))
            .map(|s| s.name.clone())
            .collect()
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.sheet_names().len()
    }

    /// Read one worksheet into a grid anchored at A1.
    ///
    /// `sheet_index` is only used to label reported issues.
    pub fn read_sheet(
        &mut self,
        name: &str,
        sheet_index: usize,
        issues: &mut Vec<CellIssue>,
    ) -> Result<Sheet> {
        let range = guard("reading cell values", || {
            self.sheets.worksheet_range(name).map_err(ConvertError::from)
        })?;

        Ok(sheet_from_range(name, sheet_index, &range, issues))
    }

    /// Read every worksheet, checking `cancel` before each one
    pub fn read_all(mut self, cancel: Option<&CancelFlag>) -> Result<ParsedWorkbook> {
        for skipped in self
            .sheets
            .sheets_metadata()
            .iter()
            .filter(|s| !matches!(s.typ, SheetType::WorkSheet))
        {
            log::info!("skipping non-worksheet '{}' ({:?})", skipped.name, skipped.typ);
        }

        let names = self.sheet_names();
        if names.is_empty() {
            return Err(ConvertError::EmptyWorkbook);
        }

        let mut workbook = Workbook::new();
        let mut issues = Vec::new();

        for (index, name) in names.iter().enumerate() {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                return Err(ConvertError::Cancelled);
            }

            let sheet = self.read_sheet(name, index, &mut issues)?;
            log::debug!(
                "read sheet '{}': {} rows x {} columns",
                name,
                sheet.height(),
                sheet.width()
            );
            workbook.add_sheet(sheet);
        }

        Ok(ParsedWorkbook {
            workbook,
            format: self.format,
            issues,
        })
    }
}

/// Parse `data` into a workbook
pub fn read_workbook(
    data: &[u8],
    hint: Option<&str>,
    cancel: Option<&CancelFlag>,
) -> Result<ParsedWorkbook> {
    WorkbookReader::open(data, hint)?.read_all(cancel)
}

fn open_sheets(data: &[u8], format: SpreadsheetFormat) -> Result<Sheets<Cursor<&[u8]>>> {
    let cursor = Cursor::new(data);
    let sheets = match format {
        SpreadsheetFormat::Xls => Sheets::Xls(Xls::new(cursor)?),
        SpreadsheetFormat::Xlsx => Sheets::Xlsx(Xlsx::new(cursor)?),
        SpreadsheetFormat::Xlsb => Sheets::Xlsb(Xlsb::new(cursor)?),
        SpreadsheetFormat::Ods => Sheets::Ods(Ods::new(cursor)?),
    };
    Ok(sheets)
}

/// Run a parser call, turning a panic inside calamine into `CorruptWorkbook`
fn guard<T>(context: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(ConvertError::CorruptWorkbook(format!(
            "parser panicked while {}: {}",
            context,
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn sheet_from_range(
    name: &str,
    sheet_index: usize,
    range: &Range<Data>,
    issues: &mut Vec<CellIssue>,
) -> Sheet {
    let mut sheet = Sheet::new(name);
    let Some((first_row, first_col)) = range.start() else {
        return sheet;
    };
    let (first_row, first_col) = (first_row as usize, first_col as usize);
    let width = first_col + range.width();

    for _ in 0..first_row {
        sheet.push_row(vec![CellValue::Empty; width]);
    }

    for (r, row) in range.rows().enumerate() {
        let mut cells = Vec::with_capacity(width);
        cells.resize(first_col, CellValue::Empty);

        for (c, data) in row.iter().enumerate() {
            let value = datatype_to_cellvalue(data).unwrap_or_else(|reason| {
                let issue = CellIssue {
                    sheet_index,
                    sheet: name.to_string(),
                    cell: cell_reference(first_row + r, first_col + c),
                    reason,
                };
                log::warn!("{}", ConvertError::from(issue.clone()));
                issues.push(issue);
                CellValue::Empty
            });
            cells.push(value);
        }

        sheet.push_row(cells);
    }

    sheet.trim_trailing_empty();
    sheet
}

/// Convert calamine Data to our CellValue
fn datatype_to_cellvalue(dt: &Data) -> std::result::Result<CellValue, String> {
    let value = match dt {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(d) => return excel_datetime_to_cellvalue(d),
        Data::DateTimeIso(s) => {
            parse_iso_datetime(s).map_or_else(|| CellValue::Text(s.clone()), CellValue::DateTime)
        }
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    };
    Ok(value)
}

fn excel_datetime_to_cellvalue(dt: &ExcelDateTime) -> std::result::Result<CellValue, String> {
    let serial = dt.as_f64();
    if !serial.is_finite() || (serial * MILLIS_PER_DAY).abs() >= i64::MAX as f64 {
        return Err(format!("date serial {} out of range", serial));
    }

    if dt.is_duration() {
        return dt
            .as_duration()
            .map(|d| CellValue::Text(format_duration(d)))
            .ok_or_else(|| format!("duration {} out of range", serial));
    }

    if (0.0..1.0).contains(&serial) {
        // rounding must not spill over into the next day
        let millis = ((serial * MILLIS_PER_DAY).round() as u32).min(LAST_MILLI_OF_DAY);
        return NaiveTime::from_num_seconds_from_midnight_opt(
            millis / 1000,
            (millis % 1000) * 1_000_000,
        )
        .map(CellValue::Time)
        .ok_or_else(|| format!("time value {} out of range", serial));
    }

    dt.as_datetime()
        .map(CellValue::DateTime)
        .ok_or_else(|| format!("date serial {} out of range", serial))
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// `[h]:mm:ss`, hours unbounded
fn format_duration(d: chrono::Duration) -> String {
    let total = d.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    #[test]
    fn test_datatype_conversion() {
        let cv = datatype_to_cellvalue(&Data::String("test".to_string())).unwrap();
        assert_eq!(cv, CellValue::Text("test".to_string()));

        let cv = datatype_to_cellvalue(&Data::Int(42)).unwrap();
        assert_eq!(cv, CellValue::Number(42.0));

        let cv = datatype_to_cellvalue(&Data::Bool(false)).unwrap();
        assert_eq!(cv, CellValue::Boolean(false));

        let cv = datatype_to_cellvalue(&Data::Error(CellErrorType::Div0)).unwrap();
        assert_eq!(cv, CellValue::Text("#DIV/0!".to_string()));
    }

    #[test]
    fn test_iso_datetime_strings() {
        let cv = datatype_to_cellvalue(&Data::DateTimeIso("2024-01-15T10:30:00".into())).unwrap();
        assert_eq!(cv.render().unwrap(), "2024-01-15 10:30:00");

        let cv = datatype_to_cellvalue(&Data::DateTimeIso("2024-01-15".into())).unwrap();
        assert_eq!(cv.render().unwrap(), "2024-01-15 00:00:00");

        let cv = datatype_to_cellvalue(&Data::DateTimeIso("someday".into())).unwrap();
        assert_eq!(cv, CellValue::Text("someday".into()));

        let cv = datatype_to_cellvalue(&Data::DurationIso("PT1H".into())).unwrap();
        assert_eq!(cv, CellValue::Text("PT1H".into()));
    }

    #[test]
    fn test_excel_times_stay_time_only() {
        use calamine::ExcelDateTimeType;

        let noon = ExcelDateTime::new(0.5, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            excel_datetime_to_cellvalue(&noon).unwrap(),
            CellValue::Time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
        );

        let almost_midnight = ExcelDateTime::new(0.9999999999, ExcelDateTimeType::DateTime, false);
        let cv = excel_datetime_to_cellvalue(&almost_midnight).unwrap();
        assert_eq!(cv.render().unwrap(), "23:59:59.999000");
    }

    #[test]
    fn test_excel_dates_and_durations() {
        use calamine::ExcelDateTimeType;

        let day = ExcelDateTime::new(45306.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            excel_datetime_to_cellvalue(&day).unwrap().render().unwrap(),
            "2024-01-15 00:00:00"
        );

        let span = ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false);
        assert_eq!(
            excel_datetime_to_cellvalue(&span).unwrap(),
            CellValue::Text("36:00:00".into())
        );

        let huge = ExcelDateTime::new(1.0e12, ExcelDateTimeType::DateTime, false);
        assert!(excel_datetime_to_cellvalue(&huge).is_err());

        let huge_span = ExcelDateTime::new(-1.0e20, ExcelDateTimeType::TimeDelta, false);
        assert!(excel_datetime_to_cellvalue(&huge_span).is_err());
    }

    #[test]
    fn test_iso_date_before_1900_keeps_its_date() {
        let cv = datatype_to_cellvalue(&Data::DateTimeIso("1899-12-31".into())).unwrap();
        assert_eq!(cv.render().unwrap(), "1899-12-31 00:00:00");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(5400)), "1:30:00");
        assert_eq!(format_duration(chrono::Duration::seconds(90000)), "25:00:00");
        assert_eq!(format_duration(chrono::Duration::seconds(-61)), "-0:01:01");
    }

    #[test]
    fn test_grid_is_anchored_at_a1() {
        let mut range = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), Data::String("x".into()));
        range.set_value((2, 2), Data::Float(2.5));

        let mut issues = Vec::new();
        let sheet = sheet_from_range("S", 0, &range, &mut issues);

        assert!(issues.is_empty());
        assert_eq!(sheet.height(), 3);
        assert_eq!(sheet.width(), 3);
        assert_eq!(sheet.rows[0], vec![CellValue::Empty; 3]);
        assert_eq!(sheet.rows[1][1], CellValue::Text("x".into()));
        assert_eq!(sheet.rows[2][2], CellValue::Number(2.5));
    }

    #[test]
    fn test_empty_range_gives_empty_sheet() {
        let range: Range<Data> = Range::empty();
        let mut issues = Vec::new();
        let sheet = sheet_from_range("Blank", 0, &range, &mut issues);
        assert_eq!(sheet.height(), 0);
        assert_eq!(sheet.name, "Blank");
    }

    #[test]
    fn test_panic_is_reported_as_corrupt() {
        let result: Result<()> = guard("testing", || panic!("boom"));
        match result {
            Err(ConvertError::CorruptWorkbook(msg)) => {
                assert!(msg.contains("testing"));
                assert!(msg.contains("boom"));
            }
            other => panic!("expected CorruptWorkbook, got {:?}", other),
        }
    }

    #[test]
    fn test_open_rejects_garbage_ole() {
        let mut data = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        data.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            WorkbookReader::open(&data, Some("broken.xls")),
            Err(ConvertError::CorruptWorkbook(_))
        ));
    }
}
