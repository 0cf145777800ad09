//! CSV rendering of a single sheet
//!
//! Comma delimiter, quotes only where needed, embedded quotes doubled,
//! UTF-8 without BOM, every record terminated.

use crate::error::{ConvertError, Result};
use crate::options::LineEnding;
use crate::types::{cell_reference, CellIssue, Sheet};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::borrow::Cow;

/// CSV bytes for one sheet plus the cells that had to be blanked
#[derive(Debug, Clone)]
pub struct RenderedSheet {
    pub bytes: Vec<u8>,
    pub rows: usize,
    pub issues: Vec<CellIssue>,
}

/// Render `sheet` (at `sheet_index` in its workbook) as CSV
pub fn render_sheet(
    sheet: &Sheet,
    sheet_index: usize,
    line_ending: LineEnding,
) -> Result<RenderedSheet> {
    let terminator = match line_ending {
        LineEnding::Lf => Terminator::Any(b'\n'),
        LineEnding::CrLf => Terminator::CRLF,
    };

    let mut writer = WriterBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .double_quote(true)
        .quote_style(QuoteStyle::Necessary)
        .terminator(terminator)
        .flexible(true)
        .from_writer(Vec::with_capacity(sheet.height() * 16));

    let mut issues = Vec::new();
    let mut fields: Vec<Cow<'_, str>> = Vec::with_capacity(sheet.width());

    for (r, row) in sheet.rows.iter().enumerate() {
        fields.clear();
        for (c, cell) in row.iter().enumerate() {
            let field = cell.render().unwrap_or_else(|reason| {
                let issue = CellIssue {
                    sheet_index,
                    sheet: sheet.name.clone(),
                    cell: cell_reference(r, c),
                    reason,
                };
                log::warn!("{}", ConvertError::from(issue.clone()));
                issues.push(issue);
                Cow::Borrowed("")
            });
            fields.push(field);
        }
        writer.write_record(fields.iter().map(|f| f.as_bytes()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ConvertError::Io(std::io::Error::other(e.to_string())))?;

    Ok(RenderedSheet {
        bytes,
        rows: sheet.height(),
        issues,
    })
}
