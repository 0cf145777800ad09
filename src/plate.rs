//! Plate-reader ratio layout
//!
//! Plate-reader exports keep 96 paired readings for 16 channels in the block
//! D8:S199: each reading row is followed by its reference row. The layout
//! divides every pair, transposes the result so channels become rows `A`-`P`,
//! and cuts the 96 pairs into six 16-column blocks stacked top to bottom
//! with five blank rows between them. Inside a block the columns are
//! interleaved as 0, 8, 1, 9, ... 7, 15.

use crate::error::{ConvertError, Result};
use crate::types::{CellValue, Sheet};

/// Zero-based row of the first reading (row 8)
const FIRST_ROW: usize = 7;
/// Zero-based column of the first channel (column D)
const FIRST_COL: usize = 3;
const CHANNELS: usize = 16;
const PAIRS: usize = 96;
const BLOCK_WIDTH: usize = 16;
const BLOCKS: usize = PAIRS / BLOCK_WIDTH;
const GAP_ROWS: usize = 5;

/// Column order inside each block
const WITHIN_ORDER: [usize; BLOCK_WIDTH] = [0, 8, 1, 9, 2, 10, 3, 11, 4, 12, 5, 13, 6, 14, 7, 15];

/// Rows of a laid-out plate sheet
pub const PLATE_ROWS: usize = BLOCKS * CHANNELS + (BLOCKS - 1) * GAP_ROWS;

/// How the ratio table is arranged into blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlateOrientation {
    /// Channels as rows, pairs split into column blocks
    #[default]
    Columns,
    /// Pairs as rows; accepted as a setting but not supported yet
    Rows,
}

impl PlateOrientation {
    /// Parse `columns` / `rows` (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "columns" | "cols" => Some(PlateOrientation::Columns),
            "rows" => Some(PlateOrientation::Rows),
            _ => None,
        }
    }
}

/// Lay out `sheet` as a 121 x 16 plate grid.
///
/// A ratio whose operands are not both numbers, or whose quotient is not
/// finite, is left empty.
pub fn plate_layout(sheet: &Sheet, orientation: PlateOrientation) -> Result<Sheet> {
    if orientation == PlateOrientation::Rows {
        return Err(layout_error(sheet, "rows orientation is not implemented"));
    }

    let (needed_rows, needed_cols) = (FIRST_ROW + 2 * PAIRS, FIRST_COL + CHANNELS);
    if sheet.height() < needed_rows || sheet.width() < needed_cols {
        return Err(layout_error(
            sheet,
            &format!(
                "block D8:S199 needs {} rows x {} columns, sheet has {} x {}",
                needed_rows,
                needed_cols,
                sheet.height(),
                sheet.width()
            ),
        ));
    }

    let mut out = Sheet::new(sheet.name.clone());
    for block in 0..BLOCKS {
        if block > 0 {
            for _ in 0..GAP_ROWS {
                out.push_row(vec![CellValue::Empty; BLOCK_WIDTH]);
            }
        }
        for channel in 0..CHANNELS {
            let row = WITHIN_ORDER
                .iter()
                .map(|&offset| ratio(sheet, block * BLOCK_WIDTH + offset, channel))
                .collect();
            out.push_row(row);
        }
    }

    log::debug!("laid out sheet '{}' as plate grid", sheet.name);
    Ok(out)
}

fn ratio(sheet: &Sheet, pair: usize, channel: usize) -> CellValue {
    let row = FIRST_ROW + 2 * pair;
    let col = FIRST_COL + channel;

    match (number_at(sheet, row, col), number_at(sheet, row + 1, col)) {
        (Some(reading), Some(reference)) => {
            let value = reading / reference;
            if value.is_finite() {
                CellValue::Number(value)
            } else {
                CellValue::Empty
            }
        }
        _ => CellValue::Empty,
    }
}

fn number_at(sheet: &Sheet, row: usize, col: usize) -> Option<f64> {
    match sheet.rows.get(row).and_then(|r| r.get(col)) {
        Some(CellValue::Number(n)) => Some(*n),
        _ => None,
    }
}

fn layout_error(sheet: &Sheet, reason: &str) -> ConvertError {
    ConvertError::PlateLayout {
        sheet: sheet.name.clone(),
        reason: reason.to_string(),
    }
}
