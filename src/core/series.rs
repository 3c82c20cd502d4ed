//! x/time series ranges of lookups and data variables.
//!
//! The series is a single row or column next to the data. It does not depend
//! on the subscripts, but Vensim needs a cellrange with its name in every
//! sheet (and file) the data is read from.

use crate::core::addressing::{absolute_range, quote_sheet_name, within_sheet};
use crate::core::layout::Layout;
use crate::error::{E2vError, E2vResult};
use crate::types::{ReadAlong, SeriesDescriptor};

/// One named copy of the series range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRange {
    pub name: String,
    pub file: String,
    pub sheet: String,
    pub address: String,
}

/// Row and column extents of the series, zero-based and inclusive.
///
/// `None` when the last cell would not fit in a `u32`.
pub fn series_extent(series: &SeriesDescriptor) -> Option<((u32, u32), (u32, u32))> {
    let (row, col) = (series.cell.row, series.cell.col);
    let last = series.length.saturating_sub(1);
    Some(match series.read_along {
        ReadAlong::Row => ((row, row.checked_add(last)?), (col, col)),
        _ => ((row, row), (col, col.checked_add(last)?)),
    })
}

/// Sheet-less address of the series: `$B$5:$K$5`.
///
/// # Errors
/// Fails when the series runs past the last row or column of a sheet.
pub fn series_address(series: &SeriesDescriptor) -> E2vResult<String> {
    match series_extent(series) {
        Some((rows, cols)) if within_sheet(rows, cols) => Ok(absolute_range(rows, cols)),
        _ => Err(E2vError::Layout(format!(
            "the series '{}' of length {} starting at {} runs past the edge of the sheet",
            series.name, series.length, series.cell
        ))),
    }
}

/// One copy of the series per `(sheet, file)` pair the data layout uses.
pub fn replicate_series(
    name: &str,
    series: &SeriesDescriptor,
    layout: &Layout,
) -> E2vResult<Vec<SeriesRange>> {
    let address = series_address(series)?;
    Ok(layout
        .locations()
        .into_iter()
        .map(|(sheet, file)| SeriesRange {
            name: name.to_string(),
            file: file.to_string(),
            sheet: sheet.to_string(),
            address: format!("{}!{}", quote_sheet_name(sheet), address),
        })
        .collect())
}
