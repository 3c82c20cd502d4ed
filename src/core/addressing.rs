//! Spreadsheet cell addressing.
//!
//! Converts between column letters ("A", "Z", "AA", "ABA") and zero-based
//! column numbers, and parses A1-style references into zero-based
//! `(row, col)` pairs.

use crate::error::{E2vError, E2vResult};
use std::fmt;
use std::str::FromStr;

/// Longest column name accepted in cell references ("XFD" is Excel's last column).
pub const MAX_COLUMN_LETTERS: usize = 3;

/// Number of columns in a worksheet (A..XFD).
pub const MAX_COLUMNS: u32 = 16_384;

/// Number of rows in a worksheet.
pub const MAX_ROWS: u32 = 1_048_576;

/// A zero-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", number_to_column(self.col), self.row + 1)
    }
}

impl FromStr for CellRef {
    type Err = E2vError;

    fn from_str(s: &str) -> E2vResult<Self> {
        parse_cell(s.trim()).ok_or_else(|| {
            E2vError::config(format!(
                "'{}' is not a valid cell reference (expected something like 'B5')",
                s
            ))
        })
    }
}

/// Transform a column name into its zero-based number (`A` → 0, `AA` → 26).
///
/// Case-insensitive. Returns `None` for empty names, names with non-letters
/// and names longer than [`MAX_COLUMN_LETTERS`].
pub fn column_to_number(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > MAX_COLUMN_LETTERS {
        return None;
    }

    let mut acc = 0u32;
    for c in letters.bytes() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        acc = acc * 26 + u32::from(c.to_ascii_uppercase() - b'A') + 1;
    }
    Some(acc - 1)
}

/// Transform a zero-based column number into its name (`0` → `A`, `26` → `AA`).
pub fn number_to_column(num: u32) -> String {
    let mut chars = Vec::new();
    let mut n = u64::from(num) + 1;

    // bijective base 26: digits run 1..=26, there is no zero digit
    while n > 0 {
        let (mut quotient, mut digit) = (n / 26, n % 26);
        if digit == 0 {
            quotient -= 1;
            digit = 26;
        }
        chars.push(char::from(b'A' + (digit - 1) as u8));
        n = quotient;
    }

    chars.iter().rev().collect()
}

/// Split an A1-style reference into zero-based `(row, col)`.
///
/// Returns `None` (never an error) when the input is not exactly one letter
/// run followed by one digit run, when the row is zero, or when the column
/// part is longer than three letters. Callers probing ambiguous strings rely
/// on this.
pub fn parse_cell(cell: &str) -> Option<CellRef> {
    let split = cell
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit())
        .map(|(idx, _)| idx)?;
    let (letters, digits) = cell.split_at(split);

    if letters.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let col = column_to_number(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }

    Some(CellRef::new(row - 1, col))
}

/// Whether an inclusive zero-based rectangle fits inside a worksheet.
pub fn within_sheet(rows: (u32, u32), cols: (u32, u32)) -> bool {
    rows.0 <= rows.1 && rows.1 < MAX_ROWS && cols.0 <= cols.1 && cols.1 < MAX_COLUMNS
}

/// `R`, `C`, `RC`, `R1`, `C2`, `R1C1` and friends.
fn looks_like_r1c1(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    let rest = match upper.strip_prefix('R') {
        Some(rest) => rest.trim_start_matches(|c: char| c.is_ascii_digit()),
        None => upper.as_str(),
    };
    let rest = match rest.strip_prefix('C') {
        Some(rest) => rest.trim_start_matches(|c: char| c.is_ascii_digit()),
        None => rest,
    };
    rest.is_empty() && !upper.is_empty() && (upper.starts_with('R') || upper.starts_with('C'))
}

/// Format a sheet name for use in an address, quoting it when Excel requires it.
///
/// Names that read as a cell reference in either notation are quoted too.
pub fn quote_sheet_name(sheet: &str) -> String {
    let plain = !sheet.is_empty()
        && !sheet.starts_with(|c: char| c.is_ascii_digit())
        && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && parse_cell(sheet).is_none()
        && !looks_like_r1c1(sheet);

    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// Absolute address of a rectangle, without the sheet prefix: `$B$5:$K$5`.
pub fn absolute_range(rows: (u32, u32), cols: (u32, u32)) -> String {
    format!(
        "${}${}:${}${}",
        number_to_column(cols.0),
        rows.0 + 1,
        number_to_column(cols.1),
        rows.1 + 1
    )
}

/// Split `SHEET!$A$1:$B$2` (or a single cell) into the unquoted sheet name
/// and the two corners.
pub fn parse_address(address: &str) -> Option<(String, CellRef, CellRef)> {
    let (sheet, cells) = address.rsplit_once('!')?;
    let sheet = match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None => sheet.to_string(),
    };

    let corner = |cell: &str| parse_cell(&cell.replace('$', ""));
    let (from, to) = match cells.split_once(':') {
        Some((from, to)) => (corner(from)?, corner(to)?),
        None => {
            let cell = corner(cells)?;
            (cell, cell)
        }
    };
    Some((sheet, from, to))
}
