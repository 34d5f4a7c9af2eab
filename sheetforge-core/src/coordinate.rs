//! Cell reference codec.
//!
//! Row and column numbers are 1-based everywhere in the public API: column 1 is
//! `A`, column 27 is `AA`. Letters form a bijective base-26 numeral (there is no
//! zero digit), so every column number in `1..=MAX_COLUMN` has exactly one name.

use std::fmt;

use crate::error::{Result, SheetError};

/// Maximum column number (XFD = 16384).
pub const MAX_COLUMN: u32 = 16384;
/// Maximum row number.
pub const MAX_ROW: u32 = 1_048_576;

/// Parse a cell reference from bytes (e.g., b"A1", b"AB123") into (row, column).
/// This is the fast path the reader uses on `r` attributes.
#[inline]
pub fn parse_coordinate_bytes(bytes: &[u8]) -> Option<(u32, u32)> {
    let split = bytes.iter().position(|b| !b.is_ascii_alphabetic())?;
    if split == 0 {
        return None;
    }
    let column = column_from_bytes(&bytes[..split])?;
    let row = parse_u32_bytes(&bytes[split..])?;
    if row == 0 || row > MAX_ROW {
        return None;
    }
    Some((row, column))
}

/// Parse a cell reference (e.g., "A1", "ab12") into (row, column).
pub fn parse_coordinate(reference: &str) -> Result<(u32, u32)> {
    let reference = reference.trim();
    parse_coordinate_bytes(reference.as_bytes()).ok_or_else(|| SheetError::reference(reference))
}

/// Split a cell reference into its column letters (upper-cased) and row number.
///
/// `"B12"` becomes `("B", 12)`. Fails when either part is missing.
pub fn parse_cell_reference(reference: &str) -> Result<(String, u32)> {
    let (row, column) = parse_coordinate(reference)?;
    Ok((column_index_to_name(column), row))
}

/// Parse a u32 directly from bytes without string allocation.
#[inline]
pub fn parse_u32_bytes(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add((b - b'0') as u32)?;
    }
    Some(result)
}

/// Parse an f64 directly from bytes.
/// Integers take a fast path; everything else goes through `str::parse`.
#[inline]
pub fn parse_f64_bytes(bytes: &[u8]) -> Option<f64> {
    if !bytes.is_empty() && bytes.len() < 16 && bytes.iter().all(|b| b.is_ascii_digit()) {
        let mut result: f64 = 0.0;
        for &b in bytes {
            result = result * 10.0 + (b - b'0') as f64;
        }
        return Some(result);
    }
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

fn column_from_bytes(letters: &[u8]) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut column: u32 = 0;
    for &b in letters {
        let upper = b.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        column = column.checked_mul(26)?.checked_add((upper - b'A' + 1) as u32)?;
        if column > MAX_COLUMN {
            return None;
        }
    }
    Some(column)
}

/// Convert column letters (e.g., "A", "ab", "XFD") to a 1-based column number.
pub fn column_name_to_index(name: &str) -> Result<u32> {
    column_from_bytes(name.trim().as_bytes())
        .ok_or_else(|| SheetError::reference(format!("column {:?}", name)))
}

/// Convert a 1-based column number to letters (1 -> "A", 28 -> "AB").
///
/// Column 0 has no name and yields an empty string.
pub fn column_index_to_name(column: u32) -> String {
    let mut letters = [0u8; 7];
    let mut pos = letters.len();
    let mut col = column;

    while col > 0 {
        col -= 1;
        pos -= 1;
        letters[pos] = b'A' + (col % 26) as u8;
        col /= 26;
    }

    letters[pos..].iter().map(|&b| b as char).collect()
}

/// Build a cell reference from 1-based row and column numbers.
pub fn coordinate_from_row_col(row: u32, column: u32) -> String {
    let mut reference = column_index_to_name(column);
    reference.push_str(itoa::Buffer::new().format(row));
    reference
}

/// Parse a range reference (e.g., "A1:B10") into its two corner coordinates.
pub fn parse_range(range: &str) -> Result<((u32, u32), (u32, u32))> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| SheetError::reference(range))?;
    Ok((parse_coordinate(start)?, parse_coordinate(end)?))
}

/// A rectangular block of cells with normalized corners (top-left first).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start_row: u32,
    pub start_column: u32,
    pub end_row: u32,
    pub end_column: u32,
}

impl CellRange {
    /// Build a range from any two opposite corners.
    pub fn new(row1: u32, column1: u32, row2: u32, column2: u32) -> Self {
        CellRange {
            start_row: row1.min(row2),
            start_column: column1.min(column2),
            end_row: row1.max(row2),
            end_column: column1.max(column2),
        }
    }

    /// Like [`CellRange::new`], with each coordinate first clamped to the
    /// sheet grid `1..=MAX_ROW` by `1..=MAX_COLUMN`.
    pub fn clamped(row1: u32, column1: u32, row2: u32, column2: u32) -> Self {
        CellRange::new(
            row1.clamp(1, MAX_ROW),
            column1.clamp(1, MAX_COLUMN),
            row2.clamp(1, MAX_ROW),
            column2.clamp(1, MAX_COLUMN),
        )
    }

    /// Parse `"A1:C3"`. The corners may be given in any order.
    pub fn parse(range: &str) -> Result<Self> {
        let ((r1, c1), (r2, c2)) = parse_range(range)?;
        Ok(CellRange::new(r1, c1, r2, c2))
    }

    pub fn contains(&self, row: u32, column: u32) -> bool {
        (self.start_row..=self.end_row).contains(&row)
            && (self.start_column..=self.end_column).contains(&column)
    }

    /// True when the two ranges share at least one cell.
    pub fn intersects(&self, other: &CellRange) -> bool {
        self.start_row <= other.end_row
            && other.start_row <= self.end_row
            && self.start_column <= other.end_column
            && other.start_column <= self.end_column
    }

    pub fn width(&self) -> u32 {
        self.end_column - self.start_column + 1
    }

    pub fn height(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn top_left(&self) -> String {
        coordinate_from_row_col(self.start_row, self.start_column)
    }

    pub fn bottom_right(&self) -> String {
        coordinate_from_row_col(self.end_row, self.end_column)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.top_left(), self.bottom_right())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("A1").unwrap(), (1, 1));
        assert_eq!(parse_coordinate("B12").unwrap(), (12, 2));
        assert_eq!(parse_coordinate("Z1").unwrap(), (1, 26));
        assert_eq!(parse_coordinate("AA1").unwrap(), (1, 27));
        assert_eq!(parse_coordinate("XFD1048576").unwrap(), (1048576, 16384));
        assert_eq!(parse_coordinate("ab10").unwrap(), (10, 28));
    }

    #[test]
    fn test_parse_coordinate_errors() {
        for bad in ["", "A", "12", "A0", "1A", "A1B", "XFE1", "A1048577", "A99999999999"] {
            assert!(
                matches!(parse_coordinate(bad), Err(SheetError::InvalidReference(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_cell_reference() {
        assert_eq!(parse_cell_reference("B12").unwrap(), ("B".to_string(), 12));
        assert_eq!(parse_cell_reference("aa3").unwrap(), ("AA".to_string(), 3));
        assert!(parse_cell_reference("B").is_err());
        assert!(parse_cell_reference("12").is_err());
    }

    #[test]
    fn test_column_name_to_index() {
        assert_eq!(column_name_to_index("A").unwrap(), 1);
        assert_eq!(column_name_to_index("Z").unwrap(), 26);
        assert_eq!(column_name_to_index("AA").unwrap(), 27);
        assert_eq!(column_name_to_index("XFD").unwrap(), 16384);
        assert!(column_name_to_index("").is_err());
        assert!(column_name_to_index("A1").is_err());
        assert!(column_name_to_index("XFE").is_err());
        assert!(column_name_to_index("ZZZZZZZZZZ").is_err());
    }

    #[test]
    fn test_column_index_to_name() {
        assert_eq!(column_index_to_name(0), "");
        assert_eq!(column_index_to_name(1), "A");
        assert_eq!(column_index_to_name(26), "Z");
        assert_eq!(column_index_to_name(27), "AA");
        assert_eq!(column_index_to_name(52), "AZ");
        assert_eq!(column_index_to_name(53), "BA");
        assert_eq!(column_index_to_name(702), "ZZ");
        assert_eq!(column_index_to_name(703), "AAA");
        assert_eq!(column_index_to_name(16384), "XFD");
    }

    #[test]
    fn test_coordinate_from_row_col() {
        assert_eq!(coordinate_from_row_col(1, 1), "A1");
        assert_eq!(coordinate_from_row_col(10, 28), "AB10");
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("A1:B10").unwrap(), ((1, 1), (10, 2)));
        assert!(parse_range("A1").is_err());
        assert!(parse_range("A1:").is_err());
    }

    #[test]
    fn test_cell_range() {
        let range = CellRange::parse("C3:A1").unwrap();
        assert_eq!(range, CellRange::new(1, 1, 3, 3));
        assert_eq!(range.to_string(), "A1:C3");
        assert_eq!((range.width(), range.height()), (3, 3));
        assert!(range.contains(2, 2));
        assert!(!range.contains(4, 1));

        assert!(range.intersects(&CellRange::parse("C3:D4").unwrap()));
        assert!(!range.intersects(&CellRange::parse("D1:E2").unwrap()));
        assert!(!range.intersects(&CellRange::parse("A4:C4").unwrap()));
    }

    #[test]
    fn test_parse_f64_bytes() {
        assert_eq!(parse_f64_bytes(b"42"), Some(42.0));
        assert_eq!(parse_f64_bytes(b"-3.5"), Some(-3.5));
        assert_eq!(parse_f64_bytes(b"1E+20"), Some(1e20));
        assert_eq!(parse_f64_bytes(b"abc"), None);
    }

    proptest! {
        #[test]
        fn column_name_round_trips(column in 1u32..=MAX_COLUMN) {
            let name = column_index_to_name(column);
            prop_assert_eq!(column_name_to_index(&name).unwrap(), column);
        }

        #[test]
        fn column_names_are_monotonic(column in 1u32..MAX_COLUMN) {
            let a = column_index_to_name(column);
            let b = column_index_to_name(column + 1);
            // Shorter names sort first; equal lengths compare lexicographically.
            prop_assert!((a.len(), a.as_str()) < (b.len(), b.as_str()));
        }
    }
}
