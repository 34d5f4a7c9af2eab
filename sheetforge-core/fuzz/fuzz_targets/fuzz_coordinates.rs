#![no_main]

//! Fuzz target for cell reference parsing.
//!
//! Checks that arbitrary input never panics, that the string and byte parsers
//! agree, and that column names and coordinates round-trip inside the grid.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sheetforge_core::coordinate::{
    column_index_to_name, column_name_to_index, coordinate_from_row_col, parse_coordinate,
    parse_coordinate_bytes, parse_f64_bytes, parse_range, parse_u32_bytes, CellRange, MAX_COLUMN,
    MAX_ROW,
};

#[derive(Arbitrary, Debug)]
struct CoordinateFuzzInput {
    raw_bytes: Vec<u8>,
    string_input: String,
    row: u32,
    column: u32,
}

fn fuzz_parse_coordinate(input: &str) {
    if let Ok((row, col)) = parse_coordinate(input) {
        assert!((1..=MAX_ROW).contains(&row), "row out of grid: {}", row);
        assert!((1..=MAX_COLUMN).contains(&col), "column out of grid: {}", col);
    }
}

fn fuzz_parse_coordinate_bytes(input: &[u8]) {
    if let Some((row, col)) = parse_coordinate_bytes(input) {
        assert!(row > 0 && row <= MAX_ROW);
        assert!(col > 0 && col <= MAX_COLUMN);
    }
}

/// The string parser trims; the byte parser does not.
fn fuzz_coordinate_consistency(input: &str) {
    let string_result = parse_coordinate(input);
    let bytes_result = parse_coordinate_bytes(input.trim().as_bytes());

    match (string_result, bytes_result) {
        (Ok(s), Some(b)) => assert_eq!(s, b, "parsers disagree on {:?}", input),
        (Err(_), None) => {}
        (s, b) => panic!("parsers disagree on {:?}: {:?} vs {:?}", input, s.ok(), b),
    }
}

fn fuzz_numbers(input: &[u8]) {
    let _ = parse_u32_bytes(input);
    if let Some(val) = parse_f64_bytes(input) {
        let _ = val.is_nan();
    }
}

fn fuzz_column_name(column: u32) {
    let letters = column_index_to_name(column);
    if column == 0 {
        assert!(letters.is_empty());
    } else if column <= MAX_COLUMN {
        let back = column_name_to_index(&letters).expect("valid column name");
        assert_eq!(back, column, "column roundtrip failed for {}", column);
    } else {
        assert!(column_name_to_index(&letters).is_err());
    }
}

fn fuzz_coordinate_from_row_col(row: u32, column: u32) {
    let coord = coordinate_from_row_col(row, column);
    if (1..=MAX_ROW).contains(&row) && (1..=MAX_COLUMN).contains(&column) {
        let back = parse_coordinate(&coord).expect("valid coordinate");
        assert_eq!(back, (row, column), "coordinate roundtrip failed for {}", coord);
    }
}

fn fuzz_ranges(input: &str) {
    if let Ok(((r1, c1), (r2, c2))) = parse_range(input) {
        assert!(r1 > 0 && c1 > 0 && r2 > 0 && c2 > 0);
        let range = CellRange::parse(input).expect("parse_range accepted it");
        assert!(range.start_row <= range.end_row);
        assert!(range.start_column <= range.end_column);
        assert!(range.contains(r1, c1) && range.contains(r2, c2));
        assert!(range.intersects(&range));
    }
}

fuzz_target!(|input: CoordinateFuzzInput| {
    fuzz_parse_coordinate(&input.string_input);
    fuzz_parse_coordinate_bytes(&input.raw_bytes);
    fuzz_coordinate_consistency(&input.string_input);
    fuzz_numbers(&input.raw_bytes);
    let _ = column_name_to_index(&input.string_input);
    fuzz_column_name(input.column);
    fuzz_coordinate_from_row_col(input.row, input.column);
    fuzz_ranges(&input.string_input);
});
