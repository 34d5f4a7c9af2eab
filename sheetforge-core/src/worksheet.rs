//! Worksheet grid: sparse rows of cells plus the optional sheet sections.
//!
//! Rows are kept in strictly ascending row order and cells within a row in
//! strictly ascending column order. Both are located by binary search, so a
//! coordinate maps to at most one cell no matter how writes are ordered.

use crate::cell::CellValue;
use crate::coordinate::{CellRange, MAX_COLUMN, MAX_ROW};
use crate::drawing::Drawing;
use crate::merge::MergeRegions;

/// One cell of the grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    /// 1-based column number.
    pub column: u32,
    pub value: CellValue,
    /// Index into the workbook's cell formats. `None` writes no `s` attribute.
    pub style_index: Option<u32>,
}

/// One row of the grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    /// 1-based row number.
    pub index: u32,
    cells: Vec<Cell>,
}

impl Row {
    fn new(index: u32) -> Self {
        Row {
            index,
            cells: Vec::new(),
        }
    }

    /// Cells in ascending column order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, column: u32) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&column, |c| c.column)
            .ok()
            .map(|pos| &self.cells[pos])
    }

    fn cell_mut_or_insert(&mut self, column: u32) -> &mut Cell {
        let pos = match self.cells.binary_search_by_key(&column, |c| c.column) {
            Ok(pos) => pos,
            Err(pos) => {
                self.cells.insert(
                    pos,
                    Cell {
                        column,
                        ..Cell::default()
                    },
                );
                pos
            }
        };
        &mut self.cells[pos]
    }
}

/// Legacy sheet protection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SheetProtection {
    /// Hex digest written as the `password` attribute, if a password was set.
    pub password_hash: Option<String>,
}

/// Worksheet child elements this crate can emit, in schema order.
///
/// The schema fixes a sequence for these elements; a worksheet part is valid
/// only if present elements appear in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SheetSection {
    Dimension,
    SheetViews,
    SheetFormatPr,
    SheetData,
    SheetCalcPr,
    SheetProtection,
    ProtectedRanges,
    Scenarios,
    AutoFilter,
    SortState,
    DataConsolidate,
    CustomSheetViews,
    MergeCells,
    PageMargins,
    Drawing,
}

/// Sections the merge list may follow, highest priority first. The merge list
/// goes right after the first of these that is present, or after `sheetData`.
pub const MERGE_CELLS_PREDECESSORS: [SheetSection; 8] = [
    SheetSection::CustomSheetViews,
    SheetSection::DataConsolidate,
    SheetSection::SortState,
    SheetSection::AutoFilter,
    SheetSection::Scenarios,
    SheetSection::ProtectedRanges,
    SheetSection::SheetProtection,
    SheetSection::SheetCalcPr,
];

/// Insert a `mergeCells` node into an assembled list of worksheet children.
///
/// Returns `false` (and leaves `parts` untouched) when neither a predecessor
/// nor `sheetData` is present.
pub fn insert_merge_cells(parts: &mut Vec<(SheetSection, String)>, xml: String) -> bool {
    let anchor = MERGE_CELLS_PREDECESSORS
        .iter()
        .chain(std::iter::once(&SheetSection::SheetData))
        .find_map(|section| parts.iter().position(|(s, _)| s == section));

    match anchor {
        Some(pos) => {
            parts.insert(pos + 1, (SheetSection::MergeCells, xml));
            true
        }
        None => false,
    }
}

/// A worksheet: identity, grid and optional sections.
#[derive(Clone, Debug)]
pub struct Worksheet {
    sheet_id: u32,
    pub(crate) name: String,
    rows: Vec<Row>,
    pub(crate) merges: MergeRegions,
    pub(crate) drawing: Option<Drawing>,
    protection: Option<SheetProtection>,
    auto_filter: Option<CellRange>,
}

impl Worksheet {
    pub(crate) fn new(sheet_id: u32, name: String) -> Self {
        Worksheet {
            sheet_id,
            name,
            rows: Vec::new(),
            merges: MergeRegions::default(),
            drawing: None,
            protection: None,
            auto_filter: None,
        }
    }

    /// Stable 1-based id; never reused within a workbook.
    pub fn sheet_id(&self) -> u32 {
        self.sheet_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rows in ascending order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: u32) -> Option<&Row> {
        self.rows
            .binary_search_by_key(&index, |r| r.index)
            .ok()
            .map(|pos| &self.rows[pos])
    }

    /// Look up a cell by 1-based row and column.
    pub fn cell(&self, row: u32, column: u32) -> Option<&Cell> {
        self.row(row)?.cell(column)
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).sum()
    }

    /// Locate or create the cell at (row, column). Coordinates below 1 are
    /// clamped to 1 and coordinates beyond the sheet limits to the limit.
    pub(crate) fn cell_mut(&mut self, row: u32, column: u32) -> &mut Cell {
        let row = row.clamp(1, MAX_ROW);
        let column = column.clamp(1, MAX_COLUMN);

        let pos = match self.rows.binary_search_by_key(&row, |r| r.index) {
            Ok(pos) => pos,
            Err(pos) => {
                self.rows.insert(pos, Row::new(row));
                pos
            }
        };
        self.rows[pos].cell_mut_or_insert(column)
    }

    /// Store a resolved value. The previous style is kept unless a new one is
    /// given.
    pub(crate) fn set_value(
        &mut self,
        row: u32,
        column: u32,
        value: CellValue,
        style_index: Option<u32>,
    ) {
        let cell = self.cell_mut(row, column);
        cell.value = value;
        if style_index.is_some() {
            cell.style_index = style_index;
        }
    }

    /// Make sure a cell exists at (row, column) without touching its content.
    pub(crate) fn ensure_cell(&mut self, row: u32, column: u32) {
        self.cell_mut(row, column);
    }

    /// The used range, or `None` for an empty sheet.
    pub fn dimension(&self) -> Option<CellRange> {
        let first = self.rows.first()?;
        let last = self.rows.last()?;
        let mut min_col = u32::MAX;
        let mut max_col = 0;
        for row in &self.rows {
            if let (Some(a), Some(b)) = (row.cells.first(), row.cells.last()) {
                min_col = min_col.min(a.column);
                max_col = max_col.max(b.column);
            }
        }
        if max_col == 0 {
            return None;
        }
        Some(CellRange::new(first.index, min_col, last.index, max_col))
    }

    /// Merged regions in insertion order.
    pub fn merged_regions(&self) -> &[CellRange] {
        self.merges.as_slice()
    }

    pub fn drawing(&self) -> Option<&Drawing> {
        self.drawing.as_ref()
    }

    /// Enable sheet protection, optionally with a password.
    pub fn protect(&mut self, password: Option<&str>) {
        self.protection = Some(SheetProtection {
            password_hash: password.map(|p| format!("{:04X}", legacy_password_hash(p))),
        });
    }

    pub fn protection(&self) -> Option<&SheetProtection> {
        self.protection.as_ref()
    }

    pub fn set_auto_filter(&mut self, range: CellRange) {
        self.auto_filter = Some(range);
    }

    pub fn auto_filter(&self) -> Option<&CellRange> {
        self.auto_filter.as_ref()
    }
}

/// The 16-bit password verifier used by legacy sheet protection.
pub fn legacy_password_hash(password: &str) -> u16 {
    let bytes = password.as_bytes();
    let mut hash: u16 = 0;
    for &b in bytes.iter().rev() {
        hash = ((hash >> 14) & 0x01) | ((hash << 1) & 0x7fff);
        hash ^= b as u16;
    }
    hash = ((hash >> 14) & 0x01) | ((hash << 1) & 0x7fff);
    hash ^= bytes.len() as u16;
    hash ^= 0xCE4B;
    hash
}
