//! Merged cell regions.

use crate::coordinate::{parse_coordinate, CellRange};
use crate::error::{Result, SheetError};
use crate::worksheet::Worksheet;

/// Merge regions of one worksheet, in insertion order. No two regions overlap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeRegions {
    regions: Vec<CellRange>,
}

impl MergeRegions {
    /// Fail if `region` shares a cell with a recorded region.
    pub fn check(&self, region: &CellRange) -> Result<()> {
        match self.regions.iter().find(|r| r.intersects(region)) {
            Some(existing) => Err(SheetError::OverlappingMerge {
                region: region.to_string(),
                existing: existing.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn push(&mut self, region: CellRange) {
        self.regions.push(region);
    }

    pub fn as_slice(&self) -> &[CellRange] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Worksheet {
    /// Merge the rectangle spanned by two cell references, e.g. `("A1", "B2")`.
    pub fn merge_range(&mut self, first: &str, second: &str) -> Result<CellRange> {
        let (r1, c1) = parse_coordinate(first)?;
        let (r2, c2) = parse_coordinate(second)?;
        self.merge_cells(r1, c1, r2, c2)
    }

    /// Merge the rectangle between two 1-based corners.
    ///
    /// Corners are clamped to the sheet grid and may be given in any order.
    /// Both corner cells are created (empty) if absent. An overlapping region
    /// is rejected before the grid is touched.
    pub fn merge_cells(
        &mut self,
        start_row: u32,
        start_column: u32,
        end_row: u32,
        end_column: u32,
    ) -> Result<CellRange> {
        let region = CellRange::clamped(start_row, start_column, end_row, end_column);
        self.merges.check(&region)?;

        self.ensure_cell(region.start_row, region.start_column);
        self.ensure_cell(region.end_row, region.end_column);
        self.merges.push(region);
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;
    use crate::coordinate::{MAX_COLUMN, MAX_ROW};

    fn sheet() -> Worksheet {
        Worksheet::new(1, "Sheet1".to_string())
    }

    #[test]
    fn test_merge_creates_corner_cells() {
        let mut ws = sheet();
        let region = ws.merge_range("A1", "B1").unwrap();

        assert_eq!(region.to_string(), "A1:B1");
        assert_eq!(ws.merged_regions(), &[region]);
        assert_eq!(ws.cell(1, 1).unwrap().value, CellValue::Empty);
        assert!(ws.cell(1, 2).is_some());
        assert_eq!(ws.cell_count(), 2);
    }

    #[test]
    fn test_merge_keeps_existing_content() {
        let mut ws = sheet();
        ws.set_value(2, 2, CellValue::SharedString(0), Some(3));
        ws.merge_cells(2, 2, 4, 3).unwrap();

        let corner = ws.cell(2, 2).unwrap();
        assert_eq!(corner.value, CellValue::SharedString(0));
        assert_eq!(corner.style_index, Some(3));
        assert!(ws.cell(4, 3).is_some());
    }

    #[test]
    fn test_merge_normalizes_corners() {
        let mut ws = sheet();
        let region = ws.merge_range("C3", "a1").unwrap();
        assert_eq!(region.to_string(), "A1:C3");
    }

    #[test]
    fn test_merge_clamps_to_grid() {
        let mut ws = sheet();
        let region = ws.merge_cells(1, 1, 1, 20_000).unwrap();
        assert_eq!(region.to_string(), "A1:XFD1");

        let columns: Vec<u32> = ws.rows()[0].cells().iter().map(|c| c.column).collect();
        assert_eq!(columns, vec![1, MAX_COLUMN]);

        let region = ws.merge_cells(2_000_000, 0, 3, 1).unwrap();
        assert_eq!(region.to_string(), "A3:A1048576");
        assert!(ws.cell(MAX_ROW, 1).is_some());
    }

    #[test]
    fn test_overlapping_merge_rejected() {
        let mut ws = sheet();
        ws.merge_range("A1", "B2").unwrap();

        let err = ws.merge_range("B2", "C3").unwrap_err();
        match err {
            SheetError::OverlappingMerge { region, existing } => {
                assert_eq!(region, "B2:C3");
                assert_eq!(existing, "A1:B2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The rejected region created nothing.
        assert!(ws.cell(3, 3).is_none());
        assert_eq!(ws.merged_regions().len(), 1);

        ws.merge_range("C1", "D2").unwrap();
        assert_eq!(ws.merged_regions().len(), 2);
    }

    #[test]
    fn test_bad_reference() {
        let mut ws = sheet();
        assert!(matches!(
            ws.merge_range("A", "B2"),
            Err(SheetError::InvalidReference(_))
        ));
        assert!(ws.merged_regions().is_empty());
    }
}
