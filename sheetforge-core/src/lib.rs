//! sheetforge: build and read xlsx spreadsheet packages.
//!
//! # Writing
//!
//! ```no_run
//! use sheetforge_core::{Image, Workbook};
//!
//! let mut wb = Workbook::new();
//! let presets = wb.presets();
//! wb.set_table(
//!     1,
//!     1,
//!     ["Name", "Age"],
//!     [["Henry", "1"], ["Ann", "2"]],
//!     Some(presets.header),
//!     Some(presets.body),
//! )?;
//! wb.merge_range("D1", "E2")?;
//! wb.insert_image(Image::from_path("logo.png")?, 4, 1)?;
//! wb.save("people.xlsx")?;
//! # Ok::<(), sheetforge_core::SheetError>(())
//! ```
//!
//! # Reading
//!
//! ```no_run
//! use sheetforge_core::SpreadsheetReader;
//!
//! let table = SpreadsheetReader::read_file("people.xlsx", None)?;
//! for row in &table.rows {
//!     println!("{:?}", row);
//! }
//! # Ok::<(), sheetforge_core::SheetError>(())
//! ```

pub mod builder;
pub mod cell;
pub mod coordinate;
pub mod drawing;
pub mod error;
pub mod merge;
pub mod reader;
pub mod shared_strings;
pub mod style;
pub mod units;
pub mod workbook;
pub mod worksheet;
pub mod writer;

pub use builder::{SpreadsheetWriter, WriterState};
pub use cell::{CellInput, CellValue};
pub use coordinate::{
    column_index_to_name, column_name_to_index, coordinate_from_row_col, parse_coordinate,
    CellRange,
};
pub use drawing::{Anchor, Drawing, Extent, Image, ImageInfo, Marker, Picture, Position};
pub use error::{Result, SheetError};
pub use reader::{DataTable, SpreadsheetReader, Value};
pub use shared_strings::SharedStringTable;
pub use style::{
    Alignment, Border, BorderLine, CellStyle, Edge, Fill, Font, HorizontalAlignment,
    NumberFormat, PatternType, StylePresets, StyleRegistry, VerticalAlignment,
};
pub use workbook::{CompressionLevel, Workbook};
pub use worksheet::{Cell, Row, SheetProtection, Worksheet};
