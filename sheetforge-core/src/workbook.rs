//! Workbook representation and the write API.
//!
//! A [`Workbook`] owns its worksheets, one shared string table and one style
//! registry. Exactly one worksheet is current at any time; cell, merge and
//! image operations act on it.

use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

use log::debug;

use crate::cell::{is_number_literal, CellInput, CellValue};
use crate::coordinate::CellRange;
use crate::drawing::{Drawing, Image, Picture};
use crate::error::{Result, SheetError};
use crate::shared_strings::SharedStringTable;
use crate::style::{CellStyle, StylePresets, StyleRegistry};
use crate::worksheet::Worksheet;
use crate::writer;

/// Maximum length of a worksheet name.
pub const MAX_SHEET_NAME_LEN: usize = 31;
const FORBIDDEN_SHEET_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Compression level for saving workbooks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    /// No compression - fastest saves, largest files
    None,
    /// Deflate level 1
    Fast,
    /// Deflate level 6
    #[default]
    Default,
    /// Deflate level 9 - smallest files, slowest
    Best,
}

/// An in-memory spreadsheet document.
#[derive(Clone, Debug)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    current: usize,
    next_sheet_id: u32,
    strings: SharedStringTable,
    styles: StyleRegistry,
    creator: String,
    /// Compression level for saving.
    pub compression: CompressionLevel,
}

impl Workbook {
    /// Create a workbook holding one empty worksheet, `Sheet1`, which is current.
    pub fn new() -> Self {
        Workbook {
            worksheets: vec![Worksheet::new(1, "Sheet1".to_string())],
            current: 0,
            next_sheet_id: 2,
            strings: SharedStringTable::new(),
            styles: StyleRegistry::new(),
            creator: "sheetforge".to_string(),
            compression: CompressionLevel::default(),
        }
    }

    /// Set compression level for saving.
    pub fn set_compression(&mut self, level: CompressionLevel) {
        self.compression = level;
    }

    /// Author written to the document properties.
    pub fn set_creator<S: Into<String>>(&mut self, creator: S) {
        self.creator = creator.into();
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    // ---- worksheets ----

    /// Worksheets in display order.
    pub fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(|ws| ws.name()).collect()
    }

    pub fn worksheet(&self, name: &str) -> Result<&Worksheet> {
        self.worksheets
            .iter()
            .find(|ws| ws.name() == name)
            .ok_or_else(|| SheetError::SheetNotFound(name.to_string()))
    }

    pub fn worksheet_mut(&mut self, name: &str) -> Result<&mut Worksheet> {
        self.worksheets
            .iter_mut()
            .find(|ws| ws.name() == name)
            .ok_or_else(|| SheetError::SheetNotFound(name.to_string()))
    }

    /// The worksheet receiving writes.
    pub fn current(&self) -> &Worksheet {
        &self.worksheets[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Worksheet {
        &mut self.worksheets[self.current]
    }

    /// Position of the current worksheet in display order.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Append a worksheet and make it current.
    ///
    /// An empty (or all-whitespace) name means the default `Sheet{sheetId}`.
    pub fn add_worksheet(&mut self, name: &str) -> Result<&mut Worksheet> {
        let sheet_id = self.next_sheet_id;
        let name = if name.trim().is_empty() {
            format!("Sheet{}", sheet_id)
        } else {
            name.to_string()
        };
        self.validate_sheet_name(&name, None)?;

        self.next_sheet_id += 1;
        self.worksheets.push(Worksheet::new(sheet_id, name));
        self.current = self.worksheets.len() - 1;
        debug!(
            "added worksheet {:?} (sheetId {})",
            self.worksheets[self.current].name(),
            sheet_id
        );
        Ok(&mut self.worksheets[self.current])
    }

    /// Rename the current worksheet.
    pub fn rename_current_worksheet(&mut self, name: &str) -> Result<()> {
        self.validate_sheet_name(name, Some(self.current))?;
        let sheet = &mut self.worksheets[self.current];
        debug!("renaming worksheet {:?} to {:?}", sheet.name, name);
        sheet.name = name.to_string();
        Ok(())
    }

    /// Make the named worksheet current.
    pub fn select_worksheet(&mut self, name: &str) -> Result<()> {
        self.current = self
            .worksheets
            .iter()
            .position(|ws| ws.name() == name)
            .ok_or_else(|| SheetError::SheetNotFound(name.to_string()))?;
        Ok(())
    }

    fn validate_sheet_name(&self, name: &str, renaming: Option<usize>) -> Result<()> {
        if name.is_empty()
            || name.chars().count() > MAX_SHEET_NAME_LEN
            || name.contains(&FORBIDDEN_SHEET_NAME_CHARS[..])
        {
            return Err(SheetError::InvalidSheetName(name.to_string()));
        }
        let taken = self
            .worksheets
            .iter()
            .enumerate()
            .any(|(idx, ws)| Some(idx) != renaming && same_sheet_name(ws.name(), name));
        if taken {
            return Err(SheetError::DuplicateSheetName(name.to_string()));
        }
        Ok(())
    }

    // ---- shared strings and styles ----

    pub fn shared_strings(&self) -> &SharedStringTable {
        &self.strings
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub fn styles_mut(&mut self) -> &mut StyleRegistry {
        &mut self.styles
    }

    /// Register a cell format and return its style index.
    pub fn add_style(&mut self, style: &CellStyle) -> Result<u32> {
        self.styles.register_cell_format(style)
    }

    /// Style indices registered at creation.
    pub fn presets(&self) -> StylePresets {
        self.styles.presets()
    }

    // ---- cells ----

    fn check_style(&self, style: Option<u32>) -> Result<()> {
        match style {
            Some(idx) => self.styles.check_style_index(idx),
            None => Ok(()),
        }
    }

    fn resolve(&mut self, input: CellInput) -> Result<CellValue> {
        Ok(match input {
            CellInput::Null => CellValue::SharedString(self.strings.intern("")),
            CellInput::Text(text) => CellValue::SharedString(self.strings.intern(&text)),
            CellInput::Number(token) if is_number_literal(&token) => CellValue::Number(token),
            CellInput::Number(token) => return Err(SheetError::InvalidNumber(token)),
        })
    }

    /// Write one value to the current worksheet.
    ///
    /// Row and column are 1-based; values below 1 are clamped to 1. A `None`
    /// style keeps whatever style the cell already had. An unregistered style
    /// index or a malformed number token fails without touching the sheet.
    pub fn set_cell<V: Into<CellInput>>(
        &mut self,
        row: u32,
        column: u32,
        value: V,
        style: Option<u32>,
    ) -> Result<()> {
        self.check_style(style)?;
        let value = self.resolve(value.into())?;
        self.worksheets[self.current].set_value(row, column, value, style);
        Ok(())
    }

    /// Write values left to right starting at (row, column).
    ///
    /// Stops at the first value that fails; cells before it stay written.
    pub fn set_row<I, V>(&mut self, row: u32, column: u32, values: I, style: Option<u32>) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellInput>,
    {
        self.check_style(style)?;
        let column = column.max(1);
        for (offset, value) in values.into_iter().enumerate() {
            self.set_cell(row, column.saturating_add(offset as u32), value, style)?;
        }
        Ok(())
    }

    /// Write a block of rows starting at (row, column).
    pub fn set_rect<R, I, V>(&mut self, row: u32, column: u32, rows: R, style: Option<u32>) -> Result<()>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = V>,
        V: Into<CellInput>,
    {
        self.check_style(style)?;
        let row = row.max(1);
        for (offset, values) in rows.into_iter().enumerate() {
            self.set_row(row.saturating_add(offset as u32), column, values, style)?;
        }
        Ok(())
    }

    /// Write a header row at `row` and the body rows below it.
    ///
    /// Styles default to the header and body presets.
    pub fn set_table<H, S, R, I, V>(
        &mut self,
        row: u32,
        column: u32,
        header: H,
        body: R,
        header_style: Option<u32>,
        body_style: Option<u32>,
    ) -> Result<()>
    where
        H: IntoIterator<Item = S>,
        S: Into<CellInput>,
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = V>,
        V: Into<CellInput>,
    {
        let presets = self.presets();
        let header_style = header_style.unwrap_or(presets.header);
        let body_style = body_style.unwrap_or(presets.body);
        self.styles.check_style_index(header_style)?;
        self.styles.check_style_index(body_style)?;

        let row = row.max(1);
        self.set_row(row, column, header, Some(header_style))?;
        self.set_rect(row.saturating_add(1), column, body, Some(body_style))
    }

    // ---- merges and sheet sections ----

    /// Merge the rectangle spanned by two cell references on the current sheet.
    pub fn merge_range(&mut self, first: &str, second: &str) -> Result<CellRange> {
        self.current_mut().merge_range(first, second)
    }

    /// Merge the rectangle between two 1-based corners on the current sheet.
    pub fn merge_cells(
        &mut self,
        start_row: u32,
        start_column: u32,
        end_row: u32,
        end_column: u32,
    ) -> Result<CellRange> {
        self.current_mut()
            .merge_cells(start_row, start_column, end_row, end_column)
    }

    /// Protect the current worksheet.
    pub fn protect_current(&mut self, password: Option<&str>) {
        self.current_mut().protect(password);
    }

    /// Set an auto-filter over `range` (e.g. `"A1:C10"`) on the current sheet.
    pub fn set_auto_filter(&mut self, range: &str) -> Result<()> {
        let range = CellRange::parse(range)?;
        self.current_mut().set_auto_filter(range);
        Ok(())
    }

    // ---- images ----

    fn drawing_mut(&mut self) -> &mut Drawing {
        let sheet = &mut self.worksheets[self.current];
        if sheet.drawing.is_none() {
            debug!("allocating drawing for worksheet {:?}", sheet.name);
        }
        sheet.drawing.get_or_insert_with(Drawing::default)
    }

    /// Insert an image at a cell, at its natural size.
    pub fn insert_image(&mut self, image: Image, row: u32, column: u32) -> Result<&Picture> {
        let picture = self.drawing_mut().add_one_cell(image, row, column)?;
        debug!("inserted {} at row {} column {}", picture.name(), row, column);
        Ok(picture)
    }

    /// Insert an image stretched over a cell range.
    pub fn insert_image_range(
        &mut self,
        image: Image,
        start_row: u32,
        start_column: u32,
        end_row: u32,
        end_column: u32,
    ) -> Result<&Picture> {
        let picture =
            self.drawing_mut()
                .add_two_cell(image, start_row, start_column, end_row, end_column);
        debug!(
            "inserted {} over rows {}..={} columns {}..={}",
            picture.name(),
            start_row,
            end_row,
            start_column,
            end_column
        );
        Ok(picture)
    }

    /// Insert an image at a page position in points, at its natural size.
    pub fn insert_image_absolute(&mut self, image: Image, x_pt: f64, y_pt: f64) -> Result<&Picture> {
        self.insert_image_absolute_sized(image, x_pt, y_pt, None, None)
    }

    /// Insert an image at a page position in points with an explicit pixel
    /// size. Either dimension may be omitted to keep the natural one.
    pub fn insert_image_absolute_sized(
        &mut self,
        image: Image,
        x_pt: f64,
        y_pt: f64,
        width_px: Option<u32>,
        height_px: Option<u32>,
    ) -> Result<&Picture> {
        let picture = self
            .drawing_mut()
            .add_absolute(image, x_pt, y_pt, width_px, height_px)?;
        debug!("inserted {} at ({}pt, {}pt)", picture.name(), x_pt, y_pt);
        Ok(picture)
    }

    // ---- saving ----

    /// Save the workbook to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        debug!("saving workbook to {}", path.display());
        let file = File::create(path)?;
        let mut writer = self.write_to(BufWriter::new(file))?;
        writer.flush()?;
        Ok(())
    }

    /// Save the workbook to an in-memory byte vector.
    pub fn save_to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Save the workbook to any writer that implements Write + Seek.
    pub fn save_to_writer<W: Write + Seek>(&self, writer: W) -> Result<()> {
        self.write_to(writer)?;
        Ok(())
    }

    pub(crate) fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        debug!(
            "writing package: {} worksheet(s), {} shared string(s), {} cell format(s)",
            self.worksheets.len(),
            self.strings.len(),
            self.styles.cell_formats().len()
        );
        writer::write_package(self, writer)
    }
}

/// Worksheet names collide regardless of letter case.
fn same_sheet_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
