//! Streaming-style document builder over a sink.
//!
//! [`SpreadsheetWriter`] wraps a [`Workbook`] and the sink it will be written
//! to. It moves from `Created` to `Finalized` exactly once; after that every
//! call fails with [`SheetError::DocumentClosed`].

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use log::{debug, warn};

use crate::cell::CellInput;
use crate::coordinate::CellRange;
use crate::drawing::Image;
use crate::error::{Result, SheetError};
use crate::style::{CellStyle, StylePresets};
use crate::workbook::{CompressionLevel, Workbook};

/// Lifecycle of a [`SpreadsheetWriter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterState {
    Created,
    Finalized,
}

/// Builds a workbook and writes it to `W` on [`finalize`](Self::finalize).
pub struct SpreadsheetWriter<W: Write + Seek> {
    workbook: Workbook,
    sink: Option<W>,
    state: WriterState,
}

impl SpreadsheetWriter<BufWriter<File>> {
    /// Create (or truncate) a file and build a document into it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Seek> SpreadsheetWriter<W> {
    /// Start a document that will be written to `sink`.
    pub fn new(sink: W) -> Self {
        SpreadsheetWriter {
            workbook: Workbook::new(),
            sink: Some(sink),
            state: WriterState::Created,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// The document being built.
    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Direct access to the document for operations without a shortcut here.
    pub fn workbook_mut(&mut self) -> Result<&mut Workbook> {
        match self.state {
            WriterState::Created => Ok(&mut self.workbook),
            WriterState::Finalized => Err(SheetError::DocumentClosed),
        }
    }

    pub fn set_compression(&mut self, level: CompressionLevel) -> Result<()> {
        self.workbook_mut()?.set_compression(level);
        Ok(())
    }

    pub fn set_cell<V: Into<CellInput>>(
        &mut self,
        row: u32,
        column: u32,
        value: V,
        style: Option<u32>,
    ) -> Result<()> {
        self.workbook_mut()?.set_cell(row, column, value, style)
    }

    pub fn set_row<I, V>(&mut self, row: u32, column: u32, values: I, style: Option<u32>) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellInput>,
    {
        self.workbook_mut()?.set_row(row, column, values, style)
    }

    pub fn set_rect<R, I, V>(&mut self, row: u32, column: u32, rows: R, style: Option<u32>) -> Result<()>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = V>,
        V: Into<CellInput>,
    {
        self.workbook_mut()?.set_rect(row, column, rows, style)
    }

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
        self.workbook_mut()?
            .set_table(row, column, header, body, header_style, body_style)
    }

    pub fn add_worksheet(&mut self, name: &str) -> Result<()> {
        self.workbook_mut()?.add_worksheet(name)?;
        Ok(())
    }

    pub fn rename_current_worksheet(&mut self, name: &str) -> Result<()> {
        self.workbook_mut()?.rename_current_worksheet(name)
    }

    pub fn select_worksheet(&mut self, name: &str) -> Result<()> {
        self.workbook_mut()?.select_worksheet(name)
    }

    pub fn add_style(&mut self, style: &CellStyle) -> Result<u32> {
        self.workbook_mut()?.add_style(style)
    }

    pub fn presets(&self) -> StylePresets {
        self.workbook.presets()
    }

    pub fn merge_range(&mut self, first: &str, second: &str) -> Result<CellRange> {
        self.workbook_mut()?.merge_range(first, second)
    }

    pub fn merge_cells(
        &mut self,
        start_row: u32,
        start_column: u32,
        end_row: u32,
        end_column: u32,
    ) -> Result<CellRange> {
        self.workbook_mut()?
            .merge_cells(start_row, start_column, end_row, end_column)
    }

    /// Insert an image at a cell; returns the picture number.
    pub fn insert_image(&mut self, image: Image, row: u32, column: u32) -> Result<u32> {
        Ok(self.workbook_mut()?.insert_image(image, row, column)?.number)
    }

    pub fn insert_image_range(
        &mut self,
        image: Image,
        start_row: u32,
        start_column: u32,
        end_row: u32,
        end_column: u32,
    ) -> Result<u32> {
        Ok(self
            .workbook_mut()?
            .insert_image_range(image, start_row, start_column, end_row, end_column)?
            .number)
    }

    pub fn insert_image_absolute(&mut self, image: Image, x_pt: f64, y_pt: f64) -> Result<u32> {
        Ok(self
            .workbook_mut()?
            .insert_image_absolute(image, x_pt, y_pt)?
            .number)
    }

    pub fn insert_image_absolute_sized(
        &mut self,
        image: Image,
        x_pt: f64,
        y_pt: f64,
        width_px: Option<u32>,
        height_px: Option<u32>,
    ) -> Result<u32> {
        Ok(self
            .workbook_mut()?
            .insert_image_absolute_sized(image, x_pt, y_pt, width_px, height_px)?
            .number)
    }

    /// Serialize the document into the sink and hand the sink back.
    ///
    /// The writer is finalized even if serialization fails.
    pub fn finalize(&mut self) -> Result<W> {
        let sink = self.sink.take().ok_or(SheetError::DocumentClosed)?;
        self.state = WriterState::Finalized;
        debug!(
            "finalizing document with {} worksheet(s)",
            self.workbook.worksheets().len()
        );
        let mut sink = self.workbook.write_to(sink)?;
        sink.flush()?;
        Ok(sink)
    }
}

impl<W: Write + Seek> Drop for SpreadsheetWriter<W> {
    fn drop(&mut self) {
        if self.sink.is_some() {
            if let Err(e) = self.finalize() {
                warn!("failed to finalize spreadsheet on drop: {}", e);
            }
        }
    }
}
