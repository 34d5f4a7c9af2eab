//! Read worksheets back out of a package as typed tables.
//!
//! The first row of a sheet becomes the column names unless raw mode is
//! requested. Values are placed by the column of their cell reference, so
//! sparse rows keep their alignment.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek};
use std::path::Path;

use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rayon::prelude::*;
use zip::ZipArchive;

use crate::cell::format_number;
use crate::coordinate::{parse_coordinate_bytes, parse_f64_bytes, MAX_COLUMN};
use crate::error::{Result, SheetError};
use crate::shared_strings::SharedStringTable;

/// A decoded cell value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text as it would appear in a header cell.
    fn display_text(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n).unwrap_or_else(|| n.to_string()),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
        }
    }
}

/// Rows of one worksheet under a list of column names.
///
/// Every row has exactly `columns.len()` values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl DataTable {
    /// Build a table whose first row supplies the column names.
    pub fn with_header(mut rows: Vec<Vec<Value>>) -> Self {
        if rows.is_empty() {
            return DataTable::default();
        }
        let header = rows.remove(0);
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(header.len());
        let columns = header_names(&header, width);
        Self::padded(columns, rows)
    }

    /// Build a table with generated `Column{n}` names.
    pub fn raw(rows: Vec<Vec<Value>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let columns = (1..=width).map(|n| format!("Column{}", n)).collect();
        Self::padded(columns, rows)
    }

    fn padded(columns: Vec<String>, mut rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            row.resize(width, Value::Empty);
        }
        DataTable { columns, rows }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value at a 0-based body row and column.
    pub fn get(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Value at a 0-based body row in the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        self.get(row, self.column_index(column)?)
    }
}

/// Column names from a header row.
///
/// Empty cells and columns past the header become `Column{n}`. Repeated names
/// get the smallest numeric suffix, starting at 0, that makes them unique.
fn header_names(header: &[Value], width: usize) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(width);
    let mut names = Vec::with_capacity(width);

    for position in 0..width {
        let text = header
            .get(position)
            .map(Value::display_text)
            .unwrap_or_default();
        let base = if text.is_empty() {
            format!("Column{}", position + 1)
        } else {
            text
        };

        let name = if used.contains(&base) {
            let mut suffix = 0u32;
            loop {
                let candidate = format!("{}{}", base, suffix);
                if !used.contains(&candidate) {
                    break candidate;
                }
                suffix += 1;
            }
        } else {
            base
        };
        used.insert(name.clone());
        names.push(name);
    }
    names
}

/// Worksheet entry from `xl/workbook.xml`.
#[derive(Clone, Debug)]
struct SheetEntry {
    name: String,
    path: String,
}

/// Reads worksheets from an xlsx package.
pub struct SpreadsheetReader<R: Read + Seek> {
    archive: Option<ZipArchive<R>>,
    sheets: Vec<SheetEntry>,
    strings: SharedStringTable,
}

impl SpreadsheetReader<BufReader<File>> {
    /// Open a package on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }

    /// Open, read one sheet in header mode and close.
    pub fn read_file<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<DataTable> {
        let mut reader = Self::open(path)?;
        let table = reader.read(sheet)?;
        reader.close();
        Ok(table)
    }
}

impl SpreadsheetReader<Cursor<Vec<u8>>> {
    /// Read a package held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> SpreadsheetReader<R> {
    /// Load the workbook index and shared strings from `source`.
    pub fn new(source: R) -> Result<Self> {
        let mut archive = ZipArchive::new(source)?;

        let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?;
        let entries = parse_workbook_xml(Cursor::new(&workbook_xml))?;

        let rels = match read_part(&mut archive, "xl/_rels/workbook.xml.rels") {
            Ok(xml) => parse_workbook_rels(Cursor::new(&xml))?,
            Err(_) => Vec::new(),
        };

        let sheets = entries
            .into_iter()
            .map(|(name, sheet_id, rel_id)| {
                let target = rel_id
                    .and_then(|id| rels.iter().find(|(rid, _)| *rid == id))
                    .map(|(_, target)| target.as_str());
                let path = match target {
                    Some(t) => match t.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{}", t),
                    },
                    None => format!("xl/worksheets/sheet{}.xml", sheet_id),
                };
                SheetEntry { name, path }
            })
            .collect::<Vec<_>>();

        let strings = match read_part(&mut archive, "xl/sharedStrings.xml") {
            Ok(xml) => SharedStringTable::from_xml(Cursor::new(xml))?,
            Err(_) => SharedStringTable::new(),
        };

        debug!(
            "opened package with {} worksheet(s) and {} shared string(s)",
            sheets.len(),
            strings.len()
        );

        Ok(SpreadsheetReader {
            archive: Some(archive),
            sheets,
            strings,
        })
    }

    fn archive_mut(&mut self) -> Result<&mut ZipArchive<R>> {
        self.archive.as_mut().ok_or(SheetError::DocumentClosed)
    }

    /// Worksheet names in workbook order.
    pub fn sheet_names(&self) -> Result<Vec<String>> {
        if self.archive.is_none() {
            return Err(SheetError::DocumentClosed);
        }
        Ok(self.sheets.iter().map(|s| s.name.clone()).collect())
    }

    /// The shared string table of the package.
    pub fn shared_strings(&self) -> Result<&SharedStringTable> {
        if self.archive.is_none() {
            return Err(SheetError::DocumentClosed);
        }
        Ok(&self.strings)
    }

    fn find_sheet(&self, sheet: Option<&str>) -> Result<&SheetEntry> {
        match sheet {
            Some(name) => self
                .sheets
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| SheetError::SheetNotFound(name.to_string())),
            None => self.sheets.first().ok_or(SheetError::NoWorksheets),
        }
    }

    fn sheet_rows(&mut self, sheet: Option<&str>) -> Result<Vec<Vec<Value>>> {
        self.archive_mut()?;
        let path = self.find_sheet(sheet)?.path.clone();
        let xml = read_part(self.archive_mut()?, &path)?;
        parse_sheet_rows(Cursor::new(&xml), &self.strings)
    }

    /// Read a sheet with its first row as column names.
    ///
    /// `None` selects the first sheet.
    pub fn read(&mut self, sheet: Option<&str>) -> Result<DataTable> {
        self.sheet_rows(sheet).map(DataTable::with_header)
    }

    /// Read a sheet without treating any row as a header.
    pub fn read_raw(&mut self, sheet: Option<&str>) -> Result<DataTable> {
        self.sheet_rows(sheet).map(DataTable::raw)
    }

    /// Read every sheet in header mode, in workbook order.
    pub fn read_all(&mut self) -> Result<Vec<(String, DataTable)>> {
        let paths: Vec<(String, String)> = self
            .sheets
            .iter()
            .map(|s| (s.name.clone(), s.path.clone()))
            .collect();

        let archive = self.archive_mut()?;
        let mut parts = Vec::with_capacity(paths.len());
        for (name, path) in paths {
            let xml = read_part(archive, &path)?;
            parts.push((name, xml));
        }

        let strings = &self.strings;
        let decode = |(name, xml): &(String, Vec<u8>)| -> Result<(String, DataTable)> {
            let rows = parse_sheet_rows(Cursor::new(xml), strings)?;
            Ok((name.clone(), DataTable::with_header(rows)))
        };

        if parts.len() > 1 {
            parts.par_iter().map(decode).collect()
        } else {
            parts.iter().map(decode).collect()
        }
    }

    /// Release the source. Later calls fail with `DocumentClosed`.
    pub fn close(&mut self) {
        self.archive = None;
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| SheetError::InvalidFormat(format!("missing part {}: {}", path, e)))?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Sheet entries as (name, sheetId, relationship id).
fn parse_workbook_xml<R: BufRead>(reader: R) -> Result<Vec<(String, u32, Option<String>)>> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    let mut name = None;
                    let mut sheet_id = None;
                    let mut rel_id = None;
                    for attr in e.attributes().flatten() {
                        let local = attr.key.local_name();
                        match local.as_ref() {
                            b"name" => name = Some(attr.unescape_value()?.into_owned()),
                            b"sheetId" => sheet_id = String::from_utf8_lossy(&attr.value).parse().ok(),
                            // r:id
                            b"id" => rel_id = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                            _ => {}
                        }
                    }
                    if let (Some(name), Some(id)) = (name, sheet_id) {
                        sheets.push((name, id, rel_id));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Relationship (Id, Target) pairs.
fn parse_workbook_rels<R: BufRead>(reader: R) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(true);

    let mut rels = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    if let (Some(id), Some(target)) =
                        (attr_string(&e, b"Id"), attr_string(&e, b"Target"))
                    {
                        rels.push((id, target));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Cell type from the `t` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellKind {
    Shared,
    Text,
    Bool,
    Number,
}

impl CellKind {
    fn from_attr(value: &[u8]) -> Self {
        match value {
            b"s" => CellKind::Shared,
            b"str" | b"inlineStr" | b"e" | b"d" => CellKind::Text,
            b"b" => CellKind::Bool,
            _ => CellKind::Number,
        }
    }
}

fn decode_value(kind: CellKind, text: String, strings: &SharedStringTable) -> Value {
    match kind {
        CellKind::Shared => match text.trim().parse::<usize>() {
            Ok(index) => match strings.get(index) {
                Some(s) => Value::Text(s.to_string()),
                None => {
                    warn!(
                        "shared string index {} out of range ({} entries)",
                        index,
                        strings.len()
                    );
                    Value::Text(text)
                }
            },
            Err(_) => Value::Text(text),
        },
        CellKind::Text => Value::Text(text),
        CellKind::Bool => Value::Bool(matches!(text.trim(), "1" | "true" | "TRUE")),
        CellKind::Number => match parse_f64_bytes(text.trim().as_bytes()) {
            Some(n) => Value::Number(n),
            None => Value::Text(text),
        },
    }
}

fn place(row: &mut Vec<Value>, column: u32, value: Value) {
    let index = (column.clamp(1, MAX_COLUMN) - 1) as usize;
    if row.len() <= index {
        row.resize(index + 1, Value::Empty);
    }
    row[index] = value;
}

/// Decode `sheetData` into rows of values, in document order.
fn parse_sheet_rows<R: BufRead>(reader: R, strings: &SharedStringTable) -> Result<Vec<Vec<Value>>> {
    let mut reader = Reader::from_reader(reader);
    // Cell text keeps its whitespace.
    reader.config_mut().trim_text(false);

    let mut rows = Vec::new();
    let mut buf = Vec::new();

    let mut row: Option<Vec<Value>> = None;
    let mut column = 0u32;
    let mut kind = CellKind::Number;
    let mut text: Option<String> = None;
    let mut in_cell = false;
    let mut in_value = false;
    let mut in_phonetic = false;

    fn cell_start(e: &BytesStart, column: &mut u32, kind: &mut CellKind) {
        let mut reference = None;
        *kind = CellKind::Number;
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"r" => reference = parse_coordinate_bytes(&attr.value),
                b"t" => *kind = CellKind::from_attr(&attr.value),
                _ => {}
            }
        }
        *column = match reference {
            Some((_, col)) => col,
            None => column.saturating_add(1),
        };
    }

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    column = 0;
                }
                b"c" => {
                    cell_start(&e, &mut column, &mut kind);
                    in_cell = true;
                    text = None;
                }
                b"v" | b"t" if in_cell && !in_phonetic => in_value = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    rows.push(Vec::new());
                }
                b"c" => {
                    cell_start(&e, &mut column, &mut kind);
                    if let Some(row) = row.as_mut() {
                        place(row, column, Value::Empty);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_value {
                    let chunk = e.unescape()?;
                    text.get_or_insert_with(String::new).push_str(&chunk);
                }
            }
            Ok(Event::CData(e)) => {
                if in_value {
                    let chunk = String::from_utf8_lossy(&e);
                    text.get_or_insert_with(String::new).push_str(&chunk);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"rPh" => in_phonetic = false,
                b"c" => {
                    in_cell = false;
                    let value = match text.take() {
                        Some(t) => decode_value(kind, t, strings),
                        None => Value::Empty,
                    };
                    if let Some(row) = row.as_mut() {
                        place(row, column, value);
                    }
                }
                b"row" => {
                    if let Some(finished) = row.take() {
                        rows.push(finished);
                    }
                }
                b"sheetData" => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}
