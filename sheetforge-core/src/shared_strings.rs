//! Shared string table: the workbook-wide pool of cell text.

use std::io::BufRead;
use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;
use crate::writer::{escape_xml, needs_space_preserve};

#[cfg(feature = "fast-hash")]
type StringIndex = hashbrown::HashMap<Arc<str>, usize, ahash::RandomState>;
#[cfg(not(feature = "fast-hash"))]
type StringIndex = std::collections::HashMap<Arc<str>, usize>;

/// Interned text values addressed by their first-insertion position.
///
/// Indices are stable: once a text has an index it keeps it for the life of the
/// table. Lookups go through a hash index; the observable behavior is the same
/// as a linear scan for the first exact match.
#[derive(Clone, Debug, Default)]
pub struct SharedStringTable {
    strings: Vec<Arc<str>>,
    index: StringIndex,
    /// Number of intern calls, written as the part's `count` attribute.
    references: usize,
}

impl SharedStringTable {
    /// Create an empty table. The first interned text receives index 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index of `text`, appending it if it is not present yet.
    pub fn intern(&mut self, text: &str) -> usize {
        self.references += 1;
        if let Some(&idx) = self.index.get(text) {
            return idx;
        }
        let idx = self.strings.len();
        let entry: Arc<str> = Arc::from(text);
        self.strings.push(entry.clone());
        self.index.insert(entry, idx);
        idx
    }

    /// Look up the text stored at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(|s| s.as_ref())
    }

    /// Number of distinct entries.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Total number of intern calls, including repeats.
    pub fn reference_count(&self) -> usize {
        self.references
    }

    /// Iterate the entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(|s| s.as_ref())
    }

    /// Bulk-load a table from a `sharedStrings.xml` part.
    ///
    /// Rich-text runs inside one `<si>` are concatenated; phonetic runs (`<rPh>`) are
    /// skipped. Every `<si>` occupies an index even when its text repeats an
    /// earlier entry, so positions match the part exactly.
    pub fn from_xml<R: BufRead>(reader: R) -> Result<Self> {
        let mut reader = Reader::from_reader(reader);
        // Whitespace inside <t> is significant
        reader.config_mut().trim_text(false);

        let mut table = SharedStringTable::new();
        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"t" if !in_phonetic => in_t = true,
                    b"rPh" => in_phonetic = true,
                    b"si" => current.clear(),
                    _ => {}
                },
                Event::Text(e) if in_t => {
                    current.push_str(&e.unescape()?);
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"t" => in_t = false,
                    b"rPh" => in_phonetic = false,
                    b"si" => table.push_loaded(&current),
                    _ => {}
                },
                Event::Empty(e) if e.local_name().as_ref() == b"si" => table.push_loaded(""),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(table)
    }

    fn push_loaded(&mut self, text: &str) {
        let entry: Arc<str> = Arc::from(text);
        let idx = self.strings.len();
        self.strings.push(entry.clone());
        self.index.entry(entry).or_insert(idx);
    }

    /// Serialize the table as a `sharedStrings.xml` part.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(128 + self.strings.len() * 32);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
            self.references.max(self.strings.len()),
            self.strings.len()
        ));
        for text in &self.strings {
            if needs_space_preserve(text) {
                xml.push_str(r#"<si><t xml:space="preserve">"#);
            } else {
                xml.push_str("<si><t>");
            }
            xml.push_str(&escape_xml(text));
            xml.push_str("</t></si>");
        }
        xml.push_str("</sst>");
        xml
    }
}
