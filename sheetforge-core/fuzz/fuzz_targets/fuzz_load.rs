#![no_main]

//! Fuzz target for package loading.
//!
//! Arbitrary bytes are fed to the reader both as a whole package and as the
//! body of a worksheet, shared strings or workbook part inside an otherwise
//! valid package. Errors are fine; panics are not.

use std::io::{Cursor, Write};

use libfuzzer_sys::fuzz_target;
use sheetforge_core::SpreadsheetReader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const WORKBOOK: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/><sheet name="Sheet2" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

const RELS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

const SHEET: &[u8] = br#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row></sheetData></worksheet>"#;

const STRINGS: &[u8] = br#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="1" uniqueCount="1"><si><t>x</t></si></sst>"#;

fn exercise(bytes: Vec<u8>) {
    let Ok(mut reader) = SpreadsheetReader::from_bytes(bytes) else {
        return;
    };
    let _ = reader.sheet_names();
    if let Ok(table) = reader.read(None) {
        for row in &table.rows {
            assert_eq!(row.len(), table.columns.len(), "unpadded row");
        }
    }
    let _ = reader.read_raw(Some("Sheet2"));
    let _ = reader.read_all();
    reader.close();
    assert!(reader.read(None).is_err());
}

/// A package whose parts are the defaults except `fuzzed_path`.
fn package_with(fuzzed_path: &str, data: &[u8]) -> Vec<u8> {
    let parts: [(&str, &[u8]); 5] = [
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", RELS),
        ("xl/sharedStrings.xml", STRINGS),
        ("xl/worksheets/sheet1.xml", SHEET),
        ("xl/worksheets/sheet2.xml", SHEET),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (path, body) in parts {
        let body = if path == fuzzed_path { data } else { body };
        if zip.start_file(path, options).is_err() || zip.write_all(body).is_err() {
            return Vec::new();
        }
    }
    zip.finish().map(|c| c.into_inner()).unwrap_or_default()
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    exercise(data.to_vec());

    if data.len() < 64 * 1024 {
        for path in [
            "xl/worksheets/sheet1.xml",
            "xl/sharedStrings.xml",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
        ] {
            exercise(package_with(path, data));
        }
    }
});
