#![no_main]

//! Build a random workbook, save it, read it back and compare cell values.

use std::collections::HashMap;

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use sheetforge_core::{
    Alignment, Border, CellInput, CellStyle, Fill, Font, HorizontalAlignment, SpreadsheetReader,
    Value, Workbook,
};

const MAX_ROWS: u32 = 50;
const MAX_COLS: u32 = 20;
const MAX_SHEETS: usize = 3;
const MAX_CELLS_PER_SHEET: usize = 100;

#[derive(Debug, Clone)]
enum FuzzCellValue {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl<'a> Arbitrary<'a> for FuzzCellValue {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let choice: u8 = u.int_in_range(0..=3)?;
        Ok(match choice {
            0 => FuzzCellValue::Null,
            1 => {
                let len: usize = u.int_in_range(0..=50)?;
                let s: String = (0..len)
                    .map(|_| u.int_in_range(32u8..=126).unwrap_or(32) as char)
                    .collect();
                FuzzCellValue::Text(s)
            }
            2 => {
                let n: f64 = u.arbitrary()?;
                FuzzCellValue::Number(if n.is_finite() { n } else { 0.0 })
            }
            _ => FuzzCellValue::Bool(u.arbitrary()?),
        })
    }
}

impl FuzzCellValue {
    fn input(&self) -> CellInput {
        match self {
            FuzzCellValue::Null => CellInput::Null,
            FuzzCellValue::Text(s) => CellInput::from(s.as_str()),
            FuzzCellValue::Number(n) => CellInput::from(*n),
            FuzzCellValue::Bool(b) => CellInput::from(*b),
        }
    }

    /// The value the reader should produce.
    fn expected(&self) -> Value {
        match self {
            FuzzCellValue::Null => Value::Text(String::new()),
            FuzzCellValue::Text(s) => Value::Text(s.clone()),
            FuzzCellValue::Number(n) => Value::Number(*n),
            FuzzCellValue::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzCell {
    row: u8,
    col: u8,
    value: FuzzCellValue,
    has_style: bool,
    bold: bool,
    bordered: bool,
    font_size: u8,
    bg_color: Option<[u8; 3]>,
    h_align: u8,
}

#[derive(Debug)]
struct FuzzSheet {
    name: String,
    cells: Vec<FuzzCell>,
    merges: Vec<(u32, u32, u32, u32)>,
}

impl<'a> Arbitrary<'a> for FuzzSheet {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let name_len: usize = u.int_in_range(1..=15)?;
        let name: String = (0..name_len)
            .map(|_| {
                let c: u8 = u.int_in_range(0..=35).unwrap_or(0);
                if c < 10 {
                    (b'0' + c) as char
                } else {
                    (b'A' + c - 10) as char
                }
            })
            .collect();

        let num_cells: usize = u.int_in_range(0..=MAX_CELLS_PER_SHEET)?;
        let mut cells = Vec::with_capacity(num_cells);
        for _ in 0..num_cells {
            cells.push(u.arbitrary()?);
        }

        let num_merges: usize = u.int_in_range(0..=3)?;
        let mut merges = Vec::with_capacity(num_merges);
        for _ in 0..num_merges {
            let r1: u32 = u.int_in_range(1..=5)?;
            let c1: u32 = u.int_in_range(1..=5)?;
            let r2: u32 = u.int_in_range(r1..=r1 + 2)?;
            let c2: u32 = u.int_in_range(c1..=c1 + 2)?;
            merges.push((r1, c1, r2, c2));
        }

        Ok(FuzzSheet { name, cells, merges })
    }
}

fn build_style(cell: &FuzzCell) -> Option<CellStyle> {
    if !cell.has_style {
        return None;
    }

    let mut font = Font::new().with_size(cell.font_size.clamp(8, 72) as f64);
    if cell.bold {
        font = font.with_bold(true);
    }
    let mut style = CellStyle::new().with_font(font);
    if let Some([r, g, b]) = cell.bg_color {
        style = style.with_fill(Fill::solid(format!("{:02X}{:02X}{:02X}", r, g, b)));
    }
    if cell.bordered {
        style = style.with_border(Border::thin("000000"));
    }
    let horizontal = match cell.h_align % 4 {
        0 => HorizontalAlignment::General,
        1 => HorizontalAlignment::Left,
        2 => HorizontalAlignment::Center,
        _ => HorizontalAlignment::Right,
    };
    Some(style.with_alignment(Alignment::new().with_horizontal(horizontal)))
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(num_sheets) = u.int_in_range(1..=MAX_SHEETS) else {
        return;
    };

    let mut wb = Workbook::new();
    let mut expected: Vec<(String, HashMap<(u32, u32), Value>)> = Vec::new();

    for i in 0..num_sheets {
        let Ok(sheet) = FuzzSheet::arbitrary(&mut u) else {
            break;
        };
        let name = if i == 0 {
            wb.rename_current_worksheet(&sheet.name).ok();
            wb.current().name().to_string()
        } else {
            match wb.add_worksheet(&sheet.name) {
                Ok(ws) => ws.name().to_string(),
                Err(_) => continue,
            }
        };

        let mut cells = HashMap::new();
        for cell in &sheet.cells {
            let row = (cell.row as u32 % MAX_ROWS).max(1);
            let col = (cell.col as u32 % MAX_COLS).max(1);
            let style = build_style(cell)
                .map(|s| wb.add_style(&s).expect("built-in styles only"));
            wb.set_cell(row, col, cell.value.input(), style)
                .expect("registered style and finite values");
            cells.insert((row, col), cell.value.expected());
        }

        for &(r1, c1, r2, c2) in &sheet.merges {
            let _ = wb.merge_cells(r1, c1, r2, c2);
        }

        expected.push((name, cells));
    }

    let bytes = wb.save_to_bytes().expect("saving an in-memory workbook");
    let mut reader = SpreadsheetReader::from_bytes(bytes).expect("reading what we just saved");

    for (name, cells) in &expected {
        let table = reader
            .read_raw(Some(name))
            .unwrap_or_else(|e| panic!("sheet {:?} unreadable: {}", name, e));

        // Rows without cells are not written, so map row numbers to positions.
        let row_numbers: Vec<u32> = wb
            .worksheet(name)
            .map(|ws| ws.rows().iter().map(|r| r.index).collect())
            .unwrap_or_default();
        assert_eq!(row_numbers.len(), table.len(), "row count mismatch in {:?}", name);

        for ((row, col), want) in cells {
            let position = row_numbers
                .iter()
                .position(|r| r == row)
                .expect("written row present");
            let got = table.get(position, (*col - 1) as usize).unwrap_or(&Value::Empty);
            assert_eq!(got, want, "cell {}:{},{} mismatch", name, row, col);
        }
    }
});
