use std::io::{Cursor, Read};

use image::{ImageFormat, Rgb, RgbImage};
use sheetforge_core::{
    CellStyle, CompressionLevel, Font, Image, SheetError, SpreadsheetReader, Workbook,
};
use zip::ZipArchive;

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn part(bytes: &[u8], path: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(path).unwrap();
    let mut xml = String::new();
    file.read_to_string(&mut xml).unwrap();
    xml
}

fn names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

#[test]
fn test_minimal_package_parts() {
    let wb = Workbook::new();
    let bytes = wb.save_to_bytes().unwrap();
    let parts = names(&bytes);

    for expected in [
        "[Content_Types].xml",
        "_rels/.rels",
        "docProps/core.xml",
        "docProps/app.xml",
        "xl/workbook.xml",
        "xl/_rels/workbook.xml.rels",
        "xl/styles.xml",
        "xl/sharedStrings.xml",
        "xl/worksheets/sheet1.xml",
    ] {
        assert!(parts.iter().any(|p| p == expected), "missing {}", expected);
    }
    assert!(!parts.iter().any(|p| p.starts_with("xl/drawings/")));

    let sst = part(&bytes, "xl/sharedStrings.xml");
    assert!(sst.contains(r#"count="0" uniqueCount="0""#));
}

#[test]
fn test_shared_string_counts() {
    let mut wb = Workbook::new();
    wb.set_row(1, 1, ["a", "b", "a", "a"], None).unwrap();
    let bytes = wb.save_to_bytes().unwrap();

    let sst = part(&bytes, "xl/sharedStrings.xml");
    assert!(sst.contains(r#"count="4" uniqueCount="2""#));
    assert!(sst.contains("<si><t>a</t></si><si><t>b</t></si>"));

    let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(r#"<c r="C1" t="s"><v>0</v></c>"#));
}

#[test]
fn test_two_images_share_one_drawing() {
    let mut wb = Workbook::new();
    let first = wb.insert_image(Image::from_bytes(png(10, 5)), 4, 2).unwrap();
    assert_eq!((first.number, first.id()), (1, 1025));
    let second = wb
        .insert_image_range(Image::from_bytes(png(3, 3)), 1, 1, 3, 3)
        .unwrap();
    assert_eq!((second.number, second.id()), (2, 1026));
    assert_eq!(wb.current().drawing().unwrap().len(), 2);

    let bytes = wb.save_to_bytes().unwrap();
    let parts = names(&bytes);
    assert!(parts.iter().any(|p| p == "xl/drawings/drawing1.xml"));
    assert!(!parts.iter().any(|p| p == "xl/drawings/drawing2.xml"));
    assert!(parts.iter().any(|p| p == "xl/media/image1.png"));
    assert!(parts.iter().any(|p| p == "xl/media/image2.png"));

    let drawing = part(&bytes, "xl/drawings/drawing1.xml");
    assert!(drawing.contains(r#"<xdr:cNvPr id="1025" name="Picture 1" descr=""/>"#));
    assert!(drawing.contains(r#"<xdr:cNvPr id="1026" name="Picture 2" descr=""/>"#));
    // 0-based markers with the fixed inset; 10x5 px at 96 dpi.
    assert!(drawing.contains(
        "<xdr:oneCellAnchor><xdr:from><xdr:col>1</xdr:col><xdr:colOff>14250</xdr:colOff><xdr:row>3</xdr:row><xdr:rowOff>14250</xdr:rowOff></xdr:from><xdr:ext cx=\"95250\" cy=\"47625\"/>"
    ));
    assert!(drawing.contains(r#"<xdr:twoCellAnchor editAs="oneCell">"#));

    let sheet_rels = part(&bytes, "xl/worksheets/_rels/sheet1.xml.rels");
    assert!(sheet_rels.contains(r#"Id="rId1""#));
    assert!(sheet_rels.contains(r#"Target="../drawings/drawing1.xml""#));

    let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.ends_with(r#"<drawing r:id="rId1"/></worksheet>"#));

    let content_types = part(&bytes, "[Content_Types].xml");
    assert!(content_types.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
    assert!(content_types.contains("/xl/drawings/drawing1.xml"));
}

#[test]
fn test_media_numbering_across_sheets() {
    let mut wb = Workbook::new();
    wb.insert_image_absolute(Image::from_bytes(png(2, 2)), 10.0, 20.0)
        .unwrap();
    wb.add_worksheet("Plain").unwrap();
    wb.add_worksheet("Pictures").unwrap();
    wb.insert_image_absolute_sized(Image::from_bytes(png(2, 2)), 0.0, 0.0, Some(100), None)
        .unwrap();

    let bytes = wb.save_to_bytes().unwrap();
    let parts = names(&bytes);
    assert!(parts.iter().any(|p| p == "xl/worksheets/_rels/sheet3.xml.rels"));
    assert!(!parts.iter().any(|p| p == "xl/worksheets/_rels/sheet2.xml.rels"));

    let rels = part(&bytes, "xl/worksheets/_rels/sheet3.xml.rels");
    assert!(rels.contains("../drawings/drawing2.xml"));
    let drawing_rels = part(&bytes, "xl/drawings/_rels/drawing2.xml.rels");
    assert!(drawing_rels.contains("../media/image2.png"));

    let first = part(&bytes, "xl/drawings/drawing1.xml");
    assert!(first.contains(r#"<xdr:pos x="127000" y="254000"/>"#));
    let second = part(&bytes, "xl/drawings/drawing2.xml");
    assert!(second.contains(r#"<xdr:ext cx="952500" cy="19050"/>"#));
}

#[test]
fn test_merge_cells_follow_auto_filter_and_protection() {
    let mut wb = Workbook::new();
    wb.set_row(1, 1, ["a", "b", "c"], None).unwrap();
    wb.merge_range("A3", "C3").unwrap();
    wb.protect_current(Some("password"));
    wb.set_auto_filter("A1:C2").unwrap();

    let sheet = part(&wb.save_to_bytes().unwrap(), "xl/worksheets/sheet1.xml");
    let protection = sheet.find("<sheetProtection").unwrap();
    let filter = sheet.find("<autoFilter").unwrap();
    let merges = sheet.find("<mergeCells").unwrap();
    let margins = sheet.find("<pageMargins").unwrap();

    assert!(sheet.contains(r#"<sheetProtection password="83AF""#));
    assert!(sheet.contains(r#"<mergeCells count="1"><mergeCell ref="A3:C3"/></mergeCells>"#));
    assert!(protection < filter);
    assert!(filter < merges);
    assert!(merges < margins);
}

#[test]
fn test_merge_cells_follow_sheet_data_by_default() {
    let mut wb = Workbook::new();
    wb.merge_cells(2, 2, 3, 4).unwrap();
    let sheet = part(&wb.save_to_bytes().unwrap(), "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(r#"</sheetData><mergeCells count="1"><mergeCell ref="B2:D3"/></mergeCells><pageMargins"#));
}

#[test]
fn test_merge_past_last_column_stays_in_grid() {
    let mut wb = Workbook::new();
    wb.merge_cells(1, 1, 1, 20_000).unwrap();
    let sheet = part(&wb.save_to_bytes().unwrap(), "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(r#"<mergeCell ref="A1:XFD1"/>"#));
    assert!(sheet.contains(r#"<c r="A1"/><c r="XFD1"/>"#));
}

#[test]
fn test_reversed_image_range_writes_ordered_anchor() {
    let mut wb = Workbook::new();
    wb.insert_image_range(Image::from_bytes(png(3, 3)), 5, 5, 2, 2)
        .unwrap();
    let drawing = part(&wb.save_to_bytes().unwrap(), "xl/drawings/drawing1.xml");
    assert!(drawing.contains("<xdr:from><xdr:col>1</xdr:col>"));
    assert!(drawing.contains("<xdr:to><xdr:col>4</xdr:col>"));
}

#[test]
fn test_unregistered_style_never_reaches_package() {
    let mut wb = Workbook::new();
    assert!(matches!(
        wb.set_cell(1, 1, "x", Some(999)),
        Err(SheetError::InvalidStyle(999))
    ));
    let style = wb
        .add_style(&CellStyle::new().with_font(Font::new().with_italic(true)))
        .unwrap();
    wb.set_cell(1, 1, "x", Some(style)).unwrap();

    let bytes = wb.save_to_bytes().unwrap();
    let styles = part(&bytes, "xl/styles.xml");
    assert!(styles.contains(&format!(r#"<cellXfs count="{}">"#, style + 1)));
    let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(&format!(r#"<c r="A1" s="{}" t="s">"#, style)));
    assert!(!sheet.contains(r#"s="999""#));
}

#[test]
fn test_compression_levels_read_back() {
    for level in [
        CompressionLevel::None,
        CompressionLevel::Fast,
        CompressionLevel::Default,
        CompressionLevel::Best,
    ] {
        let mut wb = Workbook::new();
        wb.set_compression(level);
        wb.set_row(1, 1, ["h"], None).unwrap();
        wb.set_row(2, 1, ["v"], None).unwrap();
        let mut reader = SpreadsheetReader::from_bytes(wb.save_to_bytes().unwrap()).unwrap();
        let table = reader.read(None).unwrap();
        assert_eq!(table.columns, ["h"], "level {:?}", level);
        assert_eq!(table.len(), 1);
    }
}

#[test]
fn test_active_sheet_and_creator() {
    let mut wb = Workbook::new();
    wb.set_creator("Ops & Co");
    wb.add_worksheet("Second").unwrap();
    let bytes = wb.save_to_bytes().unwrap();

    let workbook = part(&bytes, "xl/workbook.xml");
    assert!(workbook.contains(r#"activeTab="1""#));
    let second = part(&bytes, "xl/worksheets/sheet2.xml");
    assert!(second.contains(r#"tabSelected="1""#));
    let first = part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(!first.contains("tabSelected"));
    let core = part(&bytes, "docProps/core.xml");
    assert!(core.contains("<dc:creator>Ops &amp; Co</dc:creator>"));
}
