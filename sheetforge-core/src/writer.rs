//! Package assembly: XML parts and the ZIP container.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::io::{Seek, Write};

use chrono::{SecondsFormat, Utc};
use zip::write::{ExtendedFileOptions, FileOptions};
use zip::{CompressionMethod, ZipWriter};

use crate::cell::CellValue;
use crate::coordinate::column_index_to_name;
use crate::drawing::{Anchor, Drawing, Extent, Marker, Picture};
use crate::error::Result;
use crate::style::{Border, Edge, Fill, Font, PatternType, StyleRegistry};
use crate::workbook::{CompressionLevel, Workbook};
use crate::worksheet::{insert_merge_cells, SheetSection, Worksheet};

pub(crate) type ZipOptions = FileOptions<'static, ExtendedFileOptions>;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_XDR: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
const REL_DRAWING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Escape text for element content or attribute values.
///
/// Characters XML 1.0 cannot represent at all (C0 controls other than tab,
/// line feed and carriage return) are dropped. Carriage returns are written as
/// character references so parsers do not normalize them away.
pub fn escape_xml(text: &str) -> Cow<'_, str> {
    if !text
        .chars()
        .any(|c| matches!(c, '&' | '<' | '>' | '"' | '\r') || is_forbidden_xml_char(c))
    {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#13;"),
            c if is_forbidden_xml_char(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn is_forbidden_xml_char(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}')
}

/// Whether a `<t>` element needs `xml:space="preserve"` to keep its whitespace.
pub fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || text.contains('\n')
}

/// Normalize a color to the ARGB form the format stores (`"FF0000"` becomes
/// `"FFFF0000"`, `"#000"` becomes `"FF000000"`).
pub fn argb(color: &str) -> String {
    let hex = color.trim().trim_start_matches('#');
    match hex.len() {
        3 => {
            let mut out = String::from("FF");
            for c in hex.chars() {
                out.push(c);
                out.push(c);
            }
            out.to_ascii_uppercase()
        }
        6 => format!("FF{}", hex.to_ascii_uppercase()),
        _ => hex.to_ascii_uppercase(),
    }
}

pub(crate) fn file_options(level: CompressionLevel) -> ZipOptions {
    let options = FileOptions::default().large_file(false);
    match level {
        CompressionLevel::None => options.compression_method(CompressionMethod::Stored),
        CompressionLevel::Fast => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(1)),
        CompressionLevel::Default => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(6)),
        CompressionLevel::Best => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9)),
    }
}

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: &ZipOptions,
    path: &str,
    content: &[u8],
) -> Result<()> {
    zip.start_file(path, options.clone())?;
    zip.write_all(content)?;
    Ok(())
}

/// Package numbering of one worksheet's images.
struct DrawingPlan {
    /// 1-based position of the sheet in the workbook.
    sheet_number: usize,
    /// `k` in `xl/drawings/drawing{k}.xml`.
    drawing_number: usize,
    /// `n` in `xl/media/image{n}.ext`, one per picture.
    media_numbers: Vec<usize>,
}

fn plan_drawings(worksheets: &[Worksheet]) -> Vec<DrawingPlan> {
    let mut plans = Vec::new();
    let mut next_media = 1;
    for (idx, sheet) in worksheets.iter().enumerate() {
        if let Some(drawing) = sheet.drawing().filter(|d| !d.is_empty()) {
            let media_numbers = (next_media..next_media + drawing.len()).collect();
            next_media += drawing.len();
            plans.push(DrawingPlan {
                sheet_number: idx + 1,
                drawing_number: plans.len() + 1,
                media_numbers,
            });
        }
    }
    plans
}

/// Serialize a workbook into a ZIP package written to `sink`.
pub fn write_package<W: Write + Seek>(workbook: &Workbook, sink: W) -> Result<W> {
    let options = file_options(workbook.compression);
    let mut zip = ZipWriter::new(sink);
    let worksheets = workbook.worksheets();
    let plans = plan_drawings(worksheets);

    let media_extensions: BTreeSet<&str> = plans
        .iter()
        .flat_map(|plan| pictures_of(worksheets, plan))
        .map(|pic| pic.image.extension())
        .collect();

    write_part(
        &mut zip,
        &options,
        "[Content_Types].xml",
        content_types_xml(worksheets.len(), plans.len(), &media_extensions).as_bytes(),
    )?;
    write_part(&mut zip, &options, "_rels/.rels", root_rels_xml().as_bytes())?;
    write_part(
        &mut zip,
        &options,
        "docProps/core.xml",
        core_props_xml(workbook.creator()).as_bytes(),
    )?;
    write_part(
        &mut zip,
        &options,
        "docProps/app.xml",
        app_props_xml(worksheets).as_bytes(),
    )?;
    write_part(
        &mut zip,
        &options,
        "xl/workbook.xml",
        workbook_xml(worksheets, workbook.current_index()).as_bytes(),
    )?;
    write_part(
        &mut zip,
        &options,
        "xl/_rels/workbook.xml.rels",
        workbook_rels_xml(worksheets.len()).as_bytes(),
    )?;
    write_part(
        &mut zip,
        &options,
        "xl/styles.xml",
        styles_xml(workbook.styles()).as_bytes(),
    )?;
    write_part(
        &mut zip,
        &options,
        "xl/sharedStrings.xml",
        workbook.shared_strings().to_xml().as_bytes(),
    )?;

    for (idx, sheet) in worksheets.iter().enumerate() {
        let has_drawing = plans.iter().any(|p| p.sheet_number == idx + 1);
        let xml = worksheet_xml(sheet, idx == workbook.current_index(), has_drawing);
        write_part(
            &mut zip,
            &options,
            &format!("xl/worksheets/sheet{}.xml", idx + 1),
            xml.as_bytes(),
        )?;
    }

    for plan in &plans {
        let sheet = &worksheets[plan.sheet_number - 1];
        let Some(drawing) = sheet.drawing() else {
            continue;
        };
        write_part(
            &mut zip,
            &options,
            &format!("xl/worksheets/_rels/sheet{}.xml.rels", plan.sheet_number),
            sheet_rels_xml(plan.drawing_number).as_bytes(),
        )?;
        write_part(
            &mut zip,
            &options,
            &format!("xl/drawings/drawing{}.xml", plan.drawing_number),
            drawing_xml(drawing).as_bytes(),
        )?;
        write_part(
            &mut zip,
            &options,
            &format!("xl/drawings/_rels/drawing{}.xml.rels", plan.drawing_number),
            drawing_rels_xml(drawing, &plan.media_numbers).as_bytes(),
        )?;
        for (pic, media) in drawing.pictures().iter().zip(&plan.media_numbers) {
            write_part(
                &mut zip,
                &options,
                &format!("xl/media/image{}.{}", media, pic.image.extension()),
                pic.image.data(),
            )?;
        }
    }

    Ok(zip.finish()?)
}

fn pictures_of<'a>(worksheets: &'a [Worksheet], plan: &DrawingPlan) -> &'a [Picture] {
    worksheets[plan.sheet_number - 1]
        .drawing()
        .map(|d| d.pictures())
        .unwrap_or(&[])
}

pub(crate) fn content_types_xml(
    sheet_count: usize,
    drawing_count: usize,
    media_extensions: &BTreeSet<&str>,
) -> String {
    let mut xml = String::with_capacity(2048);
    xml.push_str(XML_DECL);
    xml.push_str(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    );
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    for ext in media_extensions {
        xml.push_str(&format!(
            r#"<Default Extension="{}" ContentType="image/{}"/>"#,
            ext, ext
        ));
    }
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    for n in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            n
        ));
    }
    for k in 1..=drawing_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/drawings/drawing{}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>"#,
            k
        ));
    }
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
    xml.push_str(r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
    xml.push_str(r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#);
    xml.push_str("</Types>");
    xml
}

fn root_rels_xml() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#
    )
}

fn core_props_xml(creator: &str) -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:creator>{creator}</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#,
        creator = escape_xml(creator),
        now = now
    )
}

fn app_props_xml(worksheets: &[Worksheet]) -> String {
    let mut titles = String::new();
    for sheet in worksheets {
        titles.push_str("<vt:lpstr>");
        titles.push_str(&escape_xml(sheet.name()));
        titles.push_str("</vt:lpstr>");
    }
    format!(
        r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>sheetforge</Application><HeadingPairs><vt:vector size="2" baseType="variant"><vt:variant><vt:lpstr>Worksheets</vt:lpstr></vt:variant><vt:variant><vt:i4>{count}</vt:i4></vt:variant></vt:vector></HeadingPairs><TitlesOfParts><vt:vector size="{count}" baseType="lpstr">{titles}</vt:vector></TitlesOfParts></Properties>"#,
        count = worksheets.len(),
        titles = titles
    )
}

pub(crate) fn workbook_xml(worksheets: &[Worksheet], active: usize) -> String {
    let mut xml = String::with_capacity(512 + worksheets.len() * 64);
    xml.push_str(XML_DECL);
    xml.push_str(&format!(
        r#"<workbook xmlns="{NS_MAIN}" xmlns:r="{NS_REL}"><bookViews><workbookView activeTab="{active}"/></bookViews><sheets>"#
    ));
    for (idx, sheet) in worksheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape_xml(sheet.name()),
            sheet.sheet_id(),
            idx + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::with_capacity(256 + sheet_count * 160);
    xml.push_str(XML_DECL);
    xml.push_str(&format!(r#"<Relationships xmlns="{NS_PKG_REL}">"#));
    for n in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="{REL_WORKSHEET}" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="{REL_STYLES}" Target="styles.xml"/>"#,
        sheet_count + 1
    ));
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="{REL_SHARED_STRINGS}" Target="sharedStrings.xml"/>"#,
        sheet_count + 2
    ));
    xml.push_str("</Relationships>");
    xml
}

fn font_xml(xml: &mut String, font: &Font) {
    xml.push_str("<font>");
    if font.bold {
        xml.push_str("<b/>");
    }
    if font.italic {
        xml.push_str("<i/>");
    }
    if font.strike {
        xml.push_str("<strike/>");
    }
    if font.underline {
        xml.push_str("<u/>");
    }
    xml.push_str(&format!(
        r#"<sz val="{}"/>"#,
        ryu::Buffer::new().format(font.size.unwrap_or(11.0)).trim_end_matches(".0")
    ));
    if let Some(color) = &font.color {
        xml.push_str(&format!(r#"<color rgb="{}"/>"#, escape_xml(&argb(color))));
    }
    xml.push_str(&format!(
        r#"<name val="{}"/>"#,
        escape_xml(font.name.as_deref().unwrap_or("Arial"))
    ));
    xml.push_str("</font>");
}

fn fill_xml(xml: &mut String, fill: &Fill) {
    match (fill.pattern, &fill.fg_color) {
        (PatternType::Solid, Some(color)) => xml.push_str(&format!(
            r#"<fill><patternFill patternType="solid"><fgColor rgb="{}"/><bgColor indexed="64"/></patternFill></fill>"#,
            escape_xml(&argb(color))
        )),
        (pattern, _) => xml.push_str(&format!(
            r#"<fill><patternFill patternType="{}"/></fill>"#,
            pattern.as_str()
        )),
    }
}

fn edge_xml(xml: &mut String, tag: &str, edge: Option<&Edge>) {
    match edge {
        Some(edge) => {
            xml.push_str(&format!(r#"<{} style="{}">"#, tag, edge.line.as_str()));
            match &edge.color {
                Some(color) => {
                    xml.push_str(&format!(r#"<color rgb="{}"/>"#, escape_xml(&argb(color))))
                }
                None => xml.push_str(r#"<color auto="1"/>"#),
            }
            xml.push_str(&format!("</{}>", tag));
        }
        None => xml.push_str(&format!("<{}/>", tag)),
    }
}

fn border_xml(xml: &mut String, border: &Border) {
    xml.push_str("<border>");
    edge_xml(xml, "left", border.left.as_ref());
    edge_xml(xml, "right", border.right.as_ref());
    edge_xml(xml, "top", border.top.as_ref());
    edge_xml(xml, "bottom", border.bottom.as_ref());
    xml.push_str("<diagonal/></border>");
}

/// Serialize the style registry as `xl/styles.xml`.
pub fn styles_xml(styles: &StyleRegistry) -> String {
    let mut xml = String::with_capacity(4096);
    xml.push_str(XML_DECL);
    xml.push_str(&format!(r#"<styleSheet xmlns="{NS_MAIN}">"#));

    let num_fmts = styles.custom_number_formats();
    if !num_fmts.is_empty() {
        xml.push_str(&format!(r#"<numFmts count="{}">"#, num_fmts.len()));
        for fmt in num_fmts {
            xml.push_str(&format!(
                r#"<numFmt numFmtId="{}" formatCode="{}"/>"#,
                fmt.id,
                escape_xml(&fmt.code)
            ));
        }
        xml.push_str("</numFmts>");
    }

    xml.push_str(&format!(r#"<fonts count="{}">"#, styles.fonts().len()));
    for font in styles.fonts() {
        font_xml(&mut xml, font);
    }
    xml.push_str("</fonts>");

    xml.push_str(&format!(r#"<fills count="{}">"#, styles.fills().len()));
    for fill in styles.fills() {
        fill_xml(&mut xml, fill);
    }
    xml.push_str("</fills>");

    xml.push_str(&format!(r#"<borders count="{}">"#, styles.borders().len()));
    for border in styles.borders() {
        border_xml(&mut xml, border);
    }
    xml.push_str("</borders>");

    xml.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);

    xml.push_str(&format!(r#"<cellXfs count="{}">"#, styles.cell_formats().len()));
    for xf in styles.cell_formats() {
        xml.push_str(&format!(
            r#"<xf numFmtId="{}" fontId="{}" fillId="{}" borderId="{}" xfId="0""#,
            xf.num_fmt_id, xf.font_id, xf.fill_id, xf.border_id
        ));
        if xf.apply {
            xml.push_str(r#" applyNumberFormat="1" applyFont="1" applyFill="1" applyBorder="1""#);
        }
        match xf.alignment {
            Some(alignment) => {
                xml.push_str(r#" applyAlignment="1"><alignment"#);
                xml.push_str(&format!(
                    r#" horizontal="{}" vertical="{}""#,
                    alignment.horizontal.as_str(),
                    alignment.vertical.as_str()
                ));
                if alignment.wrap_text {
                    xml.push_str(r#" wrapText="1""#);
                }
                xml.push_str("/></xf>");
            }
            None => xml.push_str("/>"),
        }
    }
    xml.push_str("</cellXfs>");

    xml.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);
    xml.push_str("</styleSheet>");
    xml
}

fn sheet_data_xml(sheet: &Worksheet) -> String {
    let mut xml = String::with_capacity(64 + sheet.cell_count() * 32);
    let mut row_buf = itoa::Buffer::new();
    xml.push_str("<sheetData>");
    for row in sheet.rows() {
        xml.push_str(r#"<row r=""#);
        xml.push_str(row_buf.format(row.index));
        xml.push_str(r#"">"#);
        for cell in row.cells() {
            xml.push_str(r#"<c r=""#);
            xml.push_str(&column_index_to_name(cell.column));
            xml.push_str(row_buf.format(row.index));
            xml.push('"');
            if let Some(style) = cell.style_index {
                xml.push_str(r#" s=""#);
                xml.push_str(itoa::Buffer::new().format(style));
                xml.push('"');
            }
            match &cell.value {
                CellValue::Empty => xml.push_str("/>"),
                CellValue::SharedString(idx) => {
                    xml.push_str(r#" t="s"><v>"#);
                    xml.push_str(itoa::Buffer::new().format(*idx));
                    xml.push_str("</v></c>");
                }
                CellValue::Number(token) => {
                    xml.push_str("><v>");
                    xml.push_str(&escape_xml(token));
                    xml.push_str("</v></c>");
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");
    xml
}

/// Assemble the children of a worksheet root in schema order.
pub(crate) fn worksheet_parts(
    sheet: &Worksheet,
    selected: bool,
    has_drawing: bool,
) -> Vec<(SheetSection, String)> {
    let mut parts = Vec::with_capacity(8);

    let dimension = sheet
        .dimension()
        .map(|range| {
            if range.width() == 1 && range.height() == 1 {
                range.top_left()
            } else {
                range.to_string()
            }
        })
        .unwrap_or_else(|| "A1".to_string());
    parts.push((
        SheetSection::Dimension,
        format!(r#"<dimension ref="{}"/>"#, dimension),
    ));

    let tab = if selected { r#" tabSelected="1""# } else { "" };
    parts.push((
        SheetSection::SheetViews,
        format!(r#"<sheetViews><sheetView{} workbookViewId="0"/></sheetViews>"#, tab),
    ));
    parts.push((
        SheetSection::SheetFormatPr,
        r#"<sheetFormatPr defaultRowHeight="15"/>"#.to_string(),
    ));
    parts.push((SheetSection::SheetData, sheet_data_xml(sheet)));

    if let Some(protection) = sheet.protection() {
        let password = protection
            .password_hash
            .as_ref()
            .map(|hash| format!(r#" password="{}""#, hash))
            .unwrap_or_default();
        parts.push((
            SheetSection::SheetProtection,
            format!(r#"<sheetProtection{} sheet="1" objects="1" scenarios="1"/>"#, password),
        ));
    }

    if let Some(range) = sheet.auto_filter() {
        parts.push((
            SheetSection::AutoFilter,
            format!(r#"<autoFilter ref="{}"/>"#, range),
        ));
    }

    parts.push((
        SheetSection::PageMargins,
        r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#
            .to_string(),
    ));

    if has_drawing {
        parts.push((SheetSection::Drawing, r#"<drawing r:id="rId1"/>"#.to_string()));
    }

    let regions = sheet.merged_regions();
    if !regions.is_empty() {
        let mut merge = format!(r#"<mergeCells count="{}">"#, regions.len());
        for region in regions {
            merge.push_str(&format!(r#"<mergeCell ref="{}"/>"#, region));
        }
        merge.push_str("</mergeCells>");
        insert_merge_cells(&mut parts, merge);
    }

    parts
}

/// Serialize one worksheet part.
pub fn worksheet_xml(sheet: &Worksheet, selected: bool, has_drawing: bool) -> String {
    let parts = worksheet_parts(sheet, selected, has_drawing);
    let body_len: usize = parts.iter().map(|(_, xml)| xml.len()).sum();

    let mut xml = String::with_capacity(256 + body_len);
    xml.push_str(XML_DECL);
    xml.push_str(&format!(r#"<worksheet xmlns="{NS_MAIN}" xmlns:r="{NS_REL}">"#));
    for (_, part) in &parts {
        xml.push_str(part);
    }
    xml.push_str("</worksheet>");
    xml
}

fn sheet_rels_xml(drawing_number: usize) -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{REL_DRAWING}" Target="../drawings/drawing{drawing_number}.xml"/></Relationships>"#
    )
}

fn drawing_rels_xml(drawing: &Drawing, media_numbers: &[usize]) -> String {
    let mut xml = String::with_capacity(256 + drawing.len() * 160);
    xml.push_str(XML_DECL);
    xml.push_str(&format!(r#"<Relationships xmlns="{NS_PKG_REL}">"#));
    for (idx, (pic, media)) in drawing.pictures().iter().zip(media_numbers).enumerate() {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{REL_IMAGE}" Target="../media/image{}.{}"/>"#,
            idx + 1,
            media,
            pic.image.extension()
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn marker_xml(xml: &mut String, tag: &str, marker: &Marker) {
    xml.push_str(&format!(
        "<xdr:{tag}><xdr:col>{}</xdr:col><xdr:colOff>{}</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>{}</xdr:rowOff></xdr:{tag}>",
        marker.col, marker.col_offset, marker.row, marker.row_offset
    ));
}

fn ext_xml(xml: &mut String, extent: &Extent) {
    xml.push_str(&format!(r#"<xdr:ext cx="{}" cy="{}"/>"#, extent.cx, extent.cy));
}

fn pic_xml(xml: &mut String, pic: &Picture, embed: usize) {
    xml.push_str(&format!(
        r#"<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{}" name="{}" descr=""/><xdr:cNvPicPr><a:picLocks noChangeAspect="1" noChangeArrowheads="1"/></xdr:cNvPicPr></xdr:nvPicPr>"#,
        pic.id(),
        pic.name()
    ));
    xml.push_str(&format!(
        r#"<xdr:blipFill><a:blip r:embed="rId{}" cstate="print"/><a:srcRect/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill>"#,
        embed
    ));
    xml.push_str(&format!(
        r#"<xdr:spPr bwMode="auto"><a:xfrm><a:off x="0" y="0"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></xdr:spPr></xdr:pic>"#,
        pic.extent.cx, pic.extent.cy
    ));
}

/// Serialize a worksheet's drawing part.
pub fn drawing_xml(drawing: &Drawing) -> String {
    let mut xml = String::with_capacity(256 + drawing.len() * 1024);
    xml.push_str(XML_DECL);
    xml.push_str(&format!(
        r#"<xdr:wsDr xmlns:xdr="{NS_XDR}" xmlns:a="{NS_A}" xmlns:r="{NS_REL}">"#
    ));
    for (idx, pic) in drawing.pictures().iter().enumerate() {
        match &pic.anchor {
            Anchor::TwoCell { from, to } => {
                xml.push_str(r#"<xdr:twoCellAnchor editAs="oneCell">"#);
                marker_xml(&mut xml, "from", from);
                marker_xml(&mut xml, "to", to);
                pic_xml(&mut xml, pic, idx + 1);
                xml.push_str("<xdr:clientData/></xdr:twoCellAnchor>");
            }
            Anchor::OneCell { from, extent } => {
                xml.push_str("<xdr:oneCellAnchor>");
                marker_xml(&mut xml, "from", from);
                ext_xml(&mut xml, extent);
                pic_xml(&mut xml, pic, idx + 1);
                xml.push_str("<xdr:clientData/></xdr:oneCellAnchor>");
            }
            Anchor::Absolute { position, extent } => {
                xml.push_str("<xdr:absoluteAnchor>");
                xml.push_str(&format!(
                    r#"<xdr:pos x="{}" y="{}"/>"#,
                    position.x, position.y
                ));
                ext_xml(&mut xml, extent);
                pic_xml(&mut xml, pic, idx + 1);
                xml.push_str("<xdr:clientData/></xdr:absoluteAnchor>");
            }
        }
    }
    xml.push_str("</xdr:wsDr>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CellRange;
    use crate::drawing::Image;
    use crate::style::{CellStyle, NumberFormat};

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("plain"), "plain");
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
        assert_eq!(escape_xml("bell\u{7}"), "bell");
        assert_eq!(escape_xml("a\r\nb"), "a&#13;\nb");
    }

    #[test]
    fn test_needs_space_preserve() {
        assert!(needs_space_preserve(" lead"));
        assert!(needs_space_preserve("trail "));
        assert!(needs_space_preserve("two\nlines"));
        assert!(!needs_space_preserve("inner space"));
        assert!(!needs_space_preserve(""));
    }

    #[test]
    fn test_argb() {
        assert_eq!(argb("ff0000"), "FFFF0000");
        assert_eq!(argb("#000"), "FF000000");
        assert_eq!(argb("80112233"), "80112233");
    }

    #[test]
    fn test_styles_xml_counts() {
        let mut styles = StyleRegistry::new();
        styles.register_cell_format(
            &CellStyle::new()
                .with_fill(Fill::solid("FFFF00"))
                .with_number_format(NumberFormat::custom("0.00%")),
        )
        .unwrap();
        let xml = styles_xml(&styles);

        assert!(xml.contains(&format!(r#"<fonts count="{}">"#, styles.fonts().len())));
        assert!(xml.contains(&format!(r#"<fills count="{}">"#, styles.fills().len())));
        assert!(xml.contains(&format!(r#"<cellXfs count="{}">"#, styles.cell_formats().len())));
        assert!(xml.contains(r#"<numFmt numFmtId="164" formatCode="0.00%"/>"#));
        assert!(xml.contains(r#"<patternFill patternType="gray125"/>"#));
        assert!(xml.contains(r#"<fgColor rgb="FFFFFF00"/>"#));
        assert!(xml.contains(r#"<sz val="11"/><name val="Arial"/>"#));
        // Default xf carries no alignment.
        assert!(xml.contains(r#"<cellXfs count="6"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#));
    }

    #[test]
    fn test_sheet_data_xml() {
        let mut sheet = Worksheet::new(1, "S".into());
        sheet.set_value(2, 28, CellValue::Number("3.5".into()), Some(4));
        sheet.set_value(2, 1, CellValue::SharedString(0), None);
        sheet.ensure_cell(1, 1);

        let xml = sheet_data_xml(&sheet);
        assert_eq!(
            xml,
            r#"<sheetData><row r="1"><c r="A1"/></row><row r="2"><c r="A2" t="s"><v>0</v></c><c r="AB2" s="4"><v>3.5</v></c></row></sheetData>"#
        );
    }

    #[test]
    fn test_worksheet_section_order() {
        let mut sheet = Worksheet::new(1, "S".into());
        sheet.set_value(1, 1, CellValue::SharedString(0), None);
        sheet.merge_range("A1", "B1").unwrap();
        sheet.protect(Some("password"));
        sheet.set_auto_filter(CellRange::parse("A1:B5").unwrap());

        let xml = worksheet_xml(&sheet, true, true);
        let pos = |needle: &str| xml.find(needle).unwrap_or_else(|| panic!("missing {needle}"));

        assert!(pos("<sheetData>") < pos("<sheetProtection"));
        assert!(pos("<sheetProtection") < pos("<autoFilter"));
        assert!(pos("<autoFilter") < pos("<mergeCells"));
        assert!(pos("<mergeCells") < pos("<pageMargins"));
        assert!(pos("<pageMargins") < pos("<drawing"));
        assert!(xml.contains(r#"password="83AF""#));
        assert!(xml.contains(r#"<mergeCells count="1"><mergeCell ref="A1:B1"/></mergeCells>"#));
        assert!(xml.contains(r#"<dimension ref="A1:B1"/>"#));
        assert!(xml.contains(r#"tabSelected="1""#));
    }

    #[test]
    fn test_drawing_xml() {
        let png = crate::drawing::tests::png_bytes(96, 96);
        let mut drawing = Drawing::default();
        drawing.add_one_cell(Image::from_bytes(png.clone()), 1, 1).unwrap();
        drawing.add_two_cell(Image::from_bytes(png.clone()), 2, 2, 4, 4);
        drawing
            .add_absolute(Image::from_bytes(png), 72.0, 72.0, None, None)
            .unwrap();

        let xml = drawing_xml(&drawing);
        assert!(xml.contains(r#"<xdr:cNvPr id="1025" name="Picture 1" descr=""/>"#));
        assert!(xml.contains(r#"<xdr:cNvPr id="1027" name="Picture 3" descr=""/>"#));
        assert!(xml.contains("<xdr:from><xdr:col>0</xdr:col><xdr:colOff>14250</xdr:colOff><xdr:row>0</xdr:row><xdr:rowOff>14250</xdr:rowOff></xdr:from>"));
        assert!(xml.contains("<xdr:to><xdr:col>3</xdr:col>"));
        assert!(xml.contains(r#"<xdr:ext cx="914400" cy="914400"/>"#));
        assert!(xml.contains(r#"<xdr:pos x="914400" y="914400"/>"#));
        assert!(xml.contains(r#"<a:blip r:embed="rId2" cstate="print"/>"#));

        let rels = drawing_rels_xml(&drawing, &[4, 5, 6]);
        assert!(rels.contains(r#"Id="rId3""#));
        assert!(rels.contains(r#"Target="../media/image6.png""#));
    }

    #[test]
    fn test_content_types() {
        let exts: BTreeSet<&str> = ["png", "jpeg"].into_iter().collect();
        let xml = content_types_xml(2, 1, &exts);
        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(r#"<Default Extension="jpeg" ContentType="image/jpeg"/>"#));
        assert!(xml.contains("/xl/worksheets/sheet2.xml"));
        assert!(!xml.contains("/xl/worksheets/sheet3.xml"));
        assert!(xml.contains("/xl/drawings/drawing1.xml"));
    }
}
