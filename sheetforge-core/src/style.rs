//! Cell styling: fonts, fills, borders, number formats and the registry that
//! composes them into cell formats.
//!
//! The registry is append-only. A cell format's position in the registry is the
//! style index stored on cells, and it never changes once issued.

use crate::error::{Result, SheetError};

/// Font properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Font {
    /// Family name. `None` means the workbook default (Arial).
    pub name: Option<String>,
    /// Size in points. `None` means 11.
    pub size: Option<f64>,
    /// RGB hex color such as `"FF0000"` (a leading `#` is accepted).
    pub color: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
}

impl Font {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_color<S: Into<String>>(mut self, color: S) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    pub fn with_strike(mut self, strike: bool) -> Self {
        self.strike = strike;
        self
    }
}

/// Fill pattern kinds written by this crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PatternType {
    #[default]
    None,
    Gray125,
    Solid,
}

impl PatternType {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternType::None => "none",
            PatternType::Gray125 => "gray125",
            PatternType::Solid => "solid",
        }
    }
}

/// Cell background.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fill {
    pub pattern: PatternType,
    /// Foreground RGB hex color; the visible color of a solid fill.
    pub fg_color: Option<String>,
}

impl Fill {
    pub fn new() -> Self {
        Self::default()
    }

    /// A solid fill of one color.
    pub fn solid<S: Into<String>>(color: S) -> Self {
        Fill {
            pattern: PatternType::Solid,
            fg_color: Some(color.into()),
        }
    }

    pub(crate) fn gray125() -> Self {
        Fill {
            pattern: PatternType::Gray125,
            fg_color: None,
        }
    }
}

/// Line style of one border edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderLine {
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
}

impl BorderLine {
    pub fn as_str(self) -> &'static str {
        match self {
            BorderLine::Thin => "thin",
            BorderLine::Medium => "medium",
            BorderLine::Thick => "thick",
            BorderLine::Dashed => "dashed",
            BorderLine::Dotted => "dotted",
            BorderLine::Double => "double",
            BorderLine::Hair => "hair",
        }
    }
}

/// One border edge.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub line: BorderLine,
    pub color: Option<String>,
}

impl Edge {
    pub fn new(line: BorderLine) -> Self {
        Edge { line, color: None }
    }

    pub fn thin() -> Self {
        Self::new(BorderLine::Thin)
    }

    pub fn with_color<S: Into<String>>(mut self, color: S) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Cell border. Edges left as `None` are not drawn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Border {
    pub left: Option<Edge>,
    pub right: Option<Edge>,
    pub top: Option<Edge>,
    pub bottom: Option<Edge>,
}

impl Border {
    pub fn new() -> Self {
        Self::default()
    }

    /// The same edge on all four sides.
    pub fn all(edge: Edge) -> Self {
        Border {
            left: Some(edge.clone()),
            right: Some(edge.clone()),
            top: Some(edge.clone()),
            bottom: Some(edge),
        }
    }

    /// Thin lines of one color on all four sides.
    pub fn thin<S: Into<String>>(color: S) -> Self {
        Self::all(Edge::thin().with_color(color))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

impl HorizontalAlignment {
    pub fn as_str(self) -> &'static str {
        match self {
            HorizontalAlignment::General => "general",
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
            HorizontalAlignment::Fill => "fill",
            HorizontalAlignment::Justify => "justify",
            HorizontalAlignment::CenterContinuous => "centerContinuous",
            HorizontalAlignment::Distributed => "distributed",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalAlignment {
    Top,
    #[default]
    Center,
    Bottom,
    Justify,
    Distributed,
}

impl VerticalAlignment {
    pub fn as_str(self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
            VerticalAlignment::Justify => "justify",
            VerticalAlignment::Distributed => "distributed",
        }
    }
}

/// Text alignment. The default is general horizontal, centered vertical.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Alignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
}

impl Alignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_horizontal(mut self, horizontal: HorizontalAlignment) -> Self {
        self.horizontal = horizontal;
        self
    }

    pub fn with_vertical(mut self, vertical: VerticalAlignment) -> Self {
        self.vertical = vertical;
        self
    }

    pub fn with_wrap_text(mut self, wrap: bool) -> Self {
        self.wrap_text = wrap;
        self
    }
}

/// First id available to custom number formats; lower ids are built in.
pub const FIRST_CUSTOM_NUM_FMT_ID: u32 = 164;

/// A number format: either a built-in id or a custom format code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NumberFormat {
    Builtin(u32),
    Custom(String),
}

impl NumberFormat {
    /// Built-in format 0, "General".
    pub const GENERAL: NumberFormat = NumberFormat::Builtin(0);
    /// Built-in format 3, `#,##0`: thousands separator, no decimals.
    pub const THOUSANDS: NumberFormat = NumberFormat::Builtin(3);

    pub fn custom<S: Into<String>>(code: S) -> Self {
        NumberFormat::Custom(code.into())
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat::GENERAL
    }
}

/// A registered custom number format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomNumberFormat {
    pub id: u32,
    pub code: String,
}

/// The parts a caller combines into a cell format. Omitted parts fall back to
/// their zero-valued defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellStyle {
    pub font: Option<Font>,
    pub border: Option<Border>,
    pub fill: Option<Fill>,
    pub alignment: Option<Alignment>,
    pub number_format: Option<NumberFormat>,
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = Some(border);
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_number_format(mut self, number_format: NumberFormat) -> Self {
        self.number_format = Some(number_format);
        self
    }
}

/// A composed cell format (a `cellXfs` entry).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellFormat {
    pub font_id: usize,
    pub fill_id: usize,
    pub border_id: usize,
    pub num_fmt_id: u32,
    /// `None` only for the default format at index 0.
    pub alignment: Option<Alignment>,
    pub apply: bool,
}

/// Style indices registered when a workbook is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StylePresets {
    /// Bold, thin black border, left aligned.
    pub header: u32,
    /// Thin black border.
    pub body: u32,
    /// Left aligned.
    pub string: u32,
    /// Centered, `#,##0`.
    pub number: u32,
}

/// Ordered style collections of one workbook.
#[derive(Clone, Debug)]
pub struct StyleRegistry {
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<Border>,
    num_fmts: Vec<CustomNumberFormat>,
    cell_formats: Vec<CellFormat>,
    presets: StylePresets,
}

impl StyleRegistry {
    /// Create a registry holding the format's required defaults and the presets.
    ///
    /// Fill 0 (no fill) and fill 1 (gray125) are reserved by the format and are
    /// always present, so user fills start at index 2.
    pub fn new() -> Self {
        let mut registry = StyleRegistry {
            fonts: vec![Font::default()],
            fills: vec![Fill::default(), Fill::gray125()],
            borders: vec![Border::default()],
            num_fmts: Vec::new(),
            cell_formats: vec![CellFormat::default()],
            presets: StylePresets {
                header: 0,
                body: 0,
                string: 0,
                number: 0,
            },
        };

        let black_border = Border::thin("000000");
        registry.presets = StylePresets {
            header: registry.push_cell_format(
                &CellStyle::new()
                    .with_font(Font::new().with_bold(true))
                    .with_border(black_border.clone())
                    .with_alignment(Alignment::new().with_horizontal(HorizontalAlignment::Left)),
                0,
            ),
            body: registry.push_cell_format(&CellStyle::new().with_border(black_border), 0),
            string: registry.push_cell_format(
                &CellStyle::new()
                    .with_alignment(Alignment::new().with_horizontal(HorizontalAlignment::Left)),
                0,
            ),
            number: registry.push_cell_format(
                &CellStyle::new()
                    .with_alignment(Alignment::new().with_horizontal(HorizontalAlignment::Center)),
                3,
            ),
        };

        registry
    }

    /// Append a font and return its index.
    pub fn register_font(&mut self, font: Font) -> usize {
        self.fonts.push(font);
        self.fonts.len() - 1
    }

    /// Append a fill and return its index.
    pub fn register_fill(&mut self, fill: Fill) -> usize {
        self.fills.push(fill);
        self.fills.len() - 1
    }

    /// Append a border and return its index.
    pub fn register_border(&mut self, border: Border) -> usize {
        self.borders.push(border);
        self.borders.len() - 1
    }

    /// Resolve a number format to the id a cell format references.
    ///
    /// Built-in ids are returned as is and must be below 164. A custom code
    /// gets the next free id from 164 upward the first time it is seen and the
    /// same id afterwards.
    pub fn register_number_format(&mut self, format: &NumberFormat) -> Result<u32> {
        match format {
            NumberFormat::Builtin(id) if *id >= FIRST_CUSTOM_NUM_FMT_ID => {
                Err(SheetError::InvalidNumberFormat(*id))
            }
            NumberFormat::Builtin(id) => Ok(*id),
            NumberFormat::Custom(code) => {
                if let Some(existing) = self.num_fmts.iter().find(|f| &f.code == code) {
                    return Ok(existing.id);
                }
                let id = FIRST_CUSTOM_NUM_FMT_ID + self.num_fmts.len() as u32;
                self.num_fmts.push(CustomNumberFormat {
                    id,
                    code: code.clone(),
                });
                Ok(id)
            }
        }
    }

    /// Compose a cell format and return its style index.
    ///
    /// Every call appends exactly one font, one fill and one border (the
    /// defaults for omitted parts), so the primitive indices a format references
    /// are the ones this call created. A rejected number format registers
    /// nothing.
    pub fn register_cell_format(&mut self, style: &CellStyle) -> Result<u32> {
        let num_fmt_id = self.register_number_format(
            style.number_format.as_ref().unwrap_or(&NumberFormat::GENERAL),
        )?;
        Ok(self.push_cell_format(style, num_fmt_id))
    }

    fn push_cell_format(&mut self, style: &CellStyle, num_fmt_id: u32) -> u32 {
        let font_id = self.register_font(style.font.clone().unwrap_or_default());
        let border_id = self.register_border(style.border.clone().unwrap_or_default());
        let fill_id = self.register_fill(style.fill.clone().unwrap_or_default());

        self.cell_formats.push(CellFormat {
            font_id,
            fill_id,
            border_id,
            num_fmt_id,
            alignment: Some(style.alignment.unwrap_or_default()),
            apply: true,
        });
        (self.cell_formats.len() - 1) as u32
    }

    /// Fail unless `style_index` names a registered cell format.
    pub fn check_style_index(&self, style_index: u32) -> Result<()> {
        if (style_index as usize) < self.cell_formats.len() {
            Ok(())
        } else {
            Err(SheetError::InvalidStyle(style_index))
        }
    }

    pub fn presets(&self) -> StylePresets {
        self.presets
    }

    pub fn fonts(&self) -> &[Font] {
        &self.fonts
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn borders(&self) -> &[Border] {
        &self.borders
    }

    pub fn custom_number_formats(&self) -> &[CustomNumberFormat] {
        &self.num_fmts
    }

    pub fn cell_formats(&self) -> &[CellFormat] {
        &self.cell_formats
    }

    pub fn cell_format(&self, style_index: u32) -> Option<&CellFormat> {
        self.cell_formats.get(style_index as usize)
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_builder() {
        let font = Font::new()
            .with_name("Calibri")
            .with_size(12.0)
            .with_bold(true)
            .with_color("FF0000");

        assert_eq!(font.name.as_deref(), Some("Calibri"));
        assert_eq!(font.size, Some(12.0));
        assert!(font.bold);
        assert!(!font.italic);
        assert_eq!(font.color.as_deref(), Some("FF0000"));
    }

    #[test]
    fn test_reserved_defaults() {
        let registry = StyleRegistry::new();
        assert_eq!(registry.fills()[0].pattern, PatternType::None);
        assert_eq!(registry.fills()[1].pattern, PatternType::Gray125);
        assert_eq!(registry.fonts()[0], Font::default());
        assert_eq!(registry.borders()[0], Border::default());
        assert_eq!(registry.cell_formats()[0], CellFormat::default());
    }

    #[test]
    fn test_presets() {
        let registry = StyleRegistry::new();
        let presets = registry.presets();
        assert_eq!(
            (presets.header, presets.body, presets.string, presets.number),
            (1, 2, 3, 4)
        );

        let header = registry.cell_format(presets.header).unwrap();
        assert!(registry.fonts()[header.font_id].bold);
        assert!(registry.borders()[header.border_id].left.is_some());
        assert_eq!(
            header.alignment.unwrap().horizontal,
            HorizontalAlignment::Left
        );

        let body = registry.cell_format(presets.body).unwrap();
        assert!(!registry.fonts()[body.font_id].bold);
        assert_eq!(
            registry.borders()[body.border_id].bottom.as_ref().unwrap().line,
            BorderLine::Thin
        );

        let number = registry.cell_format(presets.number).unwrap();
        assert_eq!(number.num_fmt_id, 3);
        assert_eq!(
            number.alignment.unwrap().horizontal,
            HorizontalAlignment::Center
        );
    }

    #[test]
    fn test_register_cell_format_grows_primitives_in_lockstep() {
        let mut registry = StyleRegistry::new();
        let fonts = registry.fonts().len();
        let fills = registry.fills().len();
        let borders = registry.borders().len();

        let first = registry.register_cell_format(&CellStyle::new()).unwrap();
        let second = registry.register_cell_format(&CellStyle::new()).unwrap();

        assert_eq!(second, first + 1);
        assert_eq!(registry.fonts().len(), fonts + 2);
        assert_eq!(registry.fills().len(), fills + 2);
        assert_eq!(registry.borders().len(), borders + 2);

        let xf = registry.cell_format(second).unwrap();
        assert_eq!(xf.font_id, fonts + 1);
        assert_eq!(xf.fill_id, fills + 1);
        assert_eq!(xf.border_id, borders + 1);
        assert_eq!(xf.num_fmt_id, 0);
    }

    #[test]
    fn test_style_indices_are_sequential() {
        let mut registry = StyleRegistry::new();
        let start = registry.cell_formats().len() as u32;
        let indices: Vec<u32> = (0..5)
            .map(|i| {
                registry
                    .register_cell_format(
                        &CellStyle::new().with_fill(Fill::solid(format!("00000{}", i))),
                    )
                    .unwrap()
            })
            .collect();
        assert_eq!(indices, (start..start + 5).collect::<Vec<_>>());
    }

    #[test]
    fn test_custom_number_formats() {
        let mut registry = StyleRegistry::new();
        let a = registry.register_number_format(&NumberFormat::custom("0.000")).unwrap();
        let b = registry
            .register_number_format(&NumberFormat::custom("yyyy-mm-dd"))
            .unwrap();
        let again = registry.register_number_format(&NumberFormat::custom("0.000")).unwrap();
        assert_eq!((a, b, again), (164, 165, 164));
        assert_eq!(
            registry.register_number_format(&NumberFormat::Builtin(10)).unwrap(),
            10
        );
        assert_eq!(registry.custom_number_formats().len(), 2);

        let idx = registry
            .register_cell_format(&CellStyle::new().with_number_format(NumberFormat::custom("yyyy-mm-dd")))
            .unwrap();
        assert_eq!(registry.cell_format(idx).unwrap().num_fmt_id, 165);
    }

    #[test]
    fn test_builtin_number_format_out_of_range() {
        let mut registry = StyleRegistry::new();
        let formats = registry.cell_formats().len();
        let fonts = registry.fonts().len();

        assert!(matches!(
            registry.register_number_format(&NumberFormat::Builtin(164)),
            Err(SheetError::InvalidNumberFormat(164))
        ));
        assert!(matches!(
            registry.register_cell_format(&CellStyle::new().with_number_format(NumberFormat::Builtin(200))),
            Err(SheetError::InvalidNumberFormat(200))
        ));
        assert_eq!(registry.cell_formats().len(), formats);
        assert_eq!(registry.fonts().len(), fonts);
        assert_eq!(
            registry.register_number_format(&NumberFormat::Builtin(163)).unwrap(),
            163
        );
    }

    #[test]
    fn test_check_style_index() {
        let registry = StyleRegistry::new();
        let last = registry.cell_formats().len() as u32 - 1;
        assert!(registry.check_style_index(0).is_ok());
        assert!(registry.check_style_index(last).is_ok());
        assert!(matches!(
            registry.check_style_index(last + 1),
            Err(SheetError::InvalidStyle(idx)) if idx == last + 1
        ));
    }
}
