//! Images and their placement on a worksheet.
//!
//! A worksheet owns at most one [`Drawing`]. Each inserted image becomes a
//! [`Picture`] with a per-sheet number `N`, the object id `1024 + N` and the
//! name `"Picture N"`.

use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::{ImageFormat, ImageReader};

use crate::coordinate::{CellRange, MAX_COLUMN, MAX_ROW};
use crate::error::{Result, SheetError};
use crate::units::{pt_to_emu, px_to_emu, DEFAULT_DPI};

/// Base added to the picture number to form the drawing object id.
pub const PICTURE_ID_BASE: u32 = 1024;
/// Sub-cell offset applied to every marker, in EMU.
pub const MARKER_OFFSET_EMU: i64 = 14250;

/// An image blob to embed.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Clone)]
pub struct Image {
    data: Arc<[u8]>,
    format: Option<ImageFormat>,
}

/// Pixel size and resolution read from an image header.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageInfo {
    pub width_px: u32,
    pub height_px: u32,
    pub dpi_x: f64,
    pub dpi_y: f64,
}

impl Image {
    /// Wrap raw image bytes. The format is sniffed from the content.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        let format = image::guess_format(&data).ok();
        Image {
            data: data.into(),
            format,
        }
    }

    /// Read an image file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            SheetError::ImageSourceUnreadable(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::from_bytes(data))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// File extension used for the media part.
    pub fn extension(&self) -> &'static str {
        match self.format {
            Some(ImageFormat::Png) => "png",
            Some(ImageFormat::Gif) => "gif",
            Some(ImageFormat::Bmp) => "bmp",
            _ => "jpeg",
        }
    }

    /// MIME type of the media part. Unrecognized content is declared as JPEG.
    pub fn content_type(&self) -> &'static str {
        match self.format {
            Some(ImageFormat::Png) => "image/png",
            Some(ImageFormat::Gif) => "image/gif",
            Some(ImageFormat::Bmp) => "image/bmp",
            _ => "image/jpeg",
        }
    }

    /// Decode the header for pixel size and resolution.
    pub fn probe(&self) -> Result<ImageInfo> {
        let (width_px, height_px) = ImageReader::new(Cursor::new(&self.data[..]))
            .with_guessed_format()
            .map_err(|e| SheetError::ImageSourceUnreadable(e.to_string()))?
            .into_dimensions()
            .map_err(|e| SheetError::ImageSourceUnreadable(e.to_string()))?;

        let (dpi_x, dpi_y) = match self.format {
            Some(ImageFormat::Png) => png_dpi(&self.data),
            Some(ImageFormat::Jpeg) => jfif_dpi(&self.data),
            _ => None,
        }
        .unwrap_or((DEFAULT_DPI, DEFAULT_DPI));

        Ok(ImageInfo {
            width_px,
            height_px,
            dpi_x,
            dpi_y,
        })
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("len", &self.data.len())
            .field("content_type", &self.content_type())
            .finish()
    }
}

/// Resolution from a PNG `pHYs` chunk, when it is given in pixels per meter.
fn png_dpi(data: &[u8]) -> Option<(f64, f64)> {
    let mut pos = 8;
    while pos + 8 <= data.len() {
        let len = u32::from_be_bytes(data[pos..pos + 4].try_into().ok()?) as usize;
        let kind = &data[pos + 4..pos + 8];
        let body = data.get(pos + 8..pos + 8 + len)?;
        match kind {
            b"pHYs" if len >= 9 => {
                let x = u32::from_be_bytes(body[0..4].try_into().ok()?);
                let y = u32::from_be_bytes(body[4..8].try_into().ok()?);
                if body[8] != 1 || x == 0 || y == 0 {
                    return None;
                }
                return Some((x as f64 * 0.0254, y as f64 * 0.0254));
            }
            b"IDAT" | b"IEND" => return None,
            _ => {}
        }
        // length + type + body + crc
        pos += 12 + len;
    }
    None
}

/// Resolution from a JPEG JFIF `APP0` segment.
fn jfif_dpi(data: &[u8]) -> Option<(f64, f64)> {
    if data.get(0..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let body = data.get(pos + 4..pos + 2 + len)?;
        match marker {
            0xE0 if body.len() >= 12 && body.starts_with(b"JFIF\0") => {
                let units = body[7];
                let x = u16::from_be_bytes([body[8], body[9]]) as f64;
                let y = u16::from_be_bytes([body[10], body[11]]) as f64;
                if x == 0.0 || y == 0.0 {
                    return None;
                }
                return match units {
                    1 => Some((x, y)),
                    2 => Some((x * 2.54, y * 2.54)),
                    _ => None,
                };
            }
            // Start of scan: no more headers.
            0xDA => return None,
            _ => {}
        }
        pos += 2 + len;
    }
    None
}

/// A cell corner in drawing coordinates (0-based column and row).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Marker {
    pub col: u32,
    pub col_offset: i64,
    pub row: u32,
    pub row_offset: i64,
}

impl Marker {
    /// Marker at the 1-based cell (row, column), inset by the fixed offset.
    /// Coordinates outside the sheet grid are clamped to it.
    pub fn at_cell(row: u32, column: u32) -> Self {
        Marker {
            col: column.clamp(1, MAX_COLUMN) - 1,
            col_offset: MARKER_OFFSET_EMU,
            row: row.clamp(1, MAX_ROW) - 1,
            row_offset: MARKER_OFFSET_EMU,
        }
    }
}

/// Size in EMU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Extent {
    pub cx: i64,
    pub cy: i64,
}

impl Extent {
    /// Natural size of an image, optionally overriding either pixel dimension.
    pub fn from_pixels(info: &ImageInfo, width_px: Option<u32>, height_px: Option<u32>) -> Self {
        Extent {
            cx: px_to_emu(width_px.unwrap_or(info.width_px), info.dpi_x),
            cy: px_to_emu(height_px.unwrap_or(info.height_px), info.dpi_y),
        }
    }
}

/// Page position in EMU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub fn from_points(x_pt: f64, y_pt: f64) -> Self {
        Position {
            x: pt_to_emu(x_pt),
            y: pt_to_emu(y_pt),
        }
    }
}

/// Where a picture sits on the sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// Stretched between two cells.
    TwoCell { from: Marker, to: Marker },
    /// Attached to one cell with an explicit size.
    OneCell { from: Marker, extent: Extent },
    /// At a fixed page position with an explicit size.
    Absolute { position: Position, extent: Extent },
}

/// One embedded image and its anchor.
#[derive(Clone, Debug)]
pub struct Picture {
    /// 1-based, per sheet.
    pub number: u32,
    pub image: Image,
    pub anchor: Anchor,
    /// Size written into the shape transform.
    pub extent: Extent,
}

impl Picture {
    pub fn id(&self) -> u32 {
        PICTURE_ID_BASE + self.number
    }

    pub fn name(&self) -> String {
        format!("Picture {}", self.number)
    }
}

/// The image layer of one worksheet.
#[derive(Clone, Debug, Default)]
pub struct Drawing {
    pictures: Vec<Picture>,
}

impl Drawing {
    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    pub fn len(&self) -> usize {
        self.pictures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pictures.is_empty()
    }

    fn push(&mut self, image: Image, anchor: Anchor, extent: Extent) -> &Picture {
        let number = self.pictures.len() as u32 + 1;
        self.pictures.push(Picture {
            number,
            image,
            anchor,
            extent,
        });
        &self.pictures[self.pictures.len() - 1]
    }

    /// Anchor at one cell, sized from the image's pixels and resolution.
    pub fn add_one_cell(&mut self, image: Image, row: u32, column: u32) -> Result<&Picture> {
        let extent = Extent::from_pixels(&image.probe()?, None, None);
        let anchor = Anchor::OneCell {
            from: Marker::at_cell(row, column),
            extent,
        };
        Ok(self.push(image, anchor, extent))
    }

    /// Stretch between two cells, given in any order. The image is probed only
    /// for the shape's nominal size; an unreadable header leaves that size at
    /// zero.
    pub fn add_two_cell(
        &mut self,
        image: Image,
        start_row: u32,
        start_column: u32,
        end_row: u32,
        end_column: u32,
    ) -> &Picture {
        let extent = image
            .probe()
            .map(|info| Extent::from_pixels(&info, None, None))
            .unwrap_or_default();
        let cells = CellRange::clamped(start_row, start_column, end_row, end_column);
        let anchor = Anchor::TwoCell {
            from: Marker::at_cell(cells.start_row, cells.start_column),
            to: Marker::at_cell(cells.end_row, cells.end_column),
        };
        self.push(image, anchor, extent)
    }

    /// Place at a page position given in points. Omitted dimensions use the
    /// image's natural pixel size.
    pub fn add_absolute(
        &mut self,
        image: Image,
        x_pt: f64,
        y_pt: f64,
        width_px: Option<u32>,
        height_px: Option<u32>,
    ) -> Result<&Picture> {
        let extent = Extent::from_pixels(&image.probe()?, width_px, height_px);
        let anchor = Anchor::Absolute {
            position: Position::from_points(x_pt, y_pt),
            extent,
        };
        Ok(self.push(image, anchor, extent))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::units::EMUS_PER_INCH;

    /// Encode a blank PNG of the given size.
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn crc32(bytes: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &b in bytes {
            crc ^= b as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }

    /// A PNG with a `pHYs` chunk declaring `dpi` on both axes.
    fn png_with_dpi(width: u32, height: u32, dpi: f64) -> Vec<u8> {
        let png = png_bytes(width, height);
        // Signature (8) + IHDR chunk (4 + 4 + 13 + 4).
        let split = 8 + 25;
        let ppm = (dpi / 0.0254).round() as u32;

        let mut chunk = Vec::new();
        chunk.extend_from_slice(b"pHYs");
        chunk.extend_from_slice(&ppm.to_be_bytes());
        chunk.extend_from_slice(&ppm.to_be_bytes());
        chunk.push(1);

        let mut out = png[..split].to_vec();
        out.extend_from_slice(&9u32.to_be_bytes());
        out.extend_from_slice(&chunk);
        out.extend_from_slice(&crc32(&chunk).to_be_bytes());
        out.extend_from_slice(&png[split..]);
        out
    }

    #[test]
    fn test_probe_png_defaults_to_96_dpi() {
        let image = Image::from_bytes(png_bytes(40, 20));
        assert_eq!(image.content_type(), "image/png");
        assert_eq!(image.extension(), "png");

        let info = image.probe().unwrap();
        assert_eq!((info.width_px, info.height_px), (40, 20));
        assert_eq!((info.dpi_x, info.dpi_y), (96.0, 96.0));
    }

    #[test]
    fn test_probe_png_phys() {
        let image = Image::from_bytes(png_with_dpi(10, 10, 300.0));
        let info = image.probe().unwrap();
        assert_eq!(info.width_px, 10);
        assert!((info.dpi_x - 300.0).abs() < 0.1);
    }

    #[test]
    fn test_jfif_density() {
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        jpeg.extend_from_slice(b"JFIF\0");
        jpeg.extend_from_slice(&[1, 1, 1, 0, 72, 0, 150, 0, 0]);
        jpeg.extend_from_slice(&[0xFF, 0xDA]);
        assert_eq!(jfif_dpi(&jpeg), Some((72.0, 150.0)));

        // Aspect-ratio-only density carries no resolution.
        jpeg[13] = 0;
        assert_eq!(jfif_dpi(&jpeg), None);
    }

    #[test]
    fn test_unreadable_image() {
        let image = Image::from_bytes(b"definitely not an image".to_vec());
        assert_eq!(image.content_type(), "image/jpeg");
        assert!(matches!(
            image.probe(),
            Err(SheetError::ImageSourceUnreadable(_))
        ));

        let mut drawing = Drawing::default();
        assert!(drawing.add_one_cell(image.clone(), 1, 1).is_err());
        assert!(drawing.is_empty());

        // A two-cell anchor does not need the size.
        let picture = drawing.add_two_cell(image, 1, 1, 3, 3);
        assert_eq!(picture.extent, Extent::default());
    }

    #[test]
    fn test_pictures_are_numbered() {
        let mut drawing = Drawing::default();
        let image = Image::from_bytes(png_bytes(96, 48));

        let first = drawing.add_one_cell(image.clone(), 2, 3).unwrap().clone();
        let second = drawing.add_two_cell(image, 1, 1, 4, 2).clone();

        assert_eq!((first.number, first.id(), first.name()), (1, 1025, "Picture 1".to_string()));
        assert_eq!((second.number, second.id()), (2, 1026));

        match first.anchor {
            Anchor::OneCell { from, extent } => {
                assert_eq!((from.col, from.row), (2, 1));
                assert_eq!(from.col_offset, MARKER_OFFSET_EMU);
                assert_eq!(extent, Extent { cx: EMUS_PER_INCH, cy: EMUS_PER_INCH / 2 });
            }
            other => panic!("unexpected anchor {other:?}"),
        }
        match second.anchor {
            Anchor::TwoCell { from, to } => {
                assert_eq!((from.col, from.row), (0, 0));
                assert_eq!((to.col, to.row), (1, 3));
            }
            other => panic!("unexpected anchor {other:?}"),
        }
    }

    #[test]
    fn test_two_cell_corners_normalized_and_clamped() {
        let mut drawing = Drawing::default();
        let image = Image::from_bytes(png_bytes(4, 4));

        let reversed = drawing.add_two_cell(image.clone(), 5, 5, 2, 2).anchor;
        assert_eq!(
            reversed,
            Anchor::TwoCell {
                from: Marker::at_cell(2, 2),
                to: Marker::at_cell(5, 5),
            }
        );

        let wide = drawing.add_two_cell(image, 0, 3, 2_000_000, 20_000).anchor;
        match wide {
            Anchor::TwoCell { from, to } => {
                assert_eq!((from.col, from.row), (2, 0));
                assert_eq!((to.col, to.row), (MAX_COLUMN - 1, MAX_ROW - 1));
            }
            other => panic!("unexpected anchor {other:?}"),
        }
    }

    #[test]
    fn test_absolute_anchor() {
        let mut drawing = Drawing::default();
        let image = Image::from_bytes(png_bytes(96, 96));

        let natural = drawing.add_absolute(image.clone(), 72.0, 36.0, None, None).unwrap().clone();
        assert_eq!(
            natural.anchor,
            Anchor::Absolute {
                position: Position { x: EMUS_PER_INCH, y: EMUS_PER_INCH / 2 },
                extent: Extent { cx: EMUS_PER_INCH, cy: EMUS_PER_INCH },
            }
        );

        let sized = drawing.add_absolute(image, 0.0, 0.0, Some(192), None).unwrap();
        assert_eq!(sized.extent, Extent { cx: 2 * EMUS_PER_INCH, cy: EMUS_PER_INCH });
        assert_eq!(sized.number, 2);
    }
}
