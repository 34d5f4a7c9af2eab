//! Drawing length units.
//!
//! Drawing geometry is expressed in EMU (English Metric Units): 914400 per
//! inch, 12700 per point.

pub const EMUS_PER_INCH: i64 = 914_400;
pub const EMUS_PER_PT: i64 = 12_700;
pub const POINTS_PER_INCH: f64 = 72.0;

/// Resolution assumed for images that carry no density information.
pub const DEFAULT_DPI: f64 = 96.0;

/// Convert points to EMU.
#[inline]
pub fn pt_to_emu(pt: f64) -> i64 {
    (pt * EMUS_PER_INCH as f64 / POINTS_PER_INCH) as i64
}

/// Convert pixels at `dpi` dots per inch to EMU.
///
/// A non-positive or non-finite resolution falls back to [`DEFAULT_DPI`].
#[inline]
pub fn px_to_emu(px: u32, dpi: f64) -> i64 {
    let dpi = if dpi.is_finite() && dpi > 0.0 { dpi } else { DEFAULT_DPI };
    (px as f64 * (EMUS_PER_INCH as f64 / dpi)) as i64
}

#[inline]
pub fn emu_to_pt(emu: i64) -> f64 {
    emu as f64 / EMUS_PER_PT as f64
}
