//! Unit conversion between raster pixels, millimetres and PDF points.

/// Millimetres per PDF point.
pub const MM_PER_PT: f32 = 0.352_778;

pub fn mm_to_pt(mm: f32) -> f32 {
    mm / MM_PER_PT
}

pub fn pt_to_mm(pt: f32) -> f32 {
    pt * MM_PER_PT
}

/// Millimetres per pixel for an image stretched to `usable_width`.
///
/// The same factor is used for both axes, so aspect ratio is preserved.
pub fn scale_factor(image_px_width: u32, usable_width: f32) -> f32 {
    if image_px_width == 0 {
        return 0.0;
    }
    usable_width / image_px_width as f32
}

/// Physical height of an image whose width fills `usable_width`.
pub fn pixels_to_physical(image_px_height: u32, image_px_width: u32, usable_width: f32) -> f32 {
    image_px_height as f32 * scale_factor(image_px_width, usable_width)
}
