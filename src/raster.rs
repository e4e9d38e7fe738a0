//! Raster images produced by region capture, and the row cropping used to
//! slice oversized captures into page-height bands.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, Rgba, RgbaImage};

use crate::error::{ReportError, Result};
use crate::style::Color;

/// JPEG quality used when embedding captured blocks.
pub const EMBED_JPEG_QUALITY: u8 = 95;

/// A captured pixel grid. Lives for one generation call only.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Decode a PNG or JPEG byte buffer.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::new(img.to_rgba8()))
    }

    /// Decode a `data:<mime>;base64,<data>` URI as produced by canvas export.
    pub fn from_data_uri(src: &str) -> Result<Self> {
        let bytes = parse_data_uri(src)?;
        Self::from_encoded(&bytes)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Composite every pixel over an opaque `background`.
    pub fn flatten_onto(&mut self, background: Color) {
        let [br, bg, bb] = background.to_rgb8();
        for px in self.pixels.pixels_mut() {
            let Rgba([r, g, b, a]) = *px;
            if a == 255 {
                continue;
            }
            let alpha = a as u32;
            let blend = |fg: u8, bgc: u8| ((fg as u32 * alpha + bgc as u32 * (255 - alpha)) / 255) as u8;
            *px = Rgba([blend(r, br), blend(g, bg), blend(b, bb), 255]);
        }
    }

    /// Copy `rows` pixel rows starting at `offset` into a new image.
    pub fn crop_rows(&self, offset: u32, rows: u32) -> Result<RasterImage> {
        let surface_error = |reason: &str| ReportError::SliceSurface {
            offset,
            rows,
            reason: reason.to_string(),
        };
        if self.width() == 0 {
            return Err(surface_error("source raster has zero width"));
        }
        if rows == 0 {
            return Err(surface_error("band has no rows"));
        }
        let end = offset
            .checked_add(rows)
            .ok_or_else(|| surface_error("band extent overflows"))?;
        if end > self.height() {
            return Err(surface_error("band extends past the source raster"));
        }
        let band = imageops::crop_imm(&self.pixels, 0, offset, self.width(), rows).to_image();
        Ok(RasterImage::new(band))
    }

    /// Encode as baseline JPEG for embedding (alpha is dropped).
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let rgb = DynamicImage::ImageRgba8(self.pixels.clone()).to_rgb8();
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality);
        encoder.encode_image(&rgb)?;
        Ok(buf)
    }
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
fn parse_data_uri(src: &str) -> Result<Vec<u8>> {
    let rest = src.strip_prefix("data:").ok_or_else(|| {
        let preview: String = src.chars().take(40).collect();
        ReportError::Draw(format!("expected a base64 data URI, got {preview:?}"))
    })?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| ReportError::Draw("data URI is missing the `,` separator".to_string()))?;
    if !header.contains(";base64") {
        return Err(ReportError::Draw(
            "only base64-encoded data URIs are supported".to_string(),
        ));
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| ReportError::Draw(format!("base64 decode error: {e}")))
}
