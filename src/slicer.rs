//! Slice splitter – cuts a capture taller than one page into page-height
//! pixel bands and draws each band at the top of its own page.

use crate::chrome::PageChrome;
use crate::error::{ReportError, Result};
use crate::raster::RasterImage;
use crate::writer::DocumentWriter;

/// A horizontal band of pixel rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// First source row.
    pub offset: u32,
    pub rows: u32,
    /// Height on the page in mm.
    pub height: f32,
}

/// Result of slicing one raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceOutcome {
    pub bands: usize,
    /// Physical height of the final, possibly partial, band.
    pub last_band_height: f32,
}

/// Split `px_height` rows into consecutive bands no taller than
/// `usable_height` once scaled by `scale` (mm per px).
pub fn plan_bands(px_height: u32, scale: f32, usable_height: f32) -> Vec<Band> {
    if px_height == 0 || !(scale > 0.0) || !scale.is_finite() {
        return Vec::new();
    }
    let band_px = ((usable_height / scale).floor() as u32).max(1);
    let mut bands = Vec::new();
    let mut offset = 0u32;
    while offset < px_height {
        let rows = band_px.min(px_height - offset);
        bands.push(Band {
            offset,
            rows,
            height: rows as f32 * scale,
        });
        offset += rows;
    }
    bands
}

/// Draw `raster` as consecutive bands. The current page must be fresh; each
/// further band opens a new page with its header.
pub fn draw_sliced<W: DocumentWriter + ?Sized>(
    writer: &mut W,
    chrome: &PageChrome,
    raster: &RasterImage,
    scale: f32,
) -> Result<SliceOutcome> {
    let g = &chrome.geometry;
    let bands = plan_bands(raster.height(), scale, g.usable_height());
    let Some(last) = bands.last().copied() else {
        return Err(ReportError::SliceSurface {
            offset: 0,
            rows: raster.height(),
            reason: format!("cannot slice a {}x{} raster at scale {scale}", raster.width(), raster.height()),
        });
    };

    for (i, band) in bands.iter().enumerate() {
        if i > 0 {
            chrome.start_page(writer)?;
        }
        let surface = raster.crop_rows(band.offset, band.rows)?;
        log::debug!(
            "band {}/{}: rows {}..{} -> {:.1} mm",
            i + 1,
            bands.len(),
            band.offset,
            band.offset + band.rows,
            band.height
        );
        writer.draw_image(&surface, g.margin, g.content_top(), g.usable_width(), band.height)?;
    }

    Ok(SliceOutcome {
        bands: bands.len(),
        last_band_height: last.height,
    })
}
