//! Block flow paginator – captures marked regions one at a time and flows
//! the resulting images down fixed-size pages.
//!
//! Handles:
//! - blocks that fit: placed under the previous block, or on a new page
//!   when the remaining space is too small
//! - blocks taller than a page: started on a fresh page and sliced
//! - page numbering in a separate pass once the page count is final
//!
//! Any capture or draw failure aborts the whole run; the caller discards
//! the writer.

use serde::Serialize;

use crate::capture::{top_level_regions, CapturableRegion, CaptureOptions, RegionCapturer};
use crate::chrome::PageChrome;
use crate::error::{ReportError, Result};
use crate::geometry::LayoutCursor;
use crate::slicer::draw_sliced;
use crate::units::scale_factor;
use crate::writer::DocumentWriter;

/// Where one block ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub block: String,
    /// 0-based page of the block's first (or only) band.
    pub page: usize,
    /// Offset below the content top, in mm.
    pub offset: f32,
    /// Full physical height of the block.
    pub height: f32,
    /// Number of slice bands; 1 when the block was placed whole.
    pub bands: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSummary {
    pub placements: Vec<Placement>,
    pub page_count: usize,
    /// Cursor offset after the last block.
    pub final_cursor: f32,
}

pub struct BlockFlowPaginator<'a, C> {
    capturer: &'a C,
    chrome: &'a PageChrome,
    options: &'a CaptureOptions,
}

impl<'a, C: RegionCapturer> BlockFlowPaginator<'a, C> {
    pub fn new(capturer: &'a C, chrome: &'a PageChrome, options: &'a CaptureOptions) -> Self {
        Self {
            capturer,
            chrome,
            options,
        }
    }

    /// Lay out every top-level region, then number the pages.
    pub async fn paginate<W: DocumentWriter + ?Sized>(
        &self,
        writer: &mut W,
        regions: &[CapturableRegion],
    ) -> Result<FlowSummary> {
        let mut summary = self.layout(writer, regions).await?;
        summary.page_count = self.chrome.stamp_footers(writer)?;
        Ok(summary)
    }

    /// First pass: place blocks. Footers are not drawn here.
    pub async fn layout<W: DocumentWriter + ?Sized>(
        &self,
        writer: &mut W,
        regions: &[CapturableRegion],
    ) -> Result<FlowSummary> {
        let g = &self.chrome.geometry;
        let usable_width = g.usable_width();
        let usable_height = g.usable_height();

        self.chrome.start_page(writer)?;
        let mut cursor = LayoutCursor::new();
        let mut placements = Vec::new();

        for region in top_level_regions(regions) {
            let raster = self.capturer.capture(region, self.options).await?;
            if raster.is_empty() {
                return Err(ReportError::capture(&region.block, "capture returned an empty raster"));
            }

            let scale = scale_factor(raster.width(), usable_width);
            let height = raster.height() as f32 * scale;

            if height <= usable_height {
                if !cursor.is_at_top() && cursor.overflows(height, usable_height) {
                    self.chrome.start_page(writer)?;
                    cursor.reset();
                }
                writer.draw_image(&raster, g.margin, g.content_top() + cursor.offset(), usable_width, height)?;
                log::debug!(
                    "block '{}' placed at {:.1} mm ({:.1} mm tall)",
                    region.block,
                    cursor.offset(),
                    height
                );
                placements.push(Placement {
                    block: region.block.clone(),
                    page: page_index(writer),
                    offset: cursor.offset(),
                    height,
                    bands: 1,
                });
                cursor.advance(height + g.block_gap);
            } else {
                if !cursor.is_at_top() {
                    self.chrome.start_page(writer)?;
                    cursor.reset();
                }
                let first_page = page_index(writer);
                let outcome = draw_sliced(writer, self.chrome, &raster, scale)?;
                log::debug!(
                    "block '{}' sliced into {} bands ({:.1} mm tall)",
                    region.block,
                    outcome.bands,
                    height
                );
                placements.push(Placement {
                    block: region.block.clone(),
                    page: first_page,
                    offset: 0.0,
                    height,
                    bands: outcome.bands,
                });
                cursor.set(outcome.last_band_height + g.block_gap);
            }
        }

        Ok(FlowSummary {
            placements,
            page_count: writer.page_count(),
            final_cursor: cursor.offset(),
        })
    }
}

fn page_index<W: DocumentWriter + ?Sized>(writer: &W) -> usize {
    writer.current_page().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrome::HeaderInfo;
    use crate::geometry::PageGeometry;
    use crate::raster::RasterImage;
    use crate::style::Theme;
    use crate::writer::RecordingWriter;
    use image::RgbaImage;
    use std::collections::HashMap;

    /// Returns rasters 190 px wide so 1 px = 1 mm on a 190 mm content width.
    struct Heights(HashMap<String, u32>);

    impl RegionCapturer for Heights {
        async fn capture(&self, region: &CapturableRegion, _: &CaptureOptions) -> Result<RasterImage> {
            let h = self
                .0
                .get(&region.block)
                .copied()
                .ok_or_else(|| ReportError::capture(&region.block, "missing"))?;
            Ok(RasterImage::new(RgbaImage::new(190, h)))
        }
    }

    fn setup(blocks: &[(&str, u32)]) -> (Heights, Vec<CapturableRegion>, PageChrome) {
        let capturer = Heights(blocks.iter().map(|(b, h)| (b.to_string(), *h)).collect());
        let regions = blocks.iter().map(|(b, _)| CapturableRegion::new(*b)).collect();
        let chrome = PageChrome {
            geometry: PageGeometry::with_content_area(190.0, 150.0),
            theme: Theme::default(),
            header: HeaderInfo {
                title: "T".into(),
                type_code: "ENFP".into(),
                date: "2025/01/31".into(),
            },
            footer_label: "T".into(),
        };
        (capturer, regions, chrome)
    }

    #[tokio::test]
    async fn small_blocks_share_pages() {
        let (capturer, regions, chrome) = setup(&[("a", 120), ("b", 40), ("c", 30)]);
        let options = CaptureOptions::default();
        let mut w = RecordingWriter::new(210.0, 192.0);
        let summary = BlockFlowPaginator::new(&capturer, &chrome, &options)
            .paginate(&mut w, &regions)
            .await
            .unwrap();
        assert_eq!(summary.page_count, 2);
        let pages: Vec<usize> = summary.placements.iter().map(|p| p.page).collect();
        assert_eq!(pages, [0, 1, 1]);
        assert_eq!(summary.placements[1].offset, 0.0);
        assert_eq!(summary.placements[2].offset, 46.0);
        assert_eq!(summary.final_cursor, 82.0);
    }

    #[tokio::test]
    async fn exact_fit_is_not_sliced() {
        let (capturer, regions, chrome) = setup(&[("a", 10), ("b", 150)]);
        let options = CaptureOptions::default();
        let mut w = RecordingWriter::new(210.0, 192.0);
        let summary = BlockFlowPaginator::new(&capturer, &chrome, &options)
            .layout(&mut w, &regions)
            .await
            .unwrap();
        assert_eq!(summary.placements[1].bands, 1);
        assert_eq!(summary.placements[1].page, 1);
        assert_eq!(w.images_on(1), [(chrome.geometry.content_top(), 150.0)]);
    }

    #[tokio::test]
    async fn oversized_block_starts_fresh_page_and_slices() {
        let (capturer, regions, chrome) = setup(&[("a", 20), ("tall", 400), ("after", 30)]);
        let options = CaptureOptions::default();
        let mut w = RecordingWriter::new(210.0, 192.0);
        let summary = BlockFlowPaginator::new(&capturer, &chrome, &options)
            .paginate(&mut w, &regions)
            .await
            .unwrap();
        let tall = &summary.placements[1];
        assert_eq!((tall.page, tall.bands), (1, 3));
        // The next block continues under the 100 mm final band.
        let after = &summary.placements[2];
        assert_eq!((after.page, after.offset), (3, 106.0));
        assert_eq!(summary.page_count, 4);
    }

    #[tokio::test]
    async fn capture_failure_aborts_run() {
        let (capturer, mut regions, chrome) = setup(&[("a", 20)]);
        regions.push(CapturableRegion::new("missing"));
        let options = CaptureOptions::default();
        let mut w = RecordingWriter::new(210.0, 192.0);
        let err = BlockFlowPaginator::new(&capturer, &chrome, &options)
            .paginate(&mut w, &regions)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::CaptureFailed { .. }));
    }

    #[tokio::test]
    async fn empty_raster_is_rejected() {
        let (capturer, regions, chrome) = setup(&[("flat", 0)]);
        let options = CaptureOptions::default();
        let mut w = RecordingWriter::new(210.0, 192.0);
        let result = BlockFlowPaginator::new(&capturer, &chrome, &options)
            .layout(&mut w, &regions)
            .await;
        assert!(matches!(result, Err(ReportError::CaptureFailed { .. })));
    }
}
