//! Region capture – the seam between the paginator and whatever can turn a
//! marked screen region into pixels.

use std::collections::HashMap;
use std::path::PathBuf;

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::raster::RasterImage;
use crate::style::Color;

/// A marked, capturable area of the result screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturableRegion {
    /// Block identifier (the value of the region's block marker).
    pub block: String,
    /// Set when the region sits inside another capturable region; such
    /// regions are captured as part of their parent.
    #[serde(default)]
    pub nested: bool,
}

impl CapturableRegion {
    pub fn new(block: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            nested: false,
        }
    }

    pub fn nested(block: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            nested: true,
        }
    }
}

/// Top-level regions in document order. Nested regions are dropped so no
/// area is captured twice.
pub fn top_level_regions(regions: &[CapturableRegion]) -> Vec<&CapturableRegion> {
    regions.iter().filter(|r| !r.nested).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Fill applied behind transparent pixels.
    pub background: Color,
    /// Resolution multiplier relative to CSS pixels.
    pub scale: f32,
    /// Elements carrying this marker are left out of captures.
    pub omit_marker: String,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            scale: 2.0,
            omit_marker: "data-pdf-omit".to_string(),
        }
    }
}

/// Produces a raster for one region. Called once per region, sequentially.
#[allow(async_fn_in_trait)]
pub trait RegionCapturer {
    async fn capture(&self, region: &CapturableRegion, options: &CaptureOptions) -> Result<RasterImage>;
}

#[derive(Debug, Clone)]
enum Snapshot {
    File(PathBuf),
    Raster(RasterImage),
}

/// Capturer backed by pre-rendered block snapshots at 1× scale, either image
/// files or in-memory rasters.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCapturer {
    snapshots: HashMap<String, Snapshot>,
}

impl SnapshotCapturer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file(&mut self, block: impl Into<String>, path: impl Into<PathBuf>) {
        self.snapshots.insert(block.into(), Snapshot::File(path.into()));
    }

    pub fn insert_raster(&mut self, block: impl Into<String>, raster: RasterImage) {
        self.snapshots.insert(block.into(), Snapshot::Raster(raster));
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl RegionCapturer for SnapshotCapturer {
    async fn capture(&self, region: &CapturableRegion, options: &CaptureOptions) -> Result<RasterImage> {
        let snapshot = self
            .snapshots
            .get(&region.block)
            .ok_or_else(|| ReportError::capture(&region.block, "no snapshot registered"))?;

        let mut raster = match snapshot {
            Snapshot::Raster(r) => r.clone(),
            Snapshot::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    ReportError::capture(&region.block, format!("{}: {e}", path.display()))
                })?;
                RasterImage::from_encoded(&bytes)
                    .map_err(|e| ReportError::capture(&region.block, e.to_string()))?
            }
        };

        if raster.is_empty() {
            return Err(ReportError::capture(&region.block, "snapshot is empty"));
        }

        if options.scale.is_finite() && options.scale > 0.0 && (options.scale - 1.0).abs() > f32::EPSILON {
            let w = ((raster.width() as f32 * options.scale).round() as u32).max(1);
            let h = ((raster.height() as f32 * options.scale).round() as u32).max(1);
            raster = RasterImage::new(imageops::resize(raster.pixels(), w, h, FilterType::Triangle));
        }
        raster.flatten_onto(options.background);

        log::debug!(
            "captured block '{}' at {}x{} px (omitting '{}')",
            region.block,
            raster.width(),
            raster.height(),
            options.omit_marker
        );
        Ok(raster)
    }
}
