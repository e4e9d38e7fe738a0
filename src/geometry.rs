//! Page geometry and the per-run layout cursor.
//!
//! All values are millimetres with the origin at the top-left of the page.

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Fixed page metrics for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    /// Left/right margin.
    pub margin: f32,
    /// Height of the coloured header band at the top of every page.
    pub header_height: f32,
    /// Space between the header band and the first content block.
    pub header_gap: f32,
    /// Band reserved at the bottom of every page for the footer.
    pub footer_height: f32,
    /// Vertical gap inserted after every flowed block.
    pub block_gap: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    /// A4 portrait, 210 × 297 mm.
    pub fn a4() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 10.0,
            header_height: 25.0,
            header_gap: 5.0,
            footer_height: 12.0,
            block_gap: 6.0,
        }
    }

    /// Geometry whose usable content area is exactly `width` × `height`,
    /// keeping the A4 bands and margins.
    pub fn with_content_area(width: f32, height: f32) -> Self {
        let base = Self::a4();
        Self {
            page_width: width + 2.0 * base.margin,
            page_height: height + base.content_top() + base.footer_height,
            ..base
        }
    }

    /// Y coordinate where content begins.
    pub fn content_top(&self) -> f32 {
        self.header_height + self.header_gap
    }

    pub fn usable_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    pub fn usable_height(&self) -> f32 {
        self.page_height - self.content_top() - self.footer_height
    }

    /// Baseline of the footer text.
    pub fn footer_baseline(&self) -> f32 {
        self.page_height - 8.0_f32.min(self.footer_height)
    }

    pub fn validate(&self) -> Result<()> {
        let values = [
            self.page_width,
            self.page_height,
            self.margin,
            self.header_height,
            self.header_gap,
            self.footer_height,
            self.block_gap,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ReportError::Config(
                "page geometry values must be finite and non-negative".to_string(),
            ));
        }
        if self.usable_width() <= 0.0 || self.usable_height() <= 0.0 {
            return Err(ReportError::Config(format!(
                "no usable content area ({:.1} x {:.1} mm)",
                self.usable_width(),
                self.usable_height()
            )));
        }
        Ok(())
    }
}

/// Filled height of the current page, in mm below the content top.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutCursor {
    offset: f32,
}

impl LayoutCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn is_at_top(&self) -> bool {
        self.offset <= 0.0
    }

    pub fn advance(&mut self, by: f32) {
        self.offset += by;
    }

    pub fn set(&mut self, offset: f32) {
        self.offset = offset;
    }

    pub fn reset(&mut self) {
        self.offset = 0.0;
    }

    /// Whether a block of height `h` would run past `limit`.
    pub fn overflows(&self, h: f32, limit: f32) -> bool {
        self.offset + h > limit
    }
}
