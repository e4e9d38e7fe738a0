//! The document writer contract shared by both report strategies, and an
//! in-memory implementation that records every draw call.
//!
//! Coordinates are millimetres from the top-left of the page. Text `y` is
//! the baseline.

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::fonts::FontManager;
use crate::raster::RasterImage;
use crate::style::{RectStyle, TextStyle};

/// Stateful handle to an in-progress multi-page document.
pub trait DocumentWriter {
    /// Append a page and make it current.
    fn new_page(&mut self);

    /// Select an existing page (0-based).
    fn set_page(&mut self, index: usize) -> Result<()>;

    fn page_count(&self) -> usize;

    fn current_page(&self) -> Option<usize>;

    fn draw_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) -> Result<()>;

    fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, style: &RectStyle) -> Result<()>;

    fn draw_image(&mut self, raster: &RasterImage, x: f32, y: f32, width: f32, height: f32) -> Result<()>;

    /// Width of `text` in millimetres.
    fn measure_text_width(&self, text: &str, style: &TextStyle) -> f32;

    /// Serialise the finished document.
    fn export(&mut self) -> Result<Vec<u8>>;
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Text {
        text: String,
        x: f32,
        y: f32,
        style: TextStyle,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        style: RectStyle,
    },
    Image {
        px_width: u32,
        px_height: u32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Serialised form of a [`RecordingWriter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedDocument {
    pub page_width: f32,
    pub page_height: f32,
    pub pages: Vec<Vec<DrawCommand>>,
}

/// Writer that keeps draw calls in memory. Exports its pages as JSON.
#[derive(Clone)]
pub struct RecordingWriter {
    page_width: f32,
    page_height: f32,
    pages: Vec<Vec<DrawCommand>>,
    current: Option<usize>,
    fonts: FontManager,
}

impl RecordingWriter {
    pub fn new(page_width: f32, page_height: f32) -> Self {
        Self::with_fonts(page_width, page_height, FontManager::default())
    }

    pub fn with_fonts(page_width: f32, page_height: f32, fonts: FontManager) -> Self {
        Self {
            page_width,
            page_height,
            pages: Vec::new(),
            current: None,
            fonts,
        }
    }

    pub fn pages(&self) -> &[Vec<DrawCommand>] {
        &self.pages
    }

    /// Text strings drawn on `page`, in draw order.
    pub fn texts_on(&self, page: usize) -> Vec<&str> {
        self.pages
            .get(page)
            .map(|cmds| {
                cmds.iter()
                    .filter_map(|c| match c {
                        DrawCommand::Text { text, .. } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Image placements on `page` as `(y, height)` pairs.
    pub fn images_on(&self, page: usize) -> Vec<(f32, f32)> {
        self.pages
            .get(page)
            .map(|cmds| {
                cmds.iter()
                    .filter_map(|c| match c {
                        DrawCommand::Image { y, height, .. } => Some((*y, *height)),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn to_document(&self) -> RecordedDocument {
        RecordedDocument {
            page_width: self.page_width,
            page_height: self.page_height,
            pages: self.pages.clone(),
        }
    }

    fn push(&mut self, cmd: DrawCommand) -> Result<()> {
        let index = self
            .current
            .ok_or_else(|| ReportError::Draw("no page to draw on".to_string()))?;
        self.pages[index].push(cmd);
        Ok(())
    }
}

impl DocumentWriter for RecordingWriter {
    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.current = Some(self.pages.len() - 1);
    }

    fn set_page(&mut self, index: usize) -> Result<()> {
        if index >= self.pages.len() {
            return Err(ReportError::Draw(format!(
                "page {index} out of range ({} pages)",
                self.pages.len()
            )));
        }
        self.current = Some(index);
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn current_page(&self) -> Option<usize> {
        self.current
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) -> Result<()> {
        self.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            style: *style,
        })
    }

    fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, style: &RectStyle) -> Result<()> {
        self.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            style: *style,
        })
    }

    fn draw_image(&mut self, raster: &RasterImage, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        self.push(DrawCommand::Image {
            px_width: raster.width(),
            px_height: raster.height(),
            x,
            y,
            width,
            height,
        })
    }

    fn measure_text_width(&self, text: &str, style: &TextStyle) -> f32 {
        self.fonts.measure_mm(text, style)
    }

    fn export(&mut self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            return Err(ReportError::Export("document has no pages".to_string()));
        }
        serde_json::to_vec_pretty(&self.to_document()).map_err(|e| ReportError::Export(e.to_string()))
    }
}
