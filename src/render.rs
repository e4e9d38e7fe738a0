//! PDF writer – implements [`DocumentWriter`] on top of `printpdf` (v0.8
//! ops-based API). Pages are kept as op lists until export.

use printpdf::*;

use crate::error::{ReportError, Result};
use crate::fonts::FontManager;
use crate::raster::{RasterImage, EMBED_JPEG_QUALITY};
use crate::style::{Align, RectStyle, TextStyle};
use crate::units::mm_to_pt;
use crate::writer::DocumentWriter;

pub struct PdfWriter {
    doc: PdfDocument,
    page_width: f32,
    page_height: f32,
    pages: Vec<Vec<Op>>,
    current: Option<usize>,
    fonts: FontManager,
    exported: Option<Vec<u8>>,
}

impl PdfWriter {
    /// Page size in millimetres.
    pub fn new(title: &str, page_width: f32, page_height: f32) -> Self {
        Self::with_fonts(title, page_width, page_height, FontManager::default())
    }

    pub fn with_fonts(title: &str, page_width: f32, page_height: f32, fonts: FontManager) -> Self {
        Self {
            doc: PdfDocument::new(title),
            page_width,
            page_height,
            pages: Vec::new(),
            current: None,
            fonts,
            exported: None,
        }
    }

    fn ops(&mut self) -> Result<&mut Vec<Op>> {
        let index = self
            .current
            .ok_or_else(|| ReportError::Draw("no page to draw on".to_string()))?;
        self.exported = None;
        Ok(&mut self.pages[index])
    }

    /// Top-left millimetres → PDF points (origin bottom-left).
    fn point(&self, x: f32, y: f32) -> Point {
        Point {
            x: Pt(mm_to_pt(x)),
            y: Pt(mm_to_pt(self.page_height - y)),
        }
    }
}

fn rgb(c: crate::style::Color) -> Color {
    Color::Rgb(Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
        icc_profile: None,
    })
}

fn builtin_font(style: &TextStyle) -> BuiltinFont {
    if style.bold {
        BuiltinFont::HelveticaBold
    } else {
        BuiltinFont::Helvetica
    }
}

impl DocumentWriter for PdfWriter {
    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.current = Some(self.pages.len() - 1);
        self.exported = None;
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
        if text.is_empty() {
            return Ok(());
        }
        let text = builtin_text(text);
        let width = self.measure_text_width(&text, style);
        let left = match style.align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };
        let pos = self.point(left, y);
        let font = builtin_font(style);
        let ops = self.ops()?;
        ops.push(Op::StartTextSection);
        ops.push(Op::SetTextCursor { pos });
        ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(style.font_size),
            font,
        });
        ops.push(Op::SetFillColor {
            col: rgb(style.color),
        });
        ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text)],
            font,
        });
        ops.push(Op::EndTextSection);
        Ok(())
    }

    fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, style: &RectStyle) -> Result<()> {
        if style.fill.is_transparent() || width <= 0.0 || height <= 0.0 {
            return Ok(());
        }
        let corners = [
            self.point(x, y + height),
            self.point(x + width, y + height),
            self.point(x + width, y),
            self.point(x, y),
        ];
        let ops = self.ops()?;
        ops.push(Op::SetFillColor {
            col: rgb(style.fill),
        });
        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: corners
                        .into_iter()
                        .map(|p| LinePoint { p, bezier: false })
                        .collect(),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
        Ok(())
    }

    fn draw_image(&mut self, raster: &RasterImage, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        if raster.is_empty() {
            return Err(ReportError::Draw("cannot embed an empty raster".to_string()));
        }
        self.ops()?;

        let bytes = raster
            .to_jpeg(EMBED_JPEG_QUALITY)
            .map_err(|e| ReportError::Draw(format!("JPEG encode error: {e}")))?;
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let raw = RawImage::decode_from_bytes(&bytes, &mut warnings)
            .map_err(|e| ReportError::Draw(format!("PDF image encode error: {e}")))?;
        let xobj_id = self.doc.add_image(&raw);

        // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px.
        let scale_x = mm_to_pt(width) / raster.width() as f32;
        let scale_y = mm_to_pt(height) / raster.height() as f32;
        let bottom = self.point(x, y + height);

        self.ops()?.push(Op::UseXobject {
            id: xobj_id,
            transform: XObjectTransform {
                translate_x: Some(bottom.x),
                translate_y: Some(bottom.y),
                dpi: Some(72.0),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                rotate: None,
            },
        });
        Ok(())
    }

    fn measure_text_width(&self, text: &str, style: &TextStyle) -> f32 {
        self.fonts.measure_mm(text, style)
    }

    fn export(&mut self) -> Result<Vec<u8>> {
        if let Some(bytes) = &self.exported {
            return Ok(bytes.clone());
        }
        if self.pages.is_empty() {
            return Err(ReportError::Export("document has no pages".to_string()));
        }
        let pages: Vec<PdfPage> = self
            .pages
            .iter()
            .map(|ops| PdfPage::new(Mm(self.page_width), Mm(self.page_height), ops.clone()))
            .collect();
        // Replaced, not appended: export may run again after more drawing.
        self.doc.pages = pages;

        let mut warnings = Vec::new();
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            log::debug!("PDF export produced {} warnings", warnings.len());
        }
        if !bytes.starts_with(b"%PDF-") {
            return Err(ReportError::Export("serialiser produced no PDF header".to_string()));
        }
        self.exported = Some(bytes.clone());
        Ok(bytes)
    }
}

/// Text for the builtin WinAnsi fonts. printpdf writes the string's bytes
/// straight into the content stream, and ASCII is the only range where UTF-8
/// and WinAnsi agree, so typographic punctuation is folded to ASCII and
/// anything else becomes `?`.
fn builtin_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            '\u{2018}' | '\u{2019}' | '\u{201A}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{30FB}' => out.push('*'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\u{3000}' | '\t' => out.push(' '),
            _ => out.push('?'),
        }
    }
    out
}
