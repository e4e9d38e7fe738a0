//! Font metrics and text wrapping using `ttf-parser`.
//!
//! Output is drawn with the builtin Helvetica faces. By default widths come
//! from an average-advance heuristic; loading a metric-compatible TTF (e.g.
//! Liberation Sans) gives exact glyph advances instead.

use std::path::Path;

use crate::error::{ReportError, Result};
use crate::style::TextStyle;
use crate::units::pt_to_mm;

/// Metrics of one loaded face.
#[derive(Clone)]
struct FaceMetrics {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    bytes: Vec<u8>,
    units_per_em: f32,
}

/// Measures text for the regular and bold builtin faces.
#[derive(Clone, Default)]
pub struct FontManager {
    regular: Option<FaceMetrics>,
    bold: Option<FaceMetrics>,
}

impl FontManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load TTF/OTF metrics for the regular or bold face.
    pub fn load_font(&mut self, bold: bool, bytes: Vec<u8>) -> Result<()> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| ReportError::Config(format!("failed to parse font: {e}")))?;
        let metrics = FaceMetrics {
            units_per_em: face.units_per_em() as f32,
            bytes,
        };
        if bold {
            self.bold = Some(metrics);
        } else {
            self.regular = Some(metrics);
        }
        Ok(())
    }

    /// Load the same TTF for both faces from disk.
    pub fn load_font_file(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path)?;
        self.load_font(false, bytes.clone())?;
        self.load_font(true, bytes)
    }

    pub fn has_real_fonts(&self) -> bool {
        self.regular.is_some()
    }

    /// Width of `text` in points.
    pub fn measure_pt(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        let metrics = if bold {
            self.bold.as_ref().or(self.regular.as_ref())
        } else {
            self.regular.as_ref()
        };

        let Some(data) = metrics else {
            // Average char width ≈ 0.5 × font_size for proportional fonts;
            // bold is ~10 % wider.
            let avg = if bold { 0.55 } else { 0.5 };
            return text.chars().count() as f32 * font_size * avg;
        };

        match ttf_parser::Face::parse(&data.bytes, 0) {
            Ok(face) => {
                let scale = font_size / data.units_per_em;
                text.chars()
                    .map(|ch| match face.glyph_index(ch) {
                        Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                        None => font_size * 0.5,
                    })
                    .sum()
            }
            Err(_) => text.chars().count() as f32 * font_size * 0.5,
        }
    }

    /// Width of `text` in millimetres for the given style.
    pub fn measure_mm(&self, text: &str, style: &TextStyle) -> f32 {
        pt_to_mm(self.measure_pt(text, style.font_size, style.bold))
    }
}

/// Word-wrap `text` so every line fits `max_width` (mm). Words wider than
/// a whole line are broken between characters. Explicit newlines are kept.
pub fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut any_word = false;
        for word in paragraph.split_whitespace() {
            any_word = true;
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure(word) <= max_width {
                current = word.to_string();
            } else {
                let mut pieces = break_word(word, max_width, &measure);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        if !current.is_empty() || !any_word {
            lines.push(current);
        }
    }
    lines
}

/// Split a single overlong word into chunks that each fit `max_width`.
/// Every chunk holds at least one character.
fn break_word(word: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if measure(&current) > max_width && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Shorten `text` to at most `limit` characters, appending "..." when cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}
