//! Data-driven renderer – rebuilds the report from diagnosis data alone,
//! using text, rectangles and bars. No screen access is involved, so the
//! only failures are writer errors and pages too short for the type card.
//!
//! Every block is measured first and passed through the page-break check
//! before it is drawn; that check is what keeps content inside the page.

use serde::Serialize;

use crate::chrome::PageChrome;
use crate::diagnosis::{AdviceText, DimensionPair, ReportData};
use crate::error::{ReportError, Result};
use crate::fonts::{truncate_chars, wrap_text};
use crate::geometry::LayoutCursor;
use crate::style::{Align, RectStyle, TextStyle};
use crate::writer::DocumentWriter;

const TITLE_HEIGHT: f32 = 10.0;
const NAME_HEIGHT: f32 = 10.0;
const CARD_HEIGHT: f32 = 35.0;
const HEADING_HEIGHT: f32 = 12.0;
const BODY_LINE_HEIGHT: f32 = 5.0;
const ADVICE_LINE_HEIGHT: f32 = 4.5;
const SUBHEADING_HEIGHT: f32 = 6.0;

const BADGE_PADDING: f32 = 4.0;
const BADGE_GAP: f32 = 2.0;
const BADGE_HEIGHT: f32 = 8.0;
const BADGE_ROW_HEIGHT: f32 = 10.0;

const BAR_BLOCK_HEIGHT: f32 = 12.0;
const BAR_OFFSET: f32 = 5.0;
const BAR_HEIGHT: f32 = 5.0;
const PERCENT_LABEL_INSET: f32 = 1.5;

/// Tallest block the layout never splits. Pages with less usable height
/// cannot hold the report.
pub const MIN_USABLE_HEIGHT: f32 = CARD_HEIGHT;

/// Fills narrower than this share of the track put their label outside.
pub const INSIDE_LABEL_MIN_FRACTION: f32 = 0.25;

/// Where a badge landed in the row-packing layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeSlot {
    pub row: usize,
    /// Offset from the left margin.
    pub x: f32,
    pub width: f32,
}

/// Pack badges left to right, wrapping to a new row when the next badge
/// would cross `row_width`. Badges wider than a row are clamped to it.
pub fn flow_badges(widths: &[f32], row_width: f32, gap: f32) -> Vec<BadgeSlot> {
    let mut slots = Vec::with_capacity(widths.len());
    let mut row = 0;
    let mut x = 0.0f32;
    for &w in widths {
        let width = w.min(row_width);
        if x > 0.0 && x + width > row_width {
            row += 1;
            x = 0.0;
        }
        slots.push(BadgeSlot { row, x, width });
        x += width + gap;
    }
    slots
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentLabel {
    Inside,
    Outside,
}

pub fn percent_label_placement(fill_width: f32, track_width: f32) -> PercentLabel {
    if fill_width < track_width * INSIDE_LABEL_MIN_FRACTION {
        PercentLabel::Outside
    } else {
        PercentLabel::Inside
    }
}

/// Cursor trajectory of one run, for comparing runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderTrace {
    /// `(page, cursor)` after every drawn block.
    pub checkpoints: Vec<(usize, f32)>,
    pub page_count: usize,
}

/// Options specific to the data-driven layout.
#[derive(Debug, Clone, Default)]
pub struct DataRendererOptions {
    /// Line under the header band on the first page.
    pub report_title: String,
    /// Cut each advice paragraph to this many characters.
    pub advice_char_limit: Option<usize>,
}

pub struct DataRenderer<'a> {
    chrome: &'a PageChrome,
    options: &'a DataRendererOptions,
}

impl<'a> DataRenderer<'a> {
    pub fn new(chrome: &'a PageChrome, options: &'a DataRendererOptions) -> Self {
        Self { chrome, options }
    }

    /// Lay out the full report, then number the pages.
    pub fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W, data: &ReportData) -> Result<RenderTrace> {
        let usable = self.chrome.geometry.usable_height();
        if usable < MIN_USABLE_HEIGHT {
            return Err(ReportError::Config(format!(
                "usable height {usable:.1} mm is below the {MIN_USABLE_HEIGHT:.0} mm type card"
            )));
        }
        let mut flow = Flow {
            writer,
            chrome: self.chrome,
            cursor: LayoutCursor::new(),
            trace: RenderTrace::default(),
        };
        flow.page_break()?;

        if !self.options.report_title.is_empty() {
            flow.centered_line(&self.options.report_title, TITLE_HEIGHT, flow.title_style())?;
        }
        if let Some(name) = data.user_name.as_deref().filter(|n| !n.trim().is_empty()) {
            flow.ensure_space(NAME_HEIGHT)?;
            let (x, top) = (flow.margin(), flow.top());
            let style = TextStyle::new(12.0, flow.theme().text);
            flow.writer.draw_text(&format!("Name: {}", name.trim()), x, top + 6.0, &style)?;
            flow.advance(NAME_HEIGHT);
        }

        flow.type_card(&data.result.type_code, &data.result.title)?;
        flow.paragraph(&data.result.description, flow.body_style(), BODY_LINE_HEIGHT)?;
        flow.gap();

        if !data.result.strengths.is_empty() {
            flow.heading("Strengths", BADGE_ROW_HEIGHT)?;
            flow.badges(&data.result.strengths)?;
            flow.gap();
        }

        if !data.result.work_style.trim().is_empty() {
            flow.heading("Ideal Work Environment", BODY_LINE_HEIGHT)?;
            flow.paragraph(&data.result.work_style, flow.body_style(), BODY_LINE_HEIGHT)?;
            flow.gap();
        }

        flow.heading("Personality Balance Analysis", BAR_BLOCK_HEIGHT)?;
        for pair in DimensionPair::ALL {
            flow.balance_bar(pair, data.scores.balance(pair))?;
        }
        flow.gap();

        if let Some(advice) = &data.advice {
            self.advice_section(&mut flow, advice)?;
        }

        let mut trace = flow.trace;
        trace.page_count = self.chrome.stamp_footers(&mut *flow.writer)?;
        log::info!("data-driven report laid out on {} pages", trace.page_count);
        Ok(trace)
    }

    fn advice_section<W: DocumentWriter + ?Sized>(&self, flow: &mut Flow<'_, W>, advice: &AdviceText) -> Result<()> {
        flow.page_break()?;
        flow.heading("AI Career Advice", SUBHEADING_HEIGHT + ADVICE_LINE_HEIGHT)?;

        let sections = [
            ("Career Development", &advice.career),
            ("Stress Management", &advice.stress),
            ("Team Collaboration", &advice.team),
        ];
        for (label, text) in sections {
            let text = match self.options.advice_char_limit {
                Some(limit) => truncate_chars(text, limit),
                None => text.clone(),
            };
            flow.subheading(label, None)?;
            flow.paragraph(&text, flow.advice_style(), ADVICE_LINE_HEIGHT)?;
            flow.gap();
        }

        let ranked = advice.ranked_recommendations();
        if !ranked.is_empty() {
            flow.heading("Recommended Sites", SUBHEADING_HEIGHT + ADVICE_LINE_HEIGHT)?;
            for (rank, site) in ranked.iter().enumerate() {
                flow.subheading(
                    &format!("{}. {}", rank + 1, site.name),
                    Some(&format!("Match {}%", site.display_score())),
                )?;
                flow.paragraph(&site.rationale, flow.advice_style(), ADVICE_LINE_HEIGHT)?;
                flow.advance(2.0);
            }
        }
        Ok(())
    }
}

/// Mutable layout state of one data-driven run.
struct Flow<'w, W: DocumentWriter + ?Sized> {
    writer: &'w mut W,
    chrome: &'w PageChrome,
    cursor: LayoutCursor,
    trace: RenderTrace,
}

impl<W: DocumentWriter + ?Sized> Flow<'_, W> {
    fn theme(&self) -> crate::style::Theme {
        self.chrome.theme
    }

    fn margin(&self) -> f32 {
        self.chrome.geometry.margin
    }

    fn width(&self) -> f32 {
        self.chrome.geometry.usable_width()
    }

    fn top(&self) -> f32 {
        self.chrome.geometry.content_top() + self.cursor.offset()
    }

    fn title_style(&self) -> TextStyle {
        TextStyle::new(16.0, self.theme().text).bold()
    }

    fn body_style(&self) -> TextStyle {
        TextStyle::new(10.0, self.theme().text)
    }

    fn advice_style(&self) -> TextStyle {
        TextStyle::new(9.0, self.theme().text)
    }

    fn page_break(&mut self) -> Result<()> {
        self.chrome.start_page(&mut *self.writer)?;
        self.cursor.reset();
        Ok(())
    }

    /// Start a new page if a block of height `h` does not fit below the
    /// cursor. A block at the top of a page is never moved.
    fn ensure_space(&mut self, h: f32) -> Result<()> {
        if !self.cursor.is_at_top() && self.cursor.overflows(h, self.chrome.geometry.usable_height()) {
            self.page_break()?;
        }
        Ok(())
    }

    fn advance(&mut self, by: f32) {
        self.cursor.advance(by);
        let page = self.writer.current_page().unwrap_or(0);
        self.trace.checkpoints.push((page, self.cursor.offset()));
    }

    fn gap(&mut self) {
        self.advance(self.chrome.geometry.block_gap);
    }

    fn centered_line(&mut self, text: &str, height: f32, style: TextStyle) -> Result<()> {
        self.ensure_space(height)?;
        let x = self.margin() + self.width() / 2.0;
        let baseline = self.top() + height * 0.7;
        self.writer.draw_text(text, x, baseline, &style.aligned(Align::Center))?;
        self.advance(height);
        Ok(())
    }

    fn type_card(&mut self, type_code: &str, title: &str) -> Result<()> {
        self.ensure_space(CARD_HEIGHT)?;
        let (x, top, width) = (self.margin(), self.top(), self.width());
        let theme = self.theme();
        let center = x + width / 2.0;
        self.writer
            .draw_rect(x, top, width, CARD_HEIGHT, &RectStyle::fill(theme.card))?;
        self.writer.draw_text(
            type_code,
            center,
            top + 15.0,
            &TextStyle::new(28.0, theme.primary).bold().aligned(Align::Center),
        )?;
        self.writer.draw_text(
            title,
            center,
            top + 28.0,
            &TextStyle::new(12.0, theme.text).aligned(Align::Center),
        )?;
        self.advance(CARD_HEIGHT);
        self.gap();
        Ok(())
    }

    /// Section heading with an accent bar. `keep_with` is the height of
    /// the first piece of following content, kept on the same page.
    fn heading(&mut self, text: &str, keep_with: f32) -> Result<()> {
        self.ensure_space(HEADING_HEIGHT + keep_with)?;
        let (x, top) = (self.margin(), self.top());
        let theme = self.theme();
        self.writer
            .draw_rect(x, top, 3.0, 8.0, &RectStyle::fill(theme.primary))?;
        self.writer.draw_text(
            text,
            x + 6.0,
            top + 6.0,
            &TextStyle::new(12.0, theme.text).bold(),
        )?;
        self.advance(HEADING_HEIGHT);
        Ok(())
    }

    /// Small accent-coloured label, optionally with a right-aligned note.
    fn subheading(&mut self, text: &str, note: Option<&str>) -> Result<()> {
        self.ensure_space(SUBHEADING_HEIGHT + ADVICE_LINE_HEIGHT)?;
        let (x, width) = (self.margin(), self.width());
        let baseline = self.top() + 4.0;
        let theme = self.theme();
        self.writer.draw_text(
            text,
            x,
            baseline,
            &TextStyle::new(10.0, theme.primary).bold(),
        )?;
        if let Some(note) = note {
            self.writer.draw_text(
                note,
                x + width,
                baseline,
                &TextStyle::new(9.0, theme.muted).aligned(Align::Right),
            )?;
        }
        self.advance(SUBHEADING_HEIGHT);
        Ok(())
    }

    /// Wrap and draw a paragraph line by line; each line may break the page.
    fn paragraph(&mut self, text: &str, style: TextStyle, line_height: f32) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let lines = {
            let writer = &*self.writer;
            wrap_text(text, self.width(), |s| writer.measure_text_width(s, &style))
        };
        let x = self.margin();
        for line in lines {
            self.ensure_space(line_height)?;
            let baseline = self.top() + line_height * 0.75;
            self.writer.draw_text(&line, x, baseline, &style)?;
            self.advance(line_height);
        }
        Ok(())
    }

    fn badges(&mut self, labels: &[String]) -> Result<()> {
        let theme = self.theme();
        let style = TextStyle::new(10.0, theme.primary);
        let widths: Vec<f32> = labels
            .iter()
            .map(|l| self.writer.measure_text_width(l, &style) + 2.0 * BADGE_PADDING)
            .collect();
        let slots = flow_badges(&widths, self.width(), BADGE_GAP);

        let mut current_row = None;
        for (label, slot) in labels.iter().zip(&slots) {
            if current_row != Some(slot.row) {
                if current_row.is_some() {
                    self.advance(BADGE_ROW_HEIGHT);
                }
                self.ensure_space(BADGE_ROW_HEIGHT)?;
                current_row = Some(slot.row);
            }
            let top = self.top();
            let x = self.margin() + slot.x;
            self.writer
                .draw_rect(x, top, slot.width, BADGE_HEIGHT, &RectStyle::fill(theme.card))?;
            self.writer.draw_text(label, x + BADGE_PADDING, top + 5.5, &style)?;
        }
        if current_row.is_some() {
            self.advance(BADGE_ROW_HEIGHT);
        }
        Ok(())
    }

    fn balance_bar(&mut self, pair: DimensionPair, balance: u8) -> Result<()> {
        self.ensure_space(BAR_BLOCK_HEIGHT)?;
        let theme = self.theme();
        let top = self.top();
        let x = self.margin();
        let track = self.width();
        let (left, right) = pair.labels();

        let label_style = TextStyle::new(9.0, theme.muted);
        self.writer.draw_text(left, x, top + 3.0, &label_style)?;
        self.writer
            .draw_text(right, x + track, top + 3.0, &label_style.aligned(Align::Right))?;

        let bar_y = top + BAR_OFFSET;
        self.writer
            .draw_rect(x, bar_y, track, BAR_HEIGHT, &RectStyle::fill(theme.track))?;
        let fill = track * balance as f32 / 100.0;
        if fill > 0.0 {
            self.writer
                .draw_rect(x, bar_y, fill, BAR_HEIGHT, &RectStyle::fill(theme.primary))?;
        }

        let label = format!("{balance}%");
        let baseline = bar_y + 3.8;
        match percent_label_placement(fill, track) {
            PercentLabel::Inside => self.writer.draw_text(
                &label,
                x + fill - PERCENT_LABEL_INSET,
                baseline,
                &TextStyle::new(8.0, theme.on_primary).aligned(Align::Right),
            )?,
            PercentLabel::Outside => self.writer.draw_text(
                &label,
                x + fill + PERCENT_LABEL_INSET,
                baseline,
                &TextStyle::new(8.0, theme.text),
            )?,
        }
        self.advance(BAR_BLOCK_HEIGHT);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrome::HeaderInfo;
    use crate::diagnosis::{DiagnosisResult, DimensionScores};
    use crate::geometry::PageGeometry;
    use crate::style::Theme;
    use crate::writer::{DrawCommand, RecordingWriter};

    fn chrome(geometry: PageGeometry) -> PageChrome {
        PageChrome {
            geometry,
            theme: Theme::default(),
            header: HeaderInfo {
                title: "Nurse Career Diagnosis AI".into(),
                type_code: "ISFJ".into(),
                date: "2025/01/31".into(),
            },
            footer_label: "Nurse Career Diagnosis AI".into(),
        }
    }

    fn data(advice: Option<AdviceText>) -> ReportData {
        ReportData {
            result: DiagnosisResult {
                type_code: "ISFJ".into(),
                title: "The Caring Guardian".into(),
                description: "Attentive and dependable. ".repeat(12),
                strengths: vec!["Empathy".into(), "Diligence".into(), "Observation".into()],
                work_style: "Wards with steady routines and close teamwork.".into(),
                character_image: None,
            },
            scores: DimensionScores {
                extraversion: 1.0,
                introversion: 9.0,
                sensing: 6.0,
                intuition: 2.0,
                ..Default::default()
            },
            advice,
            user_name: Some("Hanako".into()),
            diagnosis_date: "2025/01/31".into(),
        }
    }

    fn advice(len: usize) -> AdviceText {
        AdviceText {
            career: "Grow into a preceptor role. ".repeat(len),
            stress: "Protect your days off. ".repeat(len),
            team: "Pair well with decisive leaders. ".repeat(len),
            recommendations: Vec::new(),
        }
    }

    fn render(d: &ReportData, geometry: PageGeometry) -> (RecordingWriter, RenderTrace) {
        let c = chrome(geometry);
        let options = DataRendererOptions {
            report_title: "MBTI Personality Report".into(),
            advice_char_limit: None,
        };
        let mut w = RecordingWriter::new(geometry.page_width, geometry.page_height);
        let trace = DataRenderer::new(&c, &options).render(&mut w, d).unwrap();
        (w, trace)
    }

    #[test]
    fn badge_rows_wrap_at_row_width() {
        let slots = flow_badges(&[40.0, 40.0, 40.0, 40.0], 150.0, 0.0);
        let rows: Vec<usize> = slots.iter().map(|s| s.row).collect();
        assert_eq!(rows, [0, 0, 0, 1]);
        assert_eq!(slots[2].x, 80.0);
        assert_eq!(slots[3].x, 0.0);
    }

    #[test]
    fn oversized_badge_is_clamped_to_row() {
        let slots = flow_badges(&[10.0, 500.0], 150.0, 2.0);
        assert_eq!(slots[1].row, 1);
        assert_eq!(slots[1].width, 150.0);
    }

    #[test]
    fn percent_label_threshold() {
        assert_eq!(percent_label_placement(24.0, 100.0), PercentLabel::Outside);
        assert_eq!(percent_label_placement(25.0, 100.0), PercentLabel::Inside);
        assert_eq!(percent_label_placement(0.0, 100.0), PercentLabel::Outside);
    }

    #[test]
    fn report_without_advice_fits_one_page() {
        let (w, trace) = render(&data(None), PageGeometry::a4());
        assert_eq!(trace.page_count, 1);
        let texts = w.texts_on(0);
        assert!(texts.contains(&"Name: Hanako"));
        assert!(texts.contains(&"10%"));
        assert!(texts.contains(&"1 / 1"));
    }

    #[test]
    fn advice_always_starts_a_new_page() {
        let (w, trace) = render(&data(Some(advice(1))), PageGeometry::a4());
        assert_eq!(trace.page_count, 2);
        assert!(w.texts_on(1).contains(&"AI Career Advice"));
        assert!(!w.texts_on(0).contains(&"AI Career Advice"));
    }

    #[test]
    fn long_advice_spans_pages_within_bounds() {
        let geometry = PageGeometry::a4();
        let (w, trace) = render(&data(Some(advice(150))), geometry);
        assert!(trace.page_count > 2);
        let bottom = geometry.content_top() + geometry.usable_height();
        for (page, cmds) in w.pages().iter().enumerate() {
            for cmd in cmds {
                if let DrawCommand::Text { text, y, .. } = cmd {
                    if *y == geometry.footer_baseline() {
                        continue;
                    }
                    assert!(*y <= bottom, "page {page}: {text:?} at {y}");
                }
            }
        }
    }

    #[test]
    fn rendering_is_repeatable() {
        let d = data(Some(advice(20)));
        let (w1, t1) = render(&d, PageGeometry::a4());
        let (w2, t2) = render(&d, PageGeometry::a4());
        assert_eq!(t1, t2);
        assert_eq!(w1.pages(), w2.pages());
    }

    #[test]
    fn advice_truncation_is_optional() {
        let c = chrome(PageGeometry::a4());
        let options = DataRendererOptions {
            report_title: String::new(),
            advice_char_limit: Some(10),
        };
        let mut w = RecordingWriter::new(210.0, 297.0);
        DataRenderer::new(&c, &options)
            .render(&mut w, &data(Some(advice(5))))
            .unwrap();
        assert!(w.texts_on(1).contains(&"Grow into ..."));
    }

    #[test]
    fn page_too_short_for_the_type_card_is_rejected() {
        let geometry = PageGeometry::with_content_area(190.0, 30.0);
        let c = chrome(geometry);
        let options = DataRendererOptions::default();
        let mut w = RecordingWriter::new(geometry.page_width, geometry.page_height);
        let result = DataRenderer::new(&c, &options).render(&mut w, &data(None));
        assert!(matches!(result, Err(ReportError::Config(_))));
        assert_eq!(w.page_count(), 0);
    }

    #[test]
    fn shortest_accepted_page_keeps_blocks_inside() {
        let geometry = PageGeometry::with_content_area(190.0, MIN_USABLE_HEIGHT);
        let (w, _) = render(&data(Some(advice(2))), geometry);
        let bottom = geometry.content_top() + geometry.usable_height();
        for cmds in w.pages() {
            for cmd in cmds {
                if let DrawCommand::Rect { y, height, .. } = cmd {
                    if *y >= geometry.content_top() {
                        assert!(*y + *height <= bottom + 1e-3);
                    }
                }
            }
        }
    }
}
