//! Page chrome: the header band drawn when a page is opened, and the footer
//! pass that numbers pages once the final count is known.

use crate::error::Result;
use crate::geometry::PageGeometry;
use crate::style::{Align, RectStyle, TextStyle, Theme};
use crate::writer::DocumentWriter;

/// Text shown in the header band of every page.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderInfo {
    pub title: String,
    pub type_code: String,
    pub date: String,
}

impl HeaderInfo {
    pub fn subtitle(&self) -> String {
        format!("MBTI Type: {} | Date: {}", self.type_code, self.date)
    }
}

/// Everything needed to open pages and number them.
#[derive(Debug, Clone)]
pub struct PageChrome {
    pub geometry: PageGeometry,
    pub theme: Theme,
    pub header: HeaderInfo,
    /// Right-aligned footer label next to the page number.
    pub footer_label: String,
}

impl PageChrome {
    /// Append a page and draw its header band.
    pub fn start_page<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.new_page();
        self.draw_header(writer)
    }

    pub fn draw_header<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let g = &self.geometry;
        let center = g.page_width / 2.0;
        writer.draw_rect(
            0.0,
            0.0,
            g.page_width,
            g.header_height,
            &RectStyle::fill(self.theme.primary),
        )?;
        writer.draw_text(
            &self.header.title,
            center,
            g.header_height * 0.48,
            &TextStyle::new(14.0, self.theme.on_primary).aligned(Align::Center),
        )?;
        writer.draw_text(
            &self.header.subtitle(),
            center,
            g.header_height * 0.8,
            &TextStyle::new(10.0, self.theme.on_primary).aligned(Align::Center),
        )
    }

    /// Second pass: write `i / n` on every realised page. Must run after
    /// all content is laid out. Returns the page count.
    pub fn stamp_footers<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> Result<usize> {
        let g = &self.geometry;
        let total = writer.page_count();
        let baseline = g.footer_baseline();
        let number_style = TextStyle::new(8.0, self.theme.muted).aligned(Align::Center);
        let label_style = TextStyle::new(8.0, self.theme.muted).aligned(Align::Right);
        for index in 0..total {
            writer.set_page(index)?;
            writer.draw_text(
                &format!("{} / {}", index + 1, total),
                g.page_width / 2.0,
                baseline,
                &number_style,
            )?;
            writer.draw_text(&self.footer_label, g.page_width - g.margin, baseline, &label_style)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::RecordingWriter;

    fn chrome() -> PageChrome {
        PageChrome {
            geometry: PageGeometry::a4(),
            theme: Theme::default(),
            header: HeaderInfo {
                title: "Nurse Career Diagnosis AI".into(),
                type_code: "INFJ".into(),
                date: "2025/01/31".into(),
            },
            footer_label: "Nurse Career Diagnosis AI".into(),
        }
    }

    #[test]
    fn header_carries_type_and_date() {
        let mut w = RecordingWriter::new(210.0, 297.0);
        chrome().start_page(&mut w).unwrap();
        assert_eq!(
            w.texts_on(0),
            ["Nurse Career Diagnosis AI", "MBTI Type: INFJ | Date: 2025/01/31"]
        );
    }

    #[test]
    fn footers_reflect_final_total() {
        let c = chrome();
        let mut w = RecordingWriter::new(210.0, 297.0);
        for _ in 0..3 {
            c.start_page(&mut w).unwrap();
        }
        assert_eq!(c.stamp_footers(&mut w).unwrap(), 3);
        for page in 0..3 {
            let texts = w.texts_on(page);
            assert!(texts.contains(&format!("{} / 3", page + 1).as_str()), "{texts:?}");
        }
    }
}
