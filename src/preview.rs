//! Single-page preview: a taller header band with the product title and the
//! type code and title underneath. No pagination, no footer.

use crate::chrome::PageChrome;
use crate::diagnosis::ReportData;
use crate::error::Result;
use crate::style::{Align, RectStyle, TextStyle};
use crate::writer::DocumentWriter;

/// Band height as a multiple of the regular header band.
const BAND_SCALE: f32 = 1.6;

/// Headline shown under the product title, e.g. `INFJ - The Advocate`.
pub fn headline(data: &ReportData) -> String {
    let title = data.result.title.trim();
    if title.is_empty() {
        data.type_code().to_string()
    } else {
        format!("{} - {}", data.type_code(), title)
    }
}

/// Draw the preview onto a fresh page of `writer`.
pub fn render_preview<W: DocumentWriter + ?Sized>(
    writer: &mut W,
    chrome: &PageChrome,
    data: &ReportData,
) -> Result<()> {
    let g = &chrome.geometry;
    let band = (g.header_height * BAND_SCALE).min(g.page_height);
    let center = g.page_width / 2.0;

    writer.new_page();
    writer.draw_rect(0.0, 0.0, g.page_width, band, &RectStyle::fill(chrome.theme.primary))?;
    writer.draw_text(
        &chrome.header.title,
        center,
        band * 0.45,
        &TextStyle::new(20.0, chrome.theme.on_primary).bold().aligned(Align::Center),
    )?;
    writer.draw_text(
        &headline(data),
        center,
        band * 0.78,
        &TextStyle::new(14.0, chrome.theme.on_primary).aligned(Align::Center),
    )?;
    log::debug!("preview for {} drawn", data.type_code());
    Ok(())
}
