//! Report configuration. Every field has a default; a JSON file only needs
//! the keys it overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capture::CaptureOptions;
use crate::error::{ReportError, Result};
use crate::fallback::MIN_USABLE_HEIGHT;
use crate::fonts::FontManager;
use crate::geometry::PageGeometry;
use crate::style::Theme;

/// Fixed strings printed on, or used to name, the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLabels {
    /// Header band title and footer label.
    pub product_title: String,
    /// Title line at the top of the data-driven report.
    pub report_title: String,
    pub file_prefix: String,
    pub extension: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self {
            product_title: "Nurse Career Diagnosis AI".to_string(),
            report_title: "MBTI Personality Report".to_string(),
            file_prefix: "NurseCareer".to_string(),
            extension: "pdf".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub geometry: PageGeometry,
    pub theme: Theme,
    pub capture: CaptureOptions,
    pub labels: ReportLabels,
    /// Cut each advice paragraph to this many characters (with "...").
    pub advice_char_limit: Option<usize>,
    /// TTF with Helvetica-compatible metrics (e.g. Liberation Sans) used
    /// for text measurement instead of the average-width heuristic.
    pub metrics_font: Option<PathBuf>,
}

impl ReportConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        if self.geometry.usable_height() < MIN_USABLE_HEIGHT {
            return Err(ReportError::Config(format!(
                "usable height {:.1} mm cannot hold a {MIN_USABLE_HEIGHT:.0} mm block",
                self.geometry.usable_height()
            )));
        }
        if self.labels.file_prefix.is_empty() || self.labels.extension.is_empty() {
            return Err(ReportError::Config(
                "file prefix and extension must not be empty".to_string(),
            ));
        }
        if !(self.capture.scale > 0.0) || !self.capture.scale.is_finite() {
            return Err(ReportError::Config(format!(
                "capture scale must be positive, got {}",
                self.capture.scale
            )));
        }
        Ok(())
    }

    /// Font metrics for text measurement.
    pub fn font_manager(&self) -> Result<FontManager> {
        let mut fonts = FontManager::new();
        if let Some(path) = &self.metrics_font {
            fonts.load_font_file(path)?;
            log::debug!("measuring text with metrics from {}", path.display());
        }
        Ok(fonts)
    }
}
