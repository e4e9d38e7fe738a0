//! Report generator – runs the captured-block strategy when capture is
//! available and falls back to the data-driven strategy on any recoverable
//! failure. Callers get a complete document or an error, never a partial one.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::capture::{top_level_regions, CapturableRegion, RegionCapturer};
use crate::chrome::{HeaderInfo, PageChrome};
use crate::config::ReportConfig;
use crate::diagnosis::ReportData;
use crate::error::Result;
use crate::fallback::{DataRenderer, DataRendererOptions};
use crate::fonts::FontManager;
use crate::paginator::BlockFlowPaginator;
use crate::preview::render_preview;
use crate::render::PdfWriter;
use crate::writer::{DocumentWriter, RecordingWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    CapturedBlocks,
    DataDriven,
    Preview,
}

/// One way of producing the full report through a [`DocumentWriter`].
#[allow(async_fn_in_trait)]
pub trait ReportStrategy {
    fn kind(&self) -> StrategyKind;

    /// Lay out the report, footers included. Returns the page count.
    async fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> Result<usize>;
}

/// Flows captured screen regions onto pages.
pub struct CapturedBlockStrategy<'a, C> {
    paginator: BlockFlowPaginator<'a, C>,
    regions: &'a [CapturableRegion],
}

impl<C: RegionCapturer> ReportStrategy for CapturedBlockStrategy<'_, C> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CapturedBlocks
    }

    async fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> Result<usize> {
        let summary = self.paginator.paginate(writer, self.regions).await?;
        Ok(summary.page_count)
    }
}

/// Rebuilds the report from diagnosis data.
pub struct DataDrivenStrategy<'a> {
    renderer: DataRenderer<'a>,
    data: &'a ReportData,
}

impl ReportStrategy for DataDrivenStrategy<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DataDriven
    }

    async fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> Result<usize> {
        Ok(self.renderer.render(writer, self.data)?.page_count)
    }
}

/// Capturer plus the regions it should capture, in document order.
pub struct CaptureSource<'a, C> {
    pub capturer: &'a C,
    pub regions: &'a [CapturableRegion],
}

/// A finished document.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub strategy: StrategyKind,
    pub file_name: String,
}

impl GeneratedReport {
    /// Write the document into `dir` under its deterministic file name.
    pub fn save_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        log::info!(
            "wrote {} ({} bytes, {} page{})",
            path.display(),
            self.bytes.len(),
            self.page_count,
            if self.page_count == 1 { "" } else { "s" }
        );
        Ok(path)
    }
}

/// `{prefix}_{typeCode}_{date}.{extension}` with date separators removed.
pub fn report_file_name(prefix: &str, type_code: &str, date: &str, extension: &str) -> String {
    let date: String = date.chars().filter(|c| c.is_alphanumeric()).collect();
    let type_code: String = type_code
        .chars()
        .filter(|c| !matches!(c, '/' | '\\'))
        .collect();
    format!("{prefix}_{type_code}_{date}.{extension}")
}

/// Today's local date in the `YYYY/MM/DD` form used on reports.
pub fn today() -> String {
    chrono::Local::now().format("%Y/%m/%d").to_string()
}

type WriterFactory<W> = Box<dyn Fn(&ReportConfig) -> W>;

/// Entry point. Each call builds its own writers; nothing is shared between
/// runs.
pub struct ReportGenerator<W> {
    config: ReportConfig,
    factory: WriterFactory<W>,
}

impl ReportGenerator<PdfWriter> {
    /// Generator producing PDF documents.
    pub fn pdf(config: ReportConfig) -> Result<Self> {
        config.validate()?;
        let fonts = config.font_manager()?;
        Ok(Self::new(config, move |cfg: &ReportConfig| {
            PdfWriter::with_fonts(
                &cfg.labels.product_title,
                cfg.geometry.page_width,
                cfg.geometry.page_height,
                fonts.clone(),
            )
        }))
    }
}

impl ReportGenerator<RecordingWriter> {
    /// Generator producing JSON layout dumps.
    pub fn recording(config: ReportConfig) -> Result<Self> {
        config.validate()?;
        let fonts: FontManager = config.font_manager()?;
        Ok(Self::new(config, move |cfg: &ReportConfig| {
            RecordingWriter::with_fonts(cfg.geometry.page_width, cfg.geometry.page_height, fonts.clone())
        }))
    }
}

impl<W: DocumentWriter> ReportGenerator<W> {
    pub fn new(config: ReportConfig, factory: impl Fn(&ReportConfig) -> W + 'static) -> Self {
        Self {
            config,
            factory: Box::new(factory),
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Build the report, preferring captured blocks when a source with at
    /// least one top-level region is given.
    pub async fn generate<C: RegionCapturer>(
        &self,
        source: Option<CaptureSource<'_, C>>,
        data: &ReportData,
    ) -> Result<GeneratedReport> {
        let chrome = self.chrome(data);

        match source {
            Some(source) if !top_level_regions(source.regions).is_empty() => {
                let strategy = CapturedBlockStrategy {
                    paginator: BlockFlowPaginator::new(source.capturer, &chrome, &self.config.capture),
                    regions: source.regions,
                };
                let mut writer = (self.factory)(&self.config);
                match self.run(&strategy, &mut writer, &chrome, data).await {
                    Ok(report) => return Ok(report),
                    Err(e) if e.is_recoverable() => {
                        log::warn!("captured-block layout failed, using data-driven renderer: {e}");
                    }
                    Err(e) => return Err(e),
                }
            }
            Some(_) => log::info!("no top-level regions to capture, using data-driven renderer"),
            None => {}
        }

        self.generate_data_driven_with(&chrome, data).await
    }

    /// Build the report from data only.
    pub async fn generate_from_data(&self, data: &ReportData) -> Result<GeneratedReport> {
        let chrome = self.chrome(data);
        self.generate_data_driven_with(&chrome, data).await
    }

    /// Single-page preview with the header band, type code and title.
    pub fn preview(&self, data: &ReportData) -> Result<GeneratedReport> {
        let chrome = self.chrome(data);
        let mut writer = (self.factory)(&self.config);
        render_preview(&mut writer, &chrome, data)?;
        let bytes = writer.export()?;
        let labels = &self.config.labels;
        Ok(GeneratedReport {
            bytes,
            page_count: writer.page_count(),
            strategy: StrategyKind::Preview,
            file_name: report_file_name(
                &format!("{}_preview", labels.file_prefix),
                data.type_code(),
                &chrome.header.date,
                &labels.extension,
            ),
        })
    }

    async fn generate_data_driven_with(&self, chrome: &PageChrome, data: &ReportData) -> Result<GeneratedReport> {
        let options = DataRendererOptions {
            report_title: self.config.labels.report_title.clone(),
            advice_char_limit: self.config.advice_char_limit,
        };
        let strategy = DataDrivenStrategy {
            renderer: DataRenderer::new(chrome, &options),
            data,
        };
        let mut writer = (self.factory)(&self.config);
        self.run(&strategy, &mut writer, chrome, data).await
    }

    /// The file name uses the header's date so both agree for the whole run.
    async fn run<S: ReportStrategy>(
        &self,
        strategy: &S,
        writer: &mut W,
        chrome: &PageChrome,
        data: &ReportData,
    ) -> Result<GeneratedReport> {
        let page_count = strategy.render(writer).await?;
        let bytes = writer.export()?;
        log::info!("{:?} strategy produced {page_count} pages", strategy.kind());
        let labels = &self.config.labels;
        Ok(GeneratedReport {
            bytes,
            page_count,
            strategy: strategy.kind(),
            file_name: report_file_name(
                &labels.file_prefix,
                data.type_code(),
                &chrome.header.date,
                &labels.extension,
            ),
        })
    }

    /// Header chrome for one run. The diagnosis date is resolved here, once.
    fn chrome(&self, data: &ReportData) -> PageChrome {
        let date = match data.diagnosis_date.trim() {
            "" => today(),
            given => given.to_string(),
        };
        PageChrome {
            geometry: self.config.geometry,
            theme: self.config.theme,
            header: HeaderInfo {
                title: self.config.labels.product_title.clone(),
                type_code: data.type_code().to_string(),
                date,
            },
            footer_label: self.config.labels.product_title.clone(),
        }
    }
}
