//! Integration tests for the report generator.
//!
//! These tests validate:
//! - PDF output exists and has valid format
//! - captured blocks are paginated and numbered
//! - any capture failure falls back to the data-driven report
//! - export failures are never swallowed
//! - output and file names are deterministic

use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};

use nurse_report::capture::{CapturableRegion, CaptureOptions, RegionCapturer, SnapshotCapturer};
use nurse_report::geometry::PageGeometry;
use nurse_report::raster::RasterImage;
use nurse_report::style::{RectStyle, TextStyle};
use nurse_report::writer::{DocumentWriter, DrawCommand, RecordedDocument, RecordingWriter};
use nurse_report::{
    report_file_name, CaptureSource, ReportConfig, ReportData, ReportError, ReportGenerator, StrategyKind,
};

// =====================================================================
// Helpers
// =====================================================================

const DIAGNOSIS: &str = r#"{
    "result": {
        "type": "INFJ",
        "title": "The Advocate",
        "description": "Quietly driven and deeply caring, you notice what patients leave unsaid.",
        "strengths": ["Empathy", "Insight", "Planning", "Integrity"],
        "workStyle": "Calm wards with continuity of care and room for one-to-one time."
    },
    "scores": {"E": 3, "I": 9, "S": 4, "N": 8, "T": 5, "F": 7, "J": 8, "P": 4},
    "advice": {
        "careerAdvice": "Consider a path toward clinical nurse specialist.",
        "stressManagement": "Schedule recovery time after night shifts.",
        "teamCompatibility": "You balance well with action-oriented colleagues.",
        "personalizedSiteRecommendations": [
            {"siteName": "Nurse Jobs A", "reason": "Many specialist roles.", "matchScore": 72},
            {"siteName": "Care Careers B", "reason": "Strong mentoring programmes.", "matchScore": 91},
            {"siteName": "Clinic Link C", "reason": "Day-shift clinics.", "matchScore": 140}
        ]
    },
    "diagnosisDate": "2025/01/31"
}"#;

fn data() -> ReportData {
    ReportData::from_json(DIAGNOSIS).unwrap()
}

fn config() -> ReportConfig {
    ReportConfig {
        capture: CaptureOptions {
            scale: 1.0,
            ..CaptureOptions::default()
        },
        ..ReportConfig::default()
    }
}

/// Config whose content area is 190 × 150 mm so 190 px wide snapshots map
/// 1 px to 1 mm.
fn small_page_config() -> ReportConfig {
    ReportConfig {
        geometry: PageGeometry::with_content_area(190.0, 150.0),
        ..config()
    }
}

fn snapshot(height: u32) -> RasterImage {
    RasterImage::new(RgbaImage::from_pixel(190, height, Rgba([20, 184, 166, 255])))
}

fn blocks(heights: &[(&str, u32)]) -> (SnapshotCapturer, Vec<CapturableRegion>) {
    let mut capturer = SnapshotCapturer::new();
    let mut regions = Vec::new();
    for (block, h) in heights {
        capturer.insert_raster(*block, snapshot(*h));
        regions.push(CapturableRegion::new(*block));
    }
    (capturer, regions)
}

fn recorded(bytes: &[u8]) -> RecordedDocument {
    serde_json::from_slice(bytes).unwrap()
}

fn texts(doc: &RecordedDocument) -> Vec<&str> {
    doc.pages
        .iter()
        .flatten()
        .filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

/// Capturer that never produces anything.
struct Unavailable;

impl RegionCapturer for Unavailable {
    async fn capture(&self, region: &CapturableRegion, _: &CaptureOptions) -> nurse_report::Result<RasterImage> {
        Err(ReportError::CaptureFailed {
            block: region.block.clone(),
            reason: "screen not mounted".into(),
        })
    }
}

/// Capturer whose snapshot file is missing.
struct MissingFile;

impl RegionCapturer for MissingFile {
    async fn capture(&self, _: &CapturableRegion, _: &CaptureOptions) -> nurse_report::Result<RasterImage> {
        let bytes = std::fs::read("/nonexistent/nurse-report/snap.png")?;
        Ok(RasterImage::from_encoded(&bytes)?)
    }
}

/// Capturer whose snapshot bytes are not an image.
struct Undecodable;

impl RegionCapturer for Undecodable {
    async fn capture(&self, _: &CapturableRegion, _: &CaptureOptions) -> nurse_report::Result<RasterImage> {
        let decoded = image::load_from_memory(b"not an image")?;
        Ok(RasterImage::new(decoded.to_rgba8()))
    }
}

/// Recording writer that can be told to reject images or the export.
struct FaultyWriter {
    inner: RecordingWriter,
    reject_images: bool,
    reject_export: bool,
}

impl FaultyWriter {
    fn factory(reject_images: bool, reject_export: bool) -> impl Fn(&ReportConfig) -> FaultyWriter {
        move |c: &ReportConfig| FaultyWriter {
            inner: RecordingWriter::new(c.geometry.page_width, c.geometry.page_height),
            reject_images,
            reject_export,
        }
    }
}

impl DocumentWriter for FaultyWriter {
    fn new_page(&mut self) {
        self.inner.new_page()
    }
    fn set_page(&mut self, index: usize) -> nurse_report::Result<()> {
        self.inner.set_page(index)
    }
    fn page_count(&self) -> usize {
        self.inner.page_count()
    }
    fn current_page(&self) -> Option<usize> {
        self.inner.current_page()
    }
    fn draw_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) -> nurse_report::Result<()> {
        self.inner.draw_text(text, x, y, style)
    }
    fn draw_rect(&mut self, x: f32, y: f32, w: f32, h: f32, style: &RectStyle) -> nurse_report::Result<()> {
        self.inner.draw_rect(x, y, w, h, style)
    }
    fn draw_image(&mut self, r: &RasterImage, x: f32, y: f32, w: f32, h: f32) -> nurse_report::Result<()> {
        if self.reject_images {
            return Err(ReportError::Draw("image embedding unavailable".into()));
        }
        self.inner.draw_image(r, x, y, w, h)
    }
    fn measure_text_width(&self, text: &str, style: &TextStyle) -> f32 {
        self.inner.measure_text_width(text, style)
    }
    fn export(&mut self) -> nurse_report::Result<Vec<u8>> {
        if self.reject_export {
            return Err(ReportError::Export("disk full".into()));
        }
        self.inner.export()
    }
}

fn has_images(doc: &RecordedDocument) -> bool {
    doc.pages.iter().flatten().any(|c| matches!(c, DrawCommand::Image { .. }))
}

// =====================================================================
// PDF output
// =====================================================================

#[tokio::test]
async fn data_driven_pdf_is_valid() {
    let generator = ReportGenerator::pdf(config()).unwrap();
    let report = generator.generate_from_data(&data()).await.unwrap();
    assert_valid_pdf(&report.bytes);
    assert_eq!(report.strategy, StrategyKind::DataDriven);
    assert_eq!(report.page_count, 2);
    assert_eq!(report.file_name, "NurseCareer_INFJ_20250131.pdf");
}

#[tokio::test]
async fn captured_blocks_pdf_is_valid() {
    let (capturer, regions) = blocks(&[("result-card", 120), ("balance", 40), ("advice", 30)]);
    let generator = ReportGenerator::pdf(small_page_config()).unwrap();
    let source = CaptureSource {
        capturer: &capturer,
        regions: &regions,
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    assert_valid_pdf(&report.bytes);
    assert_eq!(report.strategy, StrategyKind::CapturedBlocks);
    assert_eq!(report.page_count, 2);
}

#[test]
fn preview_pdf_is_single_page() {
    let generator = ReportGenerator::pdf(config()).unwrap();
    let report = generator.preview(&data()).unwrap();
    assert_valid_pdf(&report.bytes);
    assert_eq!(report.page_count, 1);
    assert_eq!(report.strategy, StrategyKind::Preview);
    assert_eq!(report.file_name, "NurseCareer_preview_INFJ_20250131.pdf");
}

// =====================================================================
// Pagination
// =====================================================================

#[tokio::test]
async fn every_page_is_numbered_out_of_the_total() {
    let (capturer, regions) = blocks(&[("a", 20), ("tall", 400), ("b", 30)]);
    let generator = ReportGenerator::recording(small_page_config()).unwrap();
    let source = CaptureSource {
        capturer: &capturer,
        regions: &regions,
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    let doc = recorded(&report.bytes);
    assert_eq!(report.page_count, 4);
    assert_eq!(doc.pages.len(), 4);
    for i in 1..=4 {
        assert!(texts(&doc).contains(&format!("{i} / 4").as_str()));
    }
}

#[tokio::test]
async fn nested_regions_are_not_captured() {
    let (capturer, mut regions) = blocks(&[("card", 100)]);
    // No snapshot exists for the nested block; capturing it would fail.
    regions.push(CapturableRegion::nested("card-badges"));
    let generator = ReportGenerator::recording(small_page_config()).unwrap();
    let source = CaptureSource {
        capturer: &capturer,
        regions: &regions,
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    assert_eq!(report.strategy, StrategyKind::CapturedBlocks);
    assert_eq!(report.page_count, 1);
}

#[tokio::test]
async fn images_stay_inside_the_content_area() {
    let (capturer, regions) = blocks(&[("a", 90), ("b", 70), ("c", 150), ("d", 333), ("e", 10)]);
    let cfg = small_page_config();
    let g = cfg.geometry;
    let generator = ReportGenerator::recording(cfg).unwrap();
    let source = CaptureSource {
        capturer: &capturer,
        regions: &regions,
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    for page in recorded(&report.bytes).pages {
        for cmd in page {
            if let DrawCommand::Image { y, height, .. } = cmd {
                assert!(y >= g.content_top());
                assert!(y + height <= g.content_top() + g.usable_height() + 1e-3);
            }
        }
    }
}

// =====================================================================
// Fallback and errors
// =====================================================================

#[tokio::test]
async fn capture_failure_falls_back_to_data() {
    let generator = ReportGenerator::recording(config()).unwrap();
    let regions = vec![CapturableRegion::new("result-card")];
    let source = CaptureSource {
        capturer: &Unavailable,
        regions: &regions,
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    assert_eq!(report.strategy, StrategyKind::DataDriven);
    let doc = recorded(&report.bytes);
    assert!(texts(&doc).contains(&"Personality Balance Analysis"));
    assert!(!has_images(&doc));
}

#[tokio::test]
async fn partial_capture_failure_discards_the_partial_document() {
    let (capturer, mut regions) = blocks(&[("a", 40), ("b", 40)]);
    regions.push(CapturableRegion::new("missing"));
    let generator = ReportGenerator::recording(small_page_config()).unwrap();
    let source = CaptureSource {
        capturer: &capturer,
        regions: &regions,
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    assert_eq!(report.strategy, StrategyKind::DataDriven);
    assert!(!has_images(&recorded(&report.bytes)));
}

#[tokio::test]
async fn io_and_decode_errors_from_capture_fall_back() {
    let generator = ReportGenerator::recording(config()).unwrap();
    let regions = vec![CapturableRegion::new("result-card")];

    let source = CaptureSource {
        capturer: &MissingFile,
        regions: &regions,
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    assert_eq!(report.strategy, StrategyKind::DataDriven);

    let source = CaptureSource {
        capturer: &Undecodable,
        regions: &regions,
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    assert_eq!(report.strategy, StrategyKind::DataDriven);
    assert!(!has_images(&recorded(&report.bytes)));
}

#[tokio::test]
async fn draw_failure_mid_run_discards_the_partial_document() {
    let (capturer, regions) = blocks(&[("a", 40), ("tall", 400), ("b", 30)]);
    let generator = ReportGenerator::new(small_page_config(), FaultyWriter::factory(true, false));
    let source = CaptureSource {
        capturer: &capturer,
        regions: &regions,
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    assert_eq!(report.strategy, StrategyKind::DataDriven);
    let doc = recorded(&report.bytes);
    assert!(!has_images(&doc));
    assert!(texts(&doc).contains(&"Personality Balance Analysis"));
    assert_eq!(doc.pages.len(), report.page_count);
}

#[tokio::test]
async fn source_without_top_level_regions_uses_data() {
    let (capturer, _) = blocks(&[("badges", 40)]);
    let generator = ReportGenerator::recording(config()).unwrap();

    let nested_only = vec![CapturableRegion::nested("badges")];
    let source = CaptureSource {
        capturer: &capturer,
        regions: &nested_only,
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    assert_eq!(report.strategy, StrategyKind::DataDriven);
    assert!(texts(&recorded(&report.bytes)).contains(&"Personality Balance Analysis"));

    let source = CaptureSource {
        capturer: &capturer,
        regions: &[],
    };
    let report = generator.generate(Some(source), &data()).await.unwrap();
    assert_eq!(report.strategy, StrategyKind::DataDriven);
}

#[tokio::test]
async fn export_failure_is_not_recovered() {
    let cfg = config();
    let generator = ReportGenerator::new(cfg, FaultyWriter::factory(false, true));
    let regions = vec![CapturableRegion::new("result-card")];
    let source = CaptureSource {
        capturer: &Unavailable,
        regions: &regions,
    };
    let err = generator.generate(Some(source), &data()).await.unwrap_err();
    assert!(matches!(err, ReportError::Export(_)));

    let (capturer, regions) = blocks(&[("a", 40)]);
    let source = CaptureSource {
        capturer: &capturer,
        regions: &regions,
    };
    let err = generator.generate(Some(source), &data()).await.unwrap_err();
    assert!(matches!(err, ReportError::Export(_)));
}

// =====================================================================
// Content and determinism
// =====================================================================

#[tokio::test]
async fn recommendations_are_ranked_and_clamped() {
    let generator = ReportGenerator::recording(config()).unwrap();
    let report = generator.generate_from_data(&data()).await.unwrap();
    let doc = recorded(&report.bytes);
    let all = texts(&doc);
    let pos = |needle: &str| all.iter().position(|t| *t == needle).unwrap();
    assert!(pos("1. Clinic Link C") < pos("2. Care Careers B"));
    assert!(pos("2. Care Careers B") < pos("3. Nurse Jobs A"));
    assert!(all.contains(&"Match 100%"));
}

#[tokio::test]
async fn repeated_runs_are_byte_identical() {
    let generator = ReportGenerator::recording(config()).unwrap();
    let first = generator.generate_from_data(&data()).await.unwrap();
    let second = generator.generate_from_data(&data()).await.unwrap();
    assert_eq!(Sha256::digest(&first.bytes), Sha256::digest(&second.bytes));
    assert_eq!(first.page_count, second.page_count);
}

#[tokio::test]
async fn missing_date_uses_today_in_header_and_file_name() {
    let mut d = data();
    d.diagnosis_date.clear();
    let generator = ReportGenerator::recording(config()).unwrap();
    let report = generator.generate_from_data(&d).await.unwrap();
    let date_part = report
        .file_name
        .strip_prefix("NurseCareer_INFJ_")
        .and_then(|rest| rest.strip_suffix(".pdf"))
        .unwrap();
    assert_eq!(date_part.len(), 8);
    assert!(date_part.chars().all(|c| c.is_ascii_digit()));

    let doc = recorded(&report.bytes);
    let header_date = texts(&doc)
        .into_iter()
        .find_map(|t| t.strip_prefix("MBTI Type: INFJ | Date: "))
        .unwrap()
        .replace('/', "");
    assert_eq!(header_date, date_part);
}

#[test]
fn file_name_pattern() {
    assert_eq!(
        report_file_name("NurseCareer", "ESFP", "2024/12/05", "pdf"),
        "NurseCareer_ESFP_20241205.pdf"
    );
}

#[tokio::test]
async fn report_is_saved_under_its_file_name() {
    let dir = std::env::temp_dir().join(format!("nurse-report-test-{}", std::process::id()));
    let generator = ReportGenerator::pdf(config()).unwrap();
    let report = generator.generate_from_data(&data()).await.unwrap();
    let path = report.save_to_dir(&dir).unwrap();
    assert_eq!(path, dir.join("NurseCareer_INFJ_20250131.pdf"));
    assert_eq!(std::fs::read(&path).unwrap(), report.bytes);
    let _ = std::fs::remove_dir_all(&dir);
}
