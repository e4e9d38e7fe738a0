//! # nurse-report – paginated MBTI diagnosis reports
//!
//! Turns a finished personality diagnosis into a multi-page A4 document.
//! Two strategies share one [`writer::DocumentWriter`] contract:
//!
//! 1. **Capture** – rasterise each marked screen region ([`capture`])
//! 2. **Flow** – place the captures down the pages, slicing anything taller
//!    than one page ([`paginator`], [`slicer`])
//! 3. **Fallback** – when capture fails, rebuild the report from data with
//!    text, rectangles and bars ([`fallback`])
//! 4. **Number** – stamp `i / n` footers once the page count is final
//!    ([`chrome`])
//! 5. **Export** – emit PDF bytes via printpdf ([`render`]) under a
//!    deterministic file name ([`report`])

pub mod capture;
pub mod chrome;
pub mod config;
pub mod diagnosis;
pub mod error;
pub mod fallback;
pub mod fonts;
pub mod geometry;
pub mod paginator;
pub mod preview;
pub mod raster;
pub mod render;
pub mod report;
pub mod slicer;
pub mod style;
pub mod units;
pub mod writer;

// Re-exports for convenience
pub use capture::{CapturableRegion, CaptureOptions, RegionCapturer, SnapshotCapturer};
pub use config::ReportConfig;
pub use diagnosis::ReportData;
pub use error::{ReportError, Result};
pub use report::{report_file_name, CaptureSource, GeneratedReport, ReportGenerator, StrategyKind};
