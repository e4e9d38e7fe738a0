//! Error types for report generation.
//!
//! Every error raised while laying out captured blocks is recoverable: the
//! orchestrator answers it by switching to the data-driven renderer. Export
//! errors are not, since both strategies share the same writer.

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The region capturer could not produce a raster for a block.
    #[error("failed to capture block '{block}': {reason}")]
    CaptureFailed { block: String, reason: String },

    /// An intermediate surface for one slice band could not be created.
    #[error("failed to create slice surface at row {offset} ({rows} rows): {reason}")]
    SliceSurface {
        offset: u32,
        rows: u32,
        reason: String,
    },

    /// A drawing call was rejected by the document writer.
    #[error("draw error: {0}")]
    Draw(String),

    /// The document writer could not serialise the final document.
    #[error("export failed: {0}")]
    Export(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl ReportError {
    /// Whether the orchestrator may recover by substituting strategies.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ReportError::Export(_))
    }

    pub(crate) fn capture(block: &str, reason: impl Into<String>) -> Self {
        ReportError::CaptureFailed {
            block: block.to_string(),
            reason: reason.into(),
        }
    }
}
