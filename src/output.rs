//! Result types returned by the conversion entry points.

use serde::Serialize;

/// A finished conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// The ZIP archive: `output.html` plus every asset the renderer wrote.
    #[serde(skip)]
    pub archive: Vec<u8>,

    /// Archive entry names in archive order (forward-slash relative paths).
    pub entries: Vec<String>,

    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// True if the archive contains an entry named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e == name)
    }
}

/// Timings and sizes of one conversion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    /// Wall-clock time of the OCR pass; `None` when OCR was skipped.
    pub ocr_duration_ms: Option<u64>,
    pub render_duration_ms: u64,
    pub archive_duration_ms: u64,
    pub total_duration_ms: u64,
    pub archive_bytes: usize,
}
