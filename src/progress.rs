//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ServiceConfigBuilder::progress_callback`] to observe each
//! conversion as it moves through its stages. The CLI uses this to drive a
//! spinner; a server could forward the events to its own telemetry.
//!
//! # Example
//!
//! ```rust
//! use pdf2html::{ConversionProgressCallback, ServiceConfig, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     stages: Mutex<Vec<Stage>>,
//! }
//!
//! impl ConversionProgressCallback for Recorder {
//!     fn on_stage(&self, stage: Stage) {
//!         self.stages.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let config = ServiceConfig::builder()
//!     .progress_callback(Arc::new(Recorder::default()))
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// States of one pipeline run.
///
/// ```text
/// Created ─▶ OcrRunning? ─▶ Rendering ─▶ Packing ─▶ Done
///     └──────────┴──────────────┴────────────┴─────▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    /// Workspace allocated and input staged.
    Created,
    /// OCR container running.
    OcrRunning,
    /// Render container running.
    Rendering,
    /// Workspace being packed into the archive.
    Packing,
    /// Archive produced.
    Done,
    /// A stage failed; no archive will be returned.
    Failed,
}

impl Stage {
    /// True for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Created => "created",
            Stage::OcrRunning => "ocr",
            Stage::Rendering => "rendering",
            Stage::Packing => "packing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Called by the conversion pipeline as it moves between stages.
///
/// Implementations must be `Send + Sync`: concurrent conversions sharing one
/// `ServiceConfig` call into the same callback from different tasks. All
/// methods have no-op defaults.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called on every state transition, including the terminal one.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once when a conversion fails, after `on_stage(Stage::Failed)`.
    fn on_error(&self, error: &str) {
        let _ = error;
    }

    /// Called once when a conversion succeeds.
    ///
    /// # Arguments
    /// * `entries`       - number of files in the archive
    /// * `archive_bytes` - size of the produced ZIP
    fn on_complete(&self, entries: usize, archive_bytes: usize) {
        let _ = (entries, archive_bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ServiceConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
