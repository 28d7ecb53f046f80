//! Error types for the pdf2html library.
//!
//! A single fatal error type, [`Pdf2HtmlError`], covers every way a
//! conversion can fail. There is no partial success: the pipeline either
//! returns a complete archive or exactly one of these errors, and in both
//! cases the per-request workspace has already been removed.
//!
//! Variants are grouped by the pipeline step that raises them:
//!
//! * **Request** - the caller supplied an override the service cannot use.
//! * **Workspace** - the filesystem could not stage the request.
//! * **Tools** - an external container exited non-zero, timed out, could not
//!   be launched, or claimed success without producing its output file.
//! * **Archive** - packaging failed after a successful conversion.
//!
//! Tool diagnostics (the merged stdout/stderr of the container) are kept on
//! [`Pdf2HtmlError::ToolFailed`] for logging, but never appear in the
//! `Display` message, so nothing from inside the container leaks to callers
//! that forward `to_string()` to an HTTP client.

use crate::pipeline::ToolKind;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2html library.
#[derive(Debug, Error)]
pub enum Pdf2HtmlError {
    // ── Request errors ────────────────────────────────────────────────────
    /// A request override (or upload) is malformed.
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    // ── Workspace errors ──────────────────────────────────────────────────
    /// The per-request workspace could not be created or written to.
    #[error("Workspace error: {detail}: {source}\nCheck free space and permissions of the temp directory.")]
    Workspace {
        detail: String,
        #[source]
        source: std::io::Error,
    },

    // ── Tool errors ───────────────────────────────────────────────────────
    /// The container runtime could not be started at all.
    #[error("Failed to launch {tool}: {source}\nIs the container runtime installed and on PATH?")]
    ToolSpawn {
        tool: ToolKind,
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited with a non-zero status.
    ///
    /// `output` holds the merged stdout/stderr of the run for logging.
    #[error("{tool} exited with code {exit_code}")]
    ToolFailed {
        tool: ToolKind,
        exit_code: i32,
        output: String,
    },

    /// An external tool exceeded its deadline and was killed.
    #[error("{tool} timed out after {timeout_ms}ms")]
    Timeout { tool: ToolKind, timeout_ms: u64 },

    /// A tool exited zero but did not write the file it was asked to produce.
    #[error("{tool} reported success but did not produce '{}'", path.display())]
    MissingOutput { tool: ToolKind, path: PathBuf },

    // ── Archive errors ────────────────────────────────────────────────────
    /// The workspace could not be packed into a ZIP archive.
    #[error("Failed to build archive: {detail}")]
    Archive { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write the archive to its destination file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2HtmlError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Pdf2HtmlError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Exit code of a failed tool run, if this is a [`Pdf2HtmlError::ToolFailed`].
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Pdf2HtmlError::ToolFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// The tool this error originated from, if any.
    pub fn tool(&self) -> Option<ToolKind> {
        match self {
            Pdf2HtmlError::ToolSpawn { tool, .. }
            | Pdf2HtmlError::ToolFailed { tool, .. }
            | Pdf2HtmlError::Timeout { tool, .. }
            | Pdf2HtmlError::MissingOutput { tool, .. } => Some(*tool),
            _ => None,
        }
    }

    /// True when the caller's input was at fault rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Pdf2HtmlError::Validation { .. })
    }
}
