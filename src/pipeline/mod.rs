//! Pipeline stages for PDF-to-HTML conversion.
//!
//! Each submodule implements exactly one step; [`crate::convert`] sequences
//! them.
//!
//! ## Data Flow
//!
//! ```text
//! workspace ──▶ ocr? ──▶ render ──▶ archive
//!  (tempdir)   (ocrmypdf) (pdf2htmlEX)  (zip)
//! ```
//!
//! 1. [`workspace`] - allocate the per-request directory, stage `input.pdf`
//! 2. [`ocr`]       - optional text-layer pass producing `ocr.pdf`
//! 3. [`render`]    - HTML rendition producing `output.html` plus assets
//! 4. [`archive`]   - pack everything except the input into a ZIP
//!
//! Both container stages go through [`invoke::run_tool`], and both are
//! started the same way: the workspace is bind-mounted read/write at
//! [`crate::ServiceConfig::container_workdir`] and used as the container's
//! working directory, so tool arguments name files by basename only.

pub mod archive;
pub mod invoke;
pub mod ocr;
pub mod render;
pub mod workspace;

pub use invoke::{run_tool, ToolInvocation, ToolResult};
pub use workspace::Workspace;

use crate::config::ServiceConfig;
use crate::error::Pdf2HtmlError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the uploaded PDF inside the workspace.
pub const INPUT_FILE: &str = "input.pdf";
/// Name of the OCR pass output.
pub const OCR_OUTPUT_FILE: &str = "ocr.pdf";
/// Name of the rendered HTML document.
pub const HTML_OUTPUT_FILE: &str = "output.html";

/// The external tools the service drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ToolKind {
    /// `ocrmypdf` inside the OCR image.
    Ocr,
    /// `pdf2htmlEX` inside the render image.
    Render,
    /// The container runtime itself (self-check probes).
    Runtime,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolKind::Ocr => "ocrmypdf",
            ToolKind::Render => "pdf2htmlEX",
            ToolKind::Runtime => "container runtime",
        };
        f.write_str(s)
    }
}

/// Build `<runtime> run --rm -v <ws>:<workdir> -w <workdir> <image> <tool_args...>`.
pub(crate) fn container_invocation(
    tool: ToolKind,
    image: &str,
    workspace: &Workspace,
    config: &ServiceConfig,
    timeout: Duration,
    tool_args: Vec<String>,
) -> ToolInvocation {
    let host_dir = std::path::absolute(workspace.path())
        .unwrap_or_else(|_| workspace.path().to_path_buf());
    let mount = format!("{}:{}", host_dir.display(), config.container_workdir);

    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "-v".to_string(),
        mount,
        "-w".to_string(),
        config.container_workdir.clone(),
        image.to_string(),
    ];
    args.extend(tool_args);

    ToolInvocation {
        tool,
        executable: config.runtime_bin.clone(),
        args,
        working_dir: host_dir,
        timeout,
    }
}

/// Turn a finished tool run into the stage outcome.
///
/// Timeout wins over the exit code, a non-zero exit is fatal, and a zero
/// exit must have produced `expected`.
pub(crate) fn check_outcome(
    invocation: &ToolInvocation,
    result: ToolResult,
    expected: PathBuf,
) -> Result<PathBuf, Pdf2HtmlError> {
    let tool = invocation.tool;
    if result.timed_out {
        return Err(Pdf2HtmlError::Timeout {
            tool,
            timeout_ms: invocation.timeout_ms(),
        });
    }
    if result.exit_code != 0 {
        tracing::warn!(
            "{} exited with code {}; output:\n{}",
            tool,
            result.exit_code,
            result.combined_output
        );
        return Err(Pdf2HtmlError::ToolFailed {
            tool,
            exit_code: result.exit_code,
            output: result.combined_output,
        });
    }
    if !expected.is_file() {
        tracing::warn!(
            "{} exited 0 without writing {}; output:\n{}",
            tool,
            expected.display(),
            result.combined_output
        );
        return Err(Pdf2HtmlError::MissingOutput {
            tool,
            path: expected,
        });
    }
    Ok(expected)
}
