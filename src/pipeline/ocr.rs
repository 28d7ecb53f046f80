//! OCR pass: add a text layer with `ocrmypdf` running in a container.
//!
//! The OCR image's entrypoint is `ocrmypdf` itself, so the tool flags follow
//! the image identifier directly:
//!
//! ```text
//! docker run --rm -v <ws>:/work -w /work <ocr-image> \
//!     --force-ocr|--skip-text -l <langs> input.pdf ocr.pdf
//! ```
//!
//! `--force-ocr` rasterises and re-recognises every page, which is slower but
//! also fixes PDFs whose existing text layer is garbage. `--skip-text` leaves
//! pages that already carry text untouched.

use super::{check_outcome, container_invocation, run_tool, ToolInvocation, ToolKind, Workspace};
use super::OCR_OUTPUT_FILE;
use crate::config::ServiceConfig;
use crate::error::Pdf2HtmlError;
use std::path::PathBuf;
use tracing::info;

/// Build the OCR invocation for `input_name` inside `workspace`.
pub fn invocation(
    workspace: &Workspace,
    input_name: &str,
    languages: &str,
    force: bool,
    config: &ServiceConfig,
) -> ToolInvocation {
    let policy = if force { "--force-ocr" } else { "--skip-text" };
    let tool_args = vec![
        policy.to_string(),
        "-l".to_string(),
        languages.to_string(),
        input_name.to_string(),
        OCR_OUTPUT_FILE.to_string(),
    ];
    container_invocation(
        ToolKind::Ocr,
        &config.ocr_image,
        workspace,
        config,
        config.ocr_timeout(),
        tool_args,
    )
}

/// Run the OCR pass and return the path of the produced `ocr.pdf`.
///
/// # Errors
/// - [`Pdf2HtmlError::Timeout`] if the deadline (default 10 min) elapses
/// - [`Pdf2HtmlError::ToolFailed`] on a non-zero exit
/// - [`Pdf2HtmlError::MissingOutput`] on a zero exit without `ocr.pdf`
pub async fn run(
    workspace: &Workspace,
    input_name: &str,
    languages: &str,
    force: bool,
    config: &ServiceConfig,
) -> Result<PathBuf, Pdf2HtmlError> {
    let inv = invocation(workspace, input_name, languages, force, config);
    info!(
        "OCR pass on {} (languages: {}, force: {})",
        input_name, languages, force
    );
    let result = run_tool(&inv).await?;
    check_outcome(&inv, result, workspace.join(OCR_OUTPUT_FILE))
}
