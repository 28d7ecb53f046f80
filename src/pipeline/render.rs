//! HTML rendition with `pdf2htmlEX` running in a container.
//!
//! ```text
//! docker run --rm -v <ws>:/work -w /work <render-image> \
//!     --zoom <z> --split-pages 0 \
//!     --embed-css 0 --embed-font 0 --embed-image 0 \
//!     --fallback 1 --process-outline 0 \
//!     <input> output.html
//! ```
//!
//! The image's entrypoint is `pdf2htmlEX`; the binary name must not be
//! repeated in the arguments.
//!
//! ## Flag set
//!
//! CSS, fonts and images are written as separate files next to the HTML
//! rather than inlined, so the archive stays inspectable and the HTML small.
//! A single page file (`--split-pages 0`), fallback mode and skipping the
//! outline trade some fidelity for output that renders the same in every
//! browser.

use super::{check_outcome, container_invocation, run_tool, ToolInvocation, ToolKind, Workspace};
use crate::config::{ServiceConfig, Zoom};
use crate::error::Pdf2HtmlError;
use tracing::info;

/// Fixed pdf2htmlEX flags that follow `--zoom <z>`.
const STABILITY_FLAGS: [&str; 12] = [
    "--split-pages",
    "0",
    "--embed-css",
    "0",
    "--embed-font",
    "0",
    "--embed-image",
    "0",
    "--fallback",
    "1",
    "--process-outline",
    "0",
];

/// Build the render invocation.
pub fn invocation(
    workspace: &Workspace,
    input_name: &str,
    output_name: &str,
    zoom: Zoom,
    config: &ServiceConfig,
) -> ToolInvocation {
    let mut tool_args = Vec::with_capacity(STABILITY_FLAGS.len() + 4);
    tool_args.push("--zoom".to_string());
    tool_args.push(zoom.to_string());
    tool_args.extend(STABILITY_FLAGS.iter().map(|s| s.to_string()));
    tool_args.push(input_name.to_string());
    tool_args.push(output_name.to_string());

    container_invocation(
        ToolKind::Render,
        &config.render_image,
        workspace,
        config,
        config.render_timeout(),
        tool_args,
    )
}

/// Render `input_name` to `output_name` inside the workspace.
///
/// # Errors
/// Same taxonomy as [`super::ocr::run`], attributed to [`ToolKind::Render`].
pub async fn run(
    workspace: &Workspace,
    input_name: &str,
    output_name: &str,
    zoom: Zoom,
    config: &ServiceConfig,
) -> Result<(), Pdf2HtmlError> {
    let inv = invocation(workspace, input_name, output_name, zoom, config);
    info!("Rendering {} → {} (zoom {})", input_name, output_name, zoom);
    let result = run_tool(&inv).await?;
    check_outcome(&inv, result, workspace.join(output_name))?;
    Ok(())
}
