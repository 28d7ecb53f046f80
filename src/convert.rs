//! Conversion entry points: the pipeline coordinator.
//!
//! [`convert`] runs one request end to end:
//!
//! ```text
//! resolve config ─▶ workspace ─▶ [ocr] ─▶ render ─▶ drop input ─▶ archive
//!                        └──────────── destroy, always ◀──────────────┘
//! ```
//!
//! The effective [`RequestConfig`] is computed before anything touches the
//! filesystem, so an invalid override costs nothing. Once the workspace
//! exists, the stages run inside a single fallible block and the workspace is
//! destroyed after that block returns, whatever it returned. No partial
//! result ever escapes: the caller gets the whole archive or one error.

use crate::config::{Overrides, RequestConfig, ServiceConfig};
use crate::error::Pdf2HtmlError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::{archive, ocr, render, Workspace};
use crate::pipeline::{HTML_OUTPUT_FILE, INPUT_FILE, OCR_OUTPUT_FILE};
use crate::progress::Stage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert PDF bytes into a ZIP archive holding the HTML rendition.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `pdf_bytes` - the uploaded document
/// * `overrides` - per-request zoom / OCR / language choices
/// * `config`    - service-wide defaults; never modified
///
/// # Errors
/// Returns exactly one [`Pdf2HtmlError`] if any step fails. The workspace is
/// gone by the time this function returns, on every path.
pub async fn convert(
    pdf_bytes: &[u8],
    overrides: &Overrides,
    config: &ServiceConfig,
) -> Result<ConversionOutput, Pdf2HtmlError> {
    let total_start = Instant::now();

    // ── Step 1: Resolve effective configuration ──────────────────────────
    let request = config.resolve(overrides)?;
    info!(
        "Starting conversion: {} bytes, zoom {}, ocr {} ({})",
        pdf_bytes.len(),
        request.zoom,
        request.ocr_enabled,
        request.ocr_languages
    );

    // ── Step 2: Acquire workspace ────────────────────────────────────────
    let workspace = Workspace::create(config.workspace_root.as_deref())?;
    notify_stage(config, Stage::Created);

    // ── Steps 3–6 ────────────────────────────────────────────────────────
    let result = run_stages(&workspace, pdf_bytes, &request, config).await;

    // ── Step 7: Release workspace, whatever happened ─────────────────────
    workspace.destroy().await;

    match result {
        Ok((packed, mut stats)) => {
            stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
            info!(
                "Conversion complete: {} entries, {} bytes, {}ms total",
                packed.entries.len(),
                stats.archive_bytes,
                stats.total_duration_ms
            );
            notify_stage(config, Stage::Done);
            if let Some(ref cb) = config.progress_callback {
                cb.on_complete(packed.entries.len(), packed.bytes.len());
            }
            Ok(ConversionOutput {
                archive: packed.bytes,
                entries: packed.entries,
                stats,
            })
        }
        Err(e) => {
            warn!("Conversion failed: {}", e);
            notify_stage(config, Stage::Failed);
            if let Some(ref cb) = config.progress_callback {
                cb.on_error(&e.to_string());
            }
            Err(e)
        }
    }
}

/// Convert a PDF file on disk. See [`convert`].
pub async fn convert_file(
    input: impl AsRef<Path>,
    overrides: &Overrides,
    config: &ServiceConfig,
) -> Result<ConversionOutput, Pdf2HtmlError> {
    let path = input.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        Pdf2HtmlError::validation("input", format!("cannot read '{}': {}", path.display(), e))
    })?;
    convert(&bytes, overrides, config).await
}

/// Convert a PDF file and write the archive directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial archives.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    overrides: &Overrides,
    config: &ServiceConfig,
) -> Result<ConversionOutput, Pdf2HtmlError> {
    let output = convert_file(input, overrides, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Pdf2HtmlError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("zip.tmp");
    tokio::fs::write(&tmp_path, &output.archive)
        .await
        .map_err(|e| Pdf2HtmlError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Pdf2HtmlError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    pdf_bytes: &[u8],
    overrides: &Overrides,
    config: &ServiceConfig,
) -> Result<ConversionOutput, Pdf2HtmlError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2HtmlError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(pdf_bytes, overrides, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Steps 2b–6. Everything here runs while the workspace is alive.
async fn run_stages(
    workspace: &Workspace,
    pdf_bytes: &[u8],
    request: &RequestConfig,
    config: &ServiceConfig,
) -> Result<(archive::PackedArchive, ConversionStats), Pdf2HtmlError> {
    workspace.write_file(INPUT_FILE, pdf_bytes).await?;
    debug!("Staged {} in {}", INPUT_FILE, workspace.path().display());

    // ── OCR (optional) ───────────────────────────────────────────────────
    let mut ocr_duration_ms = None;
    let render_input = if request.ocr_enabled {
        notify_stage(config, Stage::OcrRunning);
        let start = Instant::now();
        ocr::run(
            workspace,
            INPUT_FILE,
            &request.ocr_languages,
            request.ocr_force,
            config,
        )
        .await?;
        ocr_duration_ms = Some(start.elapsed().as_millis() as u64);
        OCR_OUTPUT_FILE
    } else {
        debug!("OCR disabled for this request");
        INPUT_FILE
    };

    // ── Render ───────────────────────────────────────────────────────────
    notify_stage(config, Stage::Rendering);
    let render_start = Instant::now();
    render::run(workspace, render_input, HTML_OUTPUT_FILE, request.zoom, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Drop the upload; it is not part of the deliverable ───────────────
    workspace.remove_file(INPUT_FILE).await?;

    // ── Pack ─────────────────────────────────────────────────────────────
    notify_stage(config, Stage::Packing);
    let pack_start = Instant::now();
    let packed = archive::pack(workspace.path()).await?;
    let archive_duration_ms = pack_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        ocr_duration_ms,
        render_duration_ms,
        archive_duration_ms,
        total_duration_ms: 0,
        archive_bytes: packed.bytes.len(),
    };
    Ok((packed, stats))
}

fn notify_stage(config: &ServiceConfig, stage: Stage) {
    debug!("Pipeline stage: {}", stage);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(stage);
    }
}
