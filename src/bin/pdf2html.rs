//! CLI binary for pdf2html.
//!
//! A thin shim over the library crate: global flags map onto
//! `ServiceConfig`, subcommands onto `convert_to_file`, `server::serve` and
//! `selfcheck::run`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2html::{
    convert_to_file, selfcheck, ConversionProgressCallback, Overrides, ProgressCallback,
    ServiceConfig, Stage,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner whose message follows the pipeline stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.set_message("preparing workspace…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        let msg = match stage {
            Stage::Created => "workspace ready",
            Stage::OcrRunning => "running OCR (ocrmypdf)…",
            Stage::Rendering => "rendering HTML (pdf2htmlEX)…",
            Stage::Packing => "packing archive…",
            Stage::Done | Stage::Failed => return,
        };
        self.bar.set_message(msg);
    }

    // The outcome itself is reported once by `main`.
    fn on_error(&self, _error: &str) {
        self.bar.finish_and_clear();
    }

    fn on_complete(&self, _entries: usize, _archive_bytes: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert with OCR (default) into scan.zip
  pdf2html convert scan.pdf

  # Born-digital PDF, no OCR, larger zoom
  pdf2html convert report.pdf --no-ocr --zoom 2 -o report.zip

  # English + German OCR
  pdf2html convert letter.pdf --lang eng+deu

  # HTTP service
  pdf2html serve --bind 0.0.0.0:8080
  curl -F file=@scan.pdf http://localhost:8080/convert/pdf-to-html -o out.zip

  # Is the container runtime up and are the images pulled?
  pdf2html selfcheck

REQUIREMENTS:
  A container runtime (docker or podman) reachable by the current user, and
  the two images:
    docker pull jbarlow83/ocrmypdf-alpine:latest
    docker pull pdf2htmlex/pdf2htmlex:0.18.8.rc1-master-20200630-Ubuntu-focal-x86_64
"#;

/// Convert PDF files to self-contained HTML archives.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2html",
    version,
    about = "Convert PDF files to HTML archives via containerised OCR and pdf2htmlEX",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Container runtime executable (docker, podman, …).
    #[arg(long, global = true, env = "PDF2HTML_RUNTIME")]
    runtime: Option<String>,

    /// Image providing ocrmypdf.
    #[arg(long, global = true, env = "PDF2HTML_OCR_IMAGE")]
    ocr_image: Option<String>,

    /// Image providing pdf2htmlEX.
    #[arg(long, global = true, env = "PDF2HTML_RENDER_IMAGE")]
    render_image: Option<String>,

    /// Default zoom when a request gives none.
    #[arg(long, global = true, env = "PDF2HTML_ZOOM")]
    default_zoom: Option<f64>,

    /// Disable OCR unless a request asks for it.
    #[arg(long, global = true, env = "PDF2HTML_NO_OCR")]
    no_ocr_default: bool,

    /// Default OCR languages, `+`-separated (e.g. spa+eng).
    #[arg(long, global = true, env = "PDF2HTML_LANG")]
    default_lang: Option<String>,

    /// Keep existing text layers (`--skip-text`) instead of forcing OCR.
    #[arg(long, global = true, env = "PDF2HTML_SKIP_TEXT")]
    skip_text: bool,

    /// OCR stage timeout in seconds.
    #[arg(long, global = true, env = "PDF2HTML_OCR_TIMEOUT")]
    ocr_timeout: Option<u64>,

    /// Render stage timeout in seconds.
    #[arg(long, global = true, env = "PDF2HTML_RENDER_TIMEOUT")]
    render_timeout: Option<u64>,

    /// Parent directory for per-request workspaces (default: system temp).
    #[arg(long, global = true, env = "PDF2HTML_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2HTML_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one PDF into a ZIP archive.
    Convert {
        /// PDF file to convert.
        input: PathBuf,

        /// Where to write the archive (default: `<input stem>.zip`).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render zoom for this conversion.
        #[arg(long)]
        zoom: Option<f64>,

        /// Force OCR on for this conversion.
        #[arg(long, conflicts_with = "no_ocr")]
        ocr: bool,

        /// Force OCR off for this conversion.
        #[arg(long)]
        no_ocr: bool,

        /// OCR languages for this conversion.
        #[arg(long)]
        lang: Option<String>,

        /// Print the result as JSON (entries + stats).
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP service.
    #[cfg(feature = "server")]
    Serve {
        /// Address to listen on.
        #[arg(long, env = "PDF2HTML_BIND", default_value = "127.0.0.1:8080")]
        bind: std::net::SocketAddr,
    },

    /// Check the container runtime and images.
    Selfcheck {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback a one-shot conversion needs, so
    // library INFO logs are hidden while it runs.
    let show_progress = !cli.quiet
        && matches!(cli.command, Command::Convert { json: false, .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress: Option<ProgressCallback> = if show_progress && !cli.verbose {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;

    match cli.command {
        Command::Convert {
            ref input,
            ref output,
            zoom,
            ocr,
            no_ocr,
            ref lang,
            json,
        } => {
            let overrides = Overrides {
                zoom,
                ocr: if ocr {
                    Some(true)
                } else if no_ocr {
                    Some(false)
                } else {
                    None
                },
                lang: lang.clone(),
            };
            let output = output
                .clone()
                .unwrap_or_else(|| input.with_extension("zip"));
            run_convert(&cli, &config, input, &output, &overrides, json).await
        }

        #[cfg(feature = "server")]
        Command::Serve { bind } => pdf2html::server::serve(bind, Arc::new(config))
            .await
            .with_context(|| format!("HTTP server on {bind} failed")),

        Command::Selfcheck { json } => {
            let report = selfcheck::run(&config).await;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else {
                let mark = |ok: bool| if ok { green("✔") } else { red("✘") };
                println!(
                    "{} runtime '{}'  {}",
                    mark(report.runtime_available),
                    report.runtime,
                    dim(&report.runtime_version)
                );
                for image in &report.images {
                    println!("{} image {}", mark(image.present), image.image);
                    if let Some(ref hint) = image.hint {
                        println!("    {}", dim(&format!("try: {hint}")));
                    }
                }
            }
            if !report.healthy() {
                anyhow::bail!("Self-check failed");
            }
            Ok(())
        }
    }
}

async fn run_convert(
    cli: &Cli,
    config: &ServiceConfig,
    input: &Path,
    output: &Path,
    overrides: &Overrides,
    json: bool,
) -> Result<()> {
    let result = convert_to_file(input, output, overrides, config)
        .await
        .with_context(|| format!("Conversion of {} failed", input.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} entries  {}ms  →  {}",
            green("✔"),
            result.entries.len(),
            result.stats.total_duration_ms,
            bold(&output.display().to_string()),
        );
        if let Some(ocr_ms) = result.stats.ocr_duration_ms {
            eprintln!(
                "   {}",
                dim(&format!(
                    "ocr {ocr_ms}ms  /  render {}ms  /  pack {}ms",
                    result.stats.render_duration_ms, result.stats.archive_duration_ms
                ))
            );
        }
    }
    Ok(())
}

/// Map global CLI flags to `ServiceConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .ocr_enabled(!cli.no_ocr_default)
        .ocr_force(!cli.skip_text);

    if let Some(ref runtime) = cli.runtime {
        builder = builder.runtime_bin(runtime);
    }
    if let Some(ref image) = cli.ocr_image {
        builder = builder.ocr_image(image);
    }
    if let Some(ref image) = cli.render_image {
        builder = builder.render_image(image);
    }
    if let Some(zoom) = cli.default_zoom {
        builder = builder.zoom(zoom);
    }
    if let Some(ref lang) = cli.default_lang {
        builder = builder.ocr_lang(lang);
    }
    if let Some(secs) = cli.ocr_timeout {
        builder = builder.ocr_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.render_timeout {
        builder = builder.render_timeout(Duration::from_secs(secs));
    }
    if let Some(ref root) = cli.workspace_root {
        builder = builder.workspace_root(root);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
