//! # pdf2html
//!
//! Convert uploaded PDF documents into a ZIP of self-contained HTML, with an
//! optional OCR pass so scanned pages come out as selectable text.
//!
//! Both heavy lifters run as containerised command-line tools: `ocrmypdf`
//! adds a text layer, `pdf2htmlEX` lays the pages out as HTML + CSS + images.
//! This crate owns everything around them: a private scratch directory per
//! request, bounded tool invocations, and packing the result.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Resolve   per-request zoom / OCR / language over service defaults
//!  ├─ 2. Stage     fresh workspace, upload written as input.pdf
//!  ├─ 3. OCR       ocrmypdf container → ocr.pdf          (optional)
//!  ├─ 4. Render    pdf2htmlEX container → output.html + assets
//!  ├─ 5. Pack      every remaining file → ZIP (deflate, sorted entries)
//!  └─ 6. Cleanup   workspace removed on success and on every failure
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2html::{convert, Overrides, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::default();
//!     let pdf = std::fs::read("scan.pdf")?;
//!     let output = convert(&pdf, &Overrides::default().lang("eng"), &config).await?;
//!     std::fs::write("html_export.zip", &output.archive)?;
//!     eprintln!("{} entries", output.entries.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdf2html` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | on      | HTTP front end ([`server`]) built on axum |
//!
//! Library-only users can opt out of both:
//! ```toml
//! pdf2html = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod selfcheck;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Overrides, RequestConfig, ServiceConfig, ServiceConfigBuilder, Zoom};
pub use convert::{convert, convert_file, convert_sync, convert_to_file};
pub use error::Pdf2HtmlError;
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::ToolKind;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use selfcheck::{ImageStatus, SelfCheckReport};
