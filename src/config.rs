//! Configuration types for PDF-to-HTML conversion.
//!
//! Two layers of configuration exist, and keeping them apart is what makes
//! concurrent requests safe:
//!
//! * [`ServiceConfig`] - service-wide defaults (container runtime, image
//!   identifiers, default zoom/OCR settings, deadlines). Built once via
//!   [`ServiceConfig::builder()`], then shared read-only (typically behind an
//!   `Arc`) by every request.
//! * [`RequestConfig`] - the effective settings for one conversion, computed
//!   by [`ServiceConfig::resolve`] from the defaults plus the caller's
//!   [`Overrides`]. It is a fresh value per call; nothing is ever written back
//!   into the shared `ServiceConfig`, so there is nothing to restore after a
//!   request and no way for one request's zoom to bleed into another's.

use crate::error::Pdf2HtmlError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default container runtime executable.
pub const DEFAULT_RUNTIME_BIN: &str = "docker";
/// Default OCR image (entrypoint is `ocrmypdf`).
pub const DEFAULT_OCR_IMAGE: &str = "jbarlow83/ocrmypdf-alpine:latest";
/// Default render image (entrypoint is `pdf2htmlEX`).
pub const DEFAULT_RENDER_IMAGE: &str =
    "pdf2htmlex/pdf2htmlex:0.18.8.rc1-master-20200630-Ubuntu-focal-x86_64";
/// Default OCR language string (tesseract codes joined by `+`).
pub const DEFAULT_OCR_LANG: &str = "spa+eng";

/// Configuration shared by every conversion the service performs.
///
/// # Example
/// ```rust
/// use pdf2html::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .runtime_bin("podman")
///     .zoom(1.5)
///     .ocr_lang("eng")
///     .build()
///     .unwrap();
/// assert_eq!(config.zoom.to_string(), "1.5");
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Container runtime executable, e.g. `docker` or `podman`. Default: `docker`.
    pub runtime_bin: String,

    /// Image identifier for the OCR pass.
    pub ocr_image: String,

    /// Image identifier for the HTML-rendering pass.
    pub render_image: String,

    /// Default zoom factor handed to the renderer. Default: 1.3.
    pub zoom: Zoom,

    /// Run the OCR pass before rendering. Default: true.
    ///
    /// Scanned PDFs have no text layer; without OCR the renderer produces a
    /// page of background images that cannot be searched or selected.
    pub ocr_enabled: bool,

    /// Default OCR languages (`+`-joined tesseract codes). Default: `spa+eng`.
    pub ocr_lang: String,

    /// Re-OCR every page (`--force-ocr`) instead of skipping pages that
    /// already carry text (`--skip-text`). Default: true.
    ///
    /// Not overridable per request.
    pub ocr_force: bool,

    /// Deadline for the OCR container in milliseconds. Default: 10 minutes.
    pub ocr_timeout_ms: u64,

    /// Deadline for the render container in milliseconds. Default: 5 minutes.
    pub render_timeout_ms: u64,

    /// Directory inside the container where the workspace is mounted. Default: `/work`.
    pub container_workdir: String,

    /// Parent directory for per-request workspaces. `None` uses the system temp dir.
    pub workspace_root: Option<PathBuf>,

    /// Largest upload the HTTP layer accepts, in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Receives pipeline stage events. Not serialised.
    #[serde(skip)]
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            runtime_bin: DEFAULT_RUNTIME_BIN.to_string(),
            ocr_image: DEFAULT_OCR_IMAGE.to_string(),
            render_image: DEFAULT_RENDER_IMAGE.to_string(),
            zoom: Zoom::DEFAULT,
            ocr_enabled: true,
            ocr_lang: DEFAULT_OCR_LANG.to_string(),
            ocr_force: true,
            ocr_timeout_ms: 10 * 60 * 1000,
            render_timeout_ms: 5 * 60 * 1000,
            container_workdir: "/work".to_string(),
            workspace_root: None,
            max_upload_bytes: 50 * 1024 * 1024,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("runtime_bin", &self.runtime_bin)
            .field("ocr_image", &self.ocr_image)
            .field("render_image", &self.render_image)
            .field("zoom", &self.zoom)
            .field("ocr_enabled", &self.ocr_enabled)
            .field("ocr_lang", &self.ocr_lang)
            .field("ocr_force", &self.ocr_force)
            .field("ocr_timeout_ms", &self.ocr_timeout_ms)
            .field("render_timeout_ms", &self.render_timeout_ms)
            .field("container_workdir", &self.container_workdir)
            .field("workspace_root", &self.workspace_root)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// OCR deadline as a [`Duration`].
    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_millis(self.ocr_timeout_ms)
    }

    /// Render deadline as a [`Duration`].
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Check the constraints [`ServiceConfigBuilder::build`] enforces.
    ///
    /// A config obtained through serde skips the builder; [`resolve`](Self::resolve)
    /// calls this so such a config still fails before any tool runs.
    pub fn validate(&self) -> Result<(), Pdf2HtmlError> {
        for (name, value) in [
            ("runtime_bin", &self.runtime_bin),
            ("ocr_image", &self.ocr_image),
            ("render_image", &self.render_image),
        ] {
            if value.trim().is_empty() {
                return Err(Pdf2HtmlError::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        Zoom::new(self.zoom.0).map_err(|e| Pdf2HtmlError::InvalidConfig(e.to_string()))?;
        validate_ocr_lang(&self.ocr_lang)
            .map_err(|e| Pdf2HtmlError::InvalidConfig(e.to_string()))?;
        if self.ocr_timeout_ms == 0 || self.render_timeout_ms == 0 {
            return Err(Pdf2HtmlError::InvalidConfig(
                "Tool timeouts must be ≥ 1ms".into(),
            ));
        }
        if !self.container_workdir.starts_with('/') {
            return Err(Pdf2HtmlError::InvalidConfig(format!(
                "container_workdir must be an absolute path, got '{}'",
                self.container_workdir
            )));
        }
        Ok(())
    }

    /// Compute the effective settings for one request.
    ///
    /// Overrides win over defaults; a blank `lang` override counts as absent.
    /// `self` is never modified.
    pub fn resolve(&self, overrides: &Overrides) -> Result<RequestConfig, Pdf2HtmlError> {
        self.validate()?;
        let zoom = match overrides.zoom {
            Some(z) => Zoom::new(z)?,
            None => self.zoom,
        };

        let ocr_languages = match overrides.lang.as_deref().map(str::trim) {
            Some(lang) if !lang.is_empty() => {
                validate_ocr_lang(lang)?;
                lang.to_string()
            }
            _ => self.ocr_lang.clone(),
        };

        Ok(RequestConfig {
            zoom,
            ocr_enabled: overrides.ocr.unwrap_or(self.ocr_enabled),
            ocr_languages,
            ocr_force: self.ocr_force,
        })
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn runtime_bin(mut self, bin: impl Into<String>) -> Self {
        self.config.runtime_bin = bin.into();
        self
    }

    pub fn ocr_image(mut self, image: impl Into<String>) -> Self {
        self.config.ocr_image = image.into();
        self
    }

    pub fn render_image(mut self, image: impl Into<String>) -> Self {
        self.config.render_image = image.into();
        self
    }

    /// Default zoom. Invalid values are rejected by [`build`](Self::build).
    pub fn zoom(mut self, zoom: f64) -> Self {
        self.config.zoom = Zoom(zoom);
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr_enabled = v;
        self
    }

    pub fn ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_lang = lang.into();
        self
    }

    pub fn ocr_force(mut self, v: bool) -> Self {
        self.config.ocr_force = v;
        self
    }

    pub fn ocr_timeout(mut self, timeout: Duration) -> Self {
        self.config.ocr_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn render_timeout(mut self, timeout: Duration) -> Self {
        self.config.render_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn container_workdir(mut self, dir: impl Into<String>) -> Self {
        self.config.container_workdir = dir.into();
        self
    }

    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = Some(root.into());
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, Pdf2HtmlError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Per-request types ────────────────────────────────────────────────────

/// Per-request overrides supplied by the caller. `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    pub zoom: Option<f64>,
    pub ocr: Option<bool>,
    pub lang: Option<String>,
}

impl Overrides {
    pub fn zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn ocr(mut self, enabled: bool) -> Self {
        self.ocr = Some(enabled);
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

/// Effective settings of one conversion. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestConfig {
    pub zoom: Zoom,
    pub ocr_enabled: bool,
    pub ocr_languages: String,
    pub ocr_force: bool,
}

/// Renderer zoom factor: finite and strictly positive.
///
/// Formats with at least one fractional digit (`2.0`, `1.3`) because that is
/// the string the renderer has always been given.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Zoom(f64);

impl Zoom {
    pub const DEFAULT: Zoom = Zoom(1.3);

    pub fn new(value: f64) -> Result<Self, Pdf2HtmlError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(Pdf2HtmlError::validation(
                "zoom",
                format!("must be a positive number, got {value}"),
            ));
        }
        Ok(Zoom(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Zoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{:.1}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl TryFrom<f64> for Zoom {
    type Error = Pdf2HtmlError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Zoom::new(value)
    }
}

impl From<Zoom> for f64 {
    fn from(z: Zoom) -> f64 {
        z.0
    }
}

/// Check an OCR language string such as `eng`, `spa+eng` or `script/Latin`.
///
/// The value reaches the OCR tool verbatim as the single argument after `-l`,
/// so only what the tool would misread is refused: an empty value, or one
/// starting with `-` that would parse as an option.
pub fn validate_ocr_lang(lang: &str) -> Result<(), Pdf2HtmlError> {
    if lang.trim().is_empty() {
        return Err(Pdf2HtmlError::validation("lang", "must not be empty"));
    }
    if lang.starts_with('-') {
        return Err(Pdf2HtmlError::validation(
            "lang",
            format!("'{lang}' would be read as an option, not a language"),
        ));
    }
    Ok(())
}
