//! HTTP front end for the conversion pipeline.
//!
//! | Method | Path                    | Purpose                              |
//! |--------|-------------------------|--------------------------------------|
//! | POST   | `/convert/pdf-to-html`  | multipart upload → `html_export.zip` |
//! | GET    | `/convert/health`       | liveness, always `OK`                |
//! | GET    | `/convert/selfcheck`    | runtime + image availability (JSON)  |
//!
//! The router's only state is an `Arc<ServiceConfig>`, read-only for the life
//! of the process. Each request resolves its own overrides against it, so
//! concurrent uploads never observe each other's zoom or language.
//!
//! ```bash
//! curl -F file=@scan.pdf -F zoom=1.5 -F lang=eng \
//!      http://localhost:8080/convert/pdf-to-html -o html_export.zip
//! ```

use crate::config::{Overrides, ServiceConfig};
use crate::convert::convert;
use crate::error::Pdf2HtmlError;
use crate::selfcheck;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, info_span, warn, Instrument};

/// Name of the archive in the `Content-Disposition` header.
pub const ARCHIVE_FILENAME: &str = "html_export.zip";

static REQUEST_IDS: AtomicU64 = AtomicU64::new(1);

/// Build the application router.
pub fn router(config: Arc<ServiceConfig>) -> Router {
    let limit = config.max_upload_bytes;
    Router::new()
        .route("/convert/pdf-to-html", post(pdf_to_html))
        .route("/convert/health", get(health))
        .route("/convert/selfcheck", get(self_check))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(config)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, config: Arc<ServiceConfig>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_with_shutdown(listener, config, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    config: Arc<ServiceConfig>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown)
        .await
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// Raw override values; parsed by hand so bad input yields our own 400.
#[derive(Debug, Default, Deserialize)]
struct ConvertParams {
    zoom: Option<String>,
    ocr: Option<String>,
    lang: Option<String>,
}

async fn pdf_to_html(
    State(config): State<Arc<ServiceConfig>>,
    Query(query): Query<ConvertParams>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        ApiError::new(
            rejection.status(),
            format!("Expected a multipart upload: {}", rejection.body_text()),
        )
    })?;
    let span = info_span!("convert", id = REQUEST_IDS.fetch_add(1, Ordering::Relaxed));

    let mut upload = None;
    let mut form = ConvertParams::default();
    while let Some(field) = multipart.next_field().await.map_err(ApiError::multipart)? {
        match field.name().unwrap_or_default() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(ApiError::multipart)?;
                upload = Some((filename, data));
            }
            "zoom" => form.zoom = Some(field.text().await.map_err(ApiError::multipart)?),
            "ocr" => form.ocr = Some(field.text().await.map_err(ApiError::multipart)?),
            "lang" => form.lang = Some(field.text().await.map_err(ApiError::multipart)?),
            _ => {}
        }
    }

    let (filename, data) = match upload {
        Some((name, data)) if !data.is_empty() => (name, data),
        _ => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "Attach a PDF in the 'file' field.",
            ))
        }
    };
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Only .pdf files are accepted.",
        ));
    }

    let overrides = Overrides {
        zoom: parse_zoom(form.zoom.or(query.zoom))?,
        ocr: parse_ocr(form.ocr.or(query.ocr))?,
        lang: form.lang.or(query.lang),
    };

    async move {
        info!("Upload '{}' ({} bytes)", filename, data.len());
        let output = convert(&data, &overrides, &config).await?;
        Ok((
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{ARCHIVE_FILENAME}\""),
                ),
            ],
            output.archive,
        )
            .into_response())
    }
    .instrument(span)
    .await
}

async fn health() -> &'static str {
    "OK"
}

async fn self_check(State(config): State<Arc<ServiceConfig>>) -> Json<selfcheck::SelfCheckReport> {
    Json(selfcheck::run(&config).await)
}

// ── Parameter parsing ────────────────────────────────────────────────────

fn parse_zoom(raw: Option<String>) -> Result<Option<f64>, ApiError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<f64>().map(Some).map_err(|_| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid zoom: '{s}' is not a number"))
        }),
    }
}

fn parse_ocr(raw: Option<String>) -> Result<Option<bool>, ApiError> {
    match raw.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(None),
        Some(s) => match s.as_str() {
            "" => Ok(None),
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("Invalid ocr: '{s}' is not a boolean"),
            )),
        },
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// An error response: status code plus a JSON `{"error": ...}` body.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn multipart(e: MultipartError) -> Self {
        Self::new(e.status(), format!("Malformed upload: {}", e.body_text()))
    }
}

impl From<Pdf2HtmlError> for ApiError {
    fn from(e: Pdf2HtmlError) -> Self {
        let status = match &e {
            Pdf2HtmlError::Validation { .. } => StatusCode::BAD_REQUEST,
            Pdf2HtmlError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Pdf2HtmlError::ToolFailed { .. }
            | Pdf2HtmlError::MissingOutput { .. }
            | Pdf2HtmlError::ToolSpawn { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("Request failed ({}): {}", self.status, self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
