//! Runtime self-check: is the container runtime reachable, are the images local?
//!
//! Most "conversion failed" reports in practice come down to two things: the
//! runtime binary is missing (or the daemon is down), or an image has not been
//! pulled yet and the first request stalls on a multi-hundred-megabyte
//! download. [`run`] probes both without converting anything:
//!
//! 1. `<runtime> --version`
//! 2. `<runtime> image inspect <image>` for the OCR and render images,
//!    concurrently
//!
//! Probes go through the same invoker as the conversion stages, with a short
//! deadline each. The report is plain data; it never fails.

use crate::config::ServiceConfig;
use crate::pipeline::{run_tool, ToolInvocation, ToolKind};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of [`run`].
#[derive(Debug, Clone, Serialize)]
pub struct SelfCheckReport {
    pub runtime: String,
    pub runtime_available: bool,
    /// `--version` output, or the launch error.
    pub runtime_version: String,
    pub images: Vec<ImageStatus>,
}

impl SelfCheckReport {
    /// Runtime answered and every image is present locally.
    pub fn healthy(&self) -> bool {
        self.runtime_available && self.images.iter().all(|i| i.present)
    }
}

/// Local availability of one image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageStatus {
    pub image: String,
    pub present: bool,
    /// What to run when the image is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Probe the runtime and both images.
pub async fn run(config: &ServiceConfig) -> SelfCheckReport {
    let (runtime_available, runtime_version) =
        match run_tool(&probe(config, vec!["--version".into()])).await {
            Ok(res) => (res.success(), res.combined_output.trim().to_string()),
            Err(e) => (false, e.to_string()),
        };

    let images = futures::future::join_all(
        [&config.ocr_image, &config.render_image]
            .into_iter()
            .map(|image| inspect_image(config, image)),
    )
    .await;

    let report = SelfCheckReport {
        runtime: config.runtime_bin.clone(),
        runtime_available,
        runtime_version,
        images,
    };
    debug!("Self-check: {:?}", report);
    report
}

async fn inspect_image(config: &ServiceConfig, image: &str) -> ImageStatus {
    let inv = probe(
        config,
        vec!["image".into(), "inspect".into(), image.to_string()],
    );
    let present = matches!(run_tool(&inv).await, Ok(res) if res.success());
    ImageStatus {
        image: image.to_string(),
        present,
        hint: (!present).then(|| format!("{} pull {}", config.runtime_bin, image)),
    }
}

fn probe(config: &ServiceConfig, args: Vec<String>) -> ToolInvocation {
    ToolInvocation {
        tool: ToolKind::Runtime,
        executable: config.runtime_bin.clone(),
        args,
        working_dir: std::env::temp_dir(),
        timeout: PROBE_TIMEOUT,
    }
}
