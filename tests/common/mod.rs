//! Fake container runtime for integration tests.
//!
//! The generated shell script accepts the same argv the pipeline hands to
//! `docker run` (`run --rm -v <mount> -w <dir> <image> <tool args…>`), logs
//! it, and then behaves according to the mode baked in for that image. The
//! container's mount is irrelevant: the process already runs inside the
//! workspace, so relative input/output names resolve the same way.

#![allow(dead_code)]

use pdf2html::ServiceConfig;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const OCR_IMAGE: &str = "test/ocrmypdf";
pub const RENDER_IMAGE: &str = "test/pdf2htmlex";

/// What the fake does when asked to run a given image.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    /// OCR: copy input to output.
    CopyThrough,
    /// Render: write output.html wrapping the input, plus two assets.
    Render,
    /// Print to stderr and exit 2.
    Fail,
    /// Record the pid and sleep far past any test timeout.
    Hang,
    /// Exit 0 without writing anything.
    Silent,
    /// Like `Render`, plus an asset nested deeper than PATH_MAX allows to
    /// address by full path.
    RenderTooDeep,
}

impl Mode {
    fn script(self, pidfile: &Path) -> String {
        match self {
            Mode::CopyThrough => r#"cp "$in" "$out"; echo "ocr: 1 page""#.to_string(),
            Mode::Render => concat!(
                r#"{ printf '<html><body>'; cat "$in"; printf '</body></html>'; } > "$out"; "#,
                r#"printf 'body{margin:0}' > base.min.css; "#,
                r#"mkdir -p img; printf 'PNG' > img/bg1.png; "#,
                r#"echo "render: done""#
            )
            .to_string(),
            Mode::Fail => r#"echo "fatal: cannot parse document" >&2; exit 2"#.to_string(),
            Mode::Hang => format!(r#"echo $$ > "{}"; exec sleep 30"#, pidfile.display()),
            Mode::Silent => "exit 0".to_string(),
            Mode::RenderTooDeep => format!(
                "{}; (i=0; while [ $i -lt 24 ]; do mkdir {d} && cd {d} || exit 1; i=$((i+1)); done; printf 'x' > deep.woff)",
                Mode::Render.script(pidfile),
                d = "d".repeat(200),
            ),
        }
    }
}

/// A fake runtime plus the scratch directories a test needs.
pub struct FakeRuntime {
    pub dir: TempDir,
    pub bin: PathBuf,
    pub log: PathBuf,
    pub pidfile: PathBuf,
    pub workspace_root: PathBuf,
}

impl FakeRuntime {
    pub fn new(ocr: Mode, render: Mode) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("fake-runtime");
        let log = dir.path().join("invocations.log");
        let pidfile = dir.path().join("tool.pid");
        let workspace_root = dir.path().join("workspaces");
        std::fs::create_dir(&workspace_root).unwrap();

        let script = format!(
            r#"#!/usr/bin/env bash
echo "$*" >> "{log}"
image="$7"
eval "in=\${{$(($# - 1))}}"
eval "out=\${{$#}}"
case "$image" in
  {ocr_image}) {ocr} ;;
  {render_image}) {render} ;;
  *) echo "unknown image $image" >&2; exit 125 ;;
esac
"#,
            log = log.display(),
            ocr_image = OCR_IMAGE,
            render_image = RENDER_IMAGE,
            ocr = ocr.script(&pidfile),
            render = render.script(&pidfile),
        );
        std::fs::write(&bin, script).unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self {
            dir,
            bin,
            log,
            pidfile,
            workspace_root,
        }
    }

    /// Config pointing at this fake, with default zoom/lang/OCR settings.
    pub fn config(&self) -> pdf2html::ServiceConfigBuilder {
        ServiceConfig::builder()
            .runtime_bin(self.bin.display().to_string())
            .ocr_image(OCR_IMAGE)
            .render_image(RENDER_IMAGE)
            .workspace_root(&self.workspace_root)
    }

    /// One line per tool invocation, in order. Empty if nothing ran.
    pub fn invocations(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn render_invocations(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .filter(|l| l.contains(RENDER_IMAGE))
            .collect()
    }

    pub fn ocr_invocations(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .filter(|l| l.contains(OCR_IMAGE))
            .collect()
    }

    /// Number of entries left under the workspace root.
    pub fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(&self.workspace_root).unwrap().count()
    }
}

/// Bytes that look enough like a PDF for the fake tools.
pub fn pdf(label: &str) -> Vec<u8> {
    format!("%PDF-1.4 {label}").into_bytes()
}

/// Read one entry of a ZIP archive as a string.
pub fn zip_entry(archive: &[u8], name: &str) -> String {
    use std::io::Read;
    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(archive)).unwrap();
    let mut s = String::new();
    zip.by_name(name).unwrap().read_to_string(&mut s).unwrap();
    s
}

