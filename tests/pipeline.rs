//! End-to-end tests of the conversion pipeline against a fake container
//! runtime (see `common/mod.rs`). No docker needed.

#![cfg(unix)]

mod common;

use common::{pdf, zip_entry, FakeRuntime, Mode};
use pdf2html::{
    convert, convert_to_file, ConversionProgressCallback, Overrides, Pdf2HtmlError, Stage,
    ToolKind,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn ocr_then_render_produces_archive() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let config = fake.config().build().unwrap();

    let out = convert(&pdf("hello"), &Overrides::default(), &config)
        .await
        .unwrap();

    assert_eq!(
        out.entries,
        vec!["base.min.css", "img/bg1.png", "ocr.pdf", "output.html"]
    );
    assert!(!out.contains("input.pdf"));
    assert_eq!(
        zip_entry(&out.archive, "output.html"),
        "<html><body>%PDF-1.4 hello</body></html>"
    );
    assert!(out.stats.ocr_duration_ms.is_some());
    assert_eq!(out.stats.archive_bytes, out.archive.len());

    let ocr = fake.ocr_invocations();
    assert_eq!(ocr.len(), 1);
    assert!(ocr[0].ends_with("--force-ocr -l spa+eng input.pdf ocr.pdf"), "{}", ocr[0]);
    let render = fake.render_invocations();
    assert_eq!(render.len(), 1);
    assert!(render[0].contains("--zoom 1.3"));
    assert!(render[0].ends_with("ocr.pdf output.html"), "{}", render[0]);

    assert_eq!(fake.leftover_workspaces(), 0);
}

#[tokio::test]
async fn ocr_disabled_renders_the_upload_directly() {
    let fake = FakeRuntime::new(Mode::Fail, Mode::Render);
    let config = fake.config().build().unwrap();

    let out = convert(&pdf("digital"), &Overrides::default().ocr(false), &config)
        .await
        .unwrap();

    assert!(fake.ocr_invocations().is_empty());
    assert!(fake.render_invocations()[0].ends_with("input.pdf output.html"));
    assert_eq!(out.entries, vec!["base.min.css", "img/bg1.png", "output.html"]);
    assert_eq!(out.stats.ocr_duration_ms, None);
}

#[tokio::test]
async fn zoom_override_applies_to_one_request_only() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let config = fake.config().build().unwrap();

    convert(&pdf("a"), &Overrides::default().zoom(2.0), &config)
        .await
        .unwrap();
    convert(&pdf("b"), &Overrides::default(), &config)
        .await
        .unwrap();

    let render = fake.render_invocations();
    assert!(render[0].contains("--zoom 2.0"), "{}", render[0]);
    assert!(render[1].contains("--zoom 1.3"), "{}", render[1]);
}

#[tokio::test]
async fn language_and_skip_text_reach_ocr() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let config = fake.config().ocr_force(false).build().unwrap();

    convert(&pdf("x"), &Overrides::default().lang("eng+deu"), &config)
        .await
        .unwrap();

    let ocr = fake.ocr_invocations();
    assert!(ocr[0].ends_with("--skip-text -l eng+deu input.pdf ocr.pdf"), "{}", ocr[0]);
}

#[tokio::test]
async fn script_language_reaches_ocr_unchanged() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let config = fake.config().build().unwrap();

    convert(&pdf("x"), &Overrides::default().lang("script/Latin+eng"), &config)
        .await
        .unwrap();

    let ocr = fake.ocr_invocations();
    assert!(
        ocr[0].ends_with("--force-ocr -l script/Latin+eng input.pdf ocr.pdf"),
        "{}",
        ocr[0]
    );
}

#[tokio::test]
async fn invalid_overrides_fail_before_any_tool_runs() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let config = fake.config().build().unwrap();

    let err = convert(&pdf("x"), &Overrides::default().lang("--sidecar=out.txt"), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2HtmlError::Validation { .. }), "{err:?}");

    let err = convert(&pdf("x"), &Overrides::default().zoom(0.0), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2HtmlError::Validation { .. }), "{err:?}");

    assert!(fake.invocations().is_empty());
    assert_eq!(fake.leftover_workspaces(), 0);
}

#[tokio::test]
async fn render_failure_carries_exit_code_and_output() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Fail);
    let config = fake.config().build().unwrap();

    let err = convert(&pdf("x"), &Overrides::default(), &config)
        .await
        .unwrap_err();
    match err {
        Pdf2HtmlError::ToolFailed {
            tool,
            exit_code,
            ref output,
        } => {
            assert_eq!(tool, ToolKind::Render);
            assert_eq!(exit_code, 2);
            assert!(output.contains("cannot parse document"), "{output}");
        }
        other => panic!("expected ToolFailed, got {other:?}"),
    }
    assert_eq!(fake.leftover_workspaces(), 0);
}

#[tokio::test]
async fn ocr_failure_stops_before_render() {
    let fake = FakeRuntime::new(Mode::Fail, Mode::Render);
    let config = fake.config().build().unwrap();

    let err = convert(&pdf("x"), &Overrides::default(), &config)
        .await
        .unwrap_err();
    assert_eq!(err.tool(), Some(ToolKind::Ocr));
    assert_eq!(err.exit_code(), Some(2));
    assert!(fake.render_invocations().is_empty());
    assert_eq!(fake.leftover_workspaces(), 0);
}

#[tokio::test]
async fn tool_exiting_zero_without_output_is_missing_output() {
    let fake = FakeRuntime::new(Mode::Silent, Mode::Render);
    let config = fake.config().build().unwrap();

    let err = convert(&pdf("x"), &Overrides::default(), &config)
        .await
        .unwrap_err();
    assert!(
        matches!(err, Pdf2HtmlError::MissingOutput { tool: ToolKind::Ocr, .. }),
        "{err:?}"
    );
    assert_eq!(fake.leftover_workspaces(), 0);
}

#[tokio::test]
async fn ocr_timeout_kills_tool_and_cleans_up() {
    let fake = FakeRuntime::new(Mode::Hang, Mode::Render);
    let config = fake
        .config()
        .ocr_timeout(Duration::from_millis(500))
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    let err = convert(&pdf("x"), &Overrides::default(), &config)
        .await
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(
        matches!(
            err,
            Pdf2HtmlError::Timeout {
                tool: ToolKind::Ocr,
                timeout_ms: 500
            }
        ),
        "{err:?}"
    );
    assert!(fake.render_invocations().is_empty());
    assert_eq!(fake.leftover_workspaces(), 0);

    #[cfg(target_os = "linux")]
    {
        let pid = std::fs::read_to_string(&fake.pidfile).unwrap();
        assert!(
            !std::path::Path::new(&format!("/proc/{}", pid.trim())).exists(),
            "tool process {} still alive",
            pid.trim()
        );
    }
}

#[tokio::test]
async fn missing_workspace_root_is_workspace_error() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let config = fake
        .config()
        .workspace_root(fake.dir.path().join("does-not-exist"))
        .build()
        .unwrap();

    let err = convert(&pdf("x"), &Overrides::default(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2HtmlError::Workspace { .. }), "{err:?}");
    assert!(!err.is_client_error());
    assert!(fake.invocations().is_empty());
}

#[tokio::test]
async fn archive_failure_reaches_caller_and_cleans_up() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::RenderTooDeep);
    let recorder = Arc::new(Recorder::default());
    let config = fake
        .config()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let err = convert(&pdf("x"), &Overrides::default(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2HtmlError::Archive { .. }), "{err:?}");
    assert_eq!(fake.render_invocations().len(), 1);
    assert_eq!(fake.leftover_workspaces(), 0);

    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(&stages[stages.len() - 2..], &[Stage::Packing, Stage::Failed]);
}

#[tokio::test]
async fn concurrent_requests_are_isolated() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let config = fake.config().build().unwrap();

    let a = pdf("first document");
    let b = pdf("second document");
    let oa = Overrides::default().zoom(1.0);
    let ob = Overrides::default().zoom(3.0).ocr(false);
    let (ra, rb) = tokio::join!(convert(&a, &oa, &config), convert(&b, &ob, &config));
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert!(zip_entry(&ra.archive, "output.html").contains("first document"));
    assert!(zip_entry(&rb.archive, "output.html").contains("second document"));
    assert!(ra.contains("ocr.pdf"));
    assert!(!rb.contains("ocr.pdf"));

    let render = fake.render_invocations();
    assert_eq!(render.len(), 2);
    assert!(render.iter().any(|l| l.contains("--zoom 1.0")));
    assert!(render.iter().any(|l| l.contains("--zoom 3.0")));
    assert_eq!(fake.leftover_workspaces(), 0);
}

#[tokio::test]
async fn repeated_conversion_yields_same_entries() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let config = fake.config().build().unwrap();

    let first = convert(&pdf("same"), &Overrides::default(), &config)
        .await
        .unwrap();
    let second = convert(&pdf("same"), &Overrides::default(), &config)
        .await
        .unwrap();
    assert_eq!(first.entries, second.entries);
    assert_eq!(
        zip_entry(&first.archive, "output.html"),
        zip_entry(&second.archive, "output.html")
    );
}

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<Stage>>,
    errors: Mutex<Vec<String>>,
    completed: Mutex<Option<(usize, usize)>>,
}

impl ConversionProgressCallback for Recorder {
    fn on_stage(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }
    fn on_error(&self, error: &str) {
        self.errors.lock().unwrap().push(error.to_string());
    }
    fn on_complete(&self, entries: usize, archive_bytes: usize) {
        *self.completed.lock().unwrap() = Some((entries, archive_bytes));
    }
}

#[tokio::test]
async fn progress_callback_sees_every_stage() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let recorder = Arc::new(Recorder::default());
    let config = fake
        .config()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let out = convert(&pdf("x"), &Overrides::default(), &config)
        .await
        .unwrap();

    assert_eq!(
        *recorder.stages.lock().unwrap(),
        vec![
            Stage::Created,
            Stage::OcrRunning,
            Stage::Rendering,
            Stage::Packing,
            Stage::Done
        ]
    );
    assert_eq!(
        *recorder.completed.lock().unwrap(),
        Some((out.entries.len(), out.archive.len()))
    );
    assert!(recorder.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn progress_callback_sees_failure() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Fail);
    let recorder = Arc::new(Recorder::default());
    let config = fake
        .config()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    convert(&pdf("x"), &Overrides::default(), &config)
        .await
        .unwrap_err();

    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(stages.last(), Some(&Stage::Failed));
    assert!(!stages.contains(&Stage::Packing));
    assert_eq!(recorder.errors.lock().unwrap().len(), 1);
    assert!(recorder.completed.lock().unwrap().is_none());
}

#[tokio::test]
async fn convert_to_file_writes_archive_atomically() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let config = fake.config().build().unwrap();

    let input = fake.dir.path().join("scan.pdf");
    std::fs::write(&input, pdf("on disk")).unwrap();
    let output = fake.dir.path().join("out/nested/html_export.zip");

    let result = convert_to_file(&input, &output, &Overrides::default(), &config)
        .await
        .unwrap();

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written, result.archive);
    assert!(!output.with_extension("zip.tmp").exists());
    assert!(zip_entry(&written, "output.html").contains("on disk"));
}

#[tokio::test]
async fn missing_input_file_is_validation_error() {
    let fake = FakeRuntime::new(Mode::CopyThrough, Mode::Render);
    let config = fake.config().build().unwrap();

    let err = pdf2html::convert_file(
        fake.dir.path().join("nope.pdf"),
        &Overrides::default(),
        &config,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Pdf2HtmlError::Validation { .. }), "{err:?}");
    assert!(fake.invocations().is_empty());
}
