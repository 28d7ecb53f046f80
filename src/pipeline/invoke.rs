//! External tool invocation with a deadline.
//!
//! Every container the pipeline starts goes through [`run_tool`]. The
//! calling task is suspended until the process exits or its deadline fires,
//! whichever comes first; the loser is cancelled. There is no callback-based
//! control flow and no retry.
//!
//! ## Output capture
//!
//! stdout and stderr are read concurrently and merged line-by-line in
//! arrival order into [`ToolResult::combined_output`]. Each line is also
//! logged at `debug` under the tool's name, so `RUST_LOG=pdf2html=debug`
//! shows the container's progress live.
//!
//! ## Timeouts
//!
//! On expiry the child is killed (SIGKILL on unix) and reaped before
//! `run_tool` returns, so no zombie or orphan is left behind by this process.
//! The child is also spawned with `kill_on_drop`, which covers the case where
//! the whole request future is dropped mid-run.

use super::ToolKind;
use crate::error::Pdf2HtmlError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long to wait for the output readers after the process has exited.
///
/// Only matters when a grandchild inherited the pipes and outlives its parent.
const READER_GRACE: Duration = Duration::from_secs(5);

/// One external process execution. Built fresh per stage, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Which tool this is, for errors and log lines.
    pub tool: ToolKind,
    pub executable: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl ToolInvocation {
    /// The deadline in milliseconds.
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Executable and arguments joined by spaces, for logs.
    pub fn command_line(&self) -> String {
        let mut line = self.executable.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Outcome of [`run_tool`]. Exit codes are not interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Process exit code; `-1` if it was killed by a signal or timed out.
    pub exit_code: i32,
    pub timed_out: bool,
    /// Merged stdout and stderr.
    pub combined_output: String,
}

impl ToolResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Run `invocation` to completion or until its deadline.
///
/// # Errors
/// Only [`Pdf2HtmlError::ToolSpawn`] when the executable cannot be started,
/// and [`Pdf2HtmlError::Internal`] if waiting on the child fails. Non-zero
/// exits and timeouts are reported through [`ToolResult`].
pub async fn run_tool(invocation: &ToolInvocation) -> Result<ToolResult, Pdf2HtmlError> {
    let tool = invocation.tool;
    let start = Instant::now();
    debug!("Running {}: {}", tool, invocation.command_line());

    let mut child = Command::new(&invocation.executable)
        .args(&invocation.args)
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Pdf2HtmlError::ToolSpawn { tool, source: e })?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward_lines(stdout, tool, tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward_lines(stderr, tool, tx.clone())));
    }
    drop(tx);

    let status = match tokio::time::timeout(invocation.timeout, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            return Err(Pdf2HtmlError::Internal(format!(
                "waiting for {tool} failed: {e}"
            )))
        }
        Err(_elapsed) => None,
    };

    let result = match status {
        Some(status) => {
            let join = futures::future::join_all(readers.iter_mut());
            if tokio::time::timeout(READER_GRACE, join).await.is_err() {
                debug!("{}: output readers still open after exit, abandoning", tool);
                readers.iter().for_each(|r| r.abort());
            }
            ToolResult {
                exit_code: status.code().unwrap_or(-1),
                timed_out: false,
                combined_output: drain(&mut rx),
            }
        }
        None => {
            warn!(
                "{} exceeded its {}ms deadline, killing pid {:?}",
                tool,
                invocation.timeout_ms(),
                child.id()
            );
            if let Err(e) = child.kill().await {
                warn!("{}: kill failed: {}", tool, e);
            }
            readers.iter().for_each(|r| r.abort());
            ToolResult {
                exit_code: -1,
                timed_out: true,
                combined_output: drain(&mut rx),
            }
        }
    };

    info!(
        "{} finished in {}ms (exit {}, timed out: {})",
        tool,
        start.elapsed().as_millis(),
        result.exit_code,
        result.timed_out
    );
    Ok(result)
}

/// Forward each line of `stream` to the log and to `tx`.
async fn forward_lines<R>(stream: R, tool: ToolKind, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(|c| c == '\n' || c == '\r')
                    .to_string();
                debug!("[{}] {}", tool, line);
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("{}: output stream error: {}", tool, e);
                break;
            }
        }
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    lines.join("\n")
}
