//! Per-request workspace: an isolated temporary directory.
//!
//! The workspace is mounted into each container as its working directory, so
//! every file a tool writes lands here. One workspace exists per in-flight
//! conversion and it is never shared.
//!
//! ## Cleanup guarantee
//!
//! [`Workspace::destroy`] is the normal release path: the coordinator calls
//! it exactly once whether the pipeline succeeded or failed. It walks the
//! tree depth-first and deletes children before their parent, swallowing
//! individual failures (a leaked file costs disk, not correctness).
//!
//! If the owning future is dropped or a panic unwinds before `destroy` runs,
//! the inner [`tempfile::TempDir`] removes the directory on drop instead.

use crate::error::Pdf2HtmlError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const WORKSPACE_PREFIX: &str = "p2h-";

/// A uniquely named directory owned by one conversion.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Allocate a fresh workspace under `root`, or the system temp dir.
    pub fn create(root: Option<&Path>) -> Result<Self, Pdf2HtmlError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| Pdf2HtmlError::Workspace {
            detail: "cannot create workspace directory".into(),
            source: e,
        })?;
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Absolute path of the workspace directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the workspace.
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `bytes` to `name` inside the workspace.
    pub async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, Pdf2HtmlError> {
        let path = self.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Pdf2HtmlError::Workspace {
                detail: format!("cannot write '{name}'"),
                source: e,
            })?;
        Ok(path)
    }

    /// Remove `name` from the workspace if present.
    pub async fn remove_file(&self, name: &str) -> Result<(), Pdf2HtmlError> {
        match tokio::fs::remove_file(self.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Pdf2HtmlError::Workspace {
                detail: format!("cannot remove '{name}'"),
                source: e,
            }),
        }
    }

    /// Delete the workspace and everything in it. Never fails.
    pub async fn destroy(self) {
        let path = self.dir.path().to_path_buf();
        let task = tokio::task::spawn_blocking(move || {
            remove_tree(&path);
            path
        });
        match task.await {
            Ok(path) => debug!("Destroyed workspace {}", path.display()),
            // The TempDir drop below still removes what is left.
            Err(e) => debug!("Workspace cleanup task failed: {}", e),
        }
        drop(self.dir);
    }
}

/// Depth-first removal of `root` and its contents, deepest entries first.
///
/// Iterative so deep trees cannot overflow the stack. Symlinks are removed,
/// never followed. Missing entries and individual failures are ignored.
pub(crate) fn remove_tree(root: &Path) {
    // (path, children_already_pushed)
    let mut stack: Vec<(PathBuf, bool)> = vec![(root.to_path_buf(), false)];

    while let Some((path, expanded)) = stack.pop() {
        let meta = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                debug!("Cannot stat {}: {}", path.display(), e);
                continue;
            }
        };

        if !meta.is_dir() {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!("Cannot remove {}: {}", path.display(), e);
                }
            }
            continue;
        }

        if expanded {
            if let Err(e) = fs::remove_dir(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!("Cannot remove directory {}: {}", path.display(), e);
                }
            }
            continue;
        }

        // Revisit the directory after all of its children have been handled.
        stack.push((path.clone(), true));
        match fs::read_dir(&path) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    stack.push((entry.path(), false));
                }
            }
            Err(e) => debug!("Cannot list {}: {}", path.display(), e),
        }
    }
}
