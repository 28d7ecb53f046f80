//! Pack a workspace into a ZIP archive.
//!
//! The tree is walked depth-first with an explicit stack. Inside each
//! directory entries are visited in byte-wise name order, so the same
//! workspace always yields the same entry sequence regardless of the order
//! the filesystem happens to return. Only regular files become entries;
//! directories are implied by the entry names and symlinks are skipped.
//!
//! Entry names are relative to the workspace root and always use `/`, which
//! is what every unzip implementation expects independent of host OS.
//!
//! Walking and compressing are blocking filesystem work, so [`pack`] moves
//! them onto the blocking thread pool.

use crate::error::Pdf2HtmlError;
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A finished archive and the names of its entries, in archive order.
#[derive(Debug, Clone)]
pub struct PackedArchive {
    pub bytes: Vec<u8>,
    pub entries: Vec<String>,
}

/// Pack every regular file under `root` into a Deflate-compressed ZIP.
pub async fn pack(root: &Path) -> Result<PackedArchive, Pdf2HtmlError> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || pack_blocking(&root))
        .await
        .map_err(|e| Pdf2HtmlError::Internal(format!("Archive task panicked: {}", e)))?
}

/// Blocking implementation of [`pack`].
pub fn pack_blocking(root: &Path) -> Result<PackedArchive, Pdf2HtmlError> {
    let files = collect_files(root)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = Vec::with_capacity(files.len());

    for (name, path) in files {
        zip.start_file(name.as_str(), options)
            .map_err(|e| archive_err(format!("cannot start entry '{name}': {e}")))?;
        let mut file =
            File::open(&path).map_err(|e| archive_err(format!("cannot read '{name}': {e}")))?;
        io::copy(&mut file, &mut zip)
            .map_err(|e| archive_err(format!("cannot copy '{name}': {e}")))?;
        debug!("Archived {}", name);
        entries.push(name);
    }

    let bytes = zip
        .finish()
        .map_err(|e| archive_err(format!("cannot finalise archive: {e}")))?
        .into_inner();

    Ok(PackedArchive { bytes, entries })
}

/// Depth-first listing of regular files as `(entry_name, path)`.
fn collect_files(root: &Path) -> Result<Vec<(String, PathBuf)>, Pdf2HtmlError> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(path) = stack.pop() {
        let meta = fs::symlink_metadata(&path)
            .map_err(|e| archive_err(format!("cannot stat '{}': {e}", path.display())))?;

        if meta.is_dir() {
            let mut children: Vec<PathBuf> = fs::read_dir(&path)
                .map_err(|e| archive_err(format!("cannot list '{}': {e}", path.display())))?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<_, _>>()
                .map_err(|e| archive_err(format!("cannot list '{}': {e}", path.display())))?;
            // Reverse order so the smallest name is popped first.
            children.sort_unstable_by(|a, b| b.file_name().cmp(&a.file_name()));
            stack.extend(children);
        } else if meta.is_file() {
            files.push((entry_name(root, &path), path));
        }
    }

    Ok(files)
}

/// `root/a/b.css` → `a/b.css`.
fn entry_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn archive_err(detail: String) -> Pdf2HtmlError {
    Pdf2HtmlError::Archive { detail }
}
