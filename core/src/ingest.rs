//! Turning documents into postings: single text blobs, single files, and whole
//! directory trees, either inline or fanned out over a [`WorkQueue`].

use crate::config::TEXT_EXTENSIONS;
use crate::error::{Result, SiftError};
use crate::index::IndexWrite;
use crate::thread_safe::ThreadSafeIndex;
use crate::tokenizer::tokenize;
use crate::work_queue::WorkQueue;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Which files an ingestion walk accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Only `.txt` / `.text` files; used when walking a directory.
    TextOnly,
    /// Everything; used when a single file was named explicitly.
    All,
}

impl WalkMode {
    fn accepts(self, path: &Path) -> bool {
        match self {
            WalkMode::All => true,
            WalkMode::TextOnly => is_text_file(path),
        }
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Documents ingested successfully.
    pub documents: usize,
    /// Paths that could not be read, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEXT_EXTENSIONS.iter().any(|t| ext.eq_ignore_ascii_case(t)))
}

/// Tokenize `text` and record every stem at its 1-based position under `location`.
///
/// The document length is only registered when at least one token was found.
/// Returns the token count.
pub fn ingest_text<W: IndexWrite>(text: &str, location: &str, mut sink: W) -> usize {
    let tokens = tokenize(text);
    let count = tokens.len();
    let mut terms: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (stem, position) in tokens {
        terms.entry(stem).or_default().push(position);
    }
    sink.add_document(location, &terms);
    if count > 0 {
        sink.set_document_length(location, count);
    }
    count
}

pub fn ingest_file<W: IndexWrite>(path: &Path, sink: W) -> Result<usize> {
    let text = fs::read_to_string(path).map_err(|e| SiftError::io(path, e))?;
    let count = ingest_text(&text, &location_of(path), sink);
    debug!(path = %path.display(), tokens = count, "ingested file");
    Ok(count)
}

fn location_of(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Regular files under `root` that `mode` accepts, sorted by full path.
///
/// A `root` that is itself a file is returned as-is. Walk errors are recorded
/// in `skipped`.
fn collect_files(root: &Path, mode: WalkMode, skipped: &mut Vec<(PathBuf, String)>) -> Vec<PathBuf> {
    if !root.is_dir() {
        return vec![root.to_path_buf()];
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if mode.accepts(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Ok(_) => {}
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                warn!(path = %path.display(), error = %err, "skipping unreadable path");
                skipped.push((path, err.to_string()));
            }
        }
    }
    files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    files
}

/// Mode implied by `root`: directories are filtered to text files, an
/// explicitly named file is always ingested.
pub fn mode_for(root: &Path) -> WalkMode {
    if root.is_dir() { WalkMode::TextOnly } else { WalkMode::All }
}

/// Ingest `root` inline, one file at a time in sorted order.
pub fn ingest_tree<W: IndexWrite>(root: &Path, mut sink: W) -> IngestReport {
    ingest_tree_with_mode(root, mode_for(root), &mut sink)
}

pub fn ingest_tree_with_mode<W: IndexWrite>(root: &Path, mode: WalkMode, mut sink: W) -> IngestReport {
    let mut report = IngestReport::default();
    for path in collect_files(root, mode, &mut report.skipped) {
        match ingest_file(&path, &mut sink) {
            Ok(_) => report.documents += 1,
            Err(e) => {
                warn!(error = %e, "skipping document");
                report.skipped.push((path, e.to_string()));
            }
        }
    }
    info!(root = %root.display(), documents = report.documents, skipped = report.skipped.len(), "ingestion finished");
    report
}

/// Ingest `root` with one queue task per file, then wait for the queue to drain.
///
/// Failed tasks are logged by the worker and listed in the report.
pub fn ingest_tree_parallel(root: &Path, index: &Arc<ThreadSafeIndex>, queue: &WorkQueue) -> IngestReport {
    let mut walk_errors = Vec::new();
    let files = collect_files(root, mode_for(root), &mut walk_errors);
    let queued = files.len();
    let walk_error_count = walk_errors.len();
    let skipped = Arc::new(Mutex::new(walk_errors));

    for path in files {
        let index = Arc::clone(index);
        let skipped = Arc::clone(&skipped);
        queue.submit(move || {
            ingest_file(&path, &*index).map(|_| ()).map_err(|e| {
                skipped.lock().push((path, e.to_string()));
                e
            })
        });
    }
    queue.await_completion();

    let skipped = std::mem::take(&mut *skipped.lock());
    let failed = skipped.len() - walk_error_count;
    let report = IngestReport { documents: queued - failed, skipped };
    info!(root = %root.display(), documents = report.documents, skipped = report.skipped.len(), "parallel ingestion finished");
    report
}
