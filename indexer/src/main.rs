use anyhow::Result;
use clap::Parser;
use sift_core::config::{worker_count, DEFAULT_COUNTS_PATH, DEFAULT_INDEX_PATH, DEFAULT_RESULTS_PATH, DEFAULT_THREADS};
use sift_core::ingest::{ingest_tree, ingest_tree_parallel};
use sift_core::persist::{save_counts, save_index, save_results};
use sift_core::search::{load_queries, search_all, search_all_parallel};
use sift_core::{IndexRead, IngestReport, MatchMode, Query, QueryResults, ThreadSafeIndex, WordIndex, WorkQueue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "indexer")]
#[command(about = "Index local text files and answer ranked queries", long_about = None)]
struct Cli {
    /// File or directory to index (directories contribute .txt/.text files only)
    #[arg(long)]
    text: Option<PathBuf>,
    /// Use a worker pool; without a value the default pool size is used
    #[arg(long)]
    threads: Option<Option<usize>>,
    /// File with one query per line
    #[arg(long)]
    query: Option<PathBuf>,
    /// Match stored terms by prefix instead of exactly
    #[arg(long, default_value_t = false)]
    partial: bool,
    /// Write the inverted index as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_INDEX_PATH)]
    index: Option<PathBuf>,
    /// Write per-document word counts as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_COUNTS_PATH)]
    counts: Option<PathBuf>,
    /// Write ranked query results as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_RESULTS_PATH)]
    results: Option<PathBuf>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let started = Instant::now();

    match cli.threads {
        None => run_sequential(&cli),
        Some(requested) => {
            let requested = requested.unwrap_or(DEFAULT_THREADS);
            let threads = worker_count(requested);
            if requested < 1 {
                warn!(requested, used = threads, "thread count raised");
            }
            run_parallel(&cli, threads)?;
        }
    }

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "done");
    println!("Elapsed: {:.6} seconds", started.elapsed().as_secs_f64());
    Ok(())
}

fn run_sequential(cli: &Cli) {
    let mut index = WordIndex::new();
    if let Some(root) = &cli.text {
        log_report(root, &ingest_tree(root, &mut index));
    }
    let results = queries(cli).map(|qs| search_all(&index, &qs, MatchMode::from_partial_flag(cli.partial)));
    write_reports(cli, &index, results.as_ref());
}

fn run_parallel(cli: &Cli, threads: usize) -> Result<()> {
    let queue = WorkQueue::with_span(threads, info_span!("workers", threads))?;
    let index = Arc::new(ThreadSafeIndex::new());
    if let Some(root) = &cli.text {
        log_report(root, &ingest_tree_parallel(root, &index, &queue));
    }
    let results = queries(cli).map(|qs| search_all_parallel(&index, qs, MatchMode::from_partial_flag(cli.partial), &queue));
    queue.shutdown();
    write_reports(cli, &*index, results.as_ref());
    Ok(())
}

fn log_report(root: &Path, report: &IngestReport) {
    for (path, reason) in &report.skipped {
        warn!(path = %path.display(), reason = %reason, "skipped");
    }
    info!(root = %root.display(), documents = report.documents, skipped = report.skipped.len(), "ingested");
}

fn queries(cli: &Cli) -> Option<Vec<Query>> {
    let path = cli.query.as_ref()?;
    match load_queries(path) {
        Ok(queries) => Some(queries),
        Err(e) => {
            error!(error = %e, "unable to read queries");
            None
        }
    }
}

/// Each report is independent; a failed write is logged and the rest still go out.
fn write_reports<I: IndexRead + ?Sized>(cli: &Cli, index: &I, results: Option<&QueryResults>) {
    if let Some(path) = &cli.index {
        report("index", path, save_index(path, index));
    }
    if let Some(path) = &cli.counts {
        report("counts", path, save_counts(path, index));
    }
    if let Some(path) = &cli.results {
        let empty = QueryResults::new();
        report("results", path, save_results(path, results.unwrap_or(&empty)));
    }
}

fn report(kind: &str, path: &Path, outcome: Result<()>) {
    match outcome {
        Ok(()) => info!(kind, path = %path.display(), "wrote report"),
        Err(e) => error!(kind, path = %path.display(), error = %format!("{e:#}"), "unable to write report"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threads_flag_without_value_uses_default_pool() {
        let cli = Cli::try_parse_from(["indexer", "--threads", "--partial"]).unwrap();
        assert_eq!(cli.threads, Some(None));
        assert!(cli.partial);
        assert_eq!(worker_count(cli.threads.unwrap().unwrap_or(DEFAULT_THREADS)), 5);
    }

    #[test]
    fn threads_flag_absent_selects_sequential_path() {
        let cli = Cli::try_parse_from(["indexer", "--text", "docs"]).unwrap();
        assert_eq!(cli.threads, None);
    }

    #[test]
    fn report_flags_fall_back_to_default_names() {
        let cli = Cli::try_parse_from(["indexer", "--threads", "0", "--index", "--counts", "out/c.json"]).unwrap();
        assert_eq!(cli.threads, Some(Some(0)));
        assert_eq!(cli.index.as_deref(), Some(Path::new(DEFAULT_INDEX_PATH)));
        assert_eq!(cli.counts.as_deref(), Some(Path::new("out/c.json")));
        assert_eq!(cli.results, None);
    }
}
