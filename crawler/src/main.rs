use anyhow::Result;
use clap::Parser;
use reqwest::blocking::Client;
use reqwest::{header, StatusCode};
use sift_core::config::{
    worker_count, DEFAULT_COUNTS_PATH, DEFAULT_INDEX_PATH, DEFAULT_MAX_PAGES, DEFAULT_RESULTS_PATH, DEFAULT_THREADS,
    FETCH_TIMEOUT, MAX_BODY_BYTES, MAX_REDIRECTS,
};
use sift_core::persist::{save_counts, save_index, save_results};
use sift_core::search::{load_queries, search_all_parallel};
use sift_core::{Crawler, Fetch, MatchMode, QueryResults, SiftError, ThreadSafeIndex, WorkQueue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl from a seed URL into a searchable index", long_about = None)]
struct Cli {
    /// Seed URL; it is always indexed
    #[arg(long)]
    html: String,
    /// Pages to crawl beyond the seed
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max: usize,
    /// Worker threads
    #[arg(long, default_value_t = DEFAULT_THREADS)]
    threads: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = FETCH_TIMEOUT.as_secs())]
    timeout_secs: u64,
    /// File with one query per line
    #[arg(long)]
    query: Option<PathBuf>,
    /// Match stored terms by prefix instead of exactly
    #[arg(long, default_value_t = false)]
    partial: bool,
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_INDEX_PATH)]
    index: Option<PathBuf>,
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_COUNTS_PATH)]
    counts: Option<PathBuf>,
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_RESULTS_PATH)]
    results: Option<PathBuf>,
}

/// Blocking HTTP fetcher: 200 responses with an HTML content type only.
struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sift-crawler/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url) -> sift_core::Result<String> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| SiftError::fetch(url.as_str(), e))?;
        if resp.status() != StatusCode::OK {
            return Err(SiftError::fetch(url.as_str(), resp.status()));
        }
        let is_html = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/html"));
        if !is_html {
            return Err(SiftError::fetch(url.as_str(), "not an HTML response"));
        }
        if resp.content_length().is_some_and(|len| len as usize > MAX_BODY_BYTES) {
            return Err(SiftError::fetch(url.as_str(), "body too large"));
        }
        let bytes = resp.bytes().map_err(|e| SiftError::fetch(url.as_str(), e))?;
        if bytes.len() > MAX_BODY_BYTES {
            return Err(SiftError::fetch(url.as_str(), "body too large"));
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    let started = Instant::now();

    let fetcher = HttpFetcher::new(Duration::from_secs(args.timeout_secs))?;
    let crawler = Crawler::new(Arc::new(fetcher)).with_span(info_span!("crawl", seed = %args.html));
    let token = crawler.cancel_token();
    ctrlc::set_handler(move || token.cancel())?;

    let threads = worker_count(args.threads);
    if args.threads < 1 {
        warn!(requested = args.threads, used = threads, "thread count raised");
    }
    let queue = WorkQueue::with_span(threads, info_span!("workers", threads))?;
    let index = Arc::new(ThreadSafeIndex::new());

    match crawler.crawl(&args.html, args.max, &index, &queue) {
        Ok(summary) => info!(
            scheduled = summary.scheduled,
            indexed = summary.indexed,
            failed = summary.failed,
            "crawl complete"
        ),
        Err(e) => error!(error = %e, "unable to crawl"),
    }

    let results = match &args.query {
        Some(path) => match load_queries(path) {
            Ok(queries) => Some(search_all_parallel(&index, queries, MatchMode::from_partial_flag(args.partial), &queue)),
            Err(e) => {
                error!(error = %e, "unable to read queries");
                None
            }
        },
        None => None,
    };
    queue.shutdown();

    if let Some(path) = &args.index {
        report("index", path, save_index(path, &*index));
    }
    if let Some(path) = &args.counts {
        report("counts", path, save_counts(path, &*index));
    }
    if let Some(path) = &args.results {
        let empty = QueryResults::new();
        report("results", path, save_results(path, results.as_ref().unwrap_or(&empty)));
    }

    println!("Elapsed: {:.6} seconds", started.elapsed().as_secs_f64());
    Ok(())
}

fn report(kind: &str, path: &Path, outcome: Result<()>) {
    match outcome {
        Ok(()) => info!(kind, path = %path.display(), "wrote report"),
        Err(e) => error!(kind, path = %path.display(), error = %format!("{e:#}"), "unable to write report"),
    }
}
