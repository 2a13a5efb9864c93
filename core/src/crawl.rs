//! Bounded, deduplicated web crawl feeding a [`ThreadSafeIndex`].

use crate::error::{Result, SiftError};
use crate::html::{extract_links, normalize, strip_markup};
use crate::ingest::ingest_text;
use crate::thread_safe::ThreadSafeIndex;
use crate::work_queue::{CancelToken, QueueHandle, WorkQueue};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, Span};
use url::Url;

/// Source of HTML pages.
///
/// Implementations follow redirects themselves and return `Err` for anything
/// that is not a 200 HTML response.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<String>;
}

#[derive(Debug)]
struct FrontierState {
    seen: HashSet<String>,
    remaining: usize,
}

/// Pages claimed so far plus the remaining budget, updated as one unit.
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
}

impl Frontier {
    /// `budget` counts pages beyond the seed.
    pub fn new(budget: usize) -> Self {
        Self { state: Mutex::new(FrontierState { seen: HashSet::new(), remaining: budget }) }
    }

    /// Claim the seed without spending budget.
    pub fn admit_seed(&self, url: &Url) -> bool {
        self.state.lock().seen.insert(url.as_str().to_string())
    }

    /// Claim `url` if it has never been claimed and budget remains.
    pub fn try_claim(&self, url: &Url) -> bool {
        let mut state = self.state.lock();
        if state.remaining == 0 || state.seen.contains(url.as_str()) {
            return false;
        }
        state.seen.insert(url.as_str().to_string());
        state.remaining -= 1;
        true
    }

    pub fn remaining(&self) -> usize { self.state.lock().remaining }

    pub fn claimed(&self) -> usize { self.state.lock().seen.len() }
}

/// Totals for one crawl.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub scheduled: usize,
    pub indexed: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Counters {
    indexed: AtomicUsize,
    failed: AtomicUsize,
}

struct CrawlContext {
    fetcher: Arc<dyn Fetch>,
    index: Arc<ThreadSafeIndex>,
    frontier: Frontier,
    cancel: CancelToken,
    counters: Counters,
    queue: QueueHandle,
}

/// Drives crawls over a shared fetcher; every page becomes one queue task.
pub struct Crawler {
    fetcher: Arc<dyn Fetch>,
    cancel: CancelToken,
    span: Span,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher, cancel: CancelToken::new(), span: Span::none() }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Token that stops in-flight page tasks at their next stage boundary.
    pub fn cancel_token(&self) -> CancelToken { self.cancel.clone() }

    /// Crawl from `seed`, indexing it and at most `max_additional` further
    /// pages, each at most once. Blocks until every page task has finished.
    pub fn crawl(
        &self,
        seed: &str,
        max_additional: usize,
        index: &Arc<ThreadSafeIndex>,
        queue: &WorkQueue,
    ) -> Result<CrawlSummary> {
        let seed = Url::parse(seed)
            .map(|u| normalize(&u))
            .map_err(|source| SiftError::MalformedLocation { location: seed.to_string(), source })?;
        let _entered = self.span.enter();
        info!(seed = %seed, max_additional, "starting crawl");

        let ctx = Arc::new(CrawlContext {
            fetcher: Arc::clone(&self.fetcher),
            index: Arc::clone(index),
            frontier: Frontier::new(max_additional),
            cancel: self.cancel.clone(),
            counters: Counters::default(),
            queue: queue.handle(),
        });
        ctx.frontier.admit_seed(&seed);
        schedule(&ctx, seed);
        queue.await_completion();

        let summary = CrawlSummary {
            scheduled: ctx.frontier.claimed(),
            indexed: ctx.counters.indexed.load(Ordering::SeqCst),
            failed: ctx.counters.failed.load(Ordering::SeqCst),
        };
        info!(scheduled = summary.scheduled, indexed = summary.indexed, failed = summary.failed, "crawl finished");
        Ok(summary)
    }
}

fn schedule(ctx: &Arc<CrawlContext>, url: Url) {
    let task_ctx = Arc::clone(ctx);
    ctx.queue.submit(move || {
        let outcome = process_page(&task_ctx, &url);
        if outcome.is_err() {
            task_ctx.counters.failed.fetch_add(1, Ordering::SeqCst);
        }
        outcome
    });
}

/// Fetch, fan out to new links, then index. Cancellation is checked between stages.
fn process_page(ctx: &Arc<CrawlContext>, url: &Url) -> Result<()> {
    if ctx.cancel.is_cancelled() {
        return Ok(());
    }
    let html = ctx.fetcher.fetch(url)?;

    for link in extract_links(url, &html) {
        if ctx.frontier.try_claim(&link) {
            debug!(from = %url, to = %link, "scheduling page");
            schedule(ctx, link);
        }
    }

    if ctx.cancel.is_cancelled() {
        return Ok(());
    }
    let tokens = ingest_text(&strip_markup(&html), url.as_str(), &*ctx.index);
    ctx.counters.indexed.fetch_add(1, Ordering::SeqCst);
    debug!(url = %url, tokens, "indexed page");
    Ok(())
}
