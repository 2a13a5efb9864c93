//! Tuning constants and the query-mode switch shared by both binaries.

use std::time::Duration;

/// Worker threads used when `--threads` is given without a value.
pub const DEFAULT_THREADS: usize = 5;

/// Pages fetched beyond the seed when `--max` is not given.
pub const DEFAULT_MAX_PAGES: usize = 1;

/// Redirects followed per fetch before giving up.
pub const MAX_REDIRECTS: usize = 3;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Bodies larger than this are rejected by the HTTP fetcher (bytes). 2 MiB.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Extensions (case-insensitive) ingested while walking a directory.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "text"];

pub const DEFAULT_INDEX_PATH: &str = "index.json";
pub const DEFAULT_COUNTS_PATH: &str = "counts.json";
pub const DEFAULT_RESULTS_PATH: &str = "results.json";

/// How query terms are matched against stored terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Only the literal query term is looked up.
    #[default]
    Exact,
    /// Every stored term starting with the query term contributes.
    Partial,
}

impl MatchMode {
    pub fn from_partial_flag(partial: bool) -> Self {
        if partial { MatchMode::Partial } else { MatchMode::Exact }
    }
}

/// Clamp a requested worker count to at least one thread.
pub fn worker_count(requested: usize) -> usize {
    requested.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_raised_to_one() {
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(8), 8);
    }

    #[test]
    fn partial_flag_selects_mode() {
        assert_eq!(MatchMode::from_partial_flag(true), MatchMode::Partial);
        assert_eq!(MatchMode::from_partial_flag(false), MatchMode::Exact);
        assert_eq!(MatchMode::default(), MatchMode::Exact);
    }
}
