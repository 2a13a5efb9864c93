//! Ranking: collect postings for a query, sum hits per location, score by
//! document length and sort into a deterministic order.

use crate::config::MatchMode;
use crate::error::{Result, SiftError};
use crate::index::IndexRead;
use crate::tokenizer::unique_stems;
use crate::work_queue::WorkQueue;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Cleaned, deduplicated query terms.
pub type Query = BTreeSet<String>;

/// Ranked results keyed by the space-joined query, ascending.
pub type QueryResults = BTreeMap<String, Vec<SearchResult>>;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub location: String,
    pub count: usize,
    pub score: f64,
}

/// A result rendered the way reports print it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedResult {
    /// Integer count.
    pub count: String,
    /// Score with exactly eight decimals.
    pub score: String,
    /// Location as a quoted JSON string.
    pub r#where: String,
}

impl SearchResult {
    /// Score descending, then count descending, then location ascending ignoring case.
    pub fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.count.cmp(&self.count))
            .then_with(|| cmp_ignore_case(&self.location, &other.location))
    }

    pub fn formatted(&self) -> FormattedResult {
        FormattedResult {
            count: self.count.to_string(),
            score: fixed_half_up(self.score, 8),
            r#where: serde_json::Value::String(self.location.clone()).to_string(),
        }
    }
}

/// `value` with exactly `places` decimals, ties rounded away from zero.
///
/// Rounds the shortest decimal form of the float, so `1/512` gives
/// `0.00195313` where `{:.8}` would round to even.
pub fn fixed_half_up(value: f64, places: usize) -> String {
    if !value.is_finite() {
        return format!("{value:.places$}");
    }
    let shortest = value.abs().to_string();
    let (int_part, frac_part) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));

    let mut digits: Vec<u8> = int_part.bytes().collect();
    digits.extend(frac_part.bytes().chain(std::iter::repeat(b'0')).take(places));
    if frac_part.as_bytes().get(places).is_some_and(|&d| d >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - places;
    let mut out = String::with_capacity(digits.len() + 2);
    if value.is_sign_negative() && digits.iter().any(|&d| d != b'0') {
        out.push('-');
    }
    out.extend(digits[..split].iter().map(|&d| d as char));
    if places > 0 {
        out.push('.');
        out.extend(digits[split..].iter().map(|&d| d as char));
    }
    out
}

pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

pub fn query_key(query: &Query) -> String {
    query.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// Evaluate one query.
///
/// # Panics
///
/// If a matched location has no registered document length; the index is
/// inconsistent and any score would be wrong.
pub fn search<I: IndexRead + ?Sized>(index: &I, query: &Query, mode: MatchMode) -> Vec<SearchResult> {
    // Each stored term counts once, however many query prefixes it matches.
    let matched: BTreeSet<String> = match mode {
        MatchMode::Exact => query.clone(),
        MatchMode::Partial => query.iter().flat_map(|term| index.terms_with_prefix(term)).collect(),
    };

    // First-seen order is kept so that full ties stay stable.
    let mut hits: Vec<(String, usize)> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();
    for stored in &matched {
        for (location, count) in index.location_counts(stored) {
            match slot.get(&location) {
                Some(&i) => hits[i].1 += count,
                None => {
                    slot.insert(location.clone(), hits.len());
                    hits.push((location, count));
                }
            }
        }
    }

    let mut results: Vec<SearchResult> = hits
        .into_iter()
        .map(|(location, count)| {
            let length = index
                .document_length(&location)
                .unwrap_or_else(|e| panic!("index invariant violated: {e}"));
            SearchResult { score: count as f64 / length as f64, location, count }
        })
        .collect();
    results.sort_by(SearchResult::rank);
    results
}

/// Clean every non-empty line into a query, keeping the first occurrence of each.
pub fn read_queries<R: BufRead>(reader: R) -> std::io::Result<Vec<Query>> {
    let mut seen = HashSet::new();
    let mut queries = Vec::new();
    for line in reader.lines() {
        let query = unique_stems(&line?);
        if !query.is_empty() && seen.insert(query_key(&query)) {
            queries.push(query);
        }
    }
    Ok(queries)
}

pub fn load_queries(path: &Path) -> Result<Vec<Query>> {
    let file = File::open(path).map_err(|e| SiftError::io(path, e))?;
    let queries = read_queries(BufReader::new(file)).map_err(|e| SiftError::io(path, e))?;
    debug!(path = %path.display(), queries = queries.len(), "loaded queries");
    Ok(queries)
}

pub fn search_all<I: IndexRead + ?Sized>(index: &I, queries: &[Query], mode: MatchMode) -> QueryResults {
    queries
        .iter()
        .map(|query| (query_key(query), search(index, query, mode)))
        .collect()
}

/// One queue task per query; the shared map is locked only to insert.
pub fn search_all_parallel<I>(
    index: &Arc<I>,
    queries: Vec<Query>,
    mode: MatchMode,
    queue: &WorkQueue,
) -> QueryResults
where
    I: IndexRead + Send + Sync + 'static,
{
    let results = Arc::new(Mutex::new(QueryResults::new()));
    let total = queries.len();
    for query in queries {
        let index = Arc::clone(index);
        let results = Arc::clone(&results);
        queue.submit(move || {
            let ranked = search(&*index, &query, mode);
            results.lock().insert(query_key(&query), ranked);
            Ok(())
        });
    }
    queue.await_completion();
    info!(queries = total, "parallel search finished");
    let mut results = results.lock();
    std::mem::take(&mut *results)
}
