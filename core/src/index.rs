use crate::error::{Result, SiftError};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Positions of one term, keyed by location. Locations iterate in ascending order.
pub type Postings = BTreeMap<String, Vec<usize>>;

/// Read side of an inverted index. Every method returns an owned snapshot.
pub trait IndexRead {
    /// Number of distinct terms.
    fn num_terms(&self) -> usize;
    /// Number of locations holding `term`; 0 when unknown.
    fn num_locations(&self, term: &str) -> usize;
    /// Number of positions recorded for `term` in `location`, duplicates included.
    fn num_positions(&self, term: &str, location: &str) -> usize;
    fn has_term(&self, term: &str) -> bool;
    fn has_location(&self, term: &str, location: &str) -> bool;
    fn has_position(&self, term: &str, location: &str, position: usize) -> bool;
    /// All stored terms, ascending.
    fn terms(&self) -> Vec<String>;
    /// Stored terms beginning with `prefix`, ascending.
    fn terms_with_prefix(&self, prefix: &str) -> Vec<String>;
    /// Copy of the location map for `term`; empty when unknown.
    fn postings(&self, term: &str) -> Postings;
    fn positions(&self, term: &str, location: &str) -> Vec<usize>;
    /// `(location, position count)` pairs for `term`, ascending by location.
    fn location_counts(&self, term: &str) -> Vec<(String, usize)>;
    /// Token count registered for `location`.
    fn document_length(&self, location: &str) -> Result<usize>;
    fn document_lengths(&self) -> BTreeMap<String, usize>;
}

/// Write side of an inverted index.
///
/// Implemented for `&ThreadSafeIndex` as well, so ingestion code can be handed
/// either an exclusive plain index or a shared handle.
pub trait IndexWrite {
    fn add_position(&mut self, term: &str, location: &str, position: usize);
    fn add_positions(&mut self, term: &str, location: &str, positions: &[usize]);
    fn set_document_length(&mut self, location: &str, count: usize);

    /// Append every `term -> positions` entry of one document.
    fn add_document(&mut self, location: &str, terms: &BTreeMap<String, Vec<usize>>) {
        for (term, positions) in terms {
            self.add_positions(term, location, positions);
        }
    }
}

impl<T: IndexWrite + ?Sized> IndexWrite for &mut T {
    fn add_position(&mut self, term: &str, location: &str, position: usize) {
        (**self).add_position(term, location, position)
    }

    fn add_positions(&mut self, term: &str, location: &str, positions: &[usize]) {
        (**self).add_positions(term, location, positions)
    }

    fn set_document_length(&mut self, location: &str, count: usize) {
        (**self).set_document_length(location, count)
    }

    fn add_document(&mut self, location: &str, terms: &BTreeMap<String, Vec<usize>>) {
        (**self).add_document(location, terms)
    }
}

/// Unguarded `term -> location -> positions` map.
///
/// A term key exists only while it has a location, and a location key only
/// while it has a position.
#[derive(Debug, Default, Clone)]
pub struct PostingStore {
    terms: BTreeMap<String, Postings>,
}

impl PostingStore {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, term: &str, location: &str, position: usize) {
        self.slot(term, location).push(position);
    }

    pub fn add_all(&mut self, term: &str, location: &str, positions: &[usize]) {
        if positions.is_empty() {
            return;
        }
        self.slot(term, location).extend_from_slice(positions);
    }

    fn slot(&mut self, term: &str, location: &str) -> &mut Vec<usize> {
        self.terms
            .entry(term.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default()
    }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn num_locations(&self, term: &str) -> usize {
        self.terms.get(term).map_or(0, BTreeMap::len)
    }

    pub fn num_positions(&self, term: &str, location: &str) -> usize {
        self.get(term, location).map_or(0, Vec::len)
    }

    fn get(&self, term: &str, location: &str) -> Option<&Vec<usize>> {
        self.terms.get(term).and_then(|locations| locations.get(location))
    }

    pub fn has_term(&self, term: &str) -> bool { self.terms.contains_key(term) }

    pub fn has_location(&self, term: &str, location: &str) -> bool {
        self.get(term, location).is_some()
    }

    pub fn has_position(&self, term: &str, location: &str, position: usize) -> bool {
        self.get(term, location).is_some_and(|p| p.contains(&position))
    }

    pub fn terms(&self) -> Vec<String> { self.terms.keys().cloned().collect() }

    pub fn terms_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.terms
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(term, _)| term)
            .take_while(|term| term.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn postings(&self, term: &str) -> Postings {
        self.terms.get(term).cloned().unwrap_or_default()
    }

    pub fn positions(&self, term: &str, location: &str) -> Vec<usize> {
        self.get(term, location).cloned().unwrap_or_default()
    }

    pub fn location_counts(&self, term: &str) -> Vec<(String, usize)> {
        self.terms
            .get(term)
            .map(|locations| locations.iter().map(|(l, p)| (l.clone(), p.len())).collect())
            .unwrap_or_default()
    }
}

/// Unguarded `location -> token count` table.
#[derive(Debug, Default, Clone)]
pub struct LengthTable {
    counts: BTreeMap<String, usize>,
}

impl LengthTable {
    pub fn new() -> Self { Self::default() }

    pub fn set(&mut self, location: &str, count: usize) {
        self.counts.insert(location.to_string(), count);
    }

    pub fn get(&self, location: &str) -> Result<usize> {
        self.counts
            .get(location)
            .copied()
            .ok_or_else(|| SiftError::NotFound(location.to_string()))
    }

    pub fn snapshot(&self) -> BTreeMap<String, usize> { self.counts.clone() }
}

/// Single-threaded index: postings plus document lengths.
#[derive(Debug, Default, Clone)]
pub struct WordIndex {
    postings: PostingStore,
    lengths: LengthTable,
}

impl WordIndex {
    pub fn new() -> Self { Self::default() }

    /// Split into the two tables, e.g. to hand them to a [`ThreadSafeIndex`](crate::ThreadSafeIndex).
    pub fn into_parts(self) -> (PostingStore, LengthTable) {
        (self.postings, self.lengths)
    }
}

impl IndexWrite for WordIndex {
    fn add_position(&mut self, term: &str, location: &str, position: usize) {
        self.postings.add(term, location, position);
    }

    fn add_positions(&mut self, term: &str, location: &str, positions: &[usize]) {
        self.postings.add_all(term, location, positions);
    }

    fn set_document_length(&mut self, location: &str, count: usize) {
        self.lengths.set(location, count);
    }
}

impl IndexRead for WordIndex {
    fn num_terms(&self) -> usize { self.postings.len() }
    fn num_locations(&self, term: &str) -> usize { self.postings.num_locations(term) }
    fn num_positions(&self, term: &str, location: &str) -> usize {
        self.postings.num_positions(term, location)
    }
    fn has_term(&self, term: &str) -> bool { self.postings.has_term(term) }
    fn has_location(&self, term: &str, location: &str) -> bool {
        self.postings.has_location(term, location)
    }
    fn has_position(&self, term: &str, location: &str, position: usize) -> bool {
        self.postings.has_position(term, location, position)
    }
    fn terms(&self) -> Vec<String> { self.postings.terms() }
    fn terms_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.postings.terms_with_prefix(prefix)
    }
    fn postings(&self, term: &str) -> Postings { self.postings.postings(term) }
    fn positions(&self, term: &str, location: &str) -> Vec<usize> {
        self.postings.positions(term, location)
    }
    fn location_counts(&self, term: &str) -> Vec<(String, usize)> {
        self.postings.location_counts(term)
    }
    fn document_length(&self, location: &str) -> Result<usize> { self.lengths.get(location) }
    fn document_lengths(&self) -> BTreeMap<String, usize> { self.lengths.snapshot() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_positions_do_not_create_keys() {
        let mut store = PostingStore::new();
        store.add_all("cat", "a.txt", &[]);
        assert!(!store.has_term("cat"));
        assert!(store.is_empty());
    }

    #[test]
    fn prefix_range_stops_at_first_mismatch() {
        let mut store = PostingStore::new();
        for term in ["ca", "cat", "category", "cb", "dog"] {
            store.add(term, "a.txt", 1);
        }
        assert_eq!(store.terms_with_prefix("cat"), vec!["cat", "category"]);
        assert_eq!(store.terms_with_prefix("c").len(), 4);
        assert!(store.terms_with_prefix("z").is_empty());
    }

    #[test]
    fn missing_length_is_not_found() {
        let table = LengthTable::new();
        assert!(matches!(table.get("nowhere"), Err(SiftError::NotFound(l)) if l == "nowhere"));
    }
}
