use crate::error::Result;
use crate::index::{IndexRead, IndexWrite, LengthTable, PostingStore, Postings, WordIndex};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Shared index guarding a [`PostingStore`] and a [`LengthTable`] behind two
/// independent read/write locks.
///
/// Postings and lengths are written by ingestion workers independently, so
/// they never share a lock and no method holds both at once. Readers get owned
/// copies and can iterate after the guard is released.
#[derive(Debug, Default)]
pub struct ThreadSafeIndex {
    postings: RwLock<PostingStore>,
    lengths: RwLock<LengthTable>,
}

impl ThreadSafeIndex {
    pub fn new() -> Self { Self::default() }

    pub fn from_parts(postings: PostingStore, lengths: LengthTable) -> Self {
        Self { postings: RwLock::new(postings), lengths: RwLock::new(lengths) }
    }

    pub fn add_position(&self, term: &str, location: &str, position: usize) {
        self.postings.write().add(term, location, position);
    }

    pub fn add_positions(&self, term: &str, location: &str, positions: &[usize]) {
        self.postings.write().add_all(term, location, positions);
    }

    /// Append one whole document under a single write-lock acquisition.
    pub fn add_document(&self, location: &str, terms: &BTreeMap<String, Vec<usize>>) {
        let mut postings = self.postings.write();
        for (term, positions) in terms {
            postings.add_all(term, location, positions);
        }
    }

    pub fn set_document_length(&self, location: &str, count: usize) {
        self.lengths.write().set(location, count);
    }

    /// Copy both tables out into a plain [`WordIndex`].
    pub fn snapshot(&self) -> WordIndex {
        let mut out = WordIndex::new();
        for term in self.terms() {
            for (location, positions) in self.postings(&term) {
                out.add_positions(&term, &location, &positions);
            }
        }
        for (location, count) in self.document_lengths() {
            out.set_document_length(&location, count);
        }
        out
    }
}

impl From<WordIndex> for ThreadSafeIndex {
    fn from(index: WordIndex) -> Self {
        let (postings, lengths) = index.into_parts();
        Self::from_parts(postings, lengths)
    }
}

impl IndexWrite for &ThreadSafeIndex {
    fn add_position(&mut self, term: &str, location: &str, position: usize) {
        ThreadSafeIndex::add_position(self, term, location, position);
    }

    fn add_positions(&mut self, term: &str, location: &str, positions: &[usize]) {
        ThreadSafeIndex::add_positions(self, term, location, positions);
    }

    fn set_document_length(&mut self, location: &str, count: usize) {
        ThreadSafeIndex::set_document_length(self, location, count);
    }

    fn add_document(&mut self, location: &str, terms: &BTreeMap<String, Vec<usize>>) {
        ThreadSafeIndex::add_document(self, location, terms);
    }
}

impl IndexRead for ThreadSafeIndex {
    fn num_terms(&self) -> usize { self.postings.read().len() }
    fn num_locations(&self, term: &str) -> usize { self.postings.read().num_locations(term) }
    fn num_positions(&self, term: &str, location: &str) -> usize {
        self.postings.read().num_positions(term, location)
    }
    fn has_term(&self, term: &str) -> bool { self.postings.read().has_term(term) }
    fn has_location(&self, term: &str, location: &str) -> bool {
        self.postings.read().has_location(term, location)
    }
    fn has_position(&self, term: &str, location: &str, position: usize) -> bool {
        self.postings.read().has_position(term, location, position)
    }
    fn terms(&self) -> Vec<String> { self.postings.read().terms() }
    fn terms_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.postings.read().terms_with_prefix(prefix)
    }
    fn postings(&self, term: &str) -> Postings { self.postings.read().postings(term) }
    fn positions(&self, term: &str, location: &str) -> Vec<usize> {
        self.postings.read().positions(term, location)
    }
    fn location_counts(&self, term: &str) -> Vec<(String, usize)> {
        self.postings.read().location_counts(term)
    }
    fn document_length(&self, location: &str) -> Result<usize> {
        self.lengths.read().get(location)
    }
    fn document_lengths(&self) -> BTreeMap<String, usize> { self.lengths.read().snapshot() }
}
