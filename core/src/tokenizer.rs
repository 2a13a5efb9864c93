use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref NOISE: Regex = Regex::new(r"[^\p{Alphabetic}\s]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// NFD-normalize, drop anything that is neither a letter nor whitespace, and lowercase.
fn clean(text: &str) -> String {
    let decomposed = text.nfd().collect::<String>();
    NOISE.replace_all(&decomposed, "").to_lowercase()
}

/// Clean `text` and stem every word, keeping document order and duplicates.
pub fn clean_to_stems(text: &str) -> Vec<String> {
    clean(text)
        .split_whitespace()
        .map(|word| STEMMER.stem(word).into_owned())
        .collect()
}

/// Stems paired with their 1-based position in the document.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    clean_to_stems(text)
        .into_iter()
        .enumerate()
        .map(|(i, stem)| (stem, i + 1))
        .collect()
}

/// Unique stems of one query line, sorted.
pub fn unique_stems(line: &str) -> BTreeSet<String> {
    clean_to_stems(line).into_iter().collect()
}
