use sift_core::{IndexRead, IndexWrite, SiftError, ThreadSafeIndex, WordIndex};

fn sample() -> WordIndex {
    let mut index = WordIndex::new();
    index.add_position("cat", "a.txt", 1);
    index.add_position("cat", "a.txt", 4);
    index.add_position("cat", "a.txt", 4);
    index.add_positions("cat", "b.txt", &[2, 3]);
    index.add_position("dog", "b.txt", 1);
    index.set_document_length("a.txt", 4);
    index.set_document_length("b.txt", 3);
    index
}

#[test]
fn added_positions_are_visible() {
    let index = sample();
    assert!(index.has_position("cat", "a.txt", 1));
    assert!(index.has_position("cat", "a.txt", 4));
    assert!(!index.has_position("cat", "a.txt", 2));
    assert_eq!(index.num_positions("cat", "a.txt"), 3);
    assert_eq!(index.positions("cat", "a.txt"), vec![1, 4, 4]);
}

#[test]
fn sizes_are_zero_for_unknown_keys() {
    let index = sample();
    assert_eq!(index.num_terms(), 2);
    assert_eq!(index.num_locations("cat"), 2);
    assert_eq!(index.num_locations("bird"), 0);
    assert_eq!(index.num_positions("cat", "zzz.txt"), 0);
    assert_eq!(index.num_positions("bird", "a.txt"), 0);
    assert!(!index.has_term("bird"));
    assert!(!index.has_location("dog", "a.txt"));
    assert!(!index.has_position("bird", "a.txt", 1));
}

#[test]
fn postings_iterate_in_location_order() {
    let index = sample();
    let locations: Vec<String> = index.postings("cat").into_keys().collect();
    assert_eq!(locations, vec!["a.txt", "b.txt"]);
    assert!(index.postings("bird").is_empty());
    assert_eq!(index.location_counts("cat"), vec![("a.txt".to_string(), 3), ("b.txt".to_string(), 2)]);
}

#[test]
fn unknown_document_length_fails() {
    let index = sample();
    assert_eq!(index.document_length("a.txt").unwrap(), 4);
    assert!(matches!(index.document_length("c.txt"), Err(SiftError::NotFound(_))));
}

#[test]
fn thread_safe_index_matches_plain_index() {
    let plain = sample();
    let shared = ThreadSafeIndex::from(plain.clone());
    assert_eq!(shared.terms(), plain.terms());
    assert_eq!(shared.postings("cat"), plain.postings("cat"));
    assert_eq!(shared.terms_with_prefix("ca"), vec!["cat"]);
    assert_eq!(shared.document_lengths(), plain.document_lengths());
}

#[test]
fn repeated_length_registration_overwrites() {
    let mut index = sample();
    index.set_document_length("a.txt", 4);
    index.set_document_length("a.txt", 4);
    assert_eq!(index.document_length("a.txt").unwrap(), 4);
    assert_eq!(index.document_lengths().len(), 2);
}
