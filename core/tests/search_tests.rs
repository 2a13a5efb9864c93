use sift_core::search::{search, search_all, search_all_parallel, query_key, Query};
use sift_core::{IndexWrite, MatchMode, ThreadSafeIndex, WordIndex, WorkQueue};
use std::sync::Arc;

fn query(terms: &[&str]) -> Query {
    terms.iter().map(|t| t.to_string()).collect()
}

fn cats() -> WordIndex {
    let mut index = WordIndex::new();
    index.add_positions("cat", "a.txt", &[1, 4, 7]);
    index.add_positions("cat", "b.txt", &[1, 2, 3, 4, 5, 6]);
    index.set_document_length("a.txt", 10);
    index.set_document_length("b.txt", 12);
    index
}

#[test]
fn exact_results_are_scored_and_ordered() {
    let results = search(&cats(), &query(&["cat"]), MatchMode::Exact);
    let rendered: Vec<(String, String, String)> = results
        .iter()
        .map(|r| {
            let f = r.formatted();
            (f.r#where, f.count, f.score)
        })
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("\"b.txt\"".to_string(), "6".to_string(), "0.50000000".to_string()),
            ("\"a.txt\"".to_string(), "3".to_string(), "0.30000000".to_string()),
        ]
    );
}

#[test]
fn ties_fall_back_to_case_insensitive_location() {
    let mut index = WordIndex::new();
    for location in ["banana.txt", "Apple.txt", "cherry.txt"] {
        index.add_positions("fruit", location, &[1, 2]);
        index.set_document_length(location, 4);
    }
    let order: Vec<String> = search(&index, &query(&["fruit"]), MatchMode::Exact)
        .into_iter()
        .map(|r| r.location)
        .collect();
    assert_eq!(order, vec!["Apple.txt", "banana.txt", "cherry.txt"]);
}

#[test]
fn partial_match_sums_every_matching_term() {
    let mut index = WordIndex::new();
    index.add_positions("cat", "a.txt", &[1, 3]);
    index.add_positions("category", "a.txt", &[2]);
    index.add_positions("category", "b.txt", &[1]);
    index.add_positions("dog", "a.txt", &[4]);
    index.set_document_length("a.txt", 4);
    index.set_document_length("b.txt", 2);

    let partial = search(&index, &query(&["cat"]), MatchMode::Partial);
    assert_eq!(partial[0].location, "a.txt");
    assert_eq!(partial[0].count, 3);
    assert_eq!(partial[1].location, "b.txt");
    assert_eq!(partial[1].count, 1);

    let exact = search(&index, &query(&["cat"]), MatchMode::Exact);
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].count, 2);
}

#[test]
fn overlapping_prefixes_count_each_stored_term_once() {
    let mut index = WordIndex::new();
    index.add_positions("cat", "a.txt", &[1, 2, 3]);
    index.set_document_length("a.txt", 10);

    let results = search(&index, &query(&["ca", "cat"]), MatchMode::Partial);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].count, 3);
    assert_eq!(results[0].formatted().score, "0.30000000");
}

#[test]
fn half_way_scores_round_up() {
    let mut index = WordIndex::new();
    index.add_position("cat", "a.txt", 1);
    index.set_document_length("a.txt", 512);
    let results = search(&index, &query(&["cat"]), MatchMode::Exact);
    assert_eq!(results[0].formatted().score, "0.00195313");
}

#[test]
#[should_panic(expected = "index invariant violated")]
fn missing_document_length_fails_loudly() {
    let mut index = WordIndex::new();
    index.add_positions("cat", "orphan.txt", &[1, 2]);
    search(&index, &query(&["cat"]), MatchMode::Exact);
}

#[test]
fn multi_word_queries_accumulate_per_location() {
    let mut index = cats();
    index.add_positions("hat", "a.txt", &[2, 3, 5]);
    let results = search(&index, &query(&["cat", "hat", "missing"]), MatchMode::Exact);
    assert_eq!(results[0].location, "a.txt");
    assert_eq!(results[0].count, 6);
    assert!((results[0].score - 0.6).abs() < 1e-12);
}

#[test]
fn unknown_terms_give_no_results() {
    assert!(search(&cats(), &query(&["zebra"]), MatchMode::Partial).is_empty());
}

#[test]
fn ingesting_twice_doubles_counts() {
    let mut once = WordIndex::new();
    sift_core::ingest::ingest_text("cat hat cat", "doc", &mut once);
    let mut twice = WordIndex::new();
    sift_core::ingest::ingest_text("cat hat cat", "doc", &mut twice);
    sift_core::ingest::ingest_text("cat hat cat", "doc", &mut twice);

    let a = search(&once, &query(&["cat"]), MatchMode::Exact);
    let b = search(&twice, &query(&["cat"]), MatchMode::Exact);
    assert_eq!(a[0].count * 2, b[0].count);
    assert_eq!(b[0].score, 4.0 / 3.0);
}

#[test]
fn parallel_batch_matches_sequential_batch() {
    let mut index = cats();
    index.add_positions("hat", "b.txt", &[7]);
    index.add_positions("hatch", "c.txt", &[1]);
    index.set_document_length("c.txt", 1);
    let queries = vec![query(&["cat"]), query(&["hat"]), query(&["cat", "hat"]), query(&["dog"])];

    let sequential = search_all(&index, &queries, MatchMode::Partial);
    let queue = WorkQueue::new(3).unwrap();
    let shared = Arc::new(ThreadSafeIndex::from(index));
    let parallel = search_all_parallel(&shared, queries.clone(), MatchMode::Partial, &queue);

    assert_eq!(sequential, parallel);
    let keys: Vec<&String> = parallel.keys().collect();
    assert_eq!(keys, vec!["cat", "cat hat", "dog", "hat"]);
    assert!(parallel["dog"].is_empty());
    assert_eq!(query_key(&queries[2]), "cat hat");
}
