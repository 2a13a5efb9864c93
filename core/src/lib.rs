//! Position-aware inverted index over local files or crawled web pages, with
//! a worker pool for parallel ingestion and ranked multi-word search.

pub mod config;
pub mod crawl;
pub mod error;
pub mod html;
pub mod index;
pub mod ingest;
pub mod persist;
pub mod search;
pub mod thread_safe;
pub mod tokenizer;
pub mod work_queue;

pub use config::MatchMode;
pub use crawl::{CrawlSummary, Crawler, Fetch, Frontier};
pub use error::{Result, SiftError};
pub use index::{IndexRead, IndexWrite, LengthTable, PostingStore, Postings, WordIndex};
pub use ingest::{IngestReport, WalkMode};
pub use search::{FormattedResult, Query, QueryResults, SearchResult};
pub use thread_safe::ThreadSafeIndex;
pub use work_queue::{CancelToken, QueueHandle, WorkQueue};
