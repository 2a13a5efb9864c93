use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the index, ingestion and crawl components.
///
/// Per-document failures are local: the task that hit one logs it and
/// contributes nothing further, the rest of the session carries on.
#[derive(Debug, Error)]
pub enum SiftError {
    /// A document length was requested for a location that never registered one.
    #[error("no document length recorded for {0}")]
    NotFound(String),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("malformed location {location}: {source}")]
    MalformedLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },

    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SiftError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        SiftError::Fetch { url: url.into(), reason: reason.to_string() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SiftError::Io { path: path.into(), source }
    }
}

pub type Result<T, E = SiftError> = std::result::Result<T, E>;
