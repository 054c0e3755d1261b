//! External knowledge sources.
//!
//! - [`GoogleScholarSource`] searches Google Scholar through SerpAPI and
//!   yields [`PaperRecord`](crate::models::PaperRecord)s.
//! - [`WikipediaSource`] answers general background queries with page intros.

mod google_scholar;
mod wikipedia;

pub use google_scholar::{parse_record, parse_response, GoogleScholarSource};
pub use wikipedia::{WikipediaSource, NO_WIKIPEDIA_RESULT};

use crate::config::ConfigError;

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Missing credentials or other configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
