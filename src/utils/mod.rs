//! Utility modules supporting research operations.
//!
//! - [`HttpClient`]: shared HTTP client configured from [`crate::config::HttpConfig`]
//! - [`extract_text`]: extract text content from PDF files, `None` for anything unreadable

mod http;
mod pdf;

pub use http::HttpClient;
pub use pdf::{extract_text, extract_text_from_bytes};
