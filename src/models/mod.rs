//! Core data models for scholarly search results.

mod paper;

pub use paper::{PaperRecord, PaperSearchResult};
