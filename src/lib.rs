//! # Research Crew
//!
//! A multi-agent research assistant. An investigator agent searches Google
//! Scholar and saves what it finds, an analyst agent reads the saved papers
//! against a question, and a writer agent turns the analysis into prose.
//!
//! ## Architecture
//!
//! - [`sources`]: Google Scholar (via SerpAPI) and Wikipedia
//! - [`download`]: direct PDF downloads with a mirror fallback
//! - [`utils`]: HTTP client and PDF text extraction
//! - [`rag`]: token chunking, embeddings and the retrieval index
//! - [`llm`]: chat model boundary and the fragment summarizer
//! - [`models`]: search records and their lazily derived text and index
//! - [`research`]: the shared paper registry and the agent-facing operations
//! - [`mcp`]: tool registry and the MCP stdio server
//! - [`crew`]: agents, tasks and the sequential crew runner
//! - [`config`]: configuration management

pub mod config;
pub mod crew;
pub mod download;
pub mod llm;
pub mod mcp;
pub mod models;
pub mod rag;
pub mod research;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{PaperRecord, PaperSearchResult};
pub use research::{PaperPipeline, ResearchContext};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
