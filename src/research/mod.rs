//! Shared research state and the operations agents perform on it.
//!
//! A [`ResearchContext`] accumulates every paper found during a run.
//! [`search_and_save`] appends to it; [`read_papers`] asks each paper to
//! answer a question and collects the citations.

mod pipeline;

pub use pipeline::PaperPipeline;

use crate::config::ConfigError;
use crate::llm::LlmError;
use crate::models::{PaperRecord, PaperSearchResult};
use crate::rag::{EmbeddingError, RagError};
use crate::sources::{GoogleScholarSource, SourceError};

/// Tool answer after a search
pub const SAVED_MESSAGE: &str = "Results found and saved in global context";

/// Tool answer when no paper produced a citation
pub const NOTHING_FOUND: &str = "Nothing found";

/// Separator between citations in a `read_papers` answer
pub const CITATION_SEPARATOR: &str = "\n\n\n";

/// Errors from research operations
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl ResearchError {
    /// Whether the run cannot continue (missing credentials or bad
    /// configuration), as opposed to a failure scoped to one paper.
    pub fn is_fatal(&self) -> bool {
        match self {
            ResearchError::Config(_) => true,
            ResearchError::Source(SourceError::Config(_)) => true,
            ResearchError::Rag(RagError::Embedding(EmbeddingError::Config(_))) => true,
            ResearchError::Rag(RagError::InvalidChunking { .. } | RagError::Tokenizer(_)) => true,
            ResearchError::Embedding(EmbeddingError::Config(_)) => true,
            ResearchError::Llm(LlmError::Config(_)) => true,
            _ => false,
        }
    }
}

/// Registry of every paper found during a run
#[derive(Debug, Default)]
pub struct ResearchContext {
    results: Vec<PaperSearchResult>,
}

impl ResearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PaperRecord) {
        self.results.push(PaperSearchResult::new(record));
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = PaperRecord>) {
        self.results
            .extend(records.into_iter().map(PaperSearchResult::new));
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[PaperSearchResult] {
        &self.results
    }
}

/// Search Google Scholar and append every result to the registry.
///
/// Returns the number of results added.
pub async fn search_and_save(
    ctx: &mut ResearchContext,
    source: &GoogleScholarSource,
    query: &str,
) -> Result<usize, SourceError> {
    let records = source.search(query).await?;
    let added = records.len();
    ctx.extend(records);

    tracing::info!(
        "Saved {} results for '{}' ({} in registry)",
        added,
        query,
        ctx.len()
    );
    Ok(added)
}

/// Ask every registered paper to answer `question`.
///
/// Papers are consulted in registry order. Citations are joined with blank
/// lines; [`NOTHING_FOUND`] when none was produced.
pub async fn read_papers(
    ctx: &ResearchContext,
    pipeline: &PaperPipeline,
    question: &str,
) -> Result<String, ResearchError> {
    tracing::info!(
        "Reading {} papers for question '{}'",
        ctx.len(),
        question
    );

    let mut citations = Vec::new();
    for result in ctx.results() {
        if let Some(citation) = result.summarize(pipeline, question).await? {
            citations.push(citation);
        }
    }

    if citations.is_empty() {
        return Ok(NOTHING_FOUND.to_string());
    }
    Ok(citations.join(CITATION_SEPARATOR))
}
