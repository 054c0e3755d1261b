//! Paper model representing one scholarly search result.

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::rag::RetrievalIndex;
use crate::research::{PaperPipeline, ResearchError};

/// Identifying fields of a search result, as parsed from the search API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Paper title
    pub title: String,

    /// Primary link (publisher or landing page)
    pub link: String,

    /// Direct PDF link; empty when the result offered none
    pub resource_link: String,

    /// Authors (comma-separated, may be empty)
    pub authors: String,

    /// Result type reported by the search engine (e.g. "Pdf", "Html")
    pub format: Option<String>,

    /// Short publication summary ("A Author - Journal, 2011 - publisher")
    pub summary: String,
}

/// A search result plus the data derived from its full text.
///
/// The extracted text and the retrieval index are each computed at most once
/// per instance, on first use, and cached for the lifetime of the result.
/// A failed download is cached as well: it is not retried.
#[derive(Debug)]
pub struct PaperSearchResult {
    record: PaperRecord,
    text: OnceCell<Option<String>>,
    index: OnceCell<Option<RetrievalIndex>>,
}

impl PaperSearchResult {
    pub fn new(record: PaperRecord) -> Self {
        Self {
            record,
            text: OnceCell::new(),
            index: OnceCell::new(),
        }
    }

    pub fn record(&self) -> &PaperRecord {
        &self.record
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }

    /// Whether text extraction has already run (successfully or not)
    pub fn text_resolved(&self) -> bool {
        self.text.initialized()
    }

    /// Whether the retrieval index has already been built (or found unbuildable)
    pub fn index_resolved(&self) -> bool {
        self.index.initialized()
    }

    /// Full text of the paper, downloading and extracting it on first call.
    pub async fn text(&self, pipeline: &PaperPipeline) -> Option<&str> {
        self.text
            .get_or_init(|| pipeline.load_text(&self.record))
            .await
            .as_deref()
    }

    /// Retrieval index over the paper's chunks, built on first call.
    ///
    /// Only a fatal error (missing credentials) propagates; it leaves the
    /// index unresolved so a later call can try again.
    pub async fn index(
        &self,
        pipeline: &PaperPipeline,
    ) -> Result<Option<&RetrievalIndex>, ResearchError> {
        let index = self
            .index
            .get_or_try_init(|| async {
                let Some(text) = self.text(pipeline).await else {
                    return Ok(None);
                };

                match pipeline.build_index(text).await {
                    Ok(index) => Ok(index),
                    Err(e) if e.is_fatal() => Err(e),
                    Err(e) => {
                        tracing::warn!("Could not index '{}': {}", self.record.title, e);
                        Ok(None)
                    }
                }
            })
            .await?;

        Ok(index.as_ref())
    }

    /// Answer `question` from this paper.
    ///
    /// Returns the citation text, or `None` when the paper has no obtainable
    /// text or the answer could not be produced.
    pub async fn summarize(
        &self,
        pipeline: &PaperPipeline,
        question: &str,
    ) -> Result<Option<String>, ResearchError> {
        let Some(index) = self.index(pipeline).await? else {
            return Ok(None);
        };

        let answer = async {
            let fragments = index
                .search(pipeline.embedder(), question, pipeline.top_k())
                .await?;
            let answer = pipeline.summarizer().summarize(&fragments, question).await?;
            Ok::<_, ResearchError>(answer)
        }
        .await;

        match answer {
            Ok(answer) => Ok(Some(self.citation(&answer))),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("Could not summarize '{}': {}", self.record.title, e);
                Ok(None)
            }
        }
    }

    /// Compose the citation for a model answer
    pub fn citation(&self, answer: &str) -> String {
        format!(
            "\"{}\". {}\n\nSummary: {}",
            self.record.title, self.record.summary, answer
        )
    }
}

impl From<PaperRecord> for PaperSearchResult {
    fn from(record: PaperRecord) -> Self {
        Self::new(record)
    }
}
