//! The per-paper processing pipeline: download, extract, chunk, index.

use std::sync::Arc;

use crate::config::{Config, PdfConfig, RetrievalConfig};
use crate::download::{PaperFetcher, SciHubMirror};
use crate::llm::{LanguageModel, Summarizer};
use crate::models::PaperRecord;
use crate::rag::{
    EmbeddingProvider, OpenAIEmbedding, RetrievalIndex, TextChunker, TiktokenTokenizer,
};
use crate::research::ResearchError;
use crate::utils::{extract_text, HttpClient};

/// Everything a [`PaperSearchResult`](crate::models::PaperSearchResult)
/// needs to turn its record into an answer.
#[derive(Debug, Clone)]
pub struct PaperPipeline {
    fetcher: PaperFetcher,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    summarizer: Summarizer,
    top_k: usize,
    batch_size: usize,
    max_page_chars: usize,
}

impl PaperPipeline {
    pub fn new(
        fetcher: PaperFetcher,
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        summarizer: Summarizer,
    ) -> Self {
        let retrieval = RetrievalConfig::default();
        Self {
            fetcher,
            chunker,
            embedder,
            summarizer,
            top_k: retrieval.top_k,
            batch_size: retrieval.embedding_batch_size,
            max_page_chars: PdfConfig::default().max_page_chars,
        }
    }

    /// Build the production pipeline: OpenAI embeddings, tiktoken chunking
    /// and the configured mirror.
    pub fn from_config(
        config: &Config,
        client: HttpClient,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self, ResearchError> {
        let mirror = SciHubMirror::new(
            client.clone(),
            &config.endpoints.mirror_base,
            &config.downloads.directory,
        );
        let fetcher = PaperFetcher::new(
            client.clone(),
            &config.downloads.directory,
            Arc::new(mirror),
        );

        let chunker = TextChunker::new(
            config.retrieval.chunk_size,
            config.retrieval.chunk_overlap,
            Arc::new(TiktokenTokenizer::cl100k()?),
        )?;

        let embedder = OpenAIEmbedding::new(
            client,
            &config.endpoints.openai_base,
            &config.models.embedding_model,
            config.api_keys.openai.clone(),
        );

        Ok(Self::new(fetcher, chunker, Arc::new(embedder), Summarizer::new(model))
            .with_top_k(config.retrieval.top_k)
            .with_batch_size(config.retrieval.embedding_batch_size)
            .with_max_page_chars(config.pdf.max_page_chars))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_page_chars(mut self, max_page_chars: usize) -> Self {
        self.max_page_chars = max_page_chars;
        self
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn fetcher(&self) -> &PaperFetcher {
        &self.fetcher
    }

    /// Download the paper and extract its text; `None` when no strategy
    /// produced a readable PDF.
    pub async fn load_text(&self, record: &PaperRecord) -> Option<String> {
        let path = match self.fetcher.resolve(record).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("No downloadable copy of '{}': {}", record.title, e);
                return None;
            }
        };

        let max_page_chars = self.max_page_chars;
        let source = path.clone();
        let text = match tokio::task::spawn_blocking(move || extract_text(&source, max_page_chars))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("PDF extraction task failed: {}", e);
                None
            }
        };

        match &text {
            Some(text) => tracing::debug!(
                "Extracted {} chars from {} for '{}'",
                text.len(),
                path.display(),
                record.title
            ),
            None => tracing::warn!("Could not read {} for '{}'", path.display(), record.title),
        }
        text
    }

    /// Chunk `text` and embed the chunks. `None` when the text has no content.
    pub async fn build_index(&self, text: &str) -> Result<Option<RetrievalIndex>, ResearchError> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Ok(None);
        }

        let index = RetrievalIndex::build(chunks, self.embedder(), self.batch_size).await?;
        Ok(Some(index))
    }
}
