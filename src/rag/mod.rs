//! Retrieval over paper text: token chunking, embeddings, and an in-memory
//! similarity index.

pub mod chunker;
pub mod embeddings;
pub mod index;

pub use chunker::{TextChunker, TiktokenTokenizer, Tokenizer};
pub use embeddings::{EmbeddingError, EmbeddingProvider, OpenAIEmbedding};
pub use index::RetrievalIndex;

/// Errors from chunking and indexing
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("Invalid chunking: overlap {overlap} must be smaller than chunk size {size}")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("Tokenizer unavailable: {0}")]
    Tokenizer(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}
