//! In-memory retrieval index over text chunks.

use super::{EmbeddingProvider, RagError};

/// Chunks with their embeddings, searchable by cosine similarity
#[derive(Debug, Clone, Default)]
pub struct RetrievalIndex {
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    text: String,
    vector: Vec<f32>,
}

impl RetrievalIndex {
    /// Embed `chunks` in batches of `batch_size` and index them.
    pub async fn build(
        chunks: Vec<String>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self, RagError> {
        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size.max(1)) {
            let vectors = embedder.embed_batch(batch).await?;
            entries.extend(
                batch
                    .iter()
                    .zip(vectors)
                    .map(|(text, vector)| IndexEntry {
                        text: text.clone(),
                        vector,
                    }),
            );
        }

        tracing::debug!(
            "Indexed {} chunks with {}",
            entries.len(),
            embedder.model_name()
        );
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k` chunks most similar to `question`, best first.
    pub async fn search(
        &self,
        embedder: &dyn EmbeddingProvider,
        question: &str,
        k: usize,
    ) -> Result<Vec<String>, RagError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = embedder.embed(question).await?;
        Ok(self.nearest(&query, k))
    }

    fn nearest(&self, query: &[f32], k: usize) -> Vec<String> {
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query, &entry.vector), entry))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(k)
            .map(|(_, entry)| entry.text.clone())
            .collect()
    }
}

/// Cosine similarity in [-1, 1]; 0 for zero-length or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
