//! Embedding provider abstraction and the OpenAI implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{resolve_credential, ConfigError, OPENAI_API_KEY_VAR};
use crate::utils::HttpClient;

/// Errors that can occur during embedding operations.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Missing credentials or other configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with an error
    #[error("Embedding API error: {0}")]
    Api(String),

    /// The provider answered with something unexpected
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::Network(err.to_string())
    }
}

/// Trait for text embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Embed several texts; vectors come back in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::Parse("no embedding returned".to_string()))
    }

    /// Model identifier (e.g. "text-embedding-ada-002")
    fn model_name(&self) -> &str;
}

/// OpenAI `/embeddings` client.
///
/// The API key is taken from the configuration if set, otherwise from
/// `OPENAI_API_KEY` at request time.
#[derive(Debug, Clone)]
pub struct OpenAIEmbedding {
    client: HttpClient,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAIEmbedding {
    pub fn new(client: HttpClient, base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = resolve_credential(self.api_key.as_deref(), OPENAI_API_KEY_VAR)?;

        let response = self
            .client
            .post(&format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("status {}: {}", status, text)));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(e.to_string()))?;

        if body.data.len() != texts.len() {
            return Err(EmbeddingError::Parse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
