//! Configuration management.
//!
//! Configuration is read from an optional TOML file and then overridden by
//! environment variables prefixed with `RESEARCH_CREW`, using `__` to reach
//! nested keys (e.g. `RESEARCH_CREW_RETRIEVAL__TOP_K=6`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! openai = "sk-..."
//! serpapi = "..."
//!
//! [endpoints]
//! openai_base = "https://api.openai.com/v1"
//! serpapi_base = "https://serpapi.com"
//! mirror_base = "https://sci-hub.se"
//! wikipedia_base = "https://en.wikipedia.org"
//!
//! [models]
//! chat_model = "gpt-4-1106-preview"
//! embedding_model = "text-embedding-ada-002"
//! temperature = 0.0
//!
//! [downloads]
//! directory = "./downloads"
//!
//! [retrieval]
//! chunk_size = 200
//! chunk_overlap = 50
//! top_k = 4
//! embedding_batch_size = 64
//!
//! [pdf]
//! max_page_chars = 20000
//!
//! [http]
//! timeout_secs = 120
//! connect_timeout_secs = 10
//!
//! [agents]
//! max_iterations = 15
//! ```
//!
//! API keys left out of the file are looked up in `OPENAI_API_KEY` and
//! `SERPAPI_API_KEY` at the moment a request is made.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the language model provider key
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable holding the search API key
pub const SERPAPI_API_KEY_VAR: &str = "SERPAPI_API_KEY";

const ENV_PREFIX: &str = "RESEARCH_CREW";
const CONFIG_FILE_NAME: &str = "research-crew.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Base URLs of the external services
    #[serde(default)]
    pub endpoints: Endpoints,

    /// Language and embedding model settings
    #[serde(default)]
    pub models: ModelConfig,

    /// Download settings
    #[serde(default)]
    pub downloads: DownloadConfig,

    /// Chunking and retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// PDF extraction settings
    #[serde(default)]
    pub pdf: PdfConfig,

    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Agent execution settings
    #[serde(default)]
    pub agents: AgentConfig,
}

/// API keys for external services.
///
/// Both are optional here; unset keys are resolved from the process
/// environment at call time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub openai: Option<String>,

    #[serde(default)]
    pub serpapi: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_openai_base")]
    pub openai_base: String,

    #[serde(default = "default_serpapi_base")]
    pub serpapi_base: String,

    #[serde(default = "default_mirror_base")]
    pub mirror_base: String,

    #[serde(default = "default_wikipedia_base")]
    pub wikipedia_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openai_base: default_openai_base(),
            serpapi_base: default_serpapi_base(),
            mirror_base: default_mirror_base(),
            wikipedia_base: default_wikipedia_base(),
        }
    }
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_serpapi_base() -> String {
    "https://serpapi.com".to_string()
}

fn default_mirror_base() -> String {
    "https://sci-hub.se".to_string()
}

fn default_wikipedia_base() -> String {
    "https://en.wikipedia.org".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default)]
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            temperature: 0.0,
        }
    }
}

fn default_chat_model() -> String {
    "gpt-4-1106-preview".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory where fetched PDFs are written
    #[serde(default = "default_download_dir")]
    pub directory: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

/// Chunking and retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Chunk size in tokens
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Tokens shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Fragments retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Chunks sent per embedding request
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            embedding_batch_size: default_embedding_batch_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    200
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_top_k() -> usize {
    4
}

fn default_embedding_batch_size() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Upper bound on characters kept from a single page
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_page_chars: default_max_page_chars(),
        }
    }
}

fn default_max_page_chars() -> usize {
    20_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model round-trips an agent may spend on one task
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_max_iterations() -> usize {
    15
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(String),

    /// A required API credential is neither configured nor in the environment
    #[error("Missing credential: set {0}")]
    MissingCredential(&'static str),
}

impl Config {
    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env_source())
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Get the configuration from environment overrides and defaults only
pub fn get_config() -> Result<Config, ConfigError> {
    let settings = config::Config::builder().add_source(env_source()).build()?;
    Ok(settings.try_deserialize()?)
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

/// Find a configuration file in the default locations.
///
/// Looks for `./research-crew.toml`, then `<config dir>/research-crew/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("research-crew").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Resolve a credential: the configured value wins, otherwise the
/// environment variable is read now.
pub fn resolve_credential(
    configured: Option<&str>,
    env_var: &'static str,
) -> Result<String, ConfigError> {
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    std::env::var(env_var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(ConfigError::MissingCredential(env_var))
}
