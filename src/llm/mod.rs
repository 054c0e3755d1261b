//! Language model boundary.
//!
//! The [`LanguageModel`] trait is the seam between the research pipeline and
//! a chat-completion provider. It supports plain prompts (summaries) and
//! function calling (agents).

pub mod openai;
pub mod summarizer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConfigError;

pub use openai::OpenAIChat;
pub use summarizer::Summarizer;

/// Errors from a language model call
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Missing credentials or other configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The model returned neither text nor tool calls
    #[error("Empty response from model")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// A function the model may call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: Value,
}

/// One message of a chat transcript
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// What the model answered: text, tool calls, or both
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait LanguageModel: Send + Sync + std::fmt::Debug {
    /// Run one chat completion. `tools` may be empty.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion, LlmError>;

    /// Single-prompt convenience: the model's text answer.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(&[ChatMessage::user(prompt)], &[])
            .await?
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str;
}
