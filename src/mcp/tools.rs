//! Tool registry shared by the MCP server and the agent executor.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::llm::ToolSpec;
use crate::research::{
    read_papers, search_and_save, PaperPipeline, ResearchContext, ResearchError, SAVED_MESSAGE,
};
use crate::sources::{GoogleScholarSource, SourceError, WikipediaSource};

pub const SEARCH_TOOL: &str = "search_in_google_scholar";
pub const READ_TOOL: &str = "read_papers";
pub const WIKIPEDIA_TOOL: &str = "wikipedia";

/// A tool that can be called by an MCP client or an agent
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "read_papers")
    pub name: String,

    /// Natural-language contract shown to the caller
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

impl Tool {
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
        }
    }
}

/// Why a tool call failed
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Failure the caller can recover from (reported back as text)
    #[error("{0}")]
    Failed(String),

    /// The run cannot continue
    #[error(transparent)]
    Fatal(ResearchError),
}

impl ToolError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolError::Fatal(_))
    }
}

impl From<ResearchError> for ToolError {
    fn from(err: ResearchError) -> Self {
        if err.is_fatal() {
            ToolError::Fatal(err)
        } else {
            ToolError::Failed(err.to_string())
        }
    }
}

impl From<SourceError> for ToolError {
    fn from(err: SourceError) -> Self {
        ResearchError::from(err).into()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, ctx: &mut ResearchContext, args: Value) -> Result<Value, ToolError>;
}

fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{}' parameter", name)))
}

/// Searches Google Scholar and saves the results into the research context
#[derive(Debug)]
pub struct SearchScholarHandler {
    pub source: Arc<GoogleScholarSource>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchScholarHandler {
    async fn execute(&self, ctx: &mut ResearchContext, args: Value) -> Result<Value, ToolError> {
        let query = required_str(&args, "query")?;
        search_and_save(ctx, &self.source, query).await?;
        Ok(Value::String(SAVED_MESSAGE.to_string()))
    }
}

/// Answers a question from every saved paper
#[derive(Debug)]
pub struct ReadPapersHandler {
    pub pipeline: Arc<PaperPipeline>,
}

#[async_trait::async_trait]
impl ToolHandler for ReadPapersHandler {
    async fn execute(&self, ctx: &mut ResearchContext, args: Value) -> Result<Value, ToolError> {
        let question = required_str(&args, "question")?;
        let answer = read_papers(ctx, &self.pipeline, question).await?;
        Ok(Value::String(answer))
    }
}

/// General background lookups
#[derive(Debug)]
pub struct WikipediaHandler {
    pub source: Arc<WikipediaSource>,
}

#[async_trait::async_trait]
impl ToolHandler for WikipediaHandler {
    async fn execute(&self, _ctx: &mut ResearchContext, args: Value) -> Result<Value, ToolError> {
        let query = required_str(&args, "query")?;
        let answer = self.source.lookup(query).await?;
        Ok(Value::String(answer))
    }
}

/// Registry for all tools
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three research tools
    pub fn research_tools(
        scholar: Arc<GoogleScholarSource>,
        wikipedia: Arc<WikipediaSource>,
        pipeline: Arc<PaperPipeline>,
    ) -> Self {
        let mut registry = Self::new();

        registry.register(Tool {
            name: SEARCH_TOOL.to_string(),
            description: "Useful to search papers over Google Scholar and save them into \
                          global context. Always write queries in English!"
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query for Google Scholar, in English. \
                                        Could be rephrased to produce the best results."
                    }
                },
                "required": ["query"]
            }),
            handler: Arc::new(SearchScholarHandler { source: scholar }),
        });

        registry.register(Tool {
            name: READ_TOOL.to_string(),
            description: "Read papers that were found and saved by the investigator to find \
                          parts that are relevant to the question. Always write questions in \
                          English!"
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "A question that should be answered over the saved papers"
                    }
                },
                "required": ["question"]
            }),
            handler: Arc::new(ReadPapersHandler { pipeline }),
        });

        registry.register(Tool {
            name: WIKIPEDIA_TOOL.to_string(),
            description: "A wrapper around Wikipedia. Useful for when you need to answer \
                          general questions about people, places, companies, facts, \
                          historical events, or other subjects. Input should be a search query."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query for Wikipedia"
                    }
                },
                "required": ["query"]
            }),
            handler: Arc::new(WikipediaHandler { source: wikipedia }),
        });

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// All tools, sorted by name
    pub fn all(&self) -> Vec<&Tool> {
        let mut tools: Vec<&Tool> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function specs for the named tools; unknown names are skipped
    pub fn specs_for(&self, names: &[String]) -> Vec<ToolSpec> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .map(Tool::spec)
            .collect()
    }

    /// Execute a tool by name
    pub async fn execute(
        &self,
        name: &str,
        ctx: &mut ResearchContext,
        args: Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tracing::debug!("Executing tool {} with {}", name, args);
        tool.handler.execute(ctx, args).await
    }
}
