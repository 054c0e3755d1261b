//! MCP (Model Context Protocol) implementation and the tool registry.

pub mod server;
mod tools;

pub use server::McpServer;
pub use tools::{
    ReadPapersHandler, SearchScholarHandler, Tool, ToolError, ToolHandler, ToolRegistry,
    WikipediaHandler, READ_TOOL, SEARCH_TOOL, WIKIPEDIA_TOOL,
};
