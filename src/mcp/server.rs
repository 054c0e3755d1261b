//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! Exposes the research tools over stdio. All calls share one
//! [`ResearchContext`], so papers saved by one call are read by the next.

use crate::mcp::tools::ToolRegistry;
use crate::research::ResearchContext;
use async_trait::async_trait;
use pmcp::{Error, RequestHandlerExtra, Server, ServerCapabilities, ToolHandler, ToolInfo};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The MCP server for the research tools
pub struct McpServer {
    server: Server,
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer").finish_non_exhaustive()
    }
}

impl McpServer {
    /// Create a new MCP server over `tools`, sharing `context` between calls
    pub fn new(
        tools: &ToolRegistry,
        context: Arc<Mutex<ResearchContext>>,
    ) -> Result<Self, pmcp::Error> {
        let mut builder = Server::builder()
            .name("research-crew")
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for tool in tools.all() {
            let wrapper = ToolWrapper {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.input_schema.clone(),
                handler: tool.handler.clone(),
                context: context.clone(),
            };
            builder = builder.tool(wrapper.name.clone(), wrapper);
        }

        Ok(Self {
            server: builder.build()?,
        })
    }

    /// Run the server in stdio mode
    pub async fn run(self) -> Result<(), pmcp::Error> {
        tracing::info!("Starting MCP server in stdio mode");
        self.server.run_stdio().await
    }
}

/// Adapts a registry tool to pmcp's ToolHandler
#[derive(Clone)]
struct ToolWrapper {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: Arc<dyn crate::mcp::tools::ToolHandler>,
    context: Arc<Mutex<ResearchContext>>,
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        let mut context = self.context.lock().await;
        self.handler
            .execute(&mut *context, args)
            .await
            .map_err(|e| Error::internal(&e.to_string()))
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        ))
    }
}
