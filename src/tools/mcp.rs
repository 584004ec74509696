//! MCP (Model Context Protocol) tool connector.
//!
//! Each configured server is spawned as a child process and spoken to over
//! stdio. Every tool it lists is wrapped as a [`Tool`] whose invocation is a
//! `tools/call` request on the same connection.

use crate::tools::catalog::ToolConnector;
use crate::tools::registry::Tool;
use crate::types::{AppError, Result};
use crate::utils::toml_config::{McpServerConfig, ToolSourceConfig};
use async_trait::async_trait;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use rmcp::ServiceExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

type McpSession = RunningService<RoleClient, ()>;

/// Connects to every `[mcp.servers.*]` entry of the configuration.
#[derive(Debug, Default, Clone)]
pub struct McpConnector;

impl McpConnector {
    pub fn new() -> Self {
        Self
    }

    async fn connect_server(&self, name: &str, server: &McpServerConfig) -> Result<Vec<Arc<dyn Tool>>> {
        let mut command = Command::new(&server.command);
        command.args(&server.args).envs(server.resolved_env());

        let transport = TokioChildProcess::new(command).map_err(|e| {
            AppError::Registry(format!("Failed to spawn MCP server '{}': {}", name, e))
        })?;

        let session: McpSession = ().serve(transport).await.map_err(|e| {
            AppError::Registry(format!("MCP handshake with '{}' failed: {}", name, e))
        })?;
        let session = Arc::new(session);

        let listed = session.list_all_tools().await.map_err(|e| {
            AppError::Registry(format!("Listing tools of '{}' failed: {}", name, e))
        })?;

        let mut tools: Vec<Arc<dyn Tool>> = Vec::with_capacity(listed.len());
        for tool in listed {
            // Read the listing through its wire form so optional fields stay optional.
            let wire = serde_json::to_value(&tool)
                .map_err(|e| AppError::Registry(format!("Unreadable tool listing: {}", e)))?;
            let Some(tool_name) = wire.get("name").and_then(Value::as_str) else {
                continue;
            };

            debug!(server = %name, tool = %tool_name, "Discovered MCP tool");
            tools.push(Arc::new(McpTool {
                name: tool_name.to_string(),
                description: wire
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                schema: wire
                    .get("inputSchema")
                    .cloned()
                    .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
                session: Arc::clone(&session),
            }));
        }

        info!(server = %name, count = tools.len(), "Connected to MCP server");
        Ok(tools)
    }
}

#[async_trait]
impl ToolConnector for McpConnector {
    async fn connect(&self, source: &ToolSourceConfig) -> Result<Vec<Arc<dyn Tool>>> {
        let mut tools = Vec::new();
        for (name, server) in &source.servers {
            tools.extend(self.connect_server(name, server).await?);
        }
        Ok(tools)
    }
}

/// A remote tool; the session stays alive as long as any of its tools does.
struct McpTool {
    name: String,
    description: String,
    schema: Value,
    session: Arc<McpSession>,
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let arguments = match args {
            Value::Object(map) => Value::Object(map),
            Value::Null => json!({}),
            other => {
                return Err(AppError::Tool(format!(
                    "Arguments for '{}' must be an object, got {}",
                    self.name, other
                )))
            }
        };

        let request: CallToolRequestParam =
            serde_json::from_value(json!({"name": self.name, "arguments": arguments}))
                .map_err(|e| AppError::Tool(format!("Invalid call to '{}': {}", self.name, e)))?;

        let result = self
            .session
            .call_tool(request)
            .await
            .map_err(|e| AppError::Tool(format!("'{}' failed: {}", self.name, e)))?;

        let wire = serde_json::to_value(&result)
            .map_err(|e| AppError::Tool(format!("Unreadable result from '{}': {}", self.name, e)))?;
        decode_call_result(&self.name, &wire)
    }
}

/// Turn a `tools/call` result into an observation value.
///
/// Structured content wins; otherwise text blocks are joined and parsed as
/// JSON when possible. Results flagged as errors become tool failures.
fn decode_call_result(tool: &str, wire: &Value) -> Result<Value> {
    let text: Vec<&str> = wire
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    let text = text.join("\n");

    if wire.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        return Err(AppError::Tool(if text.is_empty() {
            format!("'{}' reported an error", tool)
        } else {
            text
        }));
    }

    if let Some(structured) = wire.get("structuredContent").filter(|v| !v.is_null()) {
        return Ok(structured.clone());
    }

    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}
