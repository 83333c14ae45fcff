//! Providers backed by MCP servers launched over stdio.

use crate::provider::{Connected, Connector, Provider};
use crate::summary::CapabilitySummarizer;
use crate::tool_agent::{ToolAgent, ToolInvoker};
use crate::types::ProviderConfig;
use agentmesh_core::{CapabilityDescriptor, MeshError, MeshResult, ToolCall, ToolSpec};
use agentmesh_mcp::{render_catalog, McpClient, McpToolDef, StdioLaunch};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Per-request timeout applied to every JSON-RPC call on a connection.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Launches MCP servers and wraps them as [`Provider`]s.
pub struct McpConnector {
    request_timeout: Duration,
    summarizer: Option<CapabilitySummarizer>,
    agent: Option<ToolAgent>,
}

impl McpConnector {
    pub fn new() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            summarizer: None,
            agent: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Capability summaries are generated with `summarizer` instead of using
    /// the raw catalog. Summarizing happens after the connect budget.
    pub fn with_summarizer(mut self, summarizer: CapabilitySummarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Multi-tool providers route untargeted steps through `agent`.
    pub fn with_agent(mut self, agent: ToolAgent) -> Self {
        self.agent = Some(agent);
        self
    }
}

impl Default for McpConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for McpConnector {
    async fn connect(&self, name: &str, config: &ProviderConfig) -> MeshResult<Connected> {
        let launch = StdioLaunch {
            command: config.command.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
        };

        let (client, tools) = McpClient::spawn(name, &launch, self.request_timeout)
            .await
            .map_err(|e| MeshError::ConnectFailed {
                provider: name.to_string(),
                reason: e.to_string(),
            })?;
        let client = Arc::new(client);

        let catalog = render_catalog(&tools);

        info!(provider = %name, tools = tools.len(), "MCP provider connected");

        let provider = McpProvider {
            client,
            tools,
            agent: self.agent.clone(),
        };
        Ok(Connected {
            provider: Arc::new(provider),
            descriptor: CapabilityDescriptor::new(name, catalog),
        })
    }

    async fn describe(&self, name: &str, catalog: String) -> String {
        match &self.summarizer {
            Some(summarizer) => summarizer.summarize(name, &catalog).await,
            None => catalog,
        }
    }
}

/// One MCP server acting as a tool-agent.
pub struct McpProvider {
    client: Arc<McpClient>,
    tools: Vec<McpToolDef>,
    agent: Option<ToolAgent>,
}

impl McpProvider {
    pub fn name(&self) -> &str {
        self.client.label()
    }

    /// The tool an invocation goes straight to, if any.
    fn direct_tool(&self, target: &str) -> Option<&McpToolDef> {
        let target = target.trim();
        if !target.is_empty() {
            if let Some(tool) = self.tools.iter().find(|t| t.name == target) {
                return Some(tool);
            }
        }
        match self.tools.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    async fn call_direct(&self, tool: &McpToolDef, input: &str) -> MeshResult<String> {
        let call = ToolCall {
            id: format!("{}-direct", tool.name),
            name: tool.name.clone(),
            arguments: tool_arguments(&tool.input_schema, input),
        };
        debug!(provider = %self.name(), tool = %tool.name, "Calling tool directly");

        let result = self
            .client
            .invoke_tool(&call)
            .await
            .map_err(|e| MeshError::invoke(self.name(), e.to_string()))?;
        if result.is_error {
            return Err(MeshError::invoke(self.name(), result.content));
        }
        Ok(result.content)
    }
}

#[async_trait]
impl Provider for McpProvider {
    async fn invoke(&self, input: &str, target: &str, context: &str) -> MeshResult<String> {
        if let Some(tool) = self.direct_tool(target) {
            return self.call_direct(tool, input).await;
        }

        let Some(agent) = &self.agent else {
            return Err(MeshError::invoke(
                self.name(),
                format!(
                    "no tool named '{target}' and no language model configured to choose among {} tools",
                    self.tools.len()
                ),
            ));
        };

        let specs: Vec<ToolSpec> = self.tools.iter().map(McpToolDef::to_spec).collect();
        agent
            .run(self.name(), &specs, self.client.as_ref(), input, context)
            .await
            .map_err(|e| match e {
                MeshError::InvokeFailed { .. } => e,
                other => MeshError::invoke(self.name(), other.to_string()),
            })
    }

    async fn disconnect(&self) {
        self.client.shutdown().await;
    }
}

/// Tool arguments for a plain-text step input.
///
/// A JSON object is passed through. Otherwise the text fills the schema's
/// only property, or an `input` field when there is not exactly one.
pub fn tool_arguments(schema: &serde_json::Value, input: &str) -> serde_json::Value {
    if let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str(input.trim()) {
        return value;
    }

    let key = schema["properties"]
        .as_object()
        .filter(|props| props.len() == 1)
        .and_then(|props| props.keys().next().cloned())
        .unwrap_or_else(|| "input".to_string());

    let mut args = serde_json::Map::new();
    args.insert(key, serde_json::Value::String(input.to_string()));
    serde_json::Value::Object(args)
}
