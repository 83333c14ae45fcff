//! Tool-use loop run on behalf of a provider.
//!
//! Prompt → LLM → tool calls → execute → backfill → repeat, until the model
//! answers or the turn budget runs out.

use agentmesh_core::{MeshError, MeshResult, Message, Role, ToolCall, ToolResult, ToolSpec};
use agentmesh_llm::{LlmClient, LlmResponse};
use agentmesh_mcp::McpClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Executes one tool call against whatever hosts the tools.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke_tool(&self, call: &ToolCall) -> MeshResult<ToolResult>;
}

#[async_trait]
impl ToolInvoker for McpClient {
    async fn invoke_tool(&self, call: &ToolCall) -> MeshResult<ToolResult> {
        let result = self.call_tool(&call.name, call.arguments.clone()).await?;
        let text = result.text();
        Ok(if result.is_error {
            ToolResult::error(&call.id, text)
        } else {
            ToolResult::success(&call.id, text)
        })
    }
}

const AGENT_SYSTEM_PROMPT: &str = "You are a tool-using agent serving one component of a larger system. \
Use the available tools to complete the task you are given. Call tools as many times as needed, \
then reply with the final result only, without asking follow-up questions.";

/// Drives the tool-use loop with a shared language-inference client.
#[derive(Clone)]
pub struct ToolAgent {
    llm: Arc<LlmClient>,
}

impl ToolAgent {
    pub fn new(llm: Arc<LlmClient>) -> Self {
        Self { llm }
    }

    /// Runs `task` to completion using `tools`. Errors are returned as-is;
    /// callers decide how to attribute them.
    pub async fn run(
        &self,
        label: &str,
        tools: &[ToolSpec],
        invoker: &dyn ToolInvoker,
        task: &str,
        context: &str,
    ) -> MeshResult<String> {
        let mut messages = Vec::new();
        if !context.trim().is_empty() {
            messages.push(Message::user(format!("Background:\n{}", context.trim())));
        }
        messages.push(Message::user(task));

        let max_turns = self.llm.max_turns();
        for turn in 0..max_turns {
            info!(provider = %label, turn, "Tool agent turn");

            let response = self
                .llm
                .chat(Some(AGENT_SYSTEM_PROMPT), &messages, tools)
                .await?;

            match response {
                LlmResponse::Done(text) => {
                    info!(provider = %label, turns = turn + 1, "Tool agent finished");
                    return Ok(text);
                }
                LlmResponse::Text(partial) => {
                    warn!(provider = %label, turns = turn + 1, "Model stopped before finishing");
                    return Err(MeshError::invoke(
                        label,
                        format!("model stopped before finishing; partial reply: {partial}"),
                    ));
                }
                LlmResponse::ToolUse {
                    content,
                    tool_calls,
                } => {
                    let note = content.unwrap_or_else(|| {
                        let names: Vec<&str> = tool_calls.iter().map(|c| c.name.as_str()).collect();
                        format!("Calling tools: {}", names.join(", "))
                    });
                    messages.push(Message::assistant(note));

                    for call in &tool_calls {
                        info!(provider = %label, tool = %call.name, call_id = %call.id, "Executing tool call");
                        let result = match invoker.invoke_tool(call).await {
                            Ok(result) => result,
                            Err(e) => {
                                warn!(provider = %label, tool = %call.name, error = %e, "Tool call failed");
                                ToolResult::error(&call.id, format!("Tool error: {e}"))
                            }
                        };
                        messages.push(Message::new(Role::Tool, result.to_backfill()));
                    }
                }
            }
        }

        warn!(provider = %label, max_turns, "Tool agent reached max turns");
        Err(MeshError::invoke(
            label,
            format!("tool loop exceeded maximum of {max_turns} turns"),
        ))
    }
}
