use crate::backends::claude::ClaudeBackend;
use crate::backends::openai::OpenAiBackend;
use crate::backends::LlmBackend;
use crate::config::{LlmProvider, ModelConfig};
use agentmesh_core::{MeshResult, Message, ToolCall, ToolSpec};
use std::time::Instant;
use tracing::{debug, warn};

/// Response from the LLM: either text content or a tool call request.
#[derive(Debug)]
pub enum LlmResponse {
    /// Partial text; the model stopped for a reason other than completion.
    Text(String),
    /// The model wants one or more tools executed.
    ToolUse {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    /// Final answer.
    Done(String),
}

impl LlmResponse {
    /// Text carried by the response, ignoring any tool calls.
    pub fn into_text(self) -> String {
        match self {
            LlmResponse::Text(t) | LlmResponse::Done(t) => t,
            LlmResponse::ToolUse { content, .. } => content.unwrap_or_default(),
        }
    }
}

/// LLM client that dispatches to the backend matching the configured provider.
pub struct LlmClient {
    backend: Box<dyn LlmBackend>,
    max_turns: u32,
}

impl LlmClient {
    pub fn new(config: ModelConfig) -> Self {
        let max_turns = config.max_turns;
        let backend: Box<dyn LlmBackend> = match config.provider {
            LlmProvider::Claude => Box::new(ClaudeBackend::new(config)),
            LlmProvider::OpenAi | LlmProvider::OpenRouter | LlmProvider::Groq => {
                Box::new(OpenAiBackend::new(config))
            }
        };
        Self { backend, max_turns }
    }

    /// Create from a pre-built backend (custom providers, tests).
    pub fn from_backend(backend: Box<dyn LlmBackend>, max_turns: u32) -> Self {
        Self { backend, max_turns }
    }

    /// Turn budget for tool-use loops driven by this client.
    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Non-streaming chat completion.
    pub async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> MeshResult<LlmResponse> {
        let start = Instant::now();
        let result = self.backend.chat(system_prompt, messages, tools).await;
        match &result {
            Ok(_) => debug!(
                messages = messages.len(),
                tools = tools.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "LLM chat completed"
            ),
            Err(e) => warn!(error = %e, "LLM chat failed"),
        }
        result
    }

    /// Single-turn completion without tools, returning the text.
    pub async fn complete(&self, system_prompt: &str, prompt: &str) -> MeshResult<String> {
        let messages = [Message::user(prompt)];
        let response = self.chat(Some(system_prompt), &messages, &[]).await?;
        Ok(response.into_text())
    }
}
