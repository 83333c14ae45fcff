pub mod claude;
pub mod openai;

use crate::llm::LlmResponse;
use agentmesh_core::{MeshResult, Message, ToolSpec};
use async_trait::async_trait;

/// Trait for LLM provider backends.
///
/// Each API family implements this to translate the provider-neutral
/// conversation into its wire format.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Non-streaming chat completion.
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> MeshResult<LlmResponse>;
}
