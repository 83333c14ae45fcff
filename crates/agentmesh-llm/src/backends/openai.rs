use super::LlmBackend;
use crate::config::{LlmProvider, ModelConfig};
use crate::llm::LlmResponse;
use agentmesh_core::{MeshError, MeshResult, Message, Role, ToolCall, ToolSpec};
use async_trait::async_trait;

/// OpenAI-compatible chat completions backend.
///
/// Serves OpenAI, OpenRouter, Groq and any other endpoint that speaks the
/// `/v1/chat/completions` dialect.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_messages(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
    ) -> Vec<serde_json::Value> {
        let mut api_messages = Vec::with_capacity(messages.len() + 1);

        if let Some(sys) = system_prompt {
            api_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }

        for m in messages {
            let role = match m.role {
                Role::System => continue,
                Role::User | Role::Tool => "user",
                Role::Assistant => "assistant",
            };
            api_messages.push(serde_json::json!({
                "role": role,
                "content": m.content
            }));
        }

        api_messages
    }

    fn build_tools(&self, tools: &[ToolSpec]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters_schema,
                    }
                })
            })
            .collect()
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        if self.config.provider == LlmProvider::OpenRouter {
            request.header("X-Title", "agentmesh")
        } else {
            request
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> MeshResult<LlmResponse> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        let mut body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": self.build_messages(system_prompt, messages),
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(self.build_tools(tools));
        }

        let resp = self
            .add_provider_headers(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| MeshError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| MeshError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(MeshError::Http(format!(
                "OpenAI-compatible API error {status}: {resp_body}"
            )));
        }

        parse_openai_response(&resp_body)
    }
}

/// Parses a chat completions response body.
pub fn parse_openai_response(body: &serde_json::Value) -> MeshResult<LlmResponse> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| MeshError::Http("response has no choices".into()))?;
    let message = &choice["message"];
    let content = message["content"].as_str().unwrap_or_default().to_string();

    if let Some(tool_calls_json) = message["tool_calls"].as_array() {
        let tool_calls: Vec<ToolCall> = tool_calls_json
            .iter()
            .filter_map(|tc| {
                let id = tc["id"].as_str()?.to_string();
                let name = tc["function"]["name"].as_str()?.to_string();
                let arguments: serde_json::Value =
                    serde_json::from_str(tc["function"]["arguments"].as_str()?).unwrap_or_default();
                Some(ToolCall {
                    id,
                    name,
                    arguments,
                })
            })
            .collect();

        if !tool_calls.is_empty() {
            return Ok(LlmResponse::ToolUse {
                content: (!content.is_empty()).then_some(content),
                tool_calls,
            });
        }
    }

    match choice["finish_reason"].as_str().unwrap_or("stop") {
        "stop" => Ok(LlmResponse::Done(content)),
        _ => Ok(LlmResponse::Text(content)),
    }
}
