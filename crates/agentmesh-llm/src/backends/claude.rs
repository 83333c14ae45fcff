use super::LlmBackend;
use crate::config::ModelConfig;
use crate::llm::LlmResponse;
use agentmesh_core::{MeshError, MeshResult, Message, Role, ToolCall, ToolSpec};
use async_trait::async_trait;
use serde::Serialize;

/// Claude (Anthropic Messages API) backend.
pub struct ClaudeBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl ClaudeBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ClaudeTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a serde_json::Value,
}

/// The Messages API requires alternating roles, so consecutive turns from the
/// same side are merged.
fn build_messages(messages: &[Message]) -> Vec<ClaudeMessage> {
    let mut out: Vec<ClaudeMessage> = Vec::with_capacity(messages.len());
    for m in messages {
        let role = match m.role {
            Role::System => continue,
            Role::User | Role::Tool => "user",
            Role::Assistant => "assistant",
        };
        match out.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(&m.content);
            }
            _ => out.push(ClaudeMessage {
                role,
                content: m.content.clone(),
            }),
        }
    }
    out
}

#[async_trait]
impl LlmBackend for ClaudeBackend {
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> MeshResult<LlmResponse> {
        let url = format!("{}/v1/messages", self.config.base_url());

        let mut body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": build_messages(messages),
        });

        if let Some(sys) = system_prompt {
            body["system"] = serde_json::json!(sys);
        }

        if !tools.is_empty() {
            let claude_tools: Vec<ClaudeTool<'_>> = tools
                .iter()
                .map(|t| ClaudeTool {
                    name: &t.name,
                    description: &t.description,
                    input_schema: &t.parameters_schema,
                })
                .collect();
            body["tools"] = serde_json::to_value(&claude_tools)?;
        }

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
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
                "Claude API error {status}: {resp_body}"
            )));
        }

        parse_claude_response(&resp_body)
    }
}

/// Parses a Messages API response body.
pub fn parse_claude_response(body: &serde_json::Value) -> MeshResult<LlmResponse> {
    let content = body["content"]
        .as_array()
        .ok_or_else(|| MeshError::Http("Missing content in Claude response".into()))?;

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in content {
        match block["type"].as_str() {
            Some("text") => {
                if let Some(t) = block["text"].as_str() {
                    text_parts.push(t.to_string());
                }
            }
            Some("tool_use") => tool_calls.push(ToolCall {
                id: block["id"].as_str().unwrap_or_default().to_string(),
                name: block["name"].as_str().unwrap_or_default().to_string(),
                arguments: block["input"].clone(),
            }),
            _ => {}
        }
    }

    let text = text_parts.join("\n");
    if !tool_calls.is_empty() {
        return Ok(LlmResponse::ToolUse {
            content: (!text.is_empty()).then_some(text),
            tool_calls,
        });
    }

    match body["stop_reason"].as_str().unwrap_or("end_turn") {
        "end_turn" | "stop_sequence" => Ok(LlmResponse::Done(text)),
        _ => Ok(LlmResponse::Text(text)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_user_turns_are_merged() {
        let msgs = vec![
            Message::user("task"),
            Message::new(Role::Tool, "{\"content\":\"a\"}"),
            Message::assistant("thinking"),
        ];
        let built = build_messages(&msgs);
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].role, "user");
        assert!(built[0].content.contains("task"));
        assert!(built[0].content.contains("\"a\""));
    }

    #[test]
    fn test_system_messages_are_dropped() {
        let msgs = vec![Message::system("rules"), Message::user("hi")];
        let built = build_messages(&msgs);
        assert_eq!(built.len(), 1);
    }

    #[test]
    fn test_parse_tool_use_block() {
        let body = serde_json::json!({
            "content": [
                {"type": "text", "text": "Let me look."},
                {"type": "tool_use", "id": "tu_1", "name": "fetch", "input": {"url": "x"}}
            ],
            "stop_reason": "tool_use"
        });
        match parse_claude_response(&body).unwrap() {
            LlmResponse::ToolUse {
                content,
                tool_calls,
            } => {
                assert_eq!(content.as_deref(), Some("Let me look."));
                assert_eq!(tool_calls[0].id, "tu_1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
