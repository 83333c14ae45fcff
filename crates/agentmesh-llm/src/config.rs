use agentmesh_core::{MeshError, MeshResult};
use serde::{Deserialize, Serialize};

/// Which hosted API family a [`ModelConfig`] talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Messages API.
    Claude,
    /// OpenAI chat completions API.
    OpenAi,
    /// OpenRouter (OpenAI-compatible).
    OpenRouter,
    /// Groq cloud inference (OpenAI-compatible).
    Groq,
}

/// Model settings for the language-inference capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: LlmProvider,
    pub model_id: String,
    /// API key, or `env:VAR_NAME` to read it from the environment.
    pub api_key: String,
    pub api_base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Turn budget for tool-use loops.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_turns() -> u32 {
    8
}

impl ModelConfig {
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url
        } else {
            match self.provider {
                LlmProvider::Claude => "https://api.anthropic.com",
                LlmProvider::OpenAi => "https://api.openai.com",
                LlmProvider::OpenRouter => "https://openrouter.ai/api",
                LlmProvider::Groq => "https://api.groq.com/openai",
            }
        }
    }

    /// Replaces an `env:VAR` api key with the variable's value.
    pub fn resolve_api_key(mut self) -> MeshResult<Self> {
        if let Some(var) = self.api_key.strip_prefix("env:") {
            self.api_key = std::env::var(var).map_err(|_| {
                MeshError::Config(format!("environment variable '{var}' is not set"))
            })?;
        }
        Ok(self)
    }
}
