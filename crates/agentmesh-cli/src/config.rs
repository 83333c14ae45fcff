//! `agentmesh.toml` loading.

use agentmesh_core::{MeshError, MeshResult};
use agentmesh_llm::ModelConfig;
use agentmesh_orchestrator::{OrchestratorSettings, ProviderConfigMap};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct MeshConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    #[serde(default)]
    pub providers: ProviderConfigMap,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

impl MeshConfig {
    /// Parses a config document and resolves `env:` API keys.
    pub fn parse(content: &str) -> MeshResult<Self> {
        let mut config: MeshConfig = toml::from_str(content)
            .map_err(|e| MeshError::Config(format!("Failed to parse config: {e}")))?;
        config.model = config.model.resolve_api_key()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> MeshResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            MeshError::Config(format!("Failed to read config '{}': {e}", path.display()))
        })?;
        Self::parse(&content)
    }
}
