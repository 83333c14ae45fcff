//! Seam to the language-inference capability.

use agentmesh_core::{MeshError, MeshResult};
use agentmesh_llm::LlmClient;
use async_trait::async_trait;
use regex::Regex;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

/// Single-shot text completion. No retries at this layer.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> MeshResult<String>;
}

#[async_trait]
impl Reasoner for LlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> MeshResult<String> {
        LlmClient::complete(self, system, prompt).await
    }
}

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("static regex")
});

/// Pulls the JSON payload out of a model reply that may wrap it in a code
/// fence or surround it with prose.
pub fn extract_json(reply: &str) -> Option<&str> {
    if let Some(body) = FENCED_JSON.captures(reply).and_then(|c| c.get(1)) {
        return Some(body.as_str().trim());
    }

    let start = reply.find(['{', '['])?;
    let close = if reply[start..].starts_with('{') { '}' } else { ']' };
    let end = reply.rfind(close)?;
    (end > start).then(|| &reply[start..=end])
}

/// Runs a reasoning call under an optional time budget, mapping expiry
/// through `on_timeout`.
pub async fn bounded<T, F>(
    limit: Option<Duration>,
    call: F,
    on_timeout: impl FnOnce(Duration) -> MeshError,
) -> MeshResult<T>
where
    F: Future<Output = MeshResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(on_timeout(limit))),
        None => call.await,
    }
}
