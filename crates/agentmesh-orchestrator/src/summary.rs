//! Condenses a provider's tool catalog into a capability summary.

use crate::reasoning::Reasoner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on one summary call when none is configured.
pub const DEFAULT_SUMMARY_TIMEOUT: Duration = Duration::from_secs(30);

const SUMMARY_SYSTEM_PROMPT: &str = "You describe software components for a planning agent. \
Given the tool catalog of one component, write a short paragraph stating what the component \
can do and which kinds of requests it should receive. Mention each tool by name. \
Reply with the paragraph only.";

/// Turns a raw tool catalog into the summary stored on the descriptor.
pub struct CapabilitySummarizer {
    reasoner: Arc<dyn Reasoner>,
    timeout: Option<Duration>,
}

impl CapabilitySummarizer {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self {
            reasoner,
            timeout: Some(DEFAULT_SUMMARY_TIMEOUT),
        }
    }

    /// `None` lets a summary call run for as long as the model takes.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Never fails: any inference error, an empty reply, or running past the
    /// timeout falls back to the catalog text itself.
    pub async fn summarize(&self, provider: &str, catalog: &str) -> String {
        let prompt = format!("Component: {provider}\n\nTool catalog:\n{catalog}");
        let call = self.reasoner.complete(SUMMARY_SYSTEM_PROMPT, &prompt);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        provider = %provider,
                        timeout_secs = limit.as_secs(),
                        "Capability summary timed out; using tool catalog"
                    );
                    return catalog.to_string();
                }
            },
            None => call.await,
        };
        match outcome {
            Ok(summary) if !summary.trim().is_empty() => {
                debug!(provider = %provider, "Capability summary generated");
                summary.trim().to_string()
            }
            Ok(_) => {
                warn!(provider = %provider, "Empty capability summary; using tool catalog");
                catalog.to_string()
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "Capability summary failed; using tool catalog");
                catalog.to_string()
            }
        }
    }
}
