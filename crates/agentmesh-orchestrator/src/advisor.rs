//! Decides what shape the final answer should take.

use crate::reasoning::Reasoner;
use agentmesh_core::{MeshError, MeshResult};
use std::sync::Arc;
use tracing::debug;

const ADVISOR_SYSTEM_PROMPT: &str = "You decide the output format of an answer before it is written. \
Given a user question and its conversation context, describe in one or two sentences how the answer \
should be structured: prose, bullet list, table, code block, JSON, and roughly how long. \
Reply with the description only.";

/// Used when the model answers with nothing.
pub const DEFAULT_SHAPE: &str = "Plain text, a few concise paragraphs.";

/// Output-shape advice over a [`Reasoner`]. One call, no retries.
pub struct ShapeAdvisor {
    reasoner: Arc<dyn Reasoner>,
}

impl ShapeAdvisor {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    pub async fn advise(&self, question: &str, context: &str) -> MeshResult<String> {
        let prompt = format!("Conversation context:\n{context}\n\nQuestion:\n{question}");
        let reply = self
            .reasoner
            .complete(ADVISOR_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| match e {
                MeshError::AdvisoryFailed(_) => e,
                other => MeshError::AdvisoryFailed(other.to_string()),
            })?;

        let shape = reply.trim();
        if shape.is_empty() {
            debug!("Advisor returned nothing; using default shape");
            return Ok(DEFAULT_SHAPE.to_string());
        }
        Ok(shape.to_string())
    }
}
