//! Turns a question into a [`Plan`] using the reasoning capability.

use crate::reasoning::{extract_json, Reasoner};
use crate::types::{Plan, PlanStep};
use agentmesh_core::{MeshError, MeshResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

const PLANNER_SYSTEM_PROMPT: &str = r#"You are the planning component of a multi-agent system.
You receive a user question, prior conversation context and a list of available components, each in a <provider name="..."> block.
Split the question into independent instructions, each addressed to exactly one listed component.
All instructions are executed at the same time, so each one must be answerable on its own.
Only use component names that appear in the list. If no component is useful, return an empty list.

Respond with JSON only, in this form:
{"steps": [{"sequence_id": 1, "provider_name": "<component>", "input": "<instruction>", "context": "<background the component needs>", "target": "<tool name, or empty>", "depends_on": []}]}"#;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPlan {
    Wrapped { steps: Vec<RawStep> },
    Bare(Vec<RawStep>),
}

#[derive(Deserialize)]
struct RawStep {
    #[serde(default)]
    sequence_id: Option<u32>,
    provider_name: String,
    input: String,
    #[serde(default)]
    context: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    depends_on: Vec<u32>,
}

/// Parses a planner reply. Steps without a `sequence_id` are numbered by
/// position, starting at 1.
pub fn parse_plan(reply: &str) -> MeshResult<Plan> {
    let json = extract_json(reply)
        .ok_or_else(|| MeshError::PlanningFailed("reply contains no JSON plan".into()))?;
    let raw: RawPlan = serde_json::from_str(json)
        .map_err(|e| MeshError::PlanningFailed(format!("malformed plan: {e}")))?;
    let raw_steps = match raw {
        RawPlan::Wrapped { steps } | RawPlan::Bare(steps) => steps,
    };

    let steps = raw_steps
        .into_iter()
        .enumerate()
        .map(|(i, raw)| PlanStep {
            sequence_id: raw.sequence_id.unwrap_or(i as u32 + 1),
            provider_name: raw.provider_name.trim().to_string(),
            input: raw.input,
            context: raw.context,
            target: raw.target,
            depends_on: raw.depends_on,
        })
        .collect();
    Ok(Plan::new(steps))
}

/// Plan generation over a [`Reasoner`]. One call, no retries.
pub struct PlanGenerator {
    reasoner: Arc<dyn Reasoner>,
}

impl PlanGenerator {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    pub async fn generate(
        &self,
        question: &str,
        context: &str,
        capabilities: &str,
    ) -> MeshResult<Plan> {
        let prompt = format!(
            "Available components:\n{capabilities}\n\nConversation context:\n{context}\n\nQuestion:\n{question}"
        );

        let reply = self
            .reasoner
            .complete(PLANNER_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| match e {
                MeshError::PlanningFailed(_) => e,
                other => MeshError::PlanningFailed(other.to_string()),
            })?;
        debug!(reply_len = reply.len(), "Planner reply received");

        let plan = parse_plan(&reply)?;
        info!(steps = plan.len(), "Plan generated");
        Ok(plan)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped_fenced_plan() {
        let reply = r#"```json
{"steps": [
  {"sequence_id": 1, "provider_name": "A", "input": "x"},
  {"sequence_id": 2, "provider_name": " B ", "input": "y", "target": "lookup", "depends_on": [1]}
]}
```"#;
        let plan = parse_plan(reply).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps()[0], PlanStep::new(1, "A", "x"));
        assert_eq!(plan.steps()[1].provider_name, "B");
        assert_eq!(plan.steps()[1].target, "lookup");
        assert_eq!(plan.steps()[1].depends_on, vec![1]);
    }

    #[test]
    fn test_parse_bare_array_numbers_steps() {
        let plan = parse_plan(r#"[{"provider_name":"A","input":"x"},{"provider_name":"A","input":"z"}]"#)
            .unwrap();
        let ids: Vec<u32> = plan.steps().iter().map(|s| s.sequence_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_empty_plan_is_valid() {
        assert!(parse_plan(r#"{"steps": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_unparseable_reply_is_planning_failed() {
        let err = parse_plan("I cannot help with that.").unwrap_err();
        assert_eq!(err.kind(), "planning_failed");

        let err = parse_plan(r#"{"steps": [{"input": "no provider"}]}"#).unwrap_err();
        assert!(err.to_string().starts_with("Planning failed: malformed plan"));
    }
}
