//! Folds step results into the final answer.

use crate::reasoning::Reasoner;
use crate::types::ExecutionReport;
use agentmesh_core::{MeshError, MeshResult};
use std::fmt::Write;
use std::sync::Arc;

const SYNTHESIZER_SYSTEM_PROMPT: &str = "You write the final answer to a user question. \
You receive the results collected from several components; some of them may have failed. \
Use the successful results, mention briefly what could not be retrieved when it matters, \
and follow the requested answer structure. Reply with the final answer only.";

/// Renders a report as numbered, tagged result blocks.
pub fn render_report(report: &ExecutionReport) -> String {
    if report.is_empty() {
        return "No components were consulted.\n".to_string();
    }
    let mut out = String::new();
    for (i, result) in report.results().iter().enumerate() {
        let status = if result.ok { "ok" } else { "failed" };
        let _ = writeln!(
            out,
            "<result index=\"{}\" provider=\"{}\" status=\"{status}\">\n{}\n</result>",
            i + 1,
            result.provider_name,
            result.payload.trim()
        );
    }
    out
}

/// Synthesis over a [`Reasoner`]. One call, no fallback.
pub struct Synthesizer {
    reasoner: Arc<dyn Reasoner>,
}

impl Synthesizer {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    pub async fn synthesize(
        &self,
        question: &str,
        report: &ExecutionReport,
        shape: &str,
    ) -> MeshResult<String> {
        let prompt = format!(
            "Question:\n{question}\n\nAnswer structure:\n{shape}\n\nCollected results:\n{}",
            render_report(report)
        );
        let reply = self
            .reasoner
            .complete(SYNTHESIZER_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| match e {
                MeshError::SynthesisFailed(_) => e,
                other => MeshError::SynthesisFailed(other.to_string()),
            })?;

        let answer = reply.trim();
        if answer.is_empty() {
            return Err(MeshError::SynthesisFailed("empty answer".into()));
        }
        Ok(answer.to_string())
    }
}
