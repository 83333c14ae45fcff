use crate::advisor::ShapeAdvisor;
use crate::dispatcher::Dispatcher;
use crate::planner::PlanGenerator;
use crate::reasoning::{bounded, Reasoner};
use crate::registry::ProviderRegistry;
use crate::synthesizer::Synthesizer;
use agentmesh_core::{MeshError, MeshResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_invoke_timeout_secs() -> u64 {
    120
}
fn default_reasoning_timeout_secs() -> u64 {
    120
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

/// Time budgets and switches for one orchestrator instance.
///
/// A zero invoke or reasoning timeout disables that bound. The connect budget
/// and the per-request provider timeout are always enforced; zero falls back
/// to the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_invoke_timeout_secs")]
    pub invoke_timeout_secs: u64,
    #[serde(default = "default_reasoning_timeout_secs")]
    pub reasoning_timeout_secs: u64,
    /// Bound on each JSON-RPC request sent to a provider process.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Generate capability summaries with the language model on connect.
    #[serde(default = "default_true")]
    pub summarize_capabilities: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            invoke_timeout_secs: default_invoke_timeout_secs(),
            reasoning_timeout_secs: default_reasoning_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            summarize_capabilities: true,
        }
    }
}

impl OrchestratorSettings {
    pub fn connect_timeout(&self) -> Duration {
        match self.connect_timeout_secs {
            0 => Duration::from_secs(default_connect_timeout_secs()),
            secs => Duration::from_secs(secs),
        }
    }

    pub fn invoke_timeout(&self) -> Option<Duration> {
        (self.invoke_timeout_secs > 0).then(|| Duration::from_secs(self.invoke_timeout_secs))
    }

    pub fn reasoning_timeout(&self) -> Option<Duration> {
        (self.reasoning_timeout_secs > 0).then(|| Duration::from_secs(self.reasoning_timeout_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        match self.request_timeout_secs {
            0 => Duration::from_secs(default_request_timeout_secs()),
            secs => Duration::from_secs(secs),
        }
    }
}

/// Final answer for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    /// Number of plan steps executed.
    pub steps: usize,
    pub failed_steps: usize,
}

/// The orchestration engine.
/// Implements the plan → dispatch → synthesize pattern.
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    planner: PlanGenerator,
    advisor: ShapeAdvisor,
    dispatcher: Dispatcher,
    synthesizer: Synthesizer,
    reasoning_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        reasoner: Arc<dyn Reasoner>,
        settings: &OrchestratorSettings,
    ) -> Self {
        Self {
            planner: PlanGenerator::new(reasoner.clone()),
            advisor: ShapeAdvisor::new(reasoner.clone()),
            synthesizer: Synthesizer::new(reasoner),
            dispatcher: Dispatcher::new(registry.clone())
                .with_invoke_timeout(settings.invoke_timeout()),
            registry,
            reasoning_timeout: settings.reasoning_timeout(),
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Answers one question.
    ///
    /// Planning and output-shape advice run concurrently, then every plan
    /// step is dispatched at once, then the results are synthesized. Only
    /// planning, advisory and synthesis failures reach the caller; step
    /// failures are folded into the answer.
    pub async fn answer(&self, question: &str, context: &str) -> MeshResult<Answer> {
        let start = Instant::now();
        info!(question_len = question.len(), "Orchestrator: starting request");

        let capabilities = self.registry.description().await;
        let limit = self.reasoning_timeout;

        let (plan, shape) = tokio::join!(
            bounded(
                limit,
                self.planner.generate(question, context, &capabilities),
                |d| MeshError::PlanningFailed(format!("timed out after {}s", d.as_secs())),
            ),
            bounded(limit, self.advisor.advise(question, context), |d| {
                MeshError::AdvisoryFailed(format!("timed out after {}s", d.as_secs()))
            }),
        );
        let plan = plan.inspect_err(|e| warn!(error = %e, "Orchestrator: planning failed"))?;
        let shape = shape.inspect_err(|e| warn!(error = %e, "Orchestrator: advisory failed"))?;
        info!(
            steps = plan.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Orchestrator: plan ready"
        );

        let report = self.dispatcher.execute(plan).await;

        let text = bounded(
            limit,
            self.synthesizer.synthesize(question, &report, &shape),
            |d| MeshError::SynthesisFailed(format!("timed out after {}s", d.as_secs())),
        )
        .await
        .inspect_err(|e| warn!(error = %e, "Orchestrator: synthesis failed"))?;

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            steps = report.len(),
            failed = report.failed_count(),
            "Orchestrator: request complete"
        );

        Ok(Answer {
            text,
            steps: report.len(),
            failed_steps: report.failed_count(),
        })
    }
}
