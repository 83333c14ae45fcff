use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Launch specification for one provider process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Provider name → launch specification. Iteration order is registration order.
pub type ProviderConfigMap = BTreeMap<String, ProviderConfig>;

/// Lifecycle of a registered provider name.
///
/// `Unregistered` is represented by absence from the registry. A name moves
/// `Connecting → Ready` on success and leaves the registry from either state
/// on failure, timeout or unload; it never goes from a failed connect to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderState {
    Connecting,
    Ready,
}

impl std::fmt::Display for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderState::Connecting => write!(f, "connecting"),
            ProviderState::Ready => write!(f, "ready"),
        }
    }
}

/// One atomic instruction to run against one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Advisory ordering metadata; does not constrain execution.
    pub sequence_id: u32,
    pub provider_name: String,
    pub input: String,
    #[serde(default)]
    pub context: String,
    /// Tool on the provider to call directly; empty lets the provider choose.
    #[serde(default)]
    pub target: String,
    /// Steps the planner believes this one depends on. Recorded, not scheduled.
    #[serde(default)]
    pub depends_on: Vec<u32>,
}

impl PlanStep {
    pub fn new(sequence_id: u32, provider_name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            sequence_id,
            provider_name: provider_name.into(),
            input: input.into(),
            context: String::new(),
            target: String::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// Ordered, immutable list of steps produced for one request.
///
/// Not `Clone`: a plan is handed to the dispatcher exactly once.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn into_steps(self) -> Vec<PlanStep> {
        self.steps
    }
}

/// Outcome of one executed step. `ok == false` payloads are error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub provider_name: String,
    pub payload: String,
    pub ok: bool,
}

impl StepResult {
    pub fn success(provider_name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            payload: payload.into(),
            ok: true,
        }
    }

    pub fn failure(provider_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            payload: error.into(),
            ok: false,
        }
    }
}

/// Step results positionally aligned with the plan they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    results: Vec<StepResult>,
}

impl ExecutionReport {
    pub fn new(results: Vec<StepResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.ok).count()
    }
}
