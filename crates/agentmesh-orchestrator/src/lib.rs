//! Orchestration engine for agentmesh.
//!
//! A question is answered in three phases:
//!
//! 1. **Plan**: [`PlanGenerator`] turns the question and the registry's
//!    capability description into a [`Plan`], while [`ShapeAdvisor`] decides
//!    the answer's shape concurrently.
//! 2. **Dispatch**: [`Dispatcher`] invokes every step at once and returns an
//!    [`ExecutionReport`] aligned with the plan. One step failing never
//!    affects another.
//! 3. **Synthesize**: [`Synthesizer`] folds the report into the final answer.
//!
//! Providers are owned by the [`ProviderRegistry`], which connects them through
//! a [`Connector`]; [`McpConnector`] launches MCP servers over stdio.

pub mod advisor;
pub mod dispatcher;
pub mod engine;
pub mod mcp_provider;
pub mod planner;
pub mod provider;
pub mod reasoning;
pub mod registry;
pub mod summary;
pub mod synthesizer;
pub mod tool_agent;
pub mod types;

pub use advisor::ShapeAdvisor;
pub use dispatcher::Dispatcher;
pub use engine::{Answer, Orchestrator, OrchestratorSettings};
pub use mcp_provider::{McpConnector, McpProvider};
pub use planner::PlanGenerator;
pub use provider::{Connected, Connector, Provider};
pub use reasoning::Reasoner;
pub use registry::{LoadReport, ProviderRegistry, ProviderStatus};
pub use summary::CapabilitySummarizer;
pub use synthesizer::Synthesizer;
pub use tool_agent::{ToolAgent, ToolInvoker};
pub use types::{
    ExecutionReport, Plan, PlanStep, ProviderConfig, ProviderConfigMap, ProviderState, StepResult,
};
