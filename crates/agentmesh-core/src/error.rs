use thiserror::Error;

/// A convenience `Result` alias using [`MeshError`].
pub type MeshResult<T> = Result<T, MeshError>;

/// Top-level error type for agentmesh.
///
/// Provider-local variants (`ConnectTimeout`, `ConnectFailed`,
/// `ProviderNotRegistered`, `InvokeFailed`) are absorbed by the registry and
/// dispatcher. `PlanningFailed`, `AdvisoryFailed` and `SynthesisFailed` are
/// terminal for the request that raised them.
#[derive(Error, Debug)]
pub enum MeshError {
    /// A provider did not finish its connect handshake within the budget.
    #[error("Provider '{provider}' timed out after {timeout_secs}s while connecting")]
    ConnectTimeout {
        /// Name of the provider being connected.
        provider: String,
        /// The connect budget that expired.
        timeout_secs: u64,
    },

    /// A provider failed to connect (spawn, handshake or enumeration error).
    #[error("Provider '{provider}' failed to connect: {reason}")]
    ConnectFailed {
        /// Name of the provider being connected.
        provider: String,
        /// Human-readable failure description.
        reason: String,
    },

    /// A plan step referenced a provider that is not registered.
    #[error("Provider '{0}' is not registered")]
    ProviderNotRegistered(String),

    /// A single provider invocation failed.
    #[error("Provider '{provider}' invocation failed: {reason}")]
    InvokeFailed {
        /// Name of the invoked provider.
        provider: String,
        /// Human-readable failure description.
        reason: String,
    },

    /// The plan generator could not produce a plan.
    #[error("Planning failed: {0}")]
    PlanningFailed(String),

    /// The output-shape advisor could not produce a shape.
    #[error("Output-shape advisory failed: {0}")]
    AdvisoryFailed(String),

    /// The synthesizer could not produce a final answer.
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// A stdio/JSON-RPC transport error talking to a provider process.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An error from an outbound HTTP request (e.g. LLM API call).
    #[error("HTTP error: {0}")]
    Http(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from the HTTP gateway layer.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MeshError {
    /// Stable snake_case identifier for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            MeshError::ConnectTimeout { .. } => "connect_timeout",
            MeshError::ConnectFailed { .. } => "connect_failed",
            MeshError::ProviderNotRegistered(_) => "provider_not_registered",
            MeshError::InvokeFailed { .. } => "invoke_failed",
            MeshError::PlanningFailed(_) => "planning_failed",
            MeshError::AdvisoryFailed(_) => "advisory_failed",
            MeshError::SynthesisFailed(_) => "synthesis_failed",
            MeshError::Transport(_) => "transport",
            MeshError::Http(_) => "http",
            MeshError::Config(_) => "config",
            MeshError::Gateway(_) => "gateway",
            MeshError::Json(_) => "json",
            MeshError::Io(_) => "io",
        }
    }

    /// Whether the error is fatal to the request that produced it.
    ///
    /// Provider-scoped failures are recorded per step instead.
    pub fn is_request_fatal(&self) -> bool {
        matches!(
            self,
            MeshError::PlanningFailed(_)
                | MeshError::AdvisoryFailed(_)
                | MeshError::SynthesisFailed(_)
        )
    }

    /// Shorthand for an [`MeshError::InvokeFailed`].
    pub fn invoke(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        MeshError::InvokeFailed {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}
