//! Connection contract for one capability provider.

use crate::types::ProviderConfig;
use agentmesh_core::{CapabilityDescriptor, MeshError, MeshResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A connected, invocable provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// One request/response call into the provider. No retries.
    async fn invoke(&self, input: &str, target: &str, context: &str) -> MeshResult<String>;

    /// Releases every resource held by the connection. Idempotent.
    async fn disconnect(&self);
}

/// Result of a successful connect.
pub struct Connected {
    pub provider: Arc<dyn Provider>,
    pub descriptor: CapabilityDescriptor,
}

/// Establishes provider connections from launch specifications.
///
/// Implementations must release everything they acquired when the returned
/// future is dropped before completion; the registry drops it on timeout.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, name: &str, config: &ProviderConfig) -> MeshResult<Connected>;

    /// Rewrites the capability summary of a provider that is already
    /// connected. Runs outside the connect budget and cannot fail the load.
    async fn describe(&self, _name: &str, summary: String) -> String {
        summary
    }
}

/// Connects under a fixed time budget.
///
/// Expiry yields [`MeshError::ConnectTimeout`]; any other failure is reported
/// as [`MeshError::ConnectFailed`].
pub async fn connect_with_budget(
    connector: &dyn Connector,
    name: &str,
    config: &ProviderConfig,
    budget: Duration,
) -> MeshResult<Connected> {
    info!(provider = %name, command = %config.command, "Connecting provider");

    match tokio::time::timeout(budget, connector.connect(name, config)).await {
        Ok(Ok(connected)) => {
            info!(provider = %name, "Provider ready");
            Ok(connected)
        }
        Ok(Err(e)) => {
            warn!(provider = %name, error = %e, "Provider failed to connect");
            Err(match e {
                MeshError::ConnectFailed { .. } | MeshError::ConnectTimeout { .. } => e,
                other => MeshError::ConnectFailed {
                    provider: name.to_string(),
                    reason: other.to_string(),
                },
            })
        }
        Err(_) => {
            warn!(
                provider = %name,
                budget_secs = budget.as_secs(),
                "Provider connect timed out"
            );
            Err(MeshError::ConnectTimeout {
                provider: name.to_string(),
                timeout_secs: budget.as_secs(),
            })
        }
    }
}
