//! Registry of connected providers and the aggregate capability description.

use crate::provider::{connect_with_budget, Connector, Provider};
use crate::types::{ProviderConfigMap, ProviderState};
use agentmesh_core::{CapabilityDescriptor, MeshError, MeshResult};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Default connect budget per provider.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

struct RegisteredProvider {
    descriptor: CapabilityDescriptor,
    provider: Arc<dyn Provider>,
}

#[derive(Default)]
struct RegistryState {
    /// Ready providers in registration order.
    entries: Vec<RegisteredProvider>,
    description: String,
}

/// Point-in-time view of one provider's lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub state: ProviderState,
    pub connected_at: Option<DateTime<Utc>>,
}

/// Outcome of a [`ProviderRegistry::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Providers that reached `Ready`, in registration order.
    pub ready: Vec<String>,
    /// One connect error per provider that did not.
    pub failures: Vec<MeshError>,
}

/// Owns every provider connection.
///
/// `load` and `unload` hold the write half of one lock for their whole
/// duration, so they never interleave; lookups share the read half.
pub struct ProviderRegistry {
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
    state: RwLock<RegistryState>,
    /// Lifecycle per name, readable while a load holds the state lock.
    lifecycle: parking_lot::Mutex<BTreeMap<String, ProviderStatus>>,
}

impl ProviderRegistry {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            state: RwLock::new(RegistryState::default()),
            lifecycle: parking_lot::Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Replaces every provider with the given configuration.
    ///
    /// Existing providers are disconnected first. Each entry is then connected
    /// concurrently and independently; a failure or timeout only excludes
    /// that entry.
    pub async fn load(&self, configs: &ProviderConfigMap) -> LoadReport {
        let mut state = self.state.write().await;
        self.unload_locked(&mut state).await;

        info!(providers = configs.len(), "Loading providers");

        {
            let mut lifecycle = self.lifecycle.lock();
            for name in configs.keys() {
                lifecycle.insert(
                    name.clone(),
                    ProviderStatus {
                        name: name.clone(),
                        state: ProviderState::Connecting,
                        connected_at: None,
                    },
                );
            }
        }

        let connector = self.connector.as_ref();
        let budget = self.connect_timeout;
        let attempts = configs.iter().map(|(name, config)| async move {
            let outcome = match connect_with_budget(connector, name, config, budget).await {
                Ok(mut connected) => {
                    let raw = std::mem::take(&mut connected.descriptor.capability_summary);
                    connected.descriptor.capability_summary = connector.describe(name, raw).await;
                    Ok(connected)
                }
                Err(e) => Err(e),
            };
            (name, outcome)
        });
        let outcomes = join_all(attempts).await;

        let mut report = LoadReport::default();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(connected) => {
                    let connected_at = Utc::now();
                    self.lifecycle.lock().insert(
                        name.clone(),
                        ProviderStatus {
                            name: name.clone(),
                            state: ProviderState::Ready,
                            connected_at: Some(connected_at),
                        },
                    );
                    state.entries.push(RegisteredProvider {
                        descriptor: connected.descriptor,
                        provider: connected.provider,
                    });
                    report.ready.push(name.clone());
                }
                Err(e) => {
                    self.lifecycle.lock().remove(name);
                    report.failures.push(e);
                }
            }
        }

        state.description = render_description(&state.entries);

        info!(
            ready = report.ready.len(),
            failed = report.failures.len(),
            "Providers loaded"
        );
        report
    }

    /// Disconnects every provider and clears the description. Idempotent.
    pub async fn unload(&self) {
        let mut state = self.state.write().await;
        self.unload_locked(&mut state).await;
    }

    async fn unload_locked(&self, state: &mut RegistryState) {
        let entries = std::mem::take(&mut state.entries);
        state.description.clear();
        self.lifecycle.lock().clear();

        if entries.is_empty() {
            return;
        }

        info!(providers = entries.len(), "Unloading providers");
        join_all(entries.iter().map(|entry| async move {
            entry.provider.disconnect().await;
            info!(provider = %entry.descriptor.name, "Provider disconnected");
        }))
        .await;
    }

    /// Looks up a ready provider.
    pub async fn get(&self, name: &str) -> MeshResult<Arc<dyn Provider>> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .find(|e| e.descriptor.name == name)
            .map(|e| e.provider.clone())
            .ok_or_else(|| MeshError::ProviderNotRegistered(name.to_string()))
    }

    /// Names of the providers currently ready.
    pub async fn ready_names(&self) -> BTreeSet<String> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .map(|e| e.descriptor.name.clone())
            .collect()
    }

    /// Tagged capability blocks of every ready provider, in registration order.
    pub async fn description(&self) -> String {
        self.state.read().await.description.clone()
    }

    pub async fn descriptors(&self) -> Vec<CapabilityDescriptor> {
        let state = self.state.read().await;
        state.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Lifecycle snapshot; does not wait for an in-progress load.
    pub fn statuses(&self) -> Vec<ProviderStatus> {
        self.lifecycle.lock().values().cloned().collect()
    }
}

fn render_description(entries: &[RegisteredProvider]) -> String {
    if entries.is_empty() {
        warn!("No providers are ready; planning will see an empty capability description");
    }
    entries.iter().map(|e| e.descriptor.to_block()).collect()
}
