//! Fakes shared by the orchestrator integration tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use agentmesh_core::{CapabilityDescriptor, MeshError, MeshResult};
use agentmesh_orchestrator::{
    Connected, Connector, Provider, ProviderConfig, ProviderConfigMap, Reasoner,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// How a fake provider behaves on connect and invoke.
#[derive(Clone)]
pub enum Behavior {
    /// Connects at once and answers every input with the text.
    Answer(String),
    /// Connects at once; every invoke fails with the reason.
    Error(String),
    /// Connects at once; every invoke sleeps, then answers.
    Delayed(Duration, String),
    /// Connects at once; every invoke panics.
    Panic,
    /// Takes the given time to connect, then answers with the text.
    SlowConnect(Duration, String),
    /// Never finishes connecting.
    HangOnConnect,
    /// Connect fails immediately.
    FailConnect(String),
}

pub struct FakeProvider {
    behavior: Behavior,
    disconnects: Arc<AtomicUsize>,
}

#[async_trait]
impl Provider for FakeProvider {
    async fn invoke(&self, input: &str, _target: &str, _context: &str) -> MeshResult<String> {
        match &self.behavior {
            Behavior::Answer(text) | Behavior::SlowConnect(_, text) => Ok(text.clone()),
            Behavior::Error(reason) => Err(MeshError::invoke("fake", reason.clone())),
            Behavior::Delayed(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(format!("{text}:{input}"))
            }
            Behavior::Panic => panic!("provider exploded"),
            Behavior::HangOnConnect | Behavior::FailConnect(_) => {
                unreachable!("never connected")
            }
        }
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Increments a counter when dropped.
struct DropGuard(Arc<AtomicUsize>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector whose providers behave as scripted per name.
#[derive(Default)]
pub struct FakeConnector {
    behaviors: HashMap<String, Behavior>,
    /// Disconnect calls, summed over every provider.
    pub disconnects: Arc<AtomicUsize>,
    /// Abandoned connect attempts that were dropped.
    pub abandoned: Arc<AtomicUsize>,
    pub connect_calls: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(name.to_string(), behavior);
        self
    }

    /// A config map with one entry per scripted provider.
    pub fn configs(&self) -> ProviderConfigMap {
        self.behaviors
            .keys()
            .map(|name| (name.clone(), config_for(name)))
            .collect()
    }
}

pub fn config_for(name: &str) -> ProviderConfig {
    ProviderConfig {
        command: format!("fake-{name}"),
        args: vec![],
        env: HashMap::new(),
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, name: &str, _config: &ProviderConfig) -> MeshResult<Connected> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .behaviors
            .get(name)
            .cloned()
            .ok_or_else(|| MeshError::Config(format!("no behavior for {name}")))?;

        match &behavior {
            Behavior::HangOnConnect => {
                let _guard = DropGuard(self.abandoned.clone());
                std::future::pending::<()>().await;
                unreachable!()
            }
            Behavior::FailConnect(reason) => {
                return Err(MeshError::Transport(reason.clone()));
            }
            Behavior::SlowConnect(delay, _) => tokio::time::sleep(*delay).await,
            _ => {}
        }

        Ok(Connected {
            provider: Arc::new(FakeProvider {
                behavior,
                disconnects: self.disconnects.clone(),
            }),
            descriptor: CapabilityDescriptor::new(name, format!("{name} capability summary")),
        })
    }
}

// ---------------------------------------------------------------------------
// Reasoning
// ---------------------------------------------------------------------------

/// Scripted reply for one reasoning role.
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    Hang,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

/// Which prompt a call belongs to, recognised from its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Plan,
    Shape,
    Synthesis,
}

fn role_of(system: &str) -> Role {
    if system.contains("\"steps\"") {
        Role::Plan
    } else if system.contains("output format") {
        Role::Shape
    } else if system.contains("final answer") {
        Role::Synthesis
    } else {
        panic!("unrecognised system prompt: {system}")
    }
}

pub struct ScriptedReasoner {
    plan: Reply,
    shape: Reply,
    synthesis: Reply,
    /// When set, planning and advisory both wait here before replying.
    rendezvous: Option<Barrier>,
    pub calls: Mutex<Vec<(Role, String)>>,
}

impl ScriptedReasoner {
    pub fn new(plan: Reply, shape: Reply, synthesis: Reply) -> Self {
        Self {
            plan,
            shape,
            synthesis,
            rendezvous: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Planning and advisory only complete if they run at the same time.
    pub fn with_rendezvous(mut self) -> Self {
        self.rendezvous = Some(Barrier::new(2));
        self
    }

    pub fn prompt_for(&self, role: Role) -> Option<String> {
        self.calls
            .lock()
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn complete(&self, system: &str, prompt: &str) -> MeshResult<String> {
        let role = role_of(system);
        self.calls.lock().push((role, prompt.to_string()));

        if let (Some(barrier), Role::Plan | Role::Shape) = (&self.rendezvous, role) {
            barrier.wait().await;
        }

        let reply = match role {
            Role::Plan => &self.plan,
            Role::Shape => &self.shape,
            Role::Synthesis => &self.synthesis,
        };
        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(reason) => Err(MeshError::Http(reason.clone())),
            Reply::Hang => std::future::pending().await,
        }
    }
}
