#![allow(clippy::unwrap_used, clippy::expect_used)]

use agentmesh_core::{CapabilityDescriptor, MeshError, MeshResult};
use agentmesh_gateway::{GatewayServer, ThreadMemory};
use agentmesh_orchestrator::{
    Connected, Connector, Orchestrator, OrchestratorSettings, Provider, ProviderConfig,
    ProviderConfigMap, ProviderRegistry, Reasoner,
};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct Constant(&'static str);

#[async_trait]
impl Provider for Constant {
    async fn invoke(&self, _input: &str, _target: &str, _context: &str) -> MeshResult<String> {
        Ok(self.0.to_string())
    }
    async fn disconnect(&self) {}
}

/// Connects any provider whose command is `ok`; fails the rest.
struct CommandConnector;

#[async_trait]
impl Connector for CommandConnector {
    async fn connect(&self, name: &str, config: &ProviderConfig) -> MeshResult<Connected> {
        if config.command != "ok" {
            return Err(MeshError::Transport(format!("cannot run {}", config.command)));
        }
        Ok(Connected {
            provider: Arc::new(Constant("42")),
            descriptor: CapabilityDescriptor::new(name, "answers everything"),
        })
    }
}

/// Plans one step against `calc`, echoes the prompt it was given on synthesis.
struct EchoReasoner {
    fail_synthesis: bool,
}

#[async_trait]
impl Reasoner for EchoReasoner {
    async fn complete(&self, system: &str, prompt: &str) -> MeshResult<String> {
        if system.contains("\"steps\"") {
            Ok(r#"{"steps":[{"sequence_id":1,"provider_name":"calc","input":"x"}]}"#.into())
        } else if system.contains("output format") {
            Ok("Plain.".into())
        } else if self.fail_synthesis {
            Err(MeshError::Http("model overloaded".into()))
        } else {
            Ok(prompt.to_string())
        }
    }
}

fn providers(entries: &[(&str, &str)]) -> ProviderConfigMap {
    entries
        .iter()
        .map(|(name, command)| {
            (
                name.to_string(),
                ProviderConfig {
                    command: command.to_string(),
                    args: vec![],
                    env: HashMap::new(),
                },
            )
        })
        .collect()
}

async fn app_with(entries: &[(&str, &str)], fail_synthesis: bool) -> (axum::Router, Arc<ThreadMemory>) {
    let registry = Arc::new(ProviderRegistry::new(Arc::new(CommandConnector)));
    registry.load(&providers(entries)).await;
    let orchestrator = Arc::new(Orchestrator::new(
        registry,
        Arc::new(EchoReasoner { fail_synthesis }),
        &OrchestratorSettings::default(),
    ));
    let memory = Arc::new(ThreadMemory::default());
    (GatewayServer::build_with_memory(orchestrator, memory.clone()), memory)
}

async fn call(app: axum::Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

// ---------------------------------------------------------------------------
// /query
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_query_generates_thread_id() {
    let (app, _) = app_with(&[("calc", "ok")], false).await;
    let (status, body) = call(app, "POST", "/query", Some(serde_json::json!({"question": "what?"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["thread_id"].as_str().unwrap().starts_with("thread-"));
    assert!(body["result"].as_str().unwrap().contains("42"));
}

#[tokio::test]
async fn test_query_keeps_thread_context() {
    let (app, memory) = app_with(&[("calc", "ok")], false).await;

    let (_, first) = call(
        app.clone(),
        "POST",
        "/query",
        Some(serde_json::json!({"question": "first question", "thread_id": "t-1"})),
    )
    .await;
    assert_eq!(first["thread_id"], "t-1");
    assert_eq!(memory.exchanges("t-1").len(), 1);

    let (status, _) = call(
        app,
        "POST",
        "/query",
        Some(serde_json::json!({"question": "second", "thread_id": "t-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(memory.context("t-1").contains("user: first question"));
    assert_eq!(memory.exchanges("t-1").len(), 2);
}

#[tokio::test]
async fn test_query_fatal_error_body() {
    let (app, memory) = app_with(&[("calc", "ok")], true).await;
    let (status, body) = call(
        app,
        "POST",
        "/query",
        Some(serde_json::json!({"question": "q", "thread_id": "t-9"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["kind"], "synthesis_failed");
    assert!(body["error"]["message"].as_str().unwrap().contains("model overloaded"));
    assert_eq!(memory.thread_count(), 0);
}

#[tokio::test]
async fn test_empty_question_is_rejected() {
    let (app, _) = app_with(&[], false).await;
    let (status, body) = call(app, "POST", "/query", Some(serde_json::json!({"question": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "gateway");
    assert!(body["error"]["message"].as_str().unwrap().contains("question must not be empty"));
}

// ---------------------------------------------------------------------------
// /health, /providers, /reload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_lists_ready_providers() {
    let (app, _) = app_with(&[("calc", "ok"), ("bad", "missing-binary")], false).await;
    let (status, body) = call(app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["degraded"], false);
    assert_eq!(body["providers"], serde_json::json!(["calc"]));
}

#[tokio::test]
async fn test_health_with_no_providers_is_degraded() {
    let (app, _) = app_with(&[], false).await;
    let (_, body) = call(app, "GET", "/health", None).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["degraded"], true);
}

#[tokio::test]
async fn test_providers_endpoint() {
    let (app, _) = app_with(&[("calc", "ok")], false).await;
    let (_, body) = call(app, "GET", "/providers", None).await;

    assert_eq!(body["providers"][0]["name"], "calc");
    assert_eq!(body["providers"][0]["summary"], "answers everything");
    assert!(body["providers"][0]["connected_at"].is_string());
    assert!(body["description"]
        .as_str()
        .unwrap()
        .starts_with("<provider name=\"calc\">"));
}

#[tokio::test]
async fn test_reload_replaces_providers() {
    let (app, _) = app_with(&[("calc", "ok")], false).await;
    let (status, body) = call(
        app.clone(),
        "POST",
        "/reload",
        Some(serde_json::json!({
            "search": {"command": "ok"},
            "broken": {"command": "nope", "args": ["--x"]}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], serde_json::json!(["search"]));
    assert_eq!(body["failed"][0]["kind"], "connect_failed");

    let (_, health) = call(app, "GET", "/health", None).await;
    assert_eq!(health["providers"], serde_json::json!(["search"]));
}

// ---------------------------------------------------------------------------
// Served over TCP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_served_health_endpoint() {
    let (app, _) = app_with(&[("calc", "ok")], false).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["providers"], serde_json::json!(["calc"]));
}
