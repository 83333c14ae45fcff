use crate::memory::ThreadMemory;
use agentmesh_core::MeshError;
use agentmesh_orchestrator::{Orchestrator, ProviderConfigMap};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared application state.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub memory: Arc<ThreadMemory>,
}

/// The HTTP gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Builds the router with a fresh in-memory thread store.
    pub fn build(orchestrator: Arc<Orchestrator>) -> Router {
        Self::build_with_memory(orchestrator, Arc::new(ThreadMemory::default()))
    }

    pub fn build_with_memory(orchestrator: Arc<Orchestrator>, memory: Arc<ThreadMemory>) -> Router {
        let state = Arc::new(AppState {
            orchestrator,
            memory,
        });

        Router::new()
            .route("/query", post(query_handler))
            .route("/health", get(health_handler))
            .route("/providers", get(providers_handler))
            .route("/reload", post(reload_handler))
            .with_state(state)
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub result: String,
    pub thread_id: String,
}

/// Error body: `{"error": {"kind", "message"}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl From<MeshError> for ApiError {
    fn from(e: MeshError) -> Self {
        let status = match e {
            MeshError::Gateway(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {"kind": self.kind, "message": self.message}
        });
        (self.status, Json(body)).into_response()
    }
}

/// `thread-<unix-millis>`.
pub fn generate_thread_id() -> String {
    format!("thread-{}", Utc::now().timestamp_millis())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let question = req.question.trim();
    if question.is_empty() {
        warn!("Rejected query with empty question");
        return Err(MeshError::Gateway("question must not be empty".into()).into());
    }

    let thread_id = req
        .thread_id
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(generate_thread_id);
    let context = state.memory.context(&thread_id);

    info!(thread_id = %thread_id, "Query received");

    match state.orchestrator.answer(question, &context).await {
        Ok(answer) => {
            state.memory.record(&thread_id, question, &answer.text);
            Ok(Json(QueryResponse {
                result: answer.text,
                thread_id,
            }))
        }
        Err(e) => {
            error!(thread_id = %thread_id, kind = e.kind(), error = %e, "Query failed");
            Err(e.into())
        }
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let providers = state.orchestrator.registry().ready_names().await;
    Json(serde_json::json!({
        "status": "healthy",
        "degraded": providers.is_empty(),
        "providers": providers,
    }))
}

async fn providers_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.orchestrator.registry();
    let statuses = registry.statuses();
    let providers: Vec<serde_json::Value> = registry
        .descriptors()
        .await
        .into_iter()
        .map(|d| {
            let connected_at = statuses
                .iter()
                .find(|s| s.name == d.name)
                .and_then(|s| s.connected_at);
            serde_json::json!({
                "name": d.name,
                "summary": d.capability_summary,
                "connected_at": connected_at,
            })
        })
        .collect();

    Json(serde_json::json!({
        "providers": providers,
        "description": registry.description().await,
    }))
}

async fn reload_handler(
    State(state): State<Arc<AppState>>,
    Json(configs): Json<ProviderConfigMap>,
) -> impl IntoResponse {
    info!(providers = configs.len(), "Reload requested");
    let report = state.orchestrator.registry().load(&configs).await;

    let failed: Vec<serde_json::Value> = report
        .failures
        .iter()
        .map(|e| serde_json::json!({"kind": e.kind(), "message": e.to_string()}))
        .collect();
    if !failed.is_empty() {
        warn!(failed = failed.len(), "Some providers failed to load");
    }

    Json(serde_json::json!({
        "ready": report.ready,
        "failed": failed,
    }))
}
