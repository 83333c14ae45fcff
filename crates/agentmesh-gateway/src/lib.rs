//! HTTP gateway for agentmesh.
//!
//! Routes:
//!
//! - `POST /query`: `{question, thread_id?}` → `{result, thread_id}`
//! - `GET /health`: readiness, with the ready provider names
//! - `GET /providers`: ready providers and the capability description
//! - `POST /reload`: replace every provider with the posted configuration

pub mod memory;
pub mod server;

pub use memory::ThreadMemory;
pub use server::{GatewayServer, QueryRequest, QueryResponse};
