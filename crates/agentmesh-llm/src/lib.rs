//! Language-inference client for agentmesh.
//!
//! [`LlmClient`] hides the provider-specific wire formats behind the
//! [`backends::LlmBackend`] trait. Planning, advisory, synthesis and
//! tool-agent loops all go through it.

pub mod backends;
pub mod config;
pub mod llm;

pub use config::{LlmProvider, ModelConfig};
pub use llm::{LlmClient, LlmResponse};
