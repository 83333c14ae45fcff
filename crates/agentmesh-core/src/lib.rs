//! Core types and error definitions for agentmesh.
//!
//! # Main types
//!
//! - [`MeshError`]: Unified error enum, including the orchestration failure taxonomy.
//! - [`MeshResult`]: Convenience alias for `Result<T, MeshError>`.
//! - [`Message`] / [`Role`]: Conversation turns exchanged with the language model.
//! - [`ToolSpec`], [`ToolCall`], [`ToolResult`]: Tool-use plumbing.
//! - [`CapabilityDescriptor`]: One connected provider's capability summary.

/// Provider capability descriptors.
pub mod capability;
/// Error types.
pub mod error;
/// Conversation message types.
pub mod message;
/// Tool-use types.
pub mod tool;

pub use capability::CapabilityDescriptor;
pub use error::{MeshError, MeshResult};
pub use message::{Message, Role};
pub use tool::{ToolCall, ToolResult, ToolSpec};
