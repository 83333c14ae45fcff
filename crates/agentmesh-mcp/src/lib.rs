//! Model Context Protocol transport for agentmesh.
//!
//! Each tool-agent is an MCP server launched as a subprocess and spoken to
//! over newline-delimited JSON-RPC on its stdio.

/// Tool catalog rendering.
pub mod catalog;
/// Stdio JSON-RPC client.
pub mod client;
/// Wire types.
pub mod protocol;

pub use catalog::render_catalog;
pub use client::{McpClient, StdioLaunch};
pub use protocol::{McpToolDef, McpToolResult};
