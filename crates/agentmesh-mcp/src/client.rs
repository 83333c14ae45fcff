//! MCP client: runs an MCP server as a subprocess and exchanges
//! newline-delimited JSON-RPC 2.0 messages over its stdio.

use crate::protocol::*;
use agentmesh_core::{MeshError, MeshResult};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// How to launch an MCP server process.
#[derive(Debug, Clone, Default)]
pub struct StdioLaunch {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

/// A live stdio connection to one MCP server.
///
/// The child process is killed when the client is shut down or dropped, so an
/// abandoned connect never leaks a subprocess.
pub struct McpClient {
    label: String,
    stdin: Mutex<ChildStdin>,
    child: Mutex<Option<Child>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    pending: PendingMap,
    next_id: AtomicU64,
    request_timeout: Duration,
    closed: AtomicBool,
}

impl McpClient {
    /// Spawn the server, run the `initialize` handshake and list its tools.
    pub async fn spawn(
        label: &str,
        launch: &StdioLaunch,
        request_timeout: Duration,
    ) -> MeshResult<(Self, Vec<McpToolDef>)> {
        let mut cmd = Command::new(&launch.command);
        cmd.args(&launch.args)
            .envs(&launch.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            MeshError::Transport(format!(
                "failed to spawn MCP server '{}': {e}",
                launch.command
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MeshError::Transport("MCP server stdin not available".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MeshError::Transport("MCP server stdout not available".into()))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_responses(label.to_string(), stdout, pending.clone()));

        let client = Self {
            label: label.to_string(),
            stdin: Mutex::new(stdin),
            child: Mutex::new(Some(child)),
            reader: Mutex::new(Some(reader)),
            pending,
            next_id: AtomicU64::new(1),
            request_timeout,
            closed: AtomicBool::new(false),
        };

        let tools = match client.handshake().await {
            Ok(tools) => tools,
            Err(e) => {
                client.shutdown().await;
                return Err(e);
            }
        };

        Ok((client, tools))
    }

    async fn handshake(&self) -> MeshResult<Vec<McpToolDef>> {
        let init = self.initialize().await?;
        info!(
            provider = %self.label,
            version = %init.protocol_version,
            server = init.server_info.as_ref().map(|s| s.name.as_str()).unwrap_or("unknown"),
            "MCP server initialized"
        );

        self.send(&JsonRpcRequest::notification("notifications/initialized", None))
            .await?;

        let tools = self.list_tools().await?;
        info!(provider = %self.label, tools = tools.len(), "MCP tools discovered");
        Ok(tools)
    }

    async fn send(&self, message: &JsonRpcRequest) -> MeshResult<()> {
        let line = message.to_line()?;
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| MeshError::Transport(format!("failed to write to MCP stdin: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| MeshError::Transport(format!("failed to flush MCP stdin: {e}")))
    }

    /// Send a JSON-RPC request and wait for the matching response.
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> MeshResult<serde_json::Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MeshError::Transport(format!(
                "MCP connection '{}' is closed",
                self.label
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(e) = self.send(&JsonRpcRequest::call(id, method, params)).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let resp = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(_)) => {
                return Err(MeshError::Transport(format!(
                    "MCP server '{}' closed before answering '{method}'",
                    self.label
                )))
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(MeshError::Transport(format!(
                    "MCP request '{method}' timed out after {}s",
                    self.request_timeout.as_secs()
                )));
            }
        };

        if let Some(err) = resp.error {
            return Err(MeshError::Transport(format!(
                "MCP error {}: {}",
                err.code, err.message
            )));
        }

        resp.result
            .ok_or_else(|| MeshError::Transport(format!("empty result for '{method}'")))
    }

    async fn initialize(&self) -> MeshResult<InitializeResult> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "agentmesh",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let result = self.request("initialize", Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| MeshError::Transport(format!("invalid initialize result: {e}")))
    }

    /// List available tools from the MCP server.
    pub async fn list_tools(&self) -> MeshResult<Vec<McpToolDef>> {
        let result = self.request("tools/list", None).await?;
        let tools = result
            .get("tools")
            .cloned()
            .unwrap_or_else(|| serde_json::json!([]));
        serde_json::from_value(tools)
            .map_err(|e| MeshError::Transport(format!("invalid tools/list result: {e}")))
    }

    /// Call a tool on the MCP server.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> MeshResult<McpToolResult> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        let result = self.request("tools/call", Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| MeshError::Transport(format!("invalid tools/call result: {e}")))
    }

    /// Name this connection was registered under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether [`McpClient::shutdown`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Kill the server process and stop the reader. Idempotent.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                warn!(provider = %self.label, error = %e, "Failed to kill MCP server");
            }
        }
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        // Dropping the senders wakes every in-flight request.
        self.pending.lock().await.clear();
        debug!(provider = %self.label, "MCP connection closed");
    }
}

async fn read_responses(label: String, stdout: ChildStdout, pending: PendingMap) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!(provider = %label, "MCP server stdout closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                    Ok(resp) => {
                        // Server notifications carry no id.
                        let Some(id) = resp.id else { continue };
                        match pending.lock().await.remove(&id) {
                            Some(tx) => {
                                let _ = tx.send(resp);
                            }
                            None => debug!(provider = %label, id, "Response for unknown request id"),
                        }
                    }
                    Err(e) => {
                        debug!(provider = %label, line = %trimmed, error = %e, "Non-JSON-RPC line from MCP server");
                    }
                }
            }
            Err(e) => {
                warn!(provider = %label, error = %e, "Error reading MCP server stdout");
                break;
            }
        }
    }
    pending.lock().await.clear();
}
