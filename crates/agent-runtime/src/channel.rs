//! Tool Channel Transports
//!
//! `RpcChannel` speaks line-delimited JSON-RPC over any async byte stream.
//! `StdioChannel` spawns the Tool Host as a child process and runs an
//! `RpcChannel` over its stdin/stdout.
//!
//! Calls are strictly serial: one request is written, then lines are read
//! until the matching response arrives.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    protocol::{
        method, CallToolParams, CallToolResult, Implementation, InitializeParams,
        InitializeResult, ListToolsResult, RpcRequest, RpcResponse, ToolDescriptor,
        PROTOCOL_VERSION,
    },
    ToolCall, ToolChannel, ToolResult,
};
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, ReadHalf,
    WriteHalf,
};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::server::ToolServer;

/// How long a closing child gets to exit on its own before it is killed
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn channel_err(e: &std::io::Error) -> AgentError {
    AgentError::Channel(e.to_string())
}

struct Connection<R, W> {
    reader: R,
    writer: W,
    next_id: u64,
}

impl<R, W> Connection<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &RpcRequest) -> Result<()> {
        let mut payload = serde_json::to_vec(message)?;
        payload.push(b'\n');
        self.writer.write_all(&payload).await.map_err(|e| channel_err(&e))?;
        self.writer.flush().await.map_err(|e| channel_err(&e))
    }

    async fn read_response(&mut self, id: u64) -> Result<RpcResponse> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).await.map_err(|e| channel_err(&e))?;
            if read == 0 {
                return Err(AgentError::Channel("tool host closed the connection".into()));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let value: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring non-JSON line from tool host");
                    continue;
                }
            };

            if value.get("method").is_some() {
                tracing::debug!(message = %trimmed, "Ignoring message initiated by tool host");
                continue;
            }

            let response: RpcResponse =
                serde_json::from_value(value).map_err(|e| AgentError::Parse(e.to_string()))?;
            if response.id.as_u64() == Some(id) {
                return Ok(response);
            }
            tracing::warn!(expected = id, got = %response.id, "Response for unknown request ID");
        }
    }
}

/// JSON-RPC client over an async byte stream
pub struct RpcChannel<R, W> {
    conn: Mutex<Option<Connection<R, W>>>,
}

impl<R, W> RpcChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            conn: Mutex::new(Some(Connection {
                reader,
                writer,
                next_id: 1,
            })),
        }
    }

    /// Send a request and wait for its response
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<RpcResponse> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| AgentError::Channel("channel is closed".into()))?;

        let id = conn.next_id;
        conn.next_id += 1;

        conn.send(&RpcRequest::new(id, method, params)).await?;
        conn.read_response(id).await
    }

    /// Send a notification (no response expected)
    pub async fn notify(&self, method: &str) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| AgentError::Channel("channel is closed".into()))?;
        conn.send(&RpcRequest::notification(method)).await
    }

    /// Lifecycle handshake: `initialize` followed by `notifications/initialized`
    pub async fn initialize(&self, client: Implementation) -> Result<InitializeResult> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.into(),
            client_info: client,
            capabilities: serde_json::json!({ "tools": {} }),
        };
        let result: InitializeResult = self
            .request(method::INITIALIZE, Some(serde_json::to_value(params)?))
            .await?
            .into_result()?;

        self.notify(method::INITIALIZED).await?;
        tracing::info!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            "Tool host initialized"
        );
        Ok(result)
    }

    async fn shutdown(&self) -> Result<()> {
        let Some(mut conn) = self.conn.lock().await.take() else {
            return Ok(());
        };
        conn.writer.shutdown().await.map_err(|e| channel_err(&e))
    }
}

#[async_trait]
impl<R, W> ToolChannel for RpcChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let result: ListToolsResult = self.request(method::LIST_TOOLS, None).await?.into_result()?;
        Ok(result.tools)
    }

    async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult> {
        let params = serde_json::to_value(CallToolParams::from(call))?;
        let response = self.request(method::CALL_TOOL, Some(params)).await?;
        if let Some(error) = response.error {
            return Err(error.into());
        }

        let raw = response.result.unwrap_or(Value::Null);
        let result: CallToolResult = serde_json::from_value(raw.clone())
            .map_err(|_| AgentError::MalformedResponse(format!("unexpected tools/call result: {raw}")))?;

        let mut tool_result = result.into_tool_result(&call.name)?;
        tool_result.id.clone_from(&call.id);
        Ok(tool_result)
    }

    async fn close(&self) -> Result<()> {
        self.shutdown().await
    }
}

/// Channel to a `ToolServer` running as a task in this process
pub type InProcessChannel = RpcChannel<BufReader<ReadHalf<DuplexStream>>, WriteHalf<DuplexStream>>;

impl InProcessChannel {
    /// Serve `server` on a background task and connect to it in memory
    pub fn in_process(server: Arc<ToolServer>) -> Self {
        let (client, host) = tokio::io::duplex(64 * 1024);
        let (host_read, host_write) = tokio::io::split(host);
        tokio::spawn(async move {
            if let Err(e) = server.serve(BufReader::new(host_read), host_write).await {
                tracing::error!(error = %e, "In-process tool server stopped");
            }
        });

        let (client_read, client_write) = tokio::io::split(client);
        Self::new(BufReader::new(client_read), client_write)
    }
}

/// Tool Host spawned as a child process, spoken to over stdio
pub struct StdioChannel {
    rpc: RpcChannel<BufReader<ChildStdout>, ChildStdin>,
    child: Mutex<Option<Child>>,
    exit: Mutex<Option<ExitStatus>>,
}

impl StdioChannel {
    /// Spawn `program` and run the `initialize` handshake
    pub async fn spawn(program: &str, args: &[String], client: Implementation) -> Result<Self> {
        Self::spawn_with_env(program, args, &[], client).await
    }

    /// Like [`StdioChannel::spawn`], with extra variables layered over the inherited environment
    pub async fn spawn_with_env(
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        client: Implementation,
    ) -> Result<Self> {
        tracing::info!(program, ?args, "Starting tool host");

        let mut child = Command::new(program)
            .args(args)
            .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::Channel(format!("failed to start tool host '{program}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Channel("tool host stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Channel("tool host stdout unavailable".into()))?;

        let channel = Self {
            rpc: RpcChannel::new(BufReader::new(stdout), stdin),
            child: Mutex::new(Some(child)),
            exit: Mutex::new(None),
        };

        if let Err(e) = channel.rpc.initialize(client).await {
            if let Err(close_err) = channel.close().await {
                tracing::warn!(error = %close_err, "Failed to stop tool host after handshake error");
            }
            return Err(e);
        }

        Ok(channel)
    }

    /// Exit status of the host once `close` has reaped it
    pub async fn exit_status(&self) -> Option<ExitStatus> {
        *self.exit.lock().await
    }
}

#[async_trait]
impl ToolChannel for StdioChannel {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.rpc.list_tools().await
    }

    async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult> {
        self.rpc.call_tool(call).await
    }

    async fn close(&self) -> Result<()> {
        // Closing stdin is the shutdown signal for the host
        let shutdown = self.rpc.shutdown().await;

        let Some(mut child) = self.child.lock().await.take() else {
            return shutdown;
        };

        let status = match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(%status, "Tool host exited");
                Some(status)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to reap tool host");
                None
            }
            Err(_) => {
                tracing::warn!("Tool host did not exit in time, killing it");
                child.kill().await.map_err(|e| channel_err(&e))?;
                child.try_wait().map_err(|e| channel_err(&e))?
            }
        };
        *self.exit.lock().await = status;

        shutdown
    }
}
