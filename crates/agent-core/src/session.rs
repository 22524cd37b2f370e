//! Tool Channel Sessions
//!
//! A `Session` is the single connection between the Orchestrator and the
//! Tool Host. It is opened once at startup, performs capability discovery,
//! is reused serially by every turn and is closed exactly once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::protocol::ToolDescriptor;
use crate::tool::{ToolCall, ToolResult};

/// Request/response transport to a Tool Host
#[async_trait]
pub trait ToolChannel: Send + Sync {
    /// Capability discovery
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool. A malformed content list is an `Err`; a tool-side
    /// failure is an `Ok` result with `success == false`.
    async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Release the transport
    async fn close(&self) -> Result<()>;
}

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open connection to a Tool Host plus its discovered catalog
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    channel: Box<dyn ToolChannel>,

    catalog: Vec<ToolDescriptor>,

    /// Creation timestamp
    pub opened_at: DateTime<Utc>,

    active: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("catalog", &self.catalog)
            .field("opened_at", &self.opened_at)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session: run discovery over the channel.
    ///
    /// If discovery fails the channel is closed before the error is returned.
    pub async fn open(channel: Box<dyn ToolChannel>) -> Result<Self> {
        let catalog = match channel.list_tools().await {
            Ok(catalog) => catalog,
            Err(e) => {
                if let Err(close_err) = channel.close().await {
                    tracing::warn!(error = %close_err, "Failed to close channel after discovery error");
                }
                return Err(e);
            }
        };

        let session = Self {
            id: SessionId::new(),
            channel,
            catalog,
            opened_at: Utc::now(),
            active: true,
        };
        tracing::info!(session = %session.id, tools = ?session.tool_names(), "Session opened");
        Ok(session)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.catalog.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.catalog.iter().any(|t| t.name == name)
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Invoke a tool by name with JSON arguments
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: impl IntoIterator<Item = (String, Value)> + Send,
    ) -> Result<ToolResult> {
        if !self.active {
            return Err(AgentError::Session(format!("session {} is closed", self.id)));
        }

        let mut call = ToolCall::new(name);
        call.arguments.extend(arguments);
        self.channel.call_tool(&call).await
    }

    /// Close the session. Only the first call reaches the channel.
    pub async fn close(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        tracing::info!(session = %self.id, "Closing session");
        self.channel.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingChannel {
        fail_discovery: bool,
        calls: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolChannel for CountingChannel {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
            if self.fail_discovery {
                return Err(AgentError::Channel("host exited".into()));
            }
            Ok(vec![ToolDescriptor {
                name: "get_weather".into(),
                description: "Weather lookup".into(),
                input_schema: Value::Null,
            }])
        }

        async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToolResult::success(&call.name, call.str_arg("city").unwrap_or_default()))
        }

        async fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_open_discovers_catalog() {
        let session = Session::open(Box::new(CountingChannel::default())).await.unwrap();
        assert!(session.is_active());
        assert!(session.has_tool("get_weather"));
        assert_eq!(session.tool_names(), vec!["get_weather"]);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let closes = Arc::new(AtomicUsize::new(0));
        let channel = CountingChannel {
            closes: closes.clone(),
            ..Default::default()
        };
        let mut session = Session::open(Box::new(channel)).await.unwrap();

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn test_call_after_close_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let channel = CountingChannel {
            calls: calls.clone(),
            ..Default::default()
        };
        let mut session = Session::open(Box::new(channel)).await.unwrap();

        let args = [("city".to_string(), Value::from("Paris"))];
        let result = session.call_tool("get_weather", args.clone()).await.unwrap();
        assert_eq!(result.output, "Paris");

        session.close().await.unwrap();
        assert!(matches!(
            session.call_tool("get_weather", args).await,
            Err(AgentError::Session(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_discovery_closes_channel() {
        let closes = Arc::new(AtomicUsize::new(0));
        let channel = CountingChannel {
            fail_discovery: true,
            closes: closes.clone(),
            ..Default::default()
        };
        assert!(Session::open(Box::new(channel)).await.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
