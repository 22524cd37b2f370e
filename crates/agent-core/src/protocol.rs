//! Channel Wire Protocol
//!
//! JSON-RPC 2.0 messages exchanged between the Orchestrator and the Tool
//! Host, one JSON document per line. Three operations ride on it:
//! capability discovery (`tools/list`), invocation (`tools/call`) and the
//! `initialize` handshake that opens a session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::tool::{ToolCall, ToolResult, ToolSchema};

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision announced during `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Method names
pub mod method {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
}

/// Standard JSON-RPC error codes
pub mod code {
    pub const PARSE_ERROR: i64 = -32700;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Request or notification (notifications carry no `id`)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: Some(Value::from(id)),
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: None,
            method: method.into(),
            params: None,
        }
    }
}

/// JSON-RPC error object
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<RpcError> for AgentError {
    fn from(err: RpcError) -> Self {
        Self::Rpc {
            code: err.code,
            message: err.message,
        }
    }
}

/// Response to a request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Unwrap into the typed result, turning an error object into `AgentError::Rpc`
    pub fn into_result<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        let result = self.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| AgentError::Parse(e.to_string()))
    }
}

/// Name/version pair for either side of the channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub client_info: Implementation,
    #[serde(default)]
    pub capabilities: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub server_info: Implementation,
    #[serde(default)]
    pub capabilities: Value,
}

/// One entry of the discovered tool catalog
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
}

impl From<&ToolSchema> for ToolDescriptor {
    fn from(schema: &ToolSchema) -> Self {
        Self {
            name: schema.name.clone(),
            description: schema.description.clone(),
            input_schema: schema.input_schema(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: HashMap<String, Value>,
}

impl From<&ToolCall> for CallToolParams {
    fn from(call: &ToolCall) -> Self {
        Self {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        }
    }
}

impl CallToolParams {
    pub fn into_call(self) -> ToolCall {
        let mut call = ToolCall::new(self.name);
        call.arguments = self.arguments;
        call
    }
}

/// Typed content item, as produced by the Tool Host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text { text: String },
}

/// `tools/call` result.
///
/// `content` is kept as raw JSON on the receiving side so that a response
/// with a missing, empty or text-less content list can be told apart from a
/// well-formed error result.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>, is_error: bool) -> Self {
        let items = vec![ContentItem::Text { text: text.into() }];
        Self {
            content: serde_json::to_value(items).unwrap_or(Value::Null),
            is_error,
        }
    }

    /// Text of the first content item, if the content list is well-formed
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str)
    }

    /// Convert into a `ToolResult`, rejecting malformed content lists
    pub fn into_tool_result(self, name: &str) -> Result<ToolResult> {
        let Some(text) = self.first_text() else {
            return Err(AgentError::MalformedResponse(format!(
                "expected a non-empty content list with text, got {}",
                self.content
            )));
        };
        let text = text.to_string();
        Ok(if self.is_error {
            ToolResult::failure(name, text)
        } else {
            ToolResult::success(name, text)
        })
    }
}

impl From<&ToolResult> for CallToolResult {
    fn from(result: &ToolResult) -> Self {
        Self::text(result.output.clone(), result.is_error())
    }
}
