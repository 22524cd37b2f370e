//! Tool Server
//!
//! Serves a `ToolRegistry` over a line-delimited JSON-RPC stream. Every
//! `tools/call` resolves to a `CallToolResult`; tool failures come back as
//! `isError` results and never tear down the stream.

use std::sync::Arc;
use std::time::Instant;

use agent_core::{
    error::{AgentError, Result},
    protocol::{
        code, method, CallToolParams, CallToolResult, Implementation, InitializeResult,
        ListToolsResult, RpcRequest, RpcResponse, ToolDescriptor, PROTOCOL_VERSION,
    },
    ToolRegistry,
};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// JSON-RPC front end for a tool registry
pub struct ToolServer {
    info: Implementation,
    tools: Arc<ToolRegistry>,
}

impl ToolServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            info: Implementation {
                name: name.into(),
                version: version.into(),
            },
            tools,
        }
    }

    /// Serve until the reader reaches EOF
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            // A bad line gets a parse error; the stream stays up
            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(line).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Request line is not valid UTF-8");
                    Some(RpcResponse::error(Value::Null, code::PARSE_ERROR, format!("Parse error: {e}")))
                }
            };

            if let Some(response) = response {
                let mut payload = serde_json::to_vec(&response)?;
                payload.push(b'\n');
                writer.write_all(&payload).await?;
                writer.flush().await?;
            }
        }

        tracing::info!(server = %self.info.name, "Client closed the channel");
        Ok(())
    }

    /// Serve on the process's stdin/stdout
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Handle one raw line; `None` for notifications
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        match serde_json::from_str::<RpcRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Unparsable request line");
                Some(RpcResponse::error(Value::Null, code::PARSE_ERROR, format!("Parse error: {e}")))
            }
        }
    }

    /// Dispatch one request
    pub async fn handle(&self, request: RpcRequest) -> Option<RpcResponse> {
        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        };

        let response = match request.method.as_str() {
            method::INITIALIZE => {
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.into(),
                    server_info: self.info.clone(),
                    capabilities: json!({ "tools": {} }),
                };
                to_response(id, &result)
            }
            method::LIST_TOOLS => {
                let result = ListToolsResult {
                    tools: self.tools.schemas().iter().map(ToolDescriptor::from).collect(),
                };
                to_response(id, &result)
            }
            method::CALL_TOOL => self.call_tool(id, request.params).await,
            "ping" => RpcResponse::success(id, json!({})),
            other => RpcResponse::error(id, code::METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };

        Some(response)
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> RpcResponse {
        let params: CallToolParams = match serde_json::from_value(params.unwrap_or(Value::Null)) {
            Ok(params) => params,
            Err(e) => {
                return RpcResponse::error(id, code::INVALID_PARAMS, format!("Invalid tools/call params: {e}"));
            }
        };

        let call = params.into_call();
        let started = Instant::now();

        let result = match self.tools.execute(&call).await {
            Ok(result) => CallToolResult::from(&result),
            Err(AgentError::ToolNotFound(name)) => {
                return RpcResponse::error(id, code::INVALID_PARAMS, format!("Unknown tool: {name}"));
            }
            Err(AgentError::ToolValidation(msg)) => CallToolResult::text(msg, true),
            Err(e) => {
                tracing::error!(tool = %call.name, error = %e, "Tool execution failed");
                CallToolResult::text(format!("Error executing {}: {e}", call.name), true)
            }
        };

        tracing::info!(
            tool = %call.name,
            is_error = result.is_error,
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Tool call completed"
        );

        to_response(id, &result)
    }
}

fn to_response<T: serde::Serialize>(id: Value, result: &T) -> RpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => RpcResponse::success(id, value),
        Err(e) => RpcResponse::error(id, code::INTERNAL_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{
        tool::ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema,
    };
    use async_trait::async_trait;

    struct ShoutTool;

    #[async_trait]
    impl Tool for ShoutTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "shout".into(),
                description: "Upper-case the input".into(),
                parameters: vec![ParameterSchema::required_string("text", "Text")],
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            let text = call.str_arg("text").unwrap_or_default();
            if text == "fail" {
                return Ok(ToolResult::failure("shout", "Error: refused"));
            }
            Ok(ToolResult::success("shout", text.to_uppercase()))
        }
    }

    fn server() -> ToolServer {
        let mut registry = ToolRegistry::new();
        registry.register(ShoutTool);
        ToolServer::new("TestServer", "0.0.1", Arc::new(registry))
    }

    async fn call(server: &ToolServer, line: &str) -> RpcResponse {
        server.handle_line(line).await.expect("request should get a response")
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = call(&server(), r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;
        let result: InitializeResult = response.into_result().unwrap();
        assert_eq!(result.server_info.name, "TestServer");
        assert_eq!(result.protocol_version, PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_list_tools() {
        let response = call(&server(), r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        let result: ListToolsResult = response.into_result().unwrap();
        assert_eq!(result.tools.len(), 1);
        assert_eq!(result.tools[0].name, "shout");
        assert_eq!(result.tools[0].input_schema["required"][0], "text");
    }

    #[tokio::test]
    async fn test_call_success_and_failure() {
        let server = server();
        let ok = call(
            &server,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"shout","arguments":{"text":"hi"}}}"#,
        )
        .await;
        let ok: CallToolResult = ok.into_result().unwrap();
        assert!(!ok.is_error);
        assert_eq!(ok.first_text(), Some("HI"));

        let failed = call(
            &server,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"shout","arguments":{"text":"fail"}}}"#,
        )
        .await;
        let failed: CallToolResult = failed.into_result().unwrap();
        assert!(failed.is_error);
    }

    #[tokio::test]
    async fn test_validation_failure_is_flagged_result() {
        let response = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"shout","arguments":{}}}"#,
        )
        .await;
        let result: CallToolResult = response.into_result().unwrap();
        assert!(result.is_error);
        assert!(result.first_text().unwrap().contains("text"));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server();

        let unknown_tool = call(
            &server,
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"nope"}}"#,
        )
        .await;
        assert_eq!(unknown_tool.error.unwrap().code, code::INVALID_PARAMS);

        let unknown_method = call(&server, r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#).await;
        assert_eq!(unknown_method.error.unwrap().code, code::METHOD_NOT_FOUND);

        let garbage = call(&server, "not json").await;
        assert_eq!(garbage.error.unwrap().code, code::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let line = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(server().handle_line(line).await.is_none());
    }

    #[tokio::test]
    async fn test_serve_writes_one_line_per_request() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        );
        let mut output = Vec::new();
        server().serve(input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""id":1"#));
        assert!(lines[1].contains("shout"));
    }

    #[tokio::test]
    async fn test_serve_survives_undecodable_bytes() {
        let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"\xff\xfe\"}\n".to_vec();
        input.extend_from_slice(b"not json\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.push(b'\n');

        let mut output = Vec::new();
        server().serve(input.as_slice(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let responses: Vec<RpcResponse> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].id, Value::Null);
        assert_eq!(responses[0].error.as_ref().unwrap().code, code::PARSE_ERROR);
        assert_eq!(responses[1].error.as_ref().unwrap().code, code::PARSE_ERROR);
        assert_eq!(responses[2].id, json!(2));
        assert!(responses[2].error.is_none());
    }
}
