//! MCP server implementation.
//!
//! The server handles the MCP protocol lifecycle:
//! 1. Initialize - exchange capabilities
//! 2. Serve requests - list/read resources and call tools via the tracker
//! 3. Shutdown - on EOF, write failure or Ctrl-C

use std::io;
use std::sync::Arc;

use jira_mcp_core::IssueTracker;
use serde_json::Value;

use crate::handlers::ToolHandler;
use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ReadResourceParams, RequestId, ResourcesCapability, ServerCapabilities, ServerInfo,
    ToolCallParams, ToolsCapability, ToolsListResult, MCP_VERSION,
};
use crate::resources::ResourceHandler;
use crate::transport::{IncomingMessage, StdioTransport};

/// Name reported in the initialize handshake.
pub const SERVER_NAME: &str = "jira-server";

/// MCP server exposing one issue tracker.
pub struct McpServer {
    tools: ToolHandler,
    resources: ResourceHandler,
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server backed by `tracker`.
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self {
            tools: ToolHandler::new(tracker.clone()),
            resources: ResourceHandler::new(tracker),
            initialized: false,
        }
    }

    /// Whether the client has completed `initialize`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Serve stdin/stdout until EOF or Ctrl-C.
    pub async fn run(&mut self) -> io::Result<()> {
        tracing::info!("Starting MCP server on stdio");

        tokio::select! {
            result = self.serve(StdioTransport::stdio()) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                Ok(())
            }
        }
    }

    /// Run the message loop on `transport`.
    ///
    /// Returns `Ok(())` on EOF and the I/O error if reading or writing fails.
    pub async fn serve(&mut self, mut transport: StdioTransport) -> io::Result<()> {
        loop {
            let msg = match transport.read_message().await {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    tracing::info!("EOF received, shutting down");
                    break;
                }
                Err(e) => {
                    tracing::error!("Transport error: {}", e);
                    return Err(e);
                }
            };

            if let Some(response) = self.handle_message(msg).await {
                if let Err(e) = transport.write_response(&response).await {
                    tracing::error!("Failed to write response: {}", e);
                    return Err(e);
                }
            }
        }

        tracing::info!("MCP server stopped");
        Ok(())
    }

    /// Handle an incoming message.
    pub async fn handle_message(&mut self, msg: IncomingMessage) -> Option<JsonRpcResponse> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif.method);
                None
            }
            IncomingMessage::Invalid(resp) => Some(resp),
        }
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&mut self, req: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!("Handling request: {} (id: {:?})", req.method, req.id);

        let id = req.id;
        match req.method.as_str() {
            "initialize" => self.handle_initialize(id, req.params),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => JsonRpcResponse::from_result(
                id,
                Ok::<_, JsonRpcError>(ToolsListResult {
                    tools: self.tools.available_tools(),
                }),
            ),
            "tools/call" => self.handle_tools_call(id, req.params).await,
            "resources/list" => JsonRpcResponse::from_result(id, self.resources.list().await),
            "resources/read" => self.handle_resources_read(id, req.params).await,
            "resources/templates/list" => {
                JsonRpcResponse::from_result(id, Ok::<_, JsonRpcError>(self.resources.templates()))
            }
            method => {
                tracing::warn!("Unknown method: {}", method);
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(method))
            }
        }
    }

    /// Handle notifications (no response).
    fn handle_notification(&mut self, method: &str) {
        match method {
            "notifications/initialized" | "initialized" => {
                tracing::info!("Client initialized");
            }
            "notifications/cancelled" => {
                tracing::debug!("Request cancelled by client");
            }
            _ => {
                tracing::debug!("Ignoring notification: {}", method);
            }
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&mut self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        if self.initialized {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Server already initialized"),
            );
        }

        // Client info is only logged
        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init_params) => {
                    tracing::info!(
                        "Client: {} v{} (protocol: {})",
                        init_params.client_info.name,
                        init_params.client_info.version,
                        init_params.protocol_version
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to parse initialize params: {}", e);
                }
            }
        }

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                resources: Some(ResourcesCapability::default()),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        JsonRpcResponse::from_result(id, Ok::<_, JsonRpcError>(result))
    }

    /// Handle tools/call request.
    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match decode_params(params) {
            Ok(params) => params,
            Err(e) => return JsonRpcResponse::error(id, e),
        };

        tracing::info!("Calling tool: {}", params.name);

        let result = self.tools.execute(&params.name, params.arguments).await;
        JsonRpcResponse::from_result(id, result)
    }

    /// Handle resources/read request.
    async fn handle_resources_read(
        &self,
        id: RequestId,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params: ReadResourceParams = match decode_params(params) {
            Ok(params) => params,
            Err(e) => return JsonRpcResponse::error(id, e),
        };

        tracing::info!("Reading resource: {}", params.uri);

        JsonRpcResponse::from_result(id, self.resources.read(&params.uri).await)
    }
}

fn decode_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{JsonRpcNotification, JSONRPC_VERSION};
    use crate::test_support::{sample_issue, sample_project, Call, FakeTracker};
    use serde_json::json;

    fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(id),
            method: method.to_string(),
            params,
        }
    }

    fn server_with(tracker: FakeTracker) -> (McpServer, Arc<FakeTracker>) {
        let tracker = Arc::new(tracker);
        (McpServer::new(tracker.clone()), tracker)
    }

    #[test]
    fn test_server_creation() {
        let (server, _) = server_with(FakeTracker::default());
        assert!(!server.is_initialized());
    }

    #[tokio::test]
    async fn test_initialize_response() {
        let (mut server, _) = server_with(FakeTracker::default());

        let resp = server
            .handle_request(request(
                1,
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0.0"}
                })),
            ))
            .await;

        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], "jira-server");
        assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_double_initialize_error() {
        let (mut server, _) = server_with(FakeTracker::default());

        let first = server.handle_request(request(1, "initialize", None)).await;
        assert!(first.result.is_some());

        let second = server.handle_request(request(2, "initialize", None)).await;
        let error = second.error.unwrap();
        assert_eq!(error.code, JsonRpcError::INVALID_REQUEST);
        assert_eq!(second.id, RequestId::Number(2));
    }

    #[tokio::test]
    async fn test_initialize_with_invalid_params() {
        let (mut server, _) = server_with(FakeTracker::default());

        // Unparseable client info is logged, not rejected
        let resp = server
            .handle_request(request(1, "initialize", Some(json!({"invalid": true}))))
            .await;

        assert!(resp.result.is_some());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_ping() {
        let (mut server, _) = server_with(FakeTracker::default());

        let resp = server.handle_request(request(5, "ping", None)).await;

        assert_eq!(resp.result, Some(json!({})));
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let (mut server, _) = server_with(FakeTracker::default());

        let resp = server.handle_request(request(1, "tools/list", None)).await;

        let result: ToolsListResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.tools.len(), 3);
        assert!(result.tools.iter().any(|t| t.name == "update_issue"));
    }

    #[tokio::test]
    async fn test_tools_call() {
        let (mut server, tracker) = server_with(FakeTracker {
            issues: vec![sample_issue("PROJ-1", "One", "Open")],
            ..Default::default()
        });

        let resp = server
            .handle_request(request(
                3,
                "tools/call",
                Some(json!({"name": "search_issues", "arguments": {"jql": "project = PROJ"}})),
            ))
            .await;

        let result = resp.result.unwrap();
        assert_eq!(result["content"][0]["type"], "text");
        let issues: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(issues[0]["key"], "PROJ-1");
        assert_eq!(tracker.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool() {
        let (mut server, _) = server_with(FakeTracker::default());

        let resp = server
            .handle_request(request(
                4,
                "tools/call",
                Some(json!({"name": "get_merge_requests", "arguments": {}})),
            ))
            .await;

        let error = resp.error.unwrap();
        assert_eq!(error.code, JsonRpcError::METHOD_NOT_FOUND);
        assert_eq!(error.message, "Unknown tool: get_merge_requests");
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let (mut server, _) = server_with(FakeTracker::default());

        let resp = server.handle_request(request(1, "tools/call", None)).await;

        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_invalid_params() {
        let (mut server, _) = server_with(FakeTracker::default());

        let resp = server
            .handle_request(request(1, "tools/call", Some(json!("not an object"))))
            .await;

        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_resources_list_and_read() {
        let (mut server, tracker) = server_with(FakeTracker {
            projects: vec![sample_project("PROJ", "Project")],
            issues: vec![sample_issue("PROJ-1", "One", "Open")],
            ..Default::default()
        });

        let list = server.handle_request(request(1, "resources/list", None)).await;
        let list = list.result.unwrap();
        assert_eq!(list["resources"][0]["uri"], "jira://PROJ/issues");
        assert_eq!(list["resources"][0]["mimeType"], "application/json");

        let read = server
            .handle_request(request(
                2,
                "resources/read",
                Some(json!({"uri": "jira://PROJ/issues"})),
            ))
            .await;
        let read = read.result.unwrap();
        assert_eq!(read["contents"][0]["uri"], "jira://PROJ/issues");
        assert!(read["contents"][0]["text"]
            .as_str()
            .unwrap()
            .contains("PROJ-1"));

        assert_eq!(tracker.calls()[0], Call::ListProjects);
    }

    #[tokio::test]
    async fn test_resources_read_invalid_uri() {
        let (mut server, _) = server_with(FakeTracker::default());

        let resp = server
            .handle_request(request(
                1,
                "resources/read",
                Some(json!({"uri": "jira://PROJ/comments"})),
            ))
            .await;

        let error = resp.error.unwrap();
        assert_eq!(error.code, JsonRpcError::INVALID_REQUEST);
        assert_eq!(error.message, "Invalid Jira resource URI: jira://PROJ/comments");
    }

    #[tokio::test]
    async fn test_resources_read_missing_uri() {
        let (mut server, _) = server_with(FakeTracker::default());

        let resp = server
            .handle_request(request(1, "resources/read", Some(json!({}))))
            .await;

        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_resources_list_upstream_failure() {
        let (mut server, _) = server_with(FakeTracker::failing(401));

        let resp = server.handle_request(request(1, "resources/list", None)).await;

        let error = resp.error.unwrap();
        assert_eq!(error.code, JsonRpcError::INTERNAL_ERROR);
        assert!(error.message.starts_with("Failed to list Jira projects: Unauthorized"));
    }

    #[tokio::test]
    async fn test_resource_templates() {
        let (mut server, _) = server_with(FakeTracker::default());

        let resp = server
            .handle_request(request(1, "resources/templates/list", None))
            .await;

        let result = resp.result.unwrap();
        assert_eq!(
            result["resourceTemplates"][0]["uriTemplate"],
            "jira://{projectKey}/issues"
        );
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (mut server, _) = server_with(FakeTracker::default());

        let resp = server
            .handle_request(request(1, "prompts/list", None))
            .await;

        let error = resp.error.unwrap();
        assert_eq!(error.code, JsonRpcError::METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found: prompts/list");
    }

    #[tokio::test]
    async fn test_handle_message_notification() {
        let (mut server, _) = server_with(FakeTracker::default());

        let msg = IncomingMessage::Notification(JsonRpcNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: "notifications/initialized".to_string(),
            params: None,
        });

        assert!(server.handle_message(msg).await.is_none());
    }

    #[tokio::test]
    async fn test_handle_message_invalid_is_answered() {
        let (mut server, _) = server_with(FakeTracker::default());

        let msg = crate::transport::parse_message("{broken");
        let resp = server.handle_message(msg).await.unwrap();

        assert_eq!(resp.id, RequestId::Null);
        assert_eq!(resp.error.unwrap().code, JsonRpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_serve_until_eof() {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

        let (mut server, _) = server_with(FakeTracker::default());
        let (client, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let transport =
            StdioTransport::new(tokio::io::BufReader::new(server_read), server_write);

        let (client_read, mut client_write) = tokio::io::split(client);
        client_write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        client_write.shutdown().await.unwrap();

        server.serve(transport).await.unwrap();

        let mut lines = tokio::io::BufReader::new(client_read).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let resp: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"], json!({}));
    }
}
