//! MCP server core: routes JSON-RPC requests to protocol handlers and the
//! tool registry. Implements `initialize`, `tools/list`, `tools/call`, and
//! `ping`.

use serde_json::Value;
use tracing::debug;

use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ServerCapabilities, ServerInfo, ToolsCapability, ToolsListResult, INTERNAL_ERROR,
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PROTOCOL_VERSION, SERVER_NAME,
    SERVER_VERSION,
};
use crate::state::SharedState;
use crate::tools::ToolRegistry;

/// Dispatches JSON-RPC requests to the appropriate MCP handler. Owns the
/// shared state and tool registry; transport layers feed parsed requests in
/// and send the returned responses.
pub struct McpServer {
    state: SharedState,
    tools: ToolRegistry,
}

impl McpServer {
    pub fn new(state: SharedState, tools: ToolRegistry) -> Self {
        Self { state, tools }
    }

    /// Route a JSON-RPC request. Returns `None` for notifications (requests
    /// without an `id`) — per spec.md §4.6, those get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("unsupported JSON-RPC version: {}", request.jsonrpc),
            ));
        }

        if request.id.is_none() {
            debug!(method = %request.method, "received notification, no response");
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => Self::handle_initialize(request.id, request.params),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            "ping" => JsonRpcResponse::success(request.id, Value::Object(serde_json::Map::new())),
            method => {
                debug!(method, "unknown MCP method");
                JsonRpcResponse::error(request.id, METHOD_NOT_FOUND, format!("method not found: {method}"))
            }
        };

        Some(response)
    }

    fn handle_initialize(id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        if let Some(params) = params {
            if let Ok(init) = serde_json::from_value::<InitializeParams>(params) {
                debug!(
                    client = %init.client_info.name,
                    version = ?init.client_info.version,
                    protocol = %init.protocol_version,
                    "MCP client connected"
                );
            }
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_owned(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_owned(),
                version: SERVER_VERSION.to_owned(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("serialization error: {e}")),
        }
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.tools.list_definitions(),
        };
        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("serialization error: {e}")),
        }
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let call_params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(cp) => cp,
                Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, format!("invalid params: {e}")),
            },
            None => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, "missing params for tools/call".to_owned())
            }
        };

        let arguments = call_params.arguments.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let result = self.tools.execute(&call_params.name, &self.state, arguments).await;

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("result serialization error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::build_tool_registry;
    use portunix_core::audit::AuditLog;
    use portunix_core::helpers::HelperRegistry;
    use portunix_core::security::SecurityProfile;
    use crate::state::ServerState;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn test_server() -> McpServer {
        let dir = tempfile::tempdir().unwrap();
        let state: SharedState = Arc::new(RwLock::new(ServerState::new(
            SecurityProfile::Development,
            AuditLog::open(dir.path().join("audit.jsonl")),
            HelperRegistry::default(),
            std::path::PathBuf::from("/usr/local/bin/portunix"),
        )));
        McpServer::new(state, build_tool_registry())
    }

    #[tokio::test]
    async fn notification_gets_no_response() {
        let server = test_server();
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "notifications/initialized".to_string(),
            params: None,
        };
        assert!(server.handle_request(request).await.is_none());
    }

    #[tokio::test]
    async fn initialize_returns_server_info() {
        let server = test_server();
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(Value::from(1)),
            method: "initialize".to_string(),
            params: Some(serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test-client"}
            })),
        };
        let response = server.handle_request(request).await.unwrap();
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let server = test_server();
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(Value::from(2)),
            method: "bogus/method".to_string(),
            params: None,
        };
        let response = server.handle_request(request).await.unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn tools_list_includes_declared_tool_count() {
        let server = test_server();
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(Value::from(3)),
            method: "tools/list".to_string(),
            params: None,
        };
        let response = server.handle_request(request).await.unwrap();
        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 21);
    }
}
