//! Safety tools: dry-run command validation, permission introspection, and
//! audit log readback.

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::SharedState;
use async_trait::async_trait;
use portunix_core::dispatcher;
use serde_json::{json, Value};

use super::McpTool;

pub struct ValidateCommand;

#[async_trait]
impl McpTool for ValidateCommand {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "validate_command".to_string(),
            description: "Resolve a command name to its route (builtin or helper) without executing it".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"command": {"type": "string"}},
                "required": ["command"]
            }),
        }
    }

    async fn execute(&self, state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(command) = arguments.get("command").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'command' argument".to_string());
        };

        let guard = state.read().await;
        match dispatcher::resolve(command, guard.helper_registry()) {
            Ok(dispatcher::Route::Builtin(name)) => {
                CallToolResult::json(&json!({"command": command, "route": "builtin", "target": name}))
            }
            Ok(dispatcher::Route::External(route)) => CallToolResult::json(&json!({
                "command": command,
                "route": "helper",
                "helper": route.helper_name,
                "path": route.helper_path.display().to_string(),
            })),
            Err(e) => CallToolResult::json(&json!({"command": command, "route": "unresolved", "reason": e.to_string()})),
        }
    }
}

pub struct GetPermissions;

#[async_trait]
impl McpTool for GetPermissions {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_permissions".to_string(),
            description: "Get the server's active security profile and what it permits".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, state: &SharedState, _arguments: Value) -> CallToolResult {
        let profile = state.read().await.security_profile();
        CallToolResult::json(&json!({
            "security_profile": profile.to_string(),
            "destructive_tools_require_confirmation": profile == portunix_core::security::SecurityProfile::Standard,
            "all_tools_allowed": profile == portunix_core::security::SecurityProfile::Development,
        }))
    }
}

pub struct AuditLogTool;

#[async_trait]
impl McpTool for AuditLogTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "audit_log".to_string(),
            description: "Read back recent audit records for MCP tool invocations".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "description": "Maximum records to return (default 50)"}
                }
            }),
        }
    }

    async fn execute(&self, state: &SharedState, arguments: Value) -> CallToolResult {
        let limit = arguments
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(50) as usize;

        let guard = state.read().await;
        match guard.audit_log().tail(limit) {
            Ok(records) => CallToolResult::json(&serde_json::to_value(records).unwrap_or_default()),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }
}
