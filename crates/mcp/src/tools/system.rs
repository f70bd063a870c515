//! System tools: host info, runtime capabilities, environment snapshot.

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::SharedState;
use async_trait::async_trait;
use portunix_core::container;
use portunix_core::platform;
use serde_json::json;

use super::McpTool;

pub struct GetSystemInfo;

#[async_trait]
impl McpTool for GetSystemInfo {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_system_info".to_string(),
            description: "Get host OS, architecture, and WSL status".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, _state: &SharedState, _arguments: serde_json::Value) -> CallToolResult {
        CallToolResult::json(&serde_json::to_value(platform::detect()).unwrap_or_default())
    }
}

pub struct GetCapabilities;

#[async_trait]
impl McpTool for GetCapabilities {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_capabilities".to_string(),
            description: "Get container runtime capabilities (docker/podman, compose flavor, daemon readiness)".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, _state: &SharedState, _arguments: serde_json::Value) -> CallToolResult {
        let report = container::check();
        CallToolResult::json(&serde_json::to_value(report).unwrap_or_default())
    }
}

pub struct GetEnvironment;

#[async_trait]
impl McpTool for GetEnvironment {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_environment".to_string(),
            description: "Get relevant environment variables (HOME, PATH entries, XDG_RUNTIME_DIR)".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, _state: &SharedState, _arguments: serde_json::Value) -> CallToolResult {
        let snapshot = json!({
            "home": std::env::var("HOME").ok().or_else(|| std::env::var("USERPROFILE").ok()),
            "xdg_runtime_dir": std::env::var("XDG_RUNTIME_DIR").ok(),
            "path_entries": std::env::var_os("PATH")
                .map(|p| std::env::split_paths(&p).map(|d| d.display().to_string()).collect::<Vec<_>>())
                .unwrap_or_default(),
        });
        CallToolResult::json(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_system_info_definition_has_empty_schema() {
        let tool = GetSystemInfo;
        let def = tool.definition();
        assert_eq!(def.name, "get_system_info");
    }
}
