//! Package tools: thin wrappers over the `install`-family helper. Per-package
//! installation logic is an external collaborator (spec.md §1); these tools
//! only own the registration contract and dispatch, never the install
//! scripts themselves.

use crate::dispatch::call_helper;
use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::SharedState;
use async_trait::async_trait;
use portunix_core::security::SecurityProfile;
use serde_json::{json, Value};

use super::McpTool;

async fn dispatch(state: &SharedState, command: &str, args: Vec<String>) -> CallToolResult {
    let guard = state.read().await;
    match call_helper(guard.helper_registry(), command, &args).await {
        Ok(result) => CallToolResult::json(&result),
        Err(message) => CallToolResult::error(message),
    }
}

pub struct ListAvailablePackages;

#[async_trait]
impl McpTool for ListAvailablePackages {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_available_packages".to_string(),
            description: "List packages the install helper can provision".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, state: &SharedState, _arguments: Value) -> CallToolResult {
        dispatch(state, "install", vec!["list".to_string()]).await
    }
}

pub struct InstallPackage;

#[async_trait]
impl McpTool for InstallPackage {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "install_package".to_string(),
            description: "Install a package by name via the install helper".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "package": {"type": "string"},
                    "confirm": {"type": "boolean", "description": "Required under the standard profile"}
                },
                "required": ["package"]
            }),
        }
    }

    fn required_profile(&self) -> SecurityProfile {
        SecurityProfile::Standard
    }

    fn destructive(&self) -> bool {
        true
    }

    async fn execute(&self, state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(package) = arguments.get("package").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'package' argument".to_string());
        };
        dispatch(state, "install", vec![package.to_string()]).await
    }
}

pub struct CheckInstalled;

#[async_trait]
impl McpTool for CheckInstalled {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "check_installed".to_string(),
            description: "Check whether a package is already installed".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"package": {"type": "string"}},
                "required": ["package"]
            }),
        }
    }

    async fn execute(&self, state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(package) = arguments.get("package").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'package' argument".to_string());
        };
        dispatch(state, "install", vec!["check".to_string(), package.to_string()]).await
    }
}

pub struct UpdatePackages;

#[async_trait]
impl McpTool for UpdatePackages {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "update_packages".to_string(),
            description: "Update previously installed packages via the install helper".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"confirm": {"type": "boolean"}}
            }),
        }
    }

    fn required_profile(&self) -> SecurityProfile {
        SecurityProfile::Standard
    }

    fn destructive(&self) -> bool {
        true
    }

    async fn execute(&self, state: &SharedState, _arguments: Value) -> CallToolResult {
        dispatch(state, "install", vec!["update".to_string()]).await
    }
}
