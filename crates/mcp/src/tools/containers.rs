//! Container tools: thin wrappers over the Container Abstraction (C3) —
//! no container logic is duplicated here, only argument parsing and
//! dispatch.

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::SharedState;
use async_trait::async_trait;
use portunix_core::container::{self, RunOptions};
use portunix_core::runtime::Runtime;
use portunix_core::security::SecurityProfile;
use serde_json::{json, Value};

use super::McpTool;

fn runtime_from_arg(arguments: &Value) -> Option<Runtime> {
    match arguments.get("runtime").and_then(Value::as_str) {
        Some("docker") => Some(Runtime::Docker),
        Some("podman") => Some(Runtime::Podman),
        _ => None,
    }
}

pub struct ListContainers;

#[async_trait]
impl McpTool for ListContainers {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_containers".to_string(),
            description: "List containers across every available runtime".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "all": {"type": "boolean", "description": "Include stopped containers"}
                }
            }),
        }
    }

    async fn execute(&self, _state: &SharedState, arguments: Value) -> CallToolResult {
        let all = arguments.get("all").and_then(Value::as_bool).unwrap_or(false);
        let runtime_impl = match container::select_runtime(None) {
            Ok(r) => r,
            Err(e) => return CallToolResult::error(e.to_string()),
        };
        match runtime_impl.list(all).await {
            Ok(containers) => CallToolResult::json(&serde_json::to_value(containers).unwrap_or_default()),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }
}

pub struct ManageContainer;

#[async_trait]
impl McpTool for ManageContainer {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "manage_container".to_string(),
            description: "Start, stop, or restart a container by name".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "container": {"type": "string"},
                    "action": {"type": "string", "enum": ["start", "stop", "restart"]},
                    "runtime": {"type": "string", "enum": ["docker", "podman"]},
                    "confirm": {"type": "boolean"}
                },
                "required": ["container", "action"]
            }),
        }
    }

    fn required_profile(&self) -> SecurityProfile {
        SecurityProfile::Standard
    }

    fn destructive(&self) -> bool {
        true
    }

    async fn execute(&self, _state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(name) = arguments.get("container").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'container' argument".to_string());
        };
        let Some(action) = arguments.get("action").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'action' argument".to_string());
        };

        let runtime_impl = match container::select_runtime(runtime_from_arg(&arguments)) {
            Ok(r) => r,
            Err(e) => return CallToolResult::error(e.to_string()),
        };

        let outcome = match action {
            "start" => runtime_impl.start(name).await,
            "stop" => runtime_impl.stop(name).await,
            "restart" => {
                if let Err(e) = runtime_impl.stop(name).await {
                    return CallToolResult::error(e.to_string());
                }
                runtime_impl.start(name).await
            }
            other => return CallToolResult::error(format!("unknown action '{other}'")),
        };

        match outcome {
            Ok(result) => CallToolResult::json(&serde_json::to_value(result).unwrap_or_default()),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }
}

pub struct GetContainerInfo;

#[async_trait]
impl McpTool for GetContainerInfo {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_container_info".to_string(),
            description: "Get details for a single container by name".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"container": {"type": "string"}},
                "required": ["container"]
            }),
        }
    }

    async fn execute(&self, _state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(name) = arguments.get("container").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'container' argument".to_string());
        };

        let runtime_impl = match container::select_runtime(None) {
            Ok(r) => r,
            Err(e) => return CallToolResult::error(e.to_string()),
        };

        match runtime_impl.list(true).await {
            Ok(containers) => match containers.into_iter().find(|c| c.name == name || c.id.starts_with(name)) {
                Some(found) => CallToolResult::json(&serde_json::to_value(found).unwrap_or_default()),
                None => CallToolResult::error(format!("no container named '{name}' found")),
            },
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }
}

pub struct CreateSandbox;

#[async_trait]
impl McpTool for CreateSandbox {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "create_sandbox".to_string(),
            description: "Create an ephemeral, detached container for experimentation".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "image": {"type": "string"},
                    "name": {"type": "string"},
                    "runtime": {"type": "string", "enum": ["docker", "podman"]}
                },
                "required": ["image"]
            }),
        }
    }

    fn required_profile(&self) -> SecurityProfile {
        SecurityProfile::Standard
    }

    async fn execute(&self, _state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(image) = arguments.get("image").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'image' argument".to_string());
        };

        let runtime_impl = match container::select_runtime(runtime_from_arg(&arguments)) {
            Ok(r) => r,
            Err(e) => return CallToolResult::error(e.to_string()),
        };

        let opts = RunOptions {
            image: image.to_string(),
            command: vec!["sleep".to_string(), "infinity".to_string()],
            detach: true,
            name: arguments.get("name").and_then(Value::as_str).map(String::from),
            ..Default::default()
        };

        match runtime_impl.run_capture(&opts).await {
            Ok(result) if result.success() => CallToolResult::json(&json!({
                "container_id": result.stdout.trim(),
                "image": image,
            })),
            Ok(result) => CallToolResult::error(result.stderr),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }
}
