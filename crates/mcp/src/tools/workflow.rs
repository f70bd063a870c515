//! Workflow tools: project scaffolding, CI/CD setup, environment deploys.
//! These drive whichever helper has registered the corresponding command
//! (`project`, `ci`, `deploy`); Portunix itself carries no CI/CD or
//! scaffolding logic, matching the out-of-scope boundary in spec.md §1.

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

pub struct CreateProject;

#[async_trait]
impl McpTool for CreateProject {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "create_project".to_string(),
            description: "Scaffold a new project via the registered project helper".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "template": {"type": "string"},
                    "name": {"type": "string"}
                },
                "required": ["template", "name"]
            }),
        }
    }

    fn required_profile(&self) -> SecurityProfile {
        SecurityProfile::Standard
    }

    async fn execute(&self, state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(template) = arguments.get("template").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'template' argument".to_string());
        };
        let Some(name) = arguments.get("name").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'name' argument".to_string());
        };
        dispatch(state, "project", vec!["create".to_string(), template.to_string(), name.to_string()]).await
    }
}

pub struct SetupCiCd;

#[async_trait]
impl McpTool for SetupCiCd {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "setup_ci_cd".to_string(),
            description: "Configure a CI/CD pipeline via the registered ci helper".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"provider": {"type": "string", "description": "e.g. github-actions, gitlab-ci"}},
                "required": ["provider"]
            }),
        }
    }

    fn required_profile(&self) -> SecurityProfile {
        SecurityProfile::Standard
    }

    async fn execute(&self, state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(provider) = arguments.get("provider").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'provider' argument".to_string());
        };
        dispatch(state, "ci", vec!["setup".to_string(), provider.to_string()]).await
    }
}

pub struct DeployEnvironment;

#[async_trait]
impl McpTool for DeployEnvironment {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "deploy_environment".to_string(),
            description: "Deploy to a target environment via the registered deploy helper".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "target": {"type": "string"},
                    "confirm": {"type": "boolean"}
                },
                "required": ["target"]
            }),
        }
    }

    fn required_profile(&self) -> SecurityProfile {
        SecurityProfile::Development
    }

    fn destructive(&self) -> bool {
        true
    }

    async fn execute(&self, state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(target) = arguments.get("target").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'target' argument".to_string());
        };
        dispatch(state, "deploy", vec![target.to_string()]).await
    }
}
