//! Tool registry and the single permission/audit chokepoint every tool call
//! passes through (spec.md §4.7) — individual tools never re-implement
//! their own gating.

pub mod containers;
pub mod packages;
pub mod project;
pub mod safety;
pub mod system;
pub mod workflow;

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::SharedState;
use async_trait::async_trait;
use chrono::Utc;
use portunix_core::audit::{AuditOutcome, AuditRecord};
use portunix_core::redaction::redact_json;
use portunix_core::security::SecurityProfile;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Trait implemented by each MCP tool exposed by this server.
#[async_trait]
pub trait McpTool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Minimum security profile under which this tool may run at all.
    /// Defaults to `Restricted` (always runnable) — override for tools
    /// that mutate state.
    fn required_profile(&self) -> SecurityProfile {
        SecurityProfile::Restricted
    }

    /// Whether this tool performs a destructive action that, under the
    /// `standard` profile, requires an explicit `"confirm": true` argument.
    fn destructive(&self) -> bool {
        false
    }

    async fn execute(&self, state: &SharedState, arguments: Value) -> CallToolResult;
}

pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn McpTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Box<dyn McpTool>) {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
    }

    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Dispatch a `tools/call`: check the permission gate, run the tool,
    /// record an audit entry, and return the result. This is the only place
    /// in the codebase that checks `SecurityProfile` against a tool's
    /// requirements.
    pub async fn execute(&self, name: &str, state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(tool) = self.tools.get(name) else {
            return CallToolResult::error(format!("Unknown tool: {name}"));
        };

        let profile = state.read().await.security_profile();
        let required = tool.required_profile();

        if !profile.permits(required) {
            self.audit(state, name, &arguments, profile, AuditOutcome::Denied)
                .await;
            return CallToolResult::error(format!(
                "tool '{name}' requires security profile '{required}' or higher; server is running as '{profile}'"
            ));
        }

        if tool.destructive() && profile == SecurityProfile::Standard {
            let confirmed = arguments
                .get("confirm")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !confirmed {
                self.audit(state, name, &arguments, profile, AuditOutcome::Denied)
                    .await;
                return CallToolResult::error(format!(
                    "tool '{name}' is destructive; pass \"confirm\": true to proceed under the 'standard' profile"
                ));
            }
        }

        let result = tool.execute(state, arguments.clone()).await;
        let outcome = if result.is_error.unwrap_or(false) {
            AuditOutcome::Error
        } else {
            AuditOutcome::Allowed
        };
        self.audit(state, name, &arguments, profile, outcome).await;
        result
    }

    async fn audit(
        &self,
        state: &SharedState,
        tool: &str,
        arguments: &Value,
        profile: SecurityProfile,
        outcome: AuditOutcome,
    ) {
        let record = AuditRecord {
            timestamp: Utc::now().to_rfc3339(),
            tool: tool.to_string(),
            arguments: redact_json(arguments),
            profile: profile.to_string(),
            outcome,
        };
        let guard = state.read().await;
        if let Err(e) = guard.audit_log().append(&record) {
            warn!(error = %e, "failed to write audit record");
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the closed tool set declared in spec.md §4.7.
pub fn build_tool_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Box::new(system::GetSystemInfo));
    registry.register(Box::new(system::GetCapabilities));
    registry.register(Box::new(system::GetEnvironment));

    registry.register(Box::new(project::DetectProjectType));
    registry.register(Box::new(project::AnalyzeDependencies));
    registry.register(Box::new(project::SuggestSetup));
    registry.register(Box::new(project::ValidateEnvironment));

    registry.register(Box::new(packages::ListAvailablePackages));
    registry.register(Box::new(packages::InstallPackage));
    registry.register(Box::new(packages::CheckInstalled));
    registry.register(Box::new(packages::UpdatePackages));

    registry.register(Box::new(containers::ListContainers));
    registry.register(Box::new(containers::ManageContainer));
    registry.register(Box::new(containers::GetContainerInfo));
    registry.register(Box::new(containers::CreateSandbox));

    registry.register(Box::new(safety::ValidateCommand));
    registry.register(Box::new(safety::GetPermissions));
    registry.register(Box::new(safety::AuditLogTool));

    registry.register(Box::new(workflow::CreateProject));
    registry.register(Box::new(workflow::SetupCiCd));
    registry.register(Box::new(workflow::DeployEnvironment));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_tool_registry_exposes_every_declared_tool() {
        let registry = build_tool_registry();
        let names: Vec<String> = registry.list_definitions().into_iter().map(|d| d.name).collect();
        for expected in [
            "get_system_info",
            "get_capabilities",
            "get_environment",
            "detect_project_type",
            "analyze_dependencies",
            "suggest_setup",
            "validate_environment",
            "list_available_packages",
            "install_package",
            "check_installed",
            "update_packages",
            "list_containers",
            "manage_container",
            "get_container_info",
            "create_sandbox",
            "validate_command",
            "get_permissions",
            "audit_log",
            "create_project",
            "setup_ci_cd",
            "deploy_environment",
        ] {
            assert!(names.contains(&expected.to_string()), "missing tool {expected}");
        }
    }
}
