//! Project tools: detect project type, inspect dependencies, suggest and
//! validate environment setup.

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::SharedState;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;

use super::McpTool;

/// Marker files used to recognize a project type, checked in declaration
/// order against the current working directory.
const PROJECT_MARKERS: &[(&str, &str)] = &[
    ("Cargo.toml", "rust"),
    ("package.json", "node"),
    ("pyproject.toml", "python"),
    ("requirements.txt", "python"),
    ("go.mod", "go"),
    ("pom.xml", "java-maven"),
    ("build.gradle", "java-gradle"),
    ("Gemfile", "ruby"),
    ("composer.json", "php"),
];

fn detect_in(dir: &Path) -> Option<&'static str> {
    PROJECT_MARKERS
        .iter()
        .find(|(marker, _)| dir.join(marker).exists())
        .map(|(_, kind)| *kind)
}

pub struct DetectProjectType;

#[async_trait]
impl McpTool for DetectProjectType {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "detect_project_type".to_string(),
            description: "Detect the project type of a directory from marker files".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Directory to inspect (defaults to cwd)"}
                }
            }),
        }
    }

    async fn execute(&self, _state: &SharedState, arguments: Value) -> CallToolResult {
        let dir = resolve_dir(&arguments);
        match detect_in(&dir) {
            Some(kind) => CallToolResult::json(&json!({"path": dir.display().to_string(), "project_type": kind})),
            None => CallToolResult::json(&json!({"path": dir.display().to_string(), "project_type": "unknown"})),
        }
    }
}

pub struct AnalyzeDependencies;

#[async_trait]
impl McpTool for AnalyzeDependencies {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "analyze_dependencies".to_string(),
            description: "Summarize dependency manifests found in a directory".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Directory to inspect (defaults to cwd)"}
                }
            }),
        }
    }

    async fn execute(&self, _state: &SharedState, arguments: Value) -> CallToolResult {
        let dir = resolve_dir(&arguments);
        let manifests: Vec<String> = PROJECT_MARKERS
            .iter()
            .map(|(marker, _)| marker.to_string())
            .filter(|marker| dir.join(marker).exists())
            .collect();
        CallToolResult::json(&json!({"path": dir.display().to_string(), "manifests_found": manifests}))
    }
}

pub struct SuggestSetup;

#[async_trait]
impl McpTool for SuggestSetup {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "suggest_setup".to_string(),
            description: "Suggest setup steps based on the detected project type".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Directory to inspect (defaults to cwd)"}
                }
            }),
        }
    }

    async fn execute(&self, _state: &SharedState, arguments: Value) -> CallToolResult {
        let dir = resolve_dir(&arguments);
        let suggestion = match detect_in(&dir) {
            Some("rust") => vec!["portunix install rust", "cargo build"],
            Some("node") => vec!["portunix install node", "npm install"],
            Some("python") => vec!["portunix install python", "pip install -r requirements.txt"],
            Some("go") => vec!["portunix install go", "go mod download"],
            Some(other) => vec![other],
            None => vec!["no recognized project marker found"],
        };
        CallToolResult::json(&json!({"path": dir.display().to_string(), "suggested_steps": suggestion}))
    }
}

pub struct ValidateEnvironment;

#[async_trait]
impl McpTool for ValidateEnvironment {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "validate_environment".to_string(),
            description: "Check that required tools for a project type are available on PATH".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project_type": {"type": "string", "description": "e.g. rust, node, python, go"}
                },
                "required": ["project_type"]
            }),
        }
    }

    async fn execute(&self, _state: &SharedState, arguments: Value) -> CallToolResult {
        let Some(project_type) = arguments.get("project_type").and_then(Value::as_str) else {
            return CallToolResult::error("missing 'project_type' argument".to_string());
        };

        let required_tools: &[&str] = match project_type {
            "rust" => &["cargo", "rustc"],
            "node" => &["node", "npm"],
            "python" => &["python3", "pip3"],
            "go" => &["go"],
            _ => &[],
        };

        let missing: Vec<&str> = required_tools
            .iter()
            .copied()
            .filter(|tool| which::which(tool).is_err())
            .collect();

        CallToolResult::json(&json!({
            "project_type": project_type,
            "required_tools": required_tools,
            "missing_tools": missing,
            "valid": missing.is_empty(),
        }))
    }
}

fn resolve_dir(arguments: &Value) -> std::path::PathBuf {
    arguments
        .get("path")
        .and_then(Value::as_str)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from(".")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_rust_project_from_cargo_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        assert_eq!(detect_in(dir.path()), Some("rust"));
    }

    #[test]
    fn unknown_directory_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_in(dir.path()), None);
    }
}
