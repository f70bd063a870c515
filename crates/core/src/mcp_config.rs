//! MCP integration configuration persistence.
//!
//! Tracks which AI-assistant clients Portunix's MCP server has been
//! registered with, and under what transport, so `mcp status` and
//! `mcp reconfigure` can reason about prior registrations without re-probing
//! every client on every invocation.

use crate::errors::{PortunixError, Result};
use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// One assistant client's recorded MCP registration (spec.md §3
/// `AssistantConfig`). `configured` is persisted explicitly rather than
/// derived from presence in `assistants`, so it can carry the
/// present-unverified/present-verified distinction from spec.md §4.8's
/// state machine instead of collapsing both into a bare `true`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistantConfig {
    pub name: String,
    pub server_type: String,
    pub configured: bool,
}

/// Root persisted document: `<config_dir>/mcp-server.json` (spec.md §6).
/// `server_type`/`port`/`protocol`/`security_profile` are the server's own
/// last-configured transport settings; `assistants` is the ordered list of
/// clients that have been registered against it (spec.md §3: "ordered list
/// of `AssistantConfig`").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct McpConfiguration {
    pub server_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub security_profile: String,
    #[serde(default)]
    pub assistants: Vec<AssistantConfig>,
}

impl Default for McpConfiguration {
    fn default() -> Self {
        Self {
            server_type: "stdio".to_string(),
            port: None,
            protocol: None,
            security_profile: "standard".to_string(),
            assistants: Vec::new(),
        }
    }
}

impl McpConfiguration {
    /// Insert `config`, replacing any existing entry with the same `name`
    /// (spec.md §3 invariant: `name` is unique within a configuration).
    pub fn set(&mut self, config: AssistantConfig) {
        match self.assistants.iter_mut().find(|a| a.name == config.name) {
            Some(existing) => *existing = config,
            None => self.assistants.push(config),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AssistantConfig> {
        let index = self.assistants.iter().position(|a| a.name == name)?;
        Some(self.assistants.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&AssistantConfig> {
        self.assistants.iter().find(|a| a.name == name)
    }
}

/// Resolve the per-user config directory Portunix writes to:
/// `~/.config/portunix` on Linux, `~/Library/Application Support/portunix`
/// on macOS, `%APPDATA%\portunix` on Windows, per `directories-next`
/// conventions applied with an empty qualifier/organization.
pub fn config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "portunix").ok_or_else(|| {
        PortunixError::internal_invariant("could not resolve a home directory for this user")
    })?;
    Ok(dirs.config_dir().to_path_buf())
}

fn config_path(dir: &Path) -> PathBuf {
    dir.join("mcp-server.json")
}

#[instrument]
pub fn load() -> Result<McpConfiguration> {
    load_from(&config_dir()?)
}

fn load_from(dir: &Path) -> Result<McpConfiguration> {
    let path = config_path(dir);
    if !path.exists() {
        return Ok(McpConfiguration::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    serde_json::from_str(&raw).map_err(PortunixError::Json)
}

#[instrument(skip(config))]
pub fn save(config: &McpConfiguration) -> Result<()> {
    let dir = config_dir()?;
    save_to(&dir, config)
}

fn save_to(dir: &Path, config: &McpConfiguration) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = config_path(dir);
    let rendered = serde_json::to_string_pretty(config).map_err(PortunixError::Json)?;

    // Write-then-rename keeps a crash mid-write from corrupting a
    // previously-valid file.
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, rendered)?;
    std::fs::rename(&tmp_path, &path)?;
    debug!(path = %path.display(), "wrote MCP configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(dir.path()).unwrap();
        assert!(config.assistants.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = McpConfiguration::default();
        config.set(AssistantConfig {
            name: "claude-code".to_string(),
            server_type: "stdio".to_string(),
            configured: true,
        });
        save_to(dir.path(), &config).unwrap();

        let reloaded = load_from(dir.path()).unwrap();
        assert_eq!(reloaded.get("claude-code"), config.get("claude-code"));
    }

    #[test]
    fn set_replaces_existing_entry_for_same_name() {
        let mut config = McpConfiguration::default();
        config.set(AssistantConfig {
            name: "claude-code".to_string(),
            server_type: "stdio".to_string(),
            configured: false,
        });
        config.set(AssistantConfig {
            name: "claude-code".to_string(),
            server_type: "stdio".to_string(),
            configured: true,
        });
        assert_eq!(config.assistants.len(), 1);
        assert!(config.get("claude-code").unwrap().configured);
    }

    #[test]
    fn remove_drops_entry() {
        let mut config = McpConfiguration::default();
        config.set(AssistantConfig {
            name: "claude-desktop".to_string(),
            server_type: "stdio".to_string(),
            configured: false,
        });
        assert!(config.remove("claude-desktop").is_some());
        assert!(config.get("claude-desktop").is_none());
    }

    #[test]
    fn assistants_serialize_as_a_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = McpConfiguration::default();
        config.set(AssistantConfig {
            name: "claude-code".to_string(),
            server_type: "stdio".to_string(),
            configured: true,
        });
        save_to(dir.path(), &config).unwrap();

        let raw = std::fs::read_to_string(config_path(dir.path())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["assistants"].is_array());
        assert_eq!(value["assistants"][0]["name"], "claude-code");
        assert_eq!(value["assistants"][0]["configured"], true);
    }

    #[test]
    fn server_fields_round_trip_field_by_field() {
        let dir = tempfile::tempdir().unwrap();
        let config = McpConfiguration {
            server_type: "remote".to_string(),
            port: Some(4100),
            protocol: Some("https".to_string()),
            security_profile: "restricted".to_string(),
            assistants: Vec::new(),
        };
        save_to(dir.path(), &config).unwrap();

        let reloaded = load_from(dir.path()).unwrap();
        assert_eq!(reloaded.server_type, config.server_type);
        assert_eq!(reloaded.port, config.port);
        assert_eq!(reloaded.protocol, config.protocol);
        assert_eq!(reloaded.security_profile, config.security_profile);
    }
}
