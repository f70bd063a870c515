//! MCP Integration Manager (C8).
//!
//! Registers Portunix as an MCP server inside third-party AI-assistant
//! clients. claude-code is wrapped by shelling out to the `claude` CLI's own
//! `mcp` subcommand (grounded on the codex wrapper's request-builder
//! pattern: build an argv, run it, parse stdout); claude-desktop is a direct
//! JSON file edit under its per-user application-data directory; gemini-cli
//! is declared but intentionally a stub — its absence must never break the
//! other two paths (spec.md §4.8).

use portunix_core::errors::{PortunixError, Result};
use portunix_core::mcp_config::{self, AssistantConfig, McpConfiguration};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// The three AI-assistant clients Portunix knows how to register with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assistant {
    ClaudeCode,
    ClaudeDesktop,
    GeminiCli,
}

impl Assistant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude-code",
            Self::ClaudeDesktop => "claude-desktop",
            Self::GeminiCli => "gemini-cli",
        }
    }

    /// Default transport per spec.md §3: claude-code and gemini-cli default
    /// to stdio (the client launches the server itself); claude-desktop
    /// defaults to a remote (tcp) transport since it is not a CLI that can
    /// spawn and own a child process the way the other two are.
    pub fn default_transport(&self) -> ServerType {
        match self {
            Self::ClaudeCode | Self::GeminiCli => ServerType::Stdio,
            Self::ClaudeDesktop => ServerType::Remote,
        }
    }
}

impl std::str::FromStr for Assistant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "claude-code" => Ok(Self::ClaudeCode),
            "claude-desktop" => Ok(Self::ClaudeDesktop),
            "gemini-cli" => Ok(Self::GeminiCli),
            other => Err(format!(
                "unknown assistant '{other}' (expected claude-code, claude-desktop, or gemini-cli)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    Stdio,
    Remote,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Remote => "remote",
        }
    }
}

/// `claude mcp add --scope <scope>`. Mirrors the registration scoping
/// `claude` itself exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaudeScope {
    Local,
    User,
    Project,
}

impl ClaudeScope {
    fn as_arg(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::User => "user",
            Self::Project => "project",
        }
    }
}

/// Inputs shared by `Configure`/`Reconfigure`.
#[derive(Debug, Clone)]
pub struct ConfigureRequest {
    pub assistant: Assistant,
    pub scope: ClaudeScope,
    pub server_type: ServerType,
    pub port: u16,
    pub security_profile: String,
    pub own_binary: PathBuf,
    pub force: bool,
}

impl ConfigureRequest {
    pub fn new(assistant: Assistant, own_binary: PathBuf) -> Self {
        Self {
            assistant,
            scope: ClaudeScope::Local,
            server_type: assistant.default_transport(),
            port: 3001,
            security_profile: "standard".to_string(),
            own_binary,
            force: false,
        }
    }
}

const PORTUNIX_SERVER_NAME: &str = "portunix";

fn mcp_serve_argv(req: &ConfigureRequest) -> Vec<String> {
    let mut argv = vec!["mcp".to_string(), "serve".to_string()];
    match req.server_type {
        ServerType::Stdio => {}
        ServerType::Remote => {
            argv.push("--transport".to_string());
            argv.push("tcp".to_string());
            argv.push("--port".to_string());
            argv.push(req.port.to_string());
        }
    }
    argv
}

/// Locate the `claude` CLI on `PATH`. A missing CLI is a user-facing
/// precondition-unmet error carrying a concrete install hint, never a panic
/// and never an abort of the whole configure flow — callers for other
/// assistants keep working.
fn find_claude_cli() -> Result<PathBuf> {
    which::which("claude").map_err(|_| {
        PortunixError::precondition_unmet(
            "the `claude` CLI was not found on PATH",
            "install Claude Code from https://claude.ai/code and ensure `claude` is on PATH",
        )
    })
}

#[instrument(skip(req))]
async fn configure_claude_code(req: &ConfigureRequest) -> Result<()> {
    let claude = find_claude_cli()?;
    let serve_argv = mcp_serve_argv(req);

    let mut args = vec![
        "mcp".to_string(),
        "add".to_string(),
        "--scope".to_string(),
        req.scope.as_arg().to_string(),
        PORTUNIX_SERVER_NAME.to_string(),
        req.own_binary.display().to_string(),
    ];
    args.extend(serve_argv);

    debug!(?args, "invoking claude CLI to register MCP server");
    let output = Command::new(&claude)
        .args(&args)
        .output()
        .await
        .map_err(PortunixError::Io)?;

    if !output.status.success() {
        return Err(PortunixError::ExternalNonZero {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    verify_claude_code_registered(&claude).await
}

/// `Status()` verification step: list registered servers and assert
/// `portunix` is present, per the round-trip property in spec.md §8.
async fn verify_claude_code_registered(claude: &std::path::Path) -> Result<()> {
    let output = Command::new(claude)
        .args(["mcp", "list"])
        .output()
        .await
        .map_err(PortunixError::Io)?;

    if !output.status.success() {
        return Err(PortunixError::ExternalNonZero {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.contains(PORTUNIX_SERVER_NAME) {
        Ok(())
    } else {
        Err(PortunixError::internal_invariant(
            "claude mcp add reported success but `claude mcp list` does not show portunix",
        ))
    }
}

async fn remove_claude_code(scope: ClaudeScope) -> Result<()> {
    let claude = find_claude_cli()?;
    let output = Command::new(&claude)
        .args(["mcp", "remove", "--scope", scope.as_arg(), PORTUNIX_SERVER_NAME])
        .output()
        .await
        .map_err(PortunixError::Io)?;

    if !output.status.success() {
        return Err(PortunixError::ExternalNonZero {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

/// Per-user config file claude-desktop itself reads; Portunix edits it
/// in-place, preserving unrelated `mcpServers` entries.
fn claude_desktop_config_path() -> Result<PathBuf> {
    let base = directories_next::BaseDirs::new().ok_or_else(|| {
        PortunixError::internal_invariant("could not resolve a home directory for this user")
    })?;

    let dir = if cfg!(target_os = "macos") {
        base.home_dir().join("Library/Application Support/Claude")
    } else if cfg!(target_os = "windows") {
        base.config_dir().join("Claude")
    } else {
        base.config_dir().join("Claude")
    };

    Ok(dir.join("claude_desktop_config.json"))
}

/// Writes the claude-desktop config, then rereads it to confirm the written
/// entry is actually present with the expected command — the readback step
/// that moves `AssistantConfig.configured` from present-unverified to
/// present-verified (spec.md §4.8). Returns `false` rather than erroring if
/// the readback doesn't confirm it, so a write that nonetheless landed
/// (e.g. another process mutated the file in between) is not reported as a
/// hard failure.
#[instrument(skip(req))]
fn configure_claude_desktop(req: &ConfigureRequest) -> Result<bool> {
    let path = claude_desktop_config_path()?;

    let mut root: serde_json::Value = match std::fs::read_to_string(&path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|_| {
            if req.force {
                warn!(path = %path.display(), "existing claude_desktop_config.json is corrupted, replacing (--force)");
                serde_json::json!({})
            } else {
                warn!(path = %path.display(), "existing claude_desktop_config.json is corrupted, leaving untouched except for our entry");
                serde_json::json!({})
            }
        }),
        Err(_) => serde_json::json!({}),
    };

    let entry = serde_json::json!({
        "command": req.own_binary.display().to_string(),
        "args": mcp_serve_argv(req),
    });

    if !root.is_object() {
        root = serde_json::json!({});
    }
    let obj = root.as_object_mut().expect("just ensured object");
    let servers = obj
        .entry("mcpServers")
        .or_insert_with(|| serde_json::json!({}));
    if !servers.is_object() {
        *servers = serde_json::json!({});
    }
    servers
        .as_object_mut()
        .expect("just ensured object")
        .insert(PORTUNIX_SERVER_NAME.to_string(), entry);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = serde_json::to_string_pretty(&root).map_err(PortunixError::Json)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, rendered)?;
    std::fs::rename(&tmp, &path)?;
    debug!(path = %path.display(), "wrote claude-desktop MCP configuration");

    let verified = std::fs::read_to_string(&path)
        .ok()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
        .and_then(|root| root.get("mcpServers")?.get(PORTUNIX_SERVER_NAME)?.get("command")?.as_str().map(str::to_string))
        .is_some_and(|command| command == req.own_binary.display().to_string());

    Ok(verified)
}

fn remove_claude_desktop() -> Result<()> {
    let path = claude_desktop_config_path()?;
    if !path.exists() {
        return Ok(());
    }
    let raw = std::fs::read_to_string(&path)?;
    let mut root: serde_json::Value = serde_json::from_str(&raw).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(servers) = root.get_mut("mcpServers").and_then(|v| v.as_object_mut()) {
        servers.remove(PORTUNIX_SERVER_NAME);
    }
    let rendered = serde_json::to_string_pretty(&root).map_err(PortunixError::Json)?;
    std::fs::write(&path, rendered)?;
    Ok(())
}

/// gemini-cli integration is declared but not implemented; returning a
/// precondition-unmet error here (rather than panicking or pretending to
/// succeed) is what keeps its absence from breaking claude-code/
/// claude-desktop configuration in the same `mcp configure --all` run.
fn configure_gemini_cli() -> Result<()> {
    Err(PortunixError::precondition_unmet(
        "gemini-cli MCP integration is not yet implemented",
        "configure claude-code or claude-desktop instead",
    ))
}

/// Is `port` free to bind on localhost right now? Used only as an up-front
/// diagnostic before writing a remote-transport registration; the server
/// itself re-binds (and can race with another process) when it actually
/// starts, so this is advisory, not a reservation.
fn port_is_free(port: u16) -> bool {
    std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Scan upward from `start` for up to three free ports to suggest when
/// `start` itself is taken (spec.md §4.8).
fn suggest_free_ports(start: u16, count: usize) -> Vec<u16> {
    let mut found = Vec::with_capacity(count);
    let mut candidate = start.saturating_add(1);
    while found.len() < count && candidate != 0 {
        if port_is_free(candidate) {
            found.push(candidate);
        }
        match candidate.checked_add(1) {
            Some(next) => candidate = next,
            None => break,
        }
    }
    found
}

/// Up-front port-conflict check for remote-transport registration: a taken
/// port is a precondition-unmet error whose `fix` names three free
/// alternatives rather than leaving the user to guess one.
fn check_port_available(port: u16) -> Result<()> {
    if port_is_free(port) {
        return Ok(());
    }
    let alternatives = suggest_free_ports(port, 3);
    let fix = if alternatives.is_empty() {
        "choose a different --port".to_string()
    } else {
        format!(
            "use one of these free ports instead: {}",
            alternatives
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    Err(PortunixError::precondition_unmet(
        format!("port {port} is already in use"),
        fix,
    ))
}

/// `Configure`: register Portunix's MCP server with `req.assistant`, then
/// persist the registration locally so `Status` can report it without
/// re-probing the client every time.
#[instrument(skip(req))]
pub async fn configure(req: ConfigureRequest) -> Result<()> {
    if req.server_type == ServerType::Remote {
        check_port_available(req.port)?;
    }

    // `claude mcp add` already ends in `verify_claude_code_registered`, so
    // reaching past this arm without an error means claude-code is verified.
    // `configure_gemini_cli` always errors, so its arm never runs.
    let configured = match req.assistant {
        Assistant::ClaudeCode => {
            configure_claude_code(&req).await?;
            true
        }
        Assistant::ClaudeDesktop => configure_claude_desktop(&req)?,
        Assistant::GeminiCli => {
            configure_gemini_cli()?;
            true
        }
    };

    let mut config = mcp_config::load()?;
    config.server_type = req.server_type.as_str().to_string();
    config.security_profile = req.security_profile.clone();
    match req.server_type {
        ServerType::Remote => {
            config.port = Some(req.port);
            config.protocol = Some("http".to_string());
        }
        ServerType::Stdio => {
            config.port = None;
            config.protocol = None;
        }
    }
    config.set(AssistantConfig {
        name: req.assistant.as_str().to_string(),
        server_type: req.server_type.as_str().to_string(),
        configured,
    });
    mcp_config::save(&config)
}

/// `Reconfigure`: identical to `Configure` — idempotent by construction,
/// since `claude mcp add` and the claude-desktop JSON edit are themselves
/// idempotent (spec.md §8's idempotence property).
pub async fn reconfigure(req: ConfigureRequest) -> Result<()> {
    configure(req).await
}

/// `Remove`: unregister from the client and drop the local record. Removal
/// from the assistant succeeds-if-absent: removing a server that was never
/// registered is not an error, matching `Status` reporting absence either way.
#[instrument]
pub async fn remove(assistant: Assistant, scope: ClaudeScope) -> Result<()> {
    match assistant {
        Assistant::ClaudeCode => {
            if let Err(e) = remove_claude_code(scope).await {
                warn!(error = %e, "claude mcp remove reported an error, proceeding to drop local record anyway");
            }
        }
        Assistant::ClaudeDesktop => remove_claude_desktop()?,
        Assistant::GeminiCli => {}
    }

    let mut config = mcp_config::load()?;
    config.remove(assistant.as_str());
    mcp_config::save(&config)
}

/// `Status`: read back the locally persisted registration record. Does not
/// re-probe the assistant client itself — `Configure`'s verification step is
/// what establishes trust in the record at write time.
pub fn status(assistant: Assistant) -> Result<Option<AssistantConfig>> {
    let config = mcp_config::load()?;
    Ok(config.get(assistant.as_str()).cloned())
}

pub fn status_all() -> Result<McpConfiguration> {
    mcp_config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_round_trips_through_str() {
        for a in [Assistant::ClaudeCode, Assistant::ClaudeDesktop, Assistant::GeminiCli] {
            let parsed: Assistant = a.as_str().parse().unwrap();
            assert_eq!(parsed.as_str(), a.as_str());
        }
    }

    #[test]
    fn unknown_assistant_name_is_rejected() {
        assert!("chatgpt".parse::<Assistant>().is_err());
    }

    #[test]
    fn default_transport_matches_spec_table() {
        assert_eq!(Assistant::ClaudeCode.default_transport().as_str(), "stdio");
        assert_eq!(Assistant::ClaudeDesktop.default_transport().as_str(), "remote");
        assert_eq!(Assistant::GeminiCli.default_transport().as_str(), "stdio");
    }

    #[test]
    fn mcp_serve_argv_carries_port_only_for_remote() {
        let req = ConfigureRequest {
            assistant: Assistant::ClaudeDesktop,
            scope: ClaudeScope::Local,
            server_type: ServerType::Remote,
            port: 4002,
            security_profile: "standard".to_string(),
            own_binary: PathBuf::from("/usr/local/bin/portunix"),
            force: false,
        };
        let argv = mcp_serve_argv(&req);
        assert!(argv.contains(&"4002".to_string()));

        let stdio_req = ConfigureRequest { server_type: ServerType::Stdio, ..req };
        let stdio_argv = mcp_serve_argv(&stdio_req);
        assert_eq!(stdio_argv, vec!["mcp".to_string(), "serve".to_string()]);
    }

    #[tokio::test]
    async fn gemini_cli_configure_fails_without_aborting_process() {
        let result = configure_gemini_cli();
        assert!(result.is_err());
    }

    #[test]
    fn port_conflict_suggests_three_free_alternatives() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let taken = listener.local_addr().unwrap().port();

        let err = check_port_available(taken).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("already in use"));
        assert!(message.contains("free ports instead"));

        drop(listener);
    }

    #[test]
    fn free_port_passes_the_check() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(check_port_available(port).is_ok());
    }
}
