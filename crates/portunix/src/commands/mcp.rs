//! `portunix mcp <verb>` — MCP server lifecycle (C6) and AI-assistant
//! integration management (C8). `serve` is the only verb that blocks
//! running the actual JSON-RPC service; the rest manage that lifecycle or
//! a client's registration record.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use portunix_core::pidfile::{self, ServerProcessState};
use portunix_core::security::SecurityProfile;
use portunix_mcp::integration::{self, Assistant, ClaudeScope, ConfigureRequest, ServerType};
use portunix_mcp::state::ServerState;
use portunix_mcp::transport::{stdio::StdioTransport, tcp::TcpTransport, McpTransport};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

#[derive(Parser, Debug)]
#[command(name = "portunix mcp", about = "MCP server lifecycle and AI-assistant integration")]
pub struct McpCli {
    #[command(subcommand)]
    pub verb: McpVerb,
}

#[derive(Subcommand, Debug)]
pub enum McpVerb {
    /// Register Portunix's MCP server with an AI-assistant client
    Configure(ConfigureArgs),
    /// Re-apply a configuration (idempotent with Configure)
    Reconfigure(ConfigureArgs),
    /// Show registration status, either for one assistant or all of them
    Status {
        assistant: Option<String>,
    },
    /// Unregister Portunix's MCP server from an AI-assistant client
    Remove {
        assistant: String,
        #[arg(long, default_value = "local")]
        scope: String,
    },
    /// Interactive setup wizard
    Init,
    /// Run the MCP JSON-RPC server (blocks)
    Serve(ServeArgs),
    /// Start the server as a background daemon
    Start(ServeArgs),
    /// Stop a running daemon
    Stop {
        #[arg(long)]
        force: bool,
    },
    /// Probe whether a server is currently reachable
    Test,
    /// Print the persisted MCP configuration document
    Config,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigureArgs {
    /// claude-code, claude-desktop, or gemini-cli
    pub assistant: String,
    #[arg(long, default_value = "local")]
    pub scope: String,
    #[arg(long)]
    pub transport: Option<String>,
    #[arg(long, default_value_t = 3001)]
    pub port: u16,
    #[arg(long, default_value = "standard")]
    pub security_profile: String,
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "stdio")]
    pub transport: String,
    #[arg(long, default_value_t = 3001)]
    pub port: u16,
    #[arg(long)]
    pub socket: Option<PathBuf>,
    #[arg(long, default_value = "standard")]
    pub security_profile: String,
}

fn parse_scope(raw: &str) -> Result<ClaudeScope> {
    match raw {
        "local" => Ok(ClaudeScope::Local),
        "user" => Ok(ClaudeScope::User),
        "project" => Ok(ClaudeScope::Project),
        other => bail!("unknown scope '{other}' (expected local, user, or project)"),
    }
}

#[instrument(skip(cli))]
pub async fn execute(cli: McpCli) -> Result<i32> {
    match cli.verb {
        McpVerb::Configure(args) => configure(args, false).await,
        McpVerb::Reconfigure(args) => configure(args, true).await,
        McpVerb::Status { assistant } => status(assistant),
        McpVerb::Remove { assistant, scope } => remove(assistant, scope).await,
        McpVerb::Init => init().await,
        McpVerb::Serve(args) => serve(args).await,
        McpVerb::Start(args) => start(args).await,
        McpVerb::Stop { force } => stop(force),
        McpVerb::Test => test(),
        McpVerb::Config => print_config(),
    }
}

async fn configure(args: ConfigureArgs, _reconfigure: bool) -> Result<i32> {
    let assistant: Assistant = args.assistant.parse().map_err(anyhow::Error::msg)?;
    let scope = parse_scope(&args.scope)?;
    let own_binary = std::env::current_exe().context("resolving own binary path")?;

    let mut req = ConfigureRequest::new(assistant, own_binary);
    req.scope = scope;
    req.port = args.port;
    req.security_profile = args.security_profile.clone();
    req.force = args.force;
    if let Some(transport) = &args.transport {
        req.server_type = match transport.as_str() {
            "stdio" => ServerType::Stdio,
            "remote" => ServerType::Remote,
            other => bail!("unknown transport '{other}' (expected stdio or remote)"),
        };
    }

    integration::configure(req).await?;
    println!("configured {} for MCP server 'portunix'", assistant.as_str());
    Ok(0)
}

fn status(assistant: Option<String>) -> Result<i32> {
    match assistant {
        Some(name) => {
            let assistant: Assistant = name.parse().map_err(anyhow::Error::msg)?;
            match integration::status(assistant)? {
                Some(config) => {
                    println!(
                        "{}: configured={} (server_type={})",
                        config.name, config.configured, config.server_type
                    );
                }
                None => println!("{}: not configured", assistant.as_str()),
            }
        }
        None => {
            let config = integration::status_all()?;
            if config.assistants.is_empty() {
                println!("no assistants configured");
            }
            for assistant_config in &config.assistants {
                println!(
                    "{}: configured={} (server_type={})",
                    assistant_config.name, assistant_config.configured, assistant_config.server_type
                );
            }
        }
    }
    print_server_process_status()?;
    Ok(0)
}

fn print_server_process_status() -> Result<()> {
    let dir = portunix_core::mcp_config::config_dir()?;
    match pidfile::read(&dir)? {
        Some(state) => println!(
            "server: running (pid={}, transport={}, address={}, started_at={})",
            state.pid, state.transport, state.address, state.started_at
        ),
        None => println!("server: not running"),
    }
    Ok(())
}

async fn remove(assistant: String, scope: String) -> Result<i32> {
    let assistant: Assistant = assistant.parse().map_err(anyhow::Error::msg)?;
    let scope = parse_scope(&scope)?;
    integration::remove(assistant, scope).await?;
    println!("removed {} MCP registration", assistant.as_str());
    Ok(0)
}

/// `mcp init`: a minimal interactive wizard over stdin/stdout, asking which
/// assistant and scope to register. No prompt-rendering crate is pulled in
/// for three plain questions.
async fn init() -> Result<i32> {
    println!("Portunix MCP setup wizard");
    let assistant_raw = prompt("Assistant [claude-code/claude-desktop/gemini-cli] (claude-code): ")?;
    let assistant_raw = if assistant_raw.is_empty() { "claude-code".to_string() } else { assistant_raw };
    let assistant: Assistant = assistant_raw.parse().map_err(anyhow::Error::msg)?;

    let scope_raw = prompt("Scope [local/user/project] (local): ")?;
    let scope_raw = if scope_raw.is_empty() { "local".to_string() } else { scope_raw };
    let scope = parse_scope(&scope_raw)?;

    let own_binary = std::env::current_exe().context("resolving own binary path")?;
    let mut req = ConfigureRequest::new(assistant, own_binary);
    req.scope = scope;

    integration::configure(req).await?;
    println!("configured {} for MCP server 'portunix'", assistant.as_str());
    Ok(0)
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    print!("{label}");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn serve(args: ServeArgs) -> Result<i32> {
    let profile = SecurityProfile::from_str(&args.security_profile).map_err(anyhow::Error::msg)?;
    let own_binary = std::env::current_exe().context("resolving own binary path")?;
    let own_dir = own_binary.parent().map(|p| p.to_path_buf());
    let config_dir = portunix_core::mcp_config::config_dir()?;

    let helper_registry = portunix_core::helpers::discover(own_dir.as_deref());
    let audit_log = portunix_core::audit::AuditLog::open(config_dir.join("audit.jsonl"));
    let state = Arc::new(RwLock::new(ServerState::new(profile, audit_log, helper_registry, own_binary)));
    let tools = portunix_mcp::tools::build_tool_registry();
    let server = Arc::new(portunix_mcp::McpServer::new(state, tools));

    let address = match args.transport.as_str() {
        "stdio" => "-".to_string(),
        "tcp" => format!("127.0.0.1:{}", args.port),
        "unix" => args
            .socket
            .clone()
            .unwrap_or_else(|| config_dir.join("mcp-server.sock"))
            .display()
            .to_string(),
        other => bail!("unknown transport '{other}' (expected stdio, tcp, or unix)"),
    };

    let process_state = ServerProcessState {
        pid: std::process::id(),
        transport: args.transport.clone(),
        address: address.clone(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };
    pidfile::write(&config_dir, &process_state)?;

    info!(transport = %args.transport, %address, "starting MCP server");

    let result = match args.transport.as_str() {
        "stdio" => StdioTransport.serve(server).await,
        "tcp" => {
            let addr = address.parse().context("parsing tcp bind address")?;
            TcpTransport { addr }.serve(server).await
        }
        #[cfg(unix)]
        "unix" => {
            let path = args.socket.unwrap_or_else(|| config_dir.join("mcp-server.sock"));
            portunix_mcp::transport::unix::UnixTransport { path }.serve(server).await
        }
        #[cfg(not(unix))]
        "unix" => bail!("the unix transport is only available on unix-like platforms"),
        other => bail!("unknown transport '{other}'"),
    };

    let _ = pidfile::remove(&config_dir);
    result?;
    Ok(0)
}

/// `mcp start`: spawn `mcp serve` as a detached background process and
/// return immediately, leaving the PID file as the rendezvous point for
/// `status`/`stop`/`test`.
async fn start(args: ServeArgs) -> Result<i32> {
    let own_binary = std::env::current_exe().context("resolving own binary path")?;

    let mut spawn_args = vec!["mcp".to_string(), "serve".to_string(), "--transport".to_string(), args.transport.clone()];
    spawn_args.push("--port".to_string());
    spawn_args.push(args.port.to_string());
    if let Some(socket) = &args.socket {
        spawn_args.push("--socket".to_string());
        spawn_args.push(socket.display().to_string());
    }
    spawn_args.push("--security-profile".to_string());
    spawn_args.push(args.security_profile.clone());

    let child = tokio::process::Command::new(&own_binary)
        .args(&spawn_args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("spawning detached MCP server process")?;

    println!("started MCP server daemon (pid {})", child.id().unwrap_or(0));
    Ok(0)
}

fn stop(force: bool) -> Result<i32> {
    let dir = portunix_core::mcp_config::config_dir()?;
    let grace = if force { Duration::from_millis(0) } else { Duration::from_secs(5) };
    match pidfile::stop(&dir, grace) {
        Ok(()) => {
            println!("stopped MCP server");
            Ok(0)
        }
        Err(e) => {
            warn!(error = %e, "mcp stop failed");
            println!("{e}");
            Ok(1)
        }
    }
}

fn test() -> Result<i32> {
    let dir = portunix_core::mcp_config::config_dir()?;
    match pidfile::read(&dir)? {
        Some(state) => {
            println!("MCP server is running (pid={}, transport={})", state.pid, state.transport);
            Ok(0)
        }
        None => {
            println!("MCP server is not running");
            Ok(1)
        }
    }
}

fn print_config() -> Result<i32> {
    let config = integration::status_all()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(0)
}
