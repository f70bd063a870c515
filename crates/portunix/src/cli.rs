//! Top-level dispatcher (C5): resolves the first argv token against the
//! built-in table and the helper registry, then either runs a built-in
//! command tree in-process or execs a discovered `ptx-*` helper with
//! inherited stdio (spec.md §4.5).
//!
//! This is hand-rolled rather than a single clap `Cli` because the set of
//! valid subcommands is only fully known once the helper registry has been
//! discovered at runtime — clap's derive macro wants that set at compile
//! time. Built-in subtrees (`container`, `mcp`) still get full clap parsing,
//! just one level down.

use anyhow::Result;
use clap::Parser;
use portunix_core::dispatcher::{self, Route};
use portunix_core::executor::{self, StdioMode};
use portunix_core::helpers::{self, HelperRegistry};

use crate::commands::{container::ContainerCli, mcp::McpCli};

pub async fn run() -> Result<i32> {
    let own_binary = std::env::current_exe().ok();
    let own_dir = own_binary.as_deref().and_then(|p| p.parent()).map(|p| p.to_path_buf());
    let registry = helpers::discover(own_dir.as_deref());

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() {
        print_help(&registry);
        return Ok(0);
    }

    match args[0].as_str() {
        "--help" | "-h" => {
            print_help(&registry);
            return Ok(0);
        }
        "--version" | "-V" => {
            println!("portunix version {}", env!("CARGO_PKG_VERSION"));
            return Ok(0);
        }
        _ => {}
    }

    let command = args[0].clone();
    let rest = &args[1..];

    match dispatcher::resolve(&command, &registry) {
        Ok(Route::Builtin(name)) => dispatch_builtin(&name, rest).await,
        Ok(Route::External(route)) => {
            let outcome = executor::run(&route.helper_path, rest, StdioMode::Inherit)?;
            Ok(outcome.exit_code)
        }
        Err(_) => {
            eprintln!("{}", dispatcher::unknown_command_error(&command, &registry));
            Ok(2)
        }
    }
}

async fn dispatch_builtin(name: &str, rest: &[String]) -> Result<i32> {
    match name {
        "version" => {
            println!("portunix version {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        "help" => {
            let own_dir = std::env::current_exe().ok().and_then(|p| p.parent().map(|p| p.to_path_buf()));
            print_help(&helpers::discover(own_dir.as_deref()));
            Ok(0)
        }
        "container" => {
            let argv = std::iter::once("portunix container".to_string()).chain(rest.iter().cloned());
            let cli = ContainerCli::parse_from(argv);
            crate::commands::container::execute(cli).await
        }
        "mcp" => {
            let argv = std::iter::once("portunix mcp".to_string()).chain(rest.iter().cloned());
            let cli = McpCli::parse_from(argv);
            crate::commands::mcp::execute(cli).await
        }
        other => unreachable!("dispatcher resolved an unregistered built-in: {other}"),
    }
}

fn print_help(registry: &HelperRegistry) {
    println!("portunix version {}", env!("CARGO_PKG_VERSION"));
    println!("Cross-platform developer-environment automation toolkit\n");
    println!("USAGE:");
    println!("    portunix <COMMAND> [ARGS]...\n");
    println!("BUILT-IN COMMANDS:");
    println!("    version               Print the version and exit");
    println!("    help                  Print this help message");
    println!("    container <VERB>      Container runtime abstraction (docker/podman)");
    println!("    mcp <VERB>            MCP server lifecycle and AI-assistant integration");

    // `registry.all()` is keyed by command, not by helper, so a helper
    // serving several commands would otherwise appear once per command.
    let mut helpers: Vec<&portunix_core::helpers::HelperDescriptor> = registry.all().collect();
    helpers.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    helpers.dedup_by(|a, b| a.name == b.name);

    if !helpers.is_empty() {
        println!("\nHELPER-PROVIDED COMMANDS:");
        for helper in helpers {
            println!("    {}:", helper.name);
            for command in &helper.commands {
                println!("        {command}");
            }
        }
    }
}
