//! `portunix container <verb>` — thin clap front end over the Container
//! Abstraction (C3) in `portunix-core`. Help flags are handled by clap
//! before any subcommand body runs, which is what keeps subcommand help
//! printable without a runtime installed (spec.md §4.3).

use anyhow::Result;
use clap::{Parser, Subcommand};
use portunix_core::container::{self, RunOptions};
use portunix_core::runtime::Runtime;
use std::path::PathBuf;
use tracing::instrument;

#[derive(Parser, Debug)]
#[command(name = "portunix container", about = "Container runtime abstraction (docker/podman)")]
pub struct ContainerCli {
    /// Force a specific runtime instead of auto-selecting (podman first,
    /// docker as fallback).
    #[arg(long, global = true, value_enum)]
    pub runtime: Option<RuntimeArg>,

    #[command(subcommand)]
    pub verb: ContainerVerb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RuntimeArg {
    Docker,
    Podman,
}

impl From<RuntimeArg> for Runtime {
    fn from(value: RuntimeArg) -> Self {
        match value {
            RuntimeArg::Docker => Runtime::Docker,
            RuntimeArg::Podman => Runtime::Podman,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ContainerVerb {
    /// Create and run a container
    Run {
        image: String,
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
        #[arg(short, long)]
        detach: bool,
        #[arg(long)]
        rm: bool,
        #[arg(short = 'i', long)]
        interactive: bool,
        #[arg(short = 't', long)]
        tty: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
        #[arg(short, long = "volume", value_name = "HOST:CONTAINER")]
        volume: Vec<String>,
        #[arg(short, long = "publish", value_name = "HOST:CONTAINER")]
        publish: Vec<String>,
        #[arg(short, long)]
        workdir: Option<String>,
    },
    /// Launch an ephemeral container that bind-mounts this binary and runs
    /// `portunix install <installation-type>` inside it, for testing
    /// installers in isolation.
    RunInContainer {
        installation_type: String,
        #[arg(long, default_value = "ubuntu:22.04")]
        image: String,
    },
    /// Run a command inside a running container
    Exec {
        container: String,
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
        #[arg(short = 'i', long)]
        interactive: bool,
    },
    /// List containers across every available runtime
    List {
        #[arg(short, long)]
        all: bool,
    },
    Stop { container: String },
    Start { container: String },
    Rm {
        container: String,
        #[arg(short, long)]
        force: bool,
    },
    Logs {
        container: String,
        #[arg(short, long)]
        follow: bool,
        #[arg(long)]
        tail: Option<u32>,
    },
    Cp { src: String, dst: String },
    /// Human-readable availability/version summary
    Info,
    /// Availability/capability table for both runtimes plus a preferred pick
    Check,
    /// Pass remaining args through to the detected compose flavor
    Compose {
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
    /// Exit 0 if a compose implementation is ready to use, 1 otherwise
    ComposePreflight {
        #[arg(long)]
        json: bool,
    },
}

fn parse_kv(raw: &str) -> (String, String) {
    match raw.split_once('=') {
        Some((k, v)) => (k.to_string(), v.to_string()),
        None => (raw.to_string(), String::new()),
    }
}

fn parse_pair(raw: &str) -> (String, String) {
    match raw.split_once(':') {
        Some((a, b)) => (a.to_string(), b.to_string()),
        None => (raw.to_string(), raw.to_string()),
    }
}

#[instrument(skip(cli))]
pub async fn execute(cli: ContainerCli) -> Result<i32> {
    let preferred = cli.runtime.map(Runtime::from);

    match cli.verb {
        ContainerVerb::Run {
            image,
            command,
            detach,
            rm,
            interactive,
            tty,
            name,
            env,
            volume,
            publish,
            workdir,
        } => {
            let runtime_impl = container::select_runtime(preferred)?;
            let opts = RunOptions {
                image,
                command,
                name,
                detach,
                remove: rm,
                interactive,
                tty,
                env: env.iter().map(|s| parse_kv(s)).collect(),
                volumes: volume.iter().map(|s| parse_pair(s)).collect(),
                ports: publish.iter().map(|s| parse_pair(s)).collect(),
                workdir,
            };
            Ok(runtime_impl.run(&opts).await?)
        }
        ContainerVerb::RunInContainer { installation_type, image } => {
            let runtime_impl = container::select_runtime(preferred)?;
            let self_binary: PathBuf = std::env::current_exe()?;
            Ok(container::run_in_container(&runtime_impl, &installation_type, Some(&image), &self_binary).await?)
        }
        ContainerVerb::Exec { container: name, command, interactive } => {
            let runtime_impl = container::select_runtime(preferred)?;
            Ok(runtime_impl.exec(&name, &command, interactive).await?)
        }
        ContainerVerb::List { all } => {
            let runtime_impl = container::select_runtime(preferred)?;
            let containers = runtime_impl.list(all).await?;
            print_container_table(&containers);
            Ok(0)
        }
        ContainerVerb::Stop { container: name } => {
            let runtime_impl = container::select_runtime(preferred)?;
            let result = runtime_impl.stop(&name).await?;
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            Ok(result.exit_code)
        }
        ContainerVerb::Start { container: name } => {
            let runtime_impl = container::select_runtime(preferred)?;
            let result = runtime_impl.start(&name).await?;
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            Ok(result.exit_code)
        }
        ContainerVerb::Rm { container: name, force } => {
            let runtime_impl = container::select_runtime(preferred)?;
            let result = runtime_impl.rm(&name, force).await?;
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            Ok(result.exit_code)
        }
        ContainerVerb::Logs { container: name, follow, tail } => {
            let runtime_impl = container::select_runtime(preferred)?;
            Ok(runtime_impl.logs(&name, follow, tail).await?)
        }
        ContainerVerb::Cp { src, dst } => {
            let runtime_impl = container::select_runtime(preferred)?;
            let result = runtime_impl.cp(&src, &dst).await?;
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            Ok(result.exit_code)
        }
        ContainerVerb::Info => {
            let runtime_impl = container::select_runtime(preferred)?;
            let info = runtime_impl.info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(0)
        }
        ContainerVerb::Check => {
            let report = container::check();
            print_check_report(&report);
            Ok(0)
        }
        ContainerVerb::Compose { args } => {
            let mut docker = portunix_core::runtime::probe_docker();
            let mut podman = portunix_core::runtime::probe_podman();
            portunix_core::runtime::probe_compose(&mut docker, &mut podman);
            let (flavor, runtime_impl) = if docker.capabilities.compose {
                (docker.compose_flavor, container::select_runtime(Some(Runtime::Docker))?)
            } else if podman.capabilities.compose {
                (podman.compose_flavor, container::select_runtime(Some(Runtime::Podman))?)
            } else {
                anyhow::bail!("no compose implementation available; run `portunix container compose-preflight` for a diagnosis");
            };
            Ok(runtime_impl.compose(flavor, &args).await?)
        }
        ContainerVerb::ComposePreflight { json } => {
            let (verdict, code) = container::compose_preflight();
            if json {
                println!("{}", serde_json::to_string(&verdict)?);
            } else if verdict.ready {
                println!(
                    "\u{2705} Compose is ready: {} ({})",
                    verdict.runtime.unwrap_or_default(),
                    verdict.version.unwrap_or_default()
                );
            } else {
                println!("\u{274c} Compose is NOT ready");
                if let Some(reason) = &verdict.error {
                    println!("  reason: {reason}");
                }
                if let Some(fix) = &verdict.fix {
                    println!("  fix: {fix}");
                }
            }
            Ok(code)
        }
    }
}

fn print_container_table(containers: &[container::ContainerSummary]) {
    println!("{:<16} {:<20} {:<24} {:<16}", "ID", "NAME", "IMAGE", "STATUS");
    for c in containers {
        println!("{:<16} {:<20} {:<24} {:<16}", c.id, c.name, c.image, c.status);
    }
}

fn print_check_report(report: &container::CheckReport) {
    for info in [&report.docker, &report.podman] {
        println!(
            "{}: version={} daemon_ready={} compose={} ({})",
            info.runtime,
            info.version.as_deref().unwrap_or("-"),
            info.daemon_ready,
            info.compose_flavor,
            info.compose_version.as_deref().unwrap_or("-"),
        );
    }
    match &report.preferred {
        Some(runtime) => println!("Preferred: {runtime}"),
        None => println!("Preferred: none (no ready runtime)"),
    }
}
