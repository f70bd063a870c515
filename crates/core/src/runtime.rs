//! Runtime Probe (C1)
//!
//! Detects presence and versions of Docker, Podman, their compose variants,
//! and their daemons/sockets. Probes never panic and never fail loudly on a
//! missing CLI — an unresolvable binary is reported as `cli_present = false`.

use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::debug;

/// Container runtime kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Docker,
    Podman,
}

impl Runtime {
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.binary()
    }
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the concrete compose implementations the abstraction selects
/// between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComposeFlavor {
    /// `docker compose` plugin (V2)
    V2,
    /// standalone `docker-compose` binary (V1)
    V1,
    /// `podman compose` built-in
    PodmanCompose,
    /// standalone `podman-compose` binary
    PodmanComposeStandalone,
    /// no usable compose implementation was found
    None,
}

impl ComposeFlavor {
    pub fn label(&self) -> &'static str {
        match self {
            Self::V2 => "Docker Compose V2",
            Self::V1 => "Docker Compose V1",
            Self::PodmanCompose => "Podman Compose",
            Self::PodmanComposeStandalone => "podman-compose",
            Self::None => "none",
        }
    }
}

/// Capability flags a runtime may expose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub compose: bool,
    pub buildx: bool,
    pub volume: bool,
    pub network: bool,
    pub runtime_active: bool,
}

/// Full probe result for one container runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeCapability {
    pub runtime: Runtime,
    pub cli_present: bool,
    pub daemon_ready: bool,
    pub version: Option<String>,
    pub compose_flavor: ComposeFlavor,
    pub compose_version: Option<String>,
    pub capabilities: Capabilities,
}

impl RuntimeCapability {
    fn absent(runtime: Runtime) -> Self {
        Self {
            runtime,
            cli_present: false,
            daemon_ready: false,
            version: None,
            compose_flavor: ComposeFlavor::None,
            compose_version: None,
            capabilities: Capabilities::default(),
        }
    }
}

/// Richer readiness verdict returned by [`check_compose_ready`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeReadiness {
    pub ready: bool,
    pub runtime: Option<String>,
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

fn cli_present(binary: &str) -> bool {
    which::which(binary).is_ok()
}

fn run_ok(binary: &str, args: &[&str]) -> bool {
    Command::new(binary)
        .args(args)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn capture_stdout(binary: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(binary).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Probe for a plain version string, preferring the machine-readable
/// template and falling back to the human-readable form.
fn probe_version(binary: &str, template_args: &[&str], fallback_args: &[&str]) -> Option<String> {
    capture_stdout(binary, template_args).or_else(|| capture_stdout(binary, fallback_args))
}

/// Is the podman user-scoped socket reachable on this host?
///
/// `podman info` can succeed without the socket that compose requires, so
/// this check is performed in addition to, not instead of, the daemon ping.
#[cfg(unix)]
fn podman_socket_present() -> bool {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/run/user/0".into());
    std::path::Path::new(&runtime_dir)
        .join("podman")
        .join("podman.sock")
        .exists()
}

#[cfg(not(unix))]
fn podman_socket_present() -> bool {
    // Podman's rootless socket model is Unix-specific; on Windows the
    // Podman Machine VM handles this transparently, so we treat the daemon
    // ping alone as sufficient.
    true
}

/// Probe Docker: CLI presence, daemon readiness, version, buildx capability.
pub fn probe_docker() -> RuntimeCapability {
    let mut cap = RuntimeCapability::absent(Runtime::Docker);
    cap.cli_present = cli_present("docker");
    if !cap.cli_present {
        debug!("docker binary not found on PATH");
        return cap;
    }

    cap.version = probe_version(
        "docker",
        &["version", "--format", "{{.Server.Version}}"],
        &["--version"],
    );
    cap.daemon_ready = run_ok("docker", &["info"]);
    cap.capabilities.runtime_active = cap.daemon_ready;
    cap.capabilities.buildx = run_ok("docker", &["buildx", "version"]);
    if cap.daemon_ready {
        cap.capabilities.volume = true;
        cap.capabilities.network = true;
    }
    cap
}

/// Probe Podman: CLI presence, daemon readiness (CLI success AND socket
/// present), version.
pub fn probe_podman() -> RuntimeCapability {
    let mut cap = RuntimeCapability::absent(Runtime::Podman);
    cap.cli_present = cli_present("podman");
    if !cap.cli_present {
        debug!("podman binary not found on PATH");
        return cap;
    }

    cap.version = probe_version(
        "podman",
        &["version", "--format", "{{.Client.Version}}"],
        &["--version"],
    );
    let info_ok = run_ok("podman", &["info"]);
    cap.daemon_ready = info_ok && podman_socket_present();
    cap.capabilities.runtime_active = cap.daemon_ready;
    if cap.daemon_ready {
        cap.capabilities.volume = true;
        cap.capabilities.network = true;
    }
    cap
}

/// Probe for compose support on an already-probed runtime, filling in
/// `compose_flavor`/`compose_version`/`capabilities.compose`. Priority order:
/// docker compose V2 plugin, docker-compose V1 binary, podman built-in
/// compose, podman-compose standalone binary. Skipped entirely if the
/// runtime's daemon is not ready.
pub fn probe_compose(docker: &mut RuntimeCapability, podman: &mut RuntimeCapability) {
    if docker.daemon_ready {
        if let Some(version) = capture_stdout("docker", &["compose", "version", "--short"]) {
            docker.compose_flavor = ComposeFlavor::V2;
            docker.compose_version = Some(version);
            docker.capabilities.compose = true;
            return check_podman_compose(podman);
        }
        if let Some(version) = probe_version(
            "docker-compose",
            &["version", "--short"],
            &["--version"],
        ) {
            docker.compose_flavor = ComposeFlavor::V1;
            docker.compose_version = Some(version);
            docker.capabilities.compose = true;
        }
    }
    check_podman_compose(podman);
}

fn check_podman_compose(podman: &mut RuntimeCapability) {
    if !podman.daemon_ready {
        return;
    }
    if let Some(version) = capture_stdout("podman", &["compose", "version"]) {
        podman.compose_flavor = ComposeFlavor::PodmanCompose;
        podman.compose_version = Some(version);
        podman.capabilities.compose = true;
        return;
    }
    if let Some(version) = probe_version(
        "podman-compose",
        &["--version"],
        &["--version"],
    ) {
        podman.compose_flavor = ComposeFlavor::PodmanComposeStandalone;
        podman.compose_version = Some(version);
        podman.capabilities.compose = true;
    }
}

/// Compose readiness iff there exists a (runtime, compose flavor) pair whose
/// daemon is reachable (spec.md §8).
pub fn check_compose_ready() -> ComposeReadiness {
    let mut docker = probe_docker();
    let mut podman = probe_podman();
    probe_compose(&mut docker, &mut podman);

    if docker.capabilities.compose {
        return ComposeReadiness {
            ready: true,
            runtime: Some(docker.compose_flavor.label().to_string()),
            version: docker.compose_version.clone(),
            error: None,
            fix: None,
        };
    }
    if podman.capabilities.compose {
        return ComposeReadiness {
            ready: true,
            runtime: Some(podman.compose_flavor.label().to_string()),
            version: podman.compose_version.clone(),
            error: None,
            fix: None,
        };
    }

    // Not ready: produce the most specific diagnosis we can.
    if !docker.cli_present && !podman.cli_present {
        return ComposeReadiness {
            ready: false,
            runtime: None,
            version: None,
            error: Some("Neither Docker nor Podman is installed".to_string()),
            fix: Some("install Docker Desktop or Podman".to_string()),
        };
    }
    if podman.cli_present && !podman.daemon_ready {
        return ComposeReadiness {
            ready: false,
            runtime: None,
            version: None,
            error: Some("Podman installed but socket is not running".to_string()),
            fix: Some("systemctl --user enable --now podman.socket".to_string()),
        };
    }
    if docker.cli_present && !docker.daemon_ready {
        return ComposeReadiness {
            ready: false,
            runtime: None,
            version: None,
            error: Some("Docker installed but daemon is not running".to_string()),
            fix: Some("start docker daemon with `sudo systemctl start docker` or open Docker Desktop".to_string()),
        };
    }
    ComposeReadiness {
        ready: false,
        runtime: None,
        version: None,
        error: Some("No compose implementation found for any ready runtime".to_string()),
        fix: Some("install `docker compose` (plugin) or `podman-compose`".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_display() {
        assert_eq!(Runtime::Docker.to_string(), "docker");
        assert_eq!(Runtime::Podman.to_string(), "podman");
    }

    #[test]
    fn absent_runtime_has_no_capabilities() {
        let cap = RuntimeCapability::absent(Runtime::Docker);
        assert!(!cap.cli_present);
        assert!(!cap.daemon_ready);
        assert_eq!(cap.compose_flavor, ComposeFlavor::None);
    }

    #[test]
    fn daemon_ready_implies_cli_present_invariant_holds_by_construction() {
        // probe_docker/probe_podman only set daemon_ready after confirming
        // cli_present, so the invariant daemon_ready => cli_present always
        // holds without an explicit runtime check.
        let cap = probe_docker();
        if cap.daemon_ready {
            assert!(cap.cli_present);
        }
    }

    #[test]
    fn compose_flavor_implies_daemon_ready() {
        let mut docker = probe_docker();
        let mut podman = probe_podman();
        probe_compose(&mut docker, &mut podman);
        if docker.compose_flavor != ComposeFlavor::None {
            assert!(docker.daemon_ready);
        }
        if podman.compose_flavor != ComposeFlavor::None {
            assert!(podman.daemon_ready);
        }
    }

    #[test]
    fn check_compose_ready_unready_has_error_and_fix() {
        let verdict = check_compose_ready();
        if !verdict.ready {
            assert!(verdict.error.is_some());
            assert!(verdict.fix.is_some());
        }
    }
}
