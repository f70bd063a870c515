//! Server process state (PID file lifecycle)
//!
//! Tracks a running `mcp serve` daemon via a PID file under the per-user
//! runtime/cache directory: atomic creation, liveness probing, self-healing
//! removal of stale files left behind by a crashed process, and
//! graceful-then-forceful stop.
//!
//! The PID file itself holds nothing but a decimal PID, so external tools
//! (`kill -0 $(cat mcp-server.pid)`) can consume it directly. The transport
//! and address a caller wants surfaced from `mcp status` live in a sidecar
//! file next to it; `startTime` is never stored at all — it is derived from
//! the PID file's own mtime when read.

use crate::errors::{PortunixError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerProcessState {
    pub pid: u32,
    pub transport: String,
    pub address: String,
    pub started_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProcessMeta {
    transport: String,
    address: String,
}

fn pid_file_path(dir: &Path) -> PathBuf {
    dir.join("mcp-server.pid")
}

fn meta_file_path(dir: &Path) -> PathBuf {
    dir.join("mcp-server.meta.json")
}

/// Atomically create the PID file: write to a temp file, then rename, so a
/// reader never observes a partially-written file. The transport/address
/// sidecar is written the same way but is advisory only — its absence or
/// corruption never fails the call or blocks liveness checks.
#[instrument(skip(state))]
pub fn write(dir: &Path, state: &ServerProcessState) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = pid_file_path(dir);

    if let Some(existing) = read(dir)? {
        if is_alive(existing.pid) {
            return Err(PortunixError::precondition_unmet(
                format!("MCP server already running (pid {})", existing.pid),
                "run `portunix mcp stop` first, or `portunix mcp status` to inspect it".to_string(),
            ));
        }
        warn!(stale_pid = existing.pid, "removing stale PID file");
        let _ = std::fs::remove_file(&path);
    }

    let tmp_path = path.with_extension("pid.tmp");
    std::fs::write(&tmp_path, state.pid.to_string())?;
    std::fs::rename(&tmp_path, &path)?;

    let meta = ProcessMeta {
        transport: state.transport.clone(),
        address: state.address.clone(),
    };
    let meta_path = meta_file_path(dir);
    let meta_tmp = meta_path.with_extension("meta.json.tmp");
    if let Ok(rendered) = serde_json::to_string_pretty(&meta) {
        if std::fs::write(&meta_tmp, rendered).is_ok() {
            let _ = std::fs::rename(&meta_tmp, &meta_path);
        }
    }

    debug!(pid = state.pid, path = %path.display(), "wrote PID file");
    Ok(())
}

/// Read the PID file if present; self-heals by removing it (and its
/// sidecar) if the content is unparsable or the recorded process is no
/// longer alive, returning `None` in both cases.
#[instrument]
pub fn read(dir: &Path) -> Result<Option<ServerProcessState>> {
    let path = pid_file_path(dir);
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    let pid: u32 = match raw.trim().parse() {
        Ok(pid) => pid,
        Err(_) => {
            warn!(path = %path.display(), "PID file unreadable, removing");
            remove(dir)?;
            return Ok(None);
        }
    };

    if !is_alive(pid) {
        debug!(pid, "recorded process is not alive, removing stale PID file");
        remove(dir)?;
        return Ok(None);
    }

    let started_at = std::fs::metadata(&path)
        .and_then(|meta| meta.modified())
        .map(|mtime| chrono::DateTime::<chrono::Utc>::from(mtime).to_rfc3339())
        .unwrap_or_default();

    let meta = std::fs::read_to_string(meta_file_path(dir))
        .ok()
        .and_then(|raw| serde_json::from_str::<ProcessMeta>(&raw).ok())
        .unwrap_or_default();

    Ok(Some(ServerProcessState {
        pid,
        transport: meta.transport,
        address: meta.address,
        started_at,
    }))
}

pub fn remove(dir: &Path) -> Result<()> {
    let path = pid_file_path(dir);
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    let meta_path = meta_file_path(dir);
    if meta_path.exists() {
        std::fs::remove_file(&meta_path)?;
    }
    Ok(())
}

/// Stop the running server: SIGTERM (unix) / graceful close (windows),
/// waiting up to `grace_period` for it to exit, then SIGKILL / forceful
/// terminate if it hasn't.
#[instrument(skip(grace_period))]
pub fn stop(dir: &Path, grace_period: Duration) -> Result<()> {
    let state = match read(dir)? {
        Some(state) => state,
        None => {
            return Err(PortunixError::precondition_unmet(
                "no MCP server is running",
                "start one with `portunix mcp serve`",
            ))
        }
    };

    terminate_graceful(state.pid)?;

    let deadline = std::time::Instant::now() + grace_period;
    while std::time::Instant::now() < deadline {
        if !is_alive(state.pid) {
            remove(dir)?;
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    warn!(pid = state.pid, "process did not exit within grace period, forcing");
    terminate_forceful(state.pid)?;
    remove(dir)?;
    Ok(())
}

#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(unix)]
fn terminate_graceful(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
        .map_err(|e| PortunixError::internal_invariant(format!("SIGTERM failed: {e}")))
}

#[cfg(unix)]
fn terminate_forceful(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), Signal::SIGKILL)
        .map_err(|e| PortunixError::internal_invariant(format!("SIGKILL failed: {e}")))
}

// Windows has no safe, unsafe-code-free equivalent of `nix::sys::signal::kill`
// in the standard library, so liveness/termination go through `sysinfo`
// (already a dependency, see `platform.rs`) instead of raw `OpenProcess`/
// `TerminateProcess` calls — this workspace forbids `unsafe_code` outright.

#[cfg(windows)]
pub fn is_alive(pid: u32) -> bool {
    use sysinfo::{Pid, System};
    let system = System::new_all();
    system.process(Pid::from_u32(pid)).is_some()
}

#[cfg(windows)]
fn terminate_graceful(pid: u32) -> Result<()> {
    // Windows has no SIGTERM equivalent reachable without the target
    // process cooperating via a console event; fall through to forceful
    // termination, matching the documented behavior of "stop" on Windows.
    terminate_forceful(pid)
}

#[cfg(windows)]
fn terminate_forceful(pid: u32) -> Result<()> {
    use sysinfo::{Pid, System};
    let system = System::new_all();
    match system.process(Pid::from_u32(pid)) {
        Some(process) if process.kill() => Ok(()),
        Some(_) => Err(PortunixError::internal_invariant(format!(
            "TerminateProcess failed for pid {pid}"
        ))),
        None => Err(PortunixError::internal_invariant(format!(
            "could not open process {pid} for termination"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state(pid: u32) -> ServerProcessState {
        ServerProcessState {
            pid,
            transport: "stdio".to_string(),
            address: "-".to_string(),
            started_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn write_then_read_round_trips_for_own_pid() {
        let dir = tempfile::tempdir().unwrap();
        let state = sample_state(std::process::id());
        write(dir.path(), &state).unwrap();

        let reloaded = read(dir.path()).unwrap().expect("pid file should exist");
        assert_eq!(reloaded.pid, state.pid);
        assert_eq!(reloaded.transport, state.transport);
        assert_eq!(reloaded.address, state.address);
        assert!(!reloaded.started_at.is_empty());
    }

    #[test]
    fn pid_file_contains_a_bare_decimal_pid_and_nothing_else() {
        let dir = tempfile::tempdir().unwrap();
        let state = sample_state(std::process::id());
        write(dir.path(), &state).unwrap();

        let raw = std::fs::read_to_string(pid_file_path(dir.path())).unwrap();
        assert_eq!(raw.trim().parse::<u32>().unwrap(), state.pid);
        assert_eq!(raw.trim(), state.pid.to_string());
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read(dir.path()).unwrap().is_none());
    }

    #[test]
    fn stale_pid_is_self_healed_on_read() {
        let dir = tempfile::tempdir().unwrap();
        // A PID essentially guaranteed not to be alive in a test sandbox.
        let state = sample_state(u32::MAX - 1);
        let path = pid_file_path(dir.path());
        std::fs::write(&path, state.pid.to_string()).unwrap();

        let result = read(dir.path()).unwrap();
        assert!(result.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn writing_over_a_live_process_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = sample_state(std::process::id());
        write(dir.path(), &state).unwrap();

        let err = write(dir.path(), &state).unwrap_err();
        assert!(matches!(err, PortunixError::PreconditionUnmet { .. }));
    }
}
