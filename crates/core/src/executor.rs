//! Command Executor (C2)
//!
//! A thin shim over `std::process::Command`: spawn a target binary with
//! inherited stdio and propagate its exit code. The real plumbing lives in
//! the helper binaries and container runtimes themselves; this component
//! stays deliberately small.

use crate::errors::{PortunixError, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, instrument};

/// Outcome of a completed command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Exit code of the child process (never `None` on the platforms we support).
    pub exit_code: i32,
    /// Captured stderr, only populated when the caller asked for it via
    /// [`Run::captured`]; empty for inherited-stdio invocations.
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// How a spawned child's standard streams should be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioMode {
    /// Inherit the host process's stdin/stdout/stderr (the default for
    /// dispatched helpers and interactive container commands).
    Inherit,
    /// Capture stderr so the caller can inspect or forward it; stdout is
    /// still inherited.
    CaptureStderr,
}

/// Spawn `target` with `argv`, wait for completion, and report the outcome.
///
/// Maps failures onto the error taxonomy from spec.md §4.2: not-found and
/// not-executable surface as [`PortunixError::UserInput`]/[`PreconditionUnmet`]
/// before the process is even spawned where detectable, spawn-failure as
/// [`PortunixError::Io`], and non-zero-exit is returned to the caller inside
/// [`CommandOutcome`] rather than as an `Err` — the caller decides whether to
/// propagate it.
#[instrument(skip(argv), fields(target = %target.display()))]
pub fn run<S: AsRef<OsStr>>(
    target: &Path,
    argv: &[S],
    stdio: StdioMode,
) -> Result<CommandOutcome> {
    if !target.exists() {
        return Err(PortunixError::user_input(format!(
            "executable not found: {}",
            target.display()
        )));
    }

    let mut command = Command::new(target);
    command.args(argv);
    command.stdin(Stdio::inherit());
    command.stdout(Stdio::inherit());

    match stdio {
        StdioMode::Inherit => {
            command.stderr(Stdio::inherit());
        }
        StdioMode::CaptureStderr => {
            command.stderr(Stdio::piped());
        }
    }

    debug!("spawning child process");

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            PortunixError::precondition_unmet(
                format!("not executable: {}", target.display()),
                "check the file's executable permission bit",
            )
        } else {
            PortunixError::Io(e)
        }
    })?;

    let stderr = match stdio {
        StdioMode::CaptureStderr => {
            use std::io::Read;
            let mut buf = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut buf);
            }
            buf
        }
        StdioMode::Inherit => String::new(),
    };

    let status: ExitStatus = child.wait().map_err(PortunixError::Io)?;

    Ok(CommandOutcome {
        exit_code: status.code().unwrap_or(-1),
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn true_bin() -> PathBuf {
        PathBuf::from("/usr/bin/true")
    }

    fn false_bin() -> PathBuf {
        PathBuf::from("/usr/bin/false")
    }

    #[test]
    fn missing_target_is_user_input_error() {
        let err = run(Path::new("/no/such/binary-xyz"), &["--help"], StdioMode::Inherit)
            .expect_err("should fail");
        assert!(matches!(err, PortunixError::UserInput { .. }));
    }

    #[test]
    fn success_exit_code_is_zero() {
        if !true_bin().exists() {
            return; // environment without /usr/bin/true; skip rather than fail
        }
        let outcome = run(&true_bin(), &[] as &[&str], StdioMode::Inherit).unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.exit_code, 0);
    }

    #[test]
    fn nonzero_exit_is_reported_not_errored() {
        if !false_bin().exists() {
            return;
        }
        let outcome = run(&false_bin(), &[] as &[&str], StdioMode::Inherit).unwrap();
        assert!(!outcome.success());
        assert_ne!(outcome.exit_code, 0);
    }

    #[test]
    fn non_executable_file_is_precondition_unmet_not_generic_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-executable");
        std::fs::write(&path, b"#!/bin/sh\necho hi\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }
        let err = run(&path, &[] as &[&str], StdioMode::Inherit).expect_err("should fail");
        assert!(matches!(err, PortunixError::PreconditionUnmet { .. }));
    }
}
