//! Host platform detection.
//!
//! Feeds `portunix version`/`mcp status`/doctor-style diagnostics with a
//! small, stable description of the host: OS, architecture, and whether
//! we're running inside WSL (which changes how container daemons are
//! reachable).

use serde::{Deserialize, Serialize};
use sysinfo::System;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
    pub is_wsl: bool,
    pub hostname: Option<String>,
    pub kernel_version: Option<String>,
}

pub fn detect() -> PlatformInfo {
    PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        is_wsl: is_wsl(),
        hostname: System::host_name(),
        kernel_version: System::kernel_version(),
    }
}

#[cfg(target_os = "linux")]
fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|v| v.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn is_wsl() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_returns_nonempty_os_and_arch() {
        let info = detect();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
    }
}
