//! Shared server state: security profile, audit log, and the read-only
//! helper registry every tool call may consult.

use portunix_core::audit::AuditLog;
use portunix_core::helpers::HelperRegistry;
use portunix_core::security::SecurityProfile;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Handle shared across all connections/tool calls.
pub type SharedState = Arc<RwLock<ServerState>>;

/// Central MCP server state. The helper registry is discovered once at
/// startup and never mutated afterwards; `security_profile` may change via
/// a future `mcp reconfigure` without restarting the server.
pub struct ServerState {
    security_profile: SecurityProfile,
    audit_log: AuditLog,
    helper_registry: HelperRegistry,
    own_binary: PathBuf,
}

impl ServerState {
    pub fn new(
        security_profile: SecurityProfile,
        audit_log: AuditLog,
        helper_registry: HelperRegistry,
        own_binary: PathBuf,
    ) -> Self {
        Self {
            security_profile,
            audit_log,
            helper_registry,
            own_binary,
        }
    }

    pub fn security_profile(&self) -> SecurityProfile {
        self.security_profile
    }

    pub fn set_security_profile(&mut self, profile: SecurityProfile) {
        self.security_profile = profile;
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    pub fn helper_registry(&self) -> &HelperRegistry {
        &self.helper_registry
    }

    pub fn own_binary(&self) -> &std::path::Path {
        &self.own_binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_reports_configured_profile() {
        let state = ServerState::new(
            SecurityProfile::Restricted,
            AuditLog::open(std::env::temp_dir().join("portunix-test-audit.jsonl")),
            HelperRegistry::default(),
            PathBuf::from("/usr/local/bin/portunix"),
        );
        assert_eq!(state.security_profile(), SecurityProfile::Restricted);
        assert!(state.helper_registry().is_empty());
    }

    #[test]
    fn set_security_profile_updates_in_place() {
        let mut state = ServerState::new(
            SecurityProfile::Standard,
            AuditLog::open(std::env::temp_dir().join("portunix-test-audit-2.jsonl")),
            HelperRegistry::default(),
            PathBuf::from("/usr/local/bin/portunix"),
        );
        state.set_security_profile(SecurityProfile::Development);
        assert_eq!(state.security_profile(), SecurityProfile::Development);
    }
}
