//! Error types and handling
//!
//! Domain errors for Portunix, mapped onto the five error kinds the
//! dispatcher and MCP layers need to reason about: user-input,
//! precondition-unmet, external-nonzero, transport, and internal-invariant.

use thiserror::Error;

/// Domain errors for Portunix
#[derive(Error, Debug)]
pub enum PortunixError {
    /// Invalid flag, unknown subcommand, missing required argument
    #[error("{message}")]
    UserInput { message: String },

    /// No runtime installed, daemon down, `claude` CLI missing, etc.
    #[error("{message}\n  fix: {fix}")]
    PreconditionUnmet { message: String, fix: String },

    /// A spawned binary returned a non-zero exit code
    #[error("command exited with status {code}")]
    ExternalNonZero { code: i32, stderr: String },

    /// MCP transport I/O error
    #[error("MCP transport error: {message}")]
    Transport { message: String },

    /// A claim the code makes about its own state was violated
    #[error("internal invariant violated: {message}")]
    InternalInvariant { message: String },

    /// I/O error propagated from the standard library
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PortunixError {
    /// The error kind as a stable, machine-readable, snake_case string.
    ///
    /// Used by the MCP layer to populate `JsonRpcError.data.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserInput { .. } => "user_input",
            Self::PreconditionUnmet { .. } => "precondition_unmet",
            Self::ExternalNonZero { .. } => "external_nonzero",
            Self::Transport { .. } => "transport",
            Self::InternalInvariant { .. } => "internal_invariant",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    pub fn user_input(message: impl Into<String>) -> Self {
        Self::UserInput {
            message: message.into(),
        }
    }

    pub fn precondition_unmet(message: impl Into<String>, fix: impl Into<String>) -> Self {
        Self::PreconditionUnmet {
            message: message.into(),
            fix: fix.into(),
        }
    }

    pub fn internal_invariant(message: impl Into<String>) -> Self {
        Self::InternalInvariant {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with PortunixError
pub type Result<T> = std::result::Result<T, PortunixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_snake_case() {
        assert_eq!(PortunixError::user_input("bad flag").kind(), "user_input");
        assert_eq!(
            PortunixError::precondition_unmet("no docker", "install docker").kind(),
            "precondition_unmet"
        );
        assert_eq!(
            PortunixError::ExternalNonZero {
                code: 1,
                stderr: String::new()
            }
            .kind(),
            "external_nonzero"
        );
    }

    #[test]
    fn display_includes_fix_for_precondition() {
        let err = PortunixError::precondition_unmet("docker daemon down", "start docker");
        let rendered = err.to_string();
        assert!(rendered.contains("docker daemon down"));
        assert!(rendered.contains("start docker"));
    }
}
