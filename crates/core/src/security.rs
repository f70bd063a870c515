//! Security profiles for the MCP tool surface.
//!
//! A single chokepoint gates tool execution by profile instead of each tool
//! re-implementing its own permission checks. Profiles are ordered from
//! least to most capable; a tool declares the minimum profile it needs and
//! the gate compares against the server's configured profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityProfile {
    /// Read-only / diagnostic tools only.
    Restricted,
    /// Read-only tools plus non-destructive container operations.
    Standard,
    /// Full tool surface, including destructive container operations and
    /// helper dispatch.
    Development,
}

impl SecurityProfile {
    /// Does a tool requiring `required` run under `self`?
    pub fn permits(&self, required: SecurityProfile) -> bool {
        *self >= required
    }
}

impl fmt::Display for SecurityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Restricted => "restricted",
            Self::Standard => "standard",
            Self::Development => "development",
        };
        write!(f, "{label}")
    }
}

impl FromStr for SecurityProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "restricted" => Ok(Self::Restricted),
            "standard" => Ok(Self::Standard),
            "development" => Ok(Self::Development),
            other => Err(format!(
                "unknown security profile '{other}' (expected restricted, standard, or development)"
            )),
        }
    }
}

impl Default for SecurityProfile {
    fn default() -> Self {
        Self::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_ordering_is_permissive_upward() {
        assert!(SecurityProfile::Development.permits(SecurityProfile::Restricted));
        assert!(SecurityProfile::Standard.permits(SecurityProfile::Standard));
        assert!(!SecurityProfile::Restricted.permits(SecurityProfile::Standard));
    }

    #[test]
    fn parses_known_profile_names() {
        assert_eq!(
            "development".parse::<SecurityProfile>().unwrap(),
            SecurityProfile::Development
        );
        assert!("bogus".parse::<SecurityProfile>().is_err());
    }

    #[test]
    fn default_profile_is_standard() {
        assert_eq!(SecurityProfile::default(), SecurityProfile::Standard);
    }
}
