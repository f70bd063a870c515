//! Dispatcher (C5)
//!
//! Resolves a subcommand name to either a built-in route (handled in-process
//! by the `portunix` binary) or an external route (a discovered `ptx-*`
//! helper). The boundary is a small static table consulted before the
//! helper registry, kept soft and data-driven so routes can migrate to
//! helpers later without touching call sites.

use crate::errors::{PortunixError, Result};
use crate::helpers::{self, HelperDescriptor, HelperRegistry};

/// Subcommands the `portunix` binary itself implements, never delegated to
/// a helper even if a same-named helper is discovered — built-ins take
/// precedence.
const BUILTIN_COMMANDS: &[&str] = &["version", "help", "container", "mcp"];

/// Resolution of a single command-line invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Handled in-process.
    Builtin(String),
    /// Delegated to a discovered helper binary.
    External(ExternalRoute),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRoute {
    pub command: String,
    pub helper_name: String,
    pub helper_path: std::path::PathBuf,
}

impl From<&HelperDescriptor> for ExternalRoute {
    fn from(descriptor: &HelperDescriptor) -> Self {
        Self {
            command: String::new(),
            helper_name: descriptor.name.clone(),
            helper_path: descriptor.path.clone(),
        }
    }
}

/// Resolve `command` against the built-in table first, then the helper
/// registry. Pure function of its inputs — no I/O, no process spawning.
pub fn resolve(command: &str, registry: &HelperRegistry) -> Result<Route> {
    if BUILTIN_COMMANDS.contains(&command) {
        return Ok(Route::Builtin(command.to_string()));
    }

    let descriptor = helpers::resolve(registry, command)?;
    let mut external = ExternalRoute::from(descriptor);
    external.command = command.to_string();
    Ok(Route::External(external))
}

/// How many closest matches to show in the "unknown command" diagnostic
/// (spec.md §4.5 step 5).
const MAX_SUGGESTIONS: usize = 5;

/// Levenshtein edit distance between two strings, used to rank known
/// commands by similarity to an unresolved one.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let tmp = row[j + 1];
            row[j + 1] = if ca == cb {
                prev_diag
            } else {
                1 + prev_diag.min(row[j]).min(row[j + 1])
            };
            prev_diag = tmp;
        }
    }
    row[b.len()]
}

/// Format the "unknown command" error shown when neither a built-in nor a
/// helper claims `command`, listing the closest matches rather than every
/// known command (spec.md §4.5 step 5).
pub fn unknown_command_error(command: &str, registry: &HelperRegistry) -> PortunixError {
    let mut known: Vec<&str> = BUILTIN_COMMANDS.to_vec();
    let helper_commands: Vec<String> = registry.all().flat_map(|d| d.commands.clone()).collect();
    known.extend(helper_commands.iter().map(String::as_str));
    known.sort_unstable();
    known.dedup();

    known.sort_by_key(|candidate| edit_distance(command, candidate));
    known.truncate(MAX_SUGGESTIONS);

    PortunixError::user_input(format!(
        "unknown command '{command}'\n  available commands: {}",
        known.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::HelperRegistry;

    #[test]
    fn builtin_commands_resolve_without_registry_lookup() {
        let registry = HelperRegistry::default();
        let route = resolve("mcp", &registry).unwrap();
        assert_eq!(route, Route::Builtin("mcp".to_string()));
    }

    #[test]
    fn unresolvable_command_is_user_input_error() {
        let registry = HelperRegistry::default();
        let err = resolve("frobnicate", &registry).unwrap_err();
        assert!(matches!(err, PortunixError::UserInput { .. }));
    }

    #[test]
    fn unknown_command_error_lists_builtins() {
        let registry = HelperRegistry::default();
        let err = unknown_command_error("frobnicate", &registry);
        let message = err.to_string();
        assert!(message.contains("version"));
        assert!(message.contains("mcp"));
    }

    #[test]
    fn unknown_command_error_ranks_closest_matches_first() {
        let registry = HelperRegistry::default();
        let err = unknown_command_error("hlp", &registry);
        let message = err.to_string();
        let suggestions_line = message.lines().last().unwrap();
        let help_pos = suggestions_line.find("help").unwrap();
        let version_pos = suggestions_line.find("version").unwrap();
        assert!(help_pos < version_pos, "expected 'help' to rank closer to 'hlp' than 'version'");
    }
}
