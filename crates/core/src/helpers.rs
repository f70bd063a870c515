//! Helper Registry (C4)
//!
//! Discovers sibling `ptx-*` executables (in the directory of the current
//! binary, then on `PATH`), interrogates each one for its supported
//! commands, and resolves name conflicts first-discovered-wins. Generalizes
//! the teacher's in-process plugin registry to out-of-process sibling
//! binaries.

use crate::errors::{PortunixError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const HELPER_PREFIX: &str = "ptx-";
const INTERROGATION_TIMEOUT: Duration = Duration::from_secs(3);

/// One discovered helper binary and the commands it claims to serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelperDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub version: Option<String>,
    pub description: Option<String>,
    pub commands: Vec<String>,
}

/// A command-name collision between two helpers, recorded rather than
/// treated as fatal: `winner` keeps serving the command, `loser` is the
/// helper whose claim was discarded.
#[derive(Debug, Clone)]
pub struct CommandConflict {
    pub command: String,
    pub winner: String,
    pub loser: String,
}

/// In-memory table of discovered helpers, keyed by the command name they
/// serve (not by binary name — one helper may serve several commands).
#[derive(Debug, Default)]
pub struct HelperRegistry {
    by_command: HashMap<String, HelperDescriptor>,
    conflicts: Vec<CommandConflict>,
}

impl HelperRegistry {
    pub fn command(&self, name: &str) -> Option<&HelperDescriptor> {
        self.by_command.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &HelperDescriptor> {
        self.by_command.values()
    }

    pub fn is_empty(&self) -> bool {
        self.by_command.is_empty()
    }

    /// Command-name collisions recorded during discovery, first-wins.
    pub fn conflicts(&self) -> &[CommandConflict] {
        &self.conflicts
    }

    fn insert(&mut self, descriptor: HelperDescriptor) {
        for command in &descriptor.commands {
            match self.by_command.entry(command.clone()) {
                std::collections::hash_map::Entry::Occupied(existing) => {
                    let winner = existing.get().name.clone();
                    if winner != descriptor.name {
                        warn!(
                            command = %command,
                            winner = %winner,
                            loser = %descriptor.name,
                            "command claimed by more than one helper, first discovered wins"
                        );
                        self.conflicts.push(CommandConflict {
                            command: command.clone(),
                            winner,
                            loser: descriptor.name.clone(),
                        });
                    }
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(descriptor.clone());
                }
            }
        }
    }
}

/// Directories to scan for `ptx-*` binaries: the running binary's own
/// directory first (so a bundled distribution is self-contained), then
/// every directory on `PATH`. Earlier directories win on name collisions,
/// matching the resolution order a shell would use.
fn search_dirs(own_binary_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(dir) = own_binary_dir {
        dirs.push(dir.to_path_buf());
    }
    if let Some(path_var) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&path_var));
    }
    dirs
}

fn is_helper_binary(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(HELPER_PREFIX))
        .unwrap_or(false)
}

/// Run `binary --list-commands` and parse a JSON array of command names.
/// Helpers that don't implement this flag, time out, or return malformed
/// output are skipped with a warning rather than failing discovery.
fn interrogate_commands(path: &Path) -> Vec<String> {
    match run_with_timeout(path, &["--list-commands"]) {
        Some(stdout) => serde_json::from_str::<Vec<String>>(stdout.trim()).unwrap_or_else(|_| {
            warn!(helper = %path.display(), "--list-commands returned non-JSON output, ignoring");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

fn interrogate_version(path: &Path) -> Option<String> {
    run_with_timeout(path, &["--version"]).map(|s| s.trim().to_string())
}

fn interrogate_description(path: &Path) -> Option<String> {
    run_with_timeout(path, &["--description"]).map(|s| s.trim().to_string())
}

/// Spawn `binary args...`, wait up to [`INTERROGATION_TIMEOUT`] by polling,
/// and return captured stdout on success. A helper that hangs or misbehaves
/// never blocks startup indefinitely.
fn run_with_timeout(binary: &Path, args: &[&str]) -> Option<String> {
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    let start = std::time::Instant::now();
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            if !status.success() {
                return None;
            }
            let mut stdout = child.stdout.take()?;
            use std::io::Read;
            let mut buf = String::new();
            stdout.read_to_string(&mut buf).ok()?;
            return Some(buf);
        }
        if start.elapsed() > INTERROGATION_TIMEOUT {
            let _ = child.kill();
            let _ = child.wait();
            warn!(helper = %binary.display(), "interrogation timed out");
            return None;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

/// Discover and interrogate every `ptx-*` binary reachable from
/// `own_binary_dir` and `PATH`. First-discovered-wins: a command name
/// claimed by two helpers is served by whichever helper was found first.
#[instrument(skip(own_binary_dir))]
pub fn discover(own_binary_dir: Option<&Path>) -> HelperRegistry {
    let mut registry = HelperRegistry::default();
    let mut seen_paths = std::collections::HashSet::new();

    for dir in search_dirs(own_binary_dir) {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_helper_binary(&path) || !path.is_file() {
                continue;
            }
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen_paths.insert(canonical) {
                continue;
            }

            let name = path
                .file_stem()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            debug!(helper = %name, path = %path.display(), "interrogating helper");
            let commands = interrogate_commands(&path);
            if commands.is_empty() {
                warn!(helper = %name, "no commands reported, skipping");
                continue;
            }

            registry.insert(HelperDescriptor {
                name,
                path: path.clone(),
                version: interrogate_version(&path),
                description: interrogate_description(&path),
                commands,
            });
        }
    }

    registry
}

/// Resolve a command name to the helper that should handle it.
pub fn resolve<'a>(registry: &'a HelperRegistry, command: &str) -> Result<&'a HelperDescriptor> {
    registry.command(command).ok_or_else(|| {
        PortunixError::user_input(format!("no helper registered for command '{command}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::io::Write;

    fn write_fake_helper(dir: &Path, name: &str, list_commands_json: &str) -> PathBuf {
        let path = dir.join(name);
        let script = format!(
            "#!/bin/sh\nif [ \"$1\" = \"--list-commands\" ]; then echo '{list_commands_json}'; fi\nif [ \"$1\" = \"--version\" ]; then echo '1.0.0'; fi\n"
        );
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(script.as_bytes()).unwrap();
        let mut perms = file.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn discovers_helper_and_lists_commands() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_helper(dir.path(), "ptx-build", r#"["build","rebuild"]"#);

        let registry = discover(Some(dir.path()));
        assert!(registry.command("build").is_some());
        assert!(registry.command("rebuild").is_some());
        assert!(registry.command("nonexistent").is_none());
    }

    #[test]
    fn non_prefixed_binaries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_helper(dir.path(), "notahelper", r#"["build"]"#);

        let registry = discover(Some(dir.path()));
        assert!(registry.is_empty());
    }

    #[test]
    fn resolve_missing_command_is_user_input_error() {
        let registry = HelperRegistry::default();
        let err = resolve(&registry, "ghost").unwrap_err();
        assert!(matches!(err, PortunixError::UserInput { .. }));
    }

    #[test]
    fn colliding_command_is_recorded_as_conflict_first_wins() {
        let mut registry = HelperRegistry::default();
        registry.insert(HelperDescriptor {
            name: "ptx-alpha".into(),
            path: PathBuf::from("/bin/ptx-alpha"),
            version: None,
            description: None,
            commands: vec!["virt".into()],
        });
        registry.insert(HelperDescriptor {
            name: "ptx-beta".into(),
            path: PathBuf::from("/bin/ptx-beta"),
            version: None,
            description: None,
            commands: vec!["virt".into()],
        });

        assert_eq!(registry.command("virt").unwrap().name, "ptx-alpha");
        assert_eq!(registry.conflicts().len(), 1);
        assert_eq!(registry.conflicts()[0].winner, "ptx-alpha");
        assert_eq!(registry.conflicts()[0].loser, "ptx-beta");
    }
}
