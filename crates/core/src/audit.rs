//! Append-only audit log for MCP tool invocations.
//!
//! Line-oriented JSON, one record per line, with size-based rotation
//! (10 MiB threshold, 5 retained files) — see SPEC_FULL.md §9. Timestamps
//! are supplied by the caller rather than read from the clock here, keeping
//! this module a pure formatter/writer that is easy to test deterministically.

use crate::errors::{PortunixError, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const ROTATE_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;
const RETAINED_FILES: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: String,
    pub tool: String,
    pub arguments: serde_json::Value,
    pub profile: String,
    pub outcome: AuditOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Allowed,
    Denied,
    Error,
}

pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[instrument(skip(self, record), fields(path = %self.path.display()))]
    pub fn append(&self, record: &AuditRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.rotate_if_needed()?;

        let mut line = serde_json::to_string(record).map_err(PortunixError::Json)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Return the most recent `limit` records, oldest first. Reads only the
    /// current (unrotated) file — rotated history is not consulted, since
    /// `audit_log` is meant for recent activity, not a full archive.
    pub fn tail(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = contents.lines().collect();
        let start = lines.len().saturating_sub(limit);
        lines[start..]
            .iter()
            .map(|line| serde_json::from_str(line).map_err(PortunixError::Json))
            .collect()
    }

    fn rotate_if_needed(&self) -> Result<()> {
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size < ROTATE_THRESHOLD_BYTES {
            return Ok(());
        }

        debug!(size, threshold = ROTATE_THRESHOLD_BYTES, "rotating audit log");

        // Shift existing rotated files up by one, dropping the oldest.
        for index in (1..RETAINED_FILES).rev() {
            let src = rotated_path(&self.path, index);
            let dst = rotated_path(&self.path, index + 1);
            if src.exists() {
                let _ = std::fs::rename(&src, &dst);
            }
        }
        let _ = std::fs::remove_file(rotated_path(&self.path, RETAINED_FILES));
        std::fs::rename(&self.path, rotated_path(&self.path, 1))?;
        Ok(())
    }
}

fn rotated_path(base: &Path, index: u32) -> PathBuf {
    let mut name = base
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audit.log")
        .to_string();
    name.push_str(&format!(".{index}"));
    base.with_file_name(name)
}

/// Touch a file's length up to `len` bytes for rotation tests, without
/// needing to actually write that much JSON.
#[cfg(test)]
fn grow_to(path: &Path, len: u64) {
    let file = std::fs::File::create(path).unwrap();
    file.set_len(len).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> AuditRecord {
        AuditRecord {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            tool: "container_list".to_string(),
            arguments: serde_json::json!({}),
            profile: "standard".to_string(),
            outcome: AuditOutcome::Allowed,
        }
    }

    #[test]
    fn append_writes_one_json_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::open(dir.path().join("audit.jsonl"));
        log.append(&sample_record()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
        assert_eq!(contents.lines().count(), 1);
        let parsed: AuditRecord = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.tool, "container_list");
    }

    #[test]
    fn tail_returns_most_recent_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::open(dir.path().join("audit.jsonl"));
        for i in 0..5 {
            let mut record = sample_record();
            record.tool = format!("tool-{i}");
            log.append(&record).unwrap();
        }

        let tail = log.tail(2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].tool, "tool-3");
        assert_eq!(tail[1].tool, "tool-4");
    }

    #[test]
    fn tail_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::open(dir.path().join("none.jsonl"));
        assert!(log.tail(10).unwrap().is_empty());
    }

    #[test]
    fn rotates_when_threshold_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        grow_to(&path, ROTATE_THRESHOLD_BYTES + 1);

        let log = AuditLog::open(&path);
        log.append(&sample_record()).unwrap();

        assert!(rotated_path(&path, 1).exists());
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn retains_at_most_five_rotated_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        for index in 1..=RETAINED_FILES {
            std::fs::write(rotated_path(&path, index), format!("old-{index}")).unwrap();
        }
        grow_to(&path, ROTATE_THRESHOLD_BYTES + 1);

        let log = AuditLog::open(&path);
        log.append(&sample_record()).unwrap();

        assert!(!rotated_path(&path, RETAINED_FILES + 1).exists());
        assert!(rotated_path(&path, RETAINED_FILES).exists());
    }
}
