//! Durable ingestion progress
//!
//! One JSON document on disk maps each tracked filename to its cursor:
//! byte offset plus inode for the currently-growing files, a processed
//! flag for immutable rotated archives. The document is the only state
//! shared between collection runs, so loading is maximally forgiving (a
//! corrupt document is backed up and treated as absent, a bad entry is
//! reset to its default) and saving is atomic (write-then-rename).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use sald_common::{Result, SaldError};

/// Suffix identifying a rotated, compressed archive
pub const ARCHIVE_SUFFIX: &str = ".gz";

/// Suffix identifying a currently-growing plain log file
pub const PLAIN_SUFFIX: &str = ".log";

/// Per-file ingestion cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileCursor {
    /// Immutable archives are ingested at most once, wholesale
    Archived { processed: bool },
    /// Growing files are tailed by byte offset, guarded by inode identity
    Plain { offset: u64, inode: Option<u64> },
}

impl FileCursor {
    /// Default cursor for a fresh plain file
    pub fn new_plain() -> Self {
        FileCursor::Plain {
            offset: 0,
            inode: None,
        }
    }

    /// Default cursor for an unseen archive
    pub fn new_archived() -> Self {
        FileCursor::Archived { processed: false }
    }

    /// Default cursor for `filename`, classified by suffix
    ///
    /// Returns `None` for filenames with an unrecognized suffix.
    pub fn default_for(filename: &str) -> Option<Self> {
        if filename.ends_with(ARCHIVE_SUFFIX) {
            Some(Self::new_archived())
        } else if filename.ends_with(PLAIN_SUFFIX) {
            Some(Self::new_plain())
        } else {
            None
        }
    }
}

/// Durable filename -> cursor mapping
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The canonical state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cursor mapping
    ///
    /// Never fails the run: a missing file yields an empty mapping, an
    /// unreadable or unparseable document is renamed aside with a `.bak`
    /// suffix and also yields an empty mapping, and individual entries
    /// that do not match their expected shape are reset to defaults.
    pub fn load(&self) -> HashMap<String, FileCursor> {
        if !self.path.exists() {
            return HashMap::new();
        }

        let document = match std::fs::read_to_string(&self.path)
            .map_err(SaldError::Io)
            .and_then(|text| serde_json::from_str::<Value>(&text).map_err(SaldError::Serialization))
        {
            Ok(value) => value,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Progress state unreadable, starting from scratch");
                self.backup_corrupt_file();
                return HashMap::new();
            },
        };

        let Some(entries) = document.as_object() else {
            error!(path = %self.path.display(), "Progress state is not an object, starting from scratch");
            self.backup_corrupt_file();
            return HashMap::new();
        };

        let mut state = HashMap::new();
        for (filename, data) in entries {
            match Self::read_entry(filename, data) {
                Some(cursor) => {
                    state.insert(filename.clone(), cursor);
                },
                None => {
                    warn!(file = %filename, "Unrecognized filename suffix in progress state, ignoring entry");
                },
            }
        }
        state
    }

    /// Interpret one state entry, resetting malformed fields to defaults
    fn read_entry(filename: &str, data: &Value) -> Option<FileCursor> {
        let default = FileCursor::default_for(filename)?;

        let Some(fields) = data.as_object() else {
            warn!(file = %filename, "Invalid progress entry, resetting to default");
            return Some(default);
        };

        let cursor = match default {
            FileCursor::Archived { .. } => FileCursor::Archived {
                processed: fields
                    .get("processed")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            FileCursor::Plain { .. } => FileCursor::Plain {
                offset: fields.get("offset").and_then(Value::as_u64).unwrap_or(0),
                inode: fields.get("inode").and_then(Value::as_u64),
            },
        };
        Some(cursor)
    }

    /// Persist the cursor mapping atomically
    ///
    /// Serializes to a temporary sibling, then renames over the canonical
    /// path so a crash mid-write never corrupts existing state.
    pub fn save(&self, state: &HashMap<String, FileCursor>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(state)?;

        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, serialized)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn backup_corrupt_file(&self) {
        let mut backup = self.path.as_os_str().to_owned();
        backup.push(".bak");
        if let Err(e) = std::fs::rename(&self.path, PathBuf::from(&backup)) {
            warn!(path = %self.path.display(), error = %e, "Could not back up corrupt progress state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_returns_empty() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("log_state.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("log_state.json"));

        let mut state = HashMap::new();
        state.insert(
            "proxy-host-1_access.log".to_string(),
            FileCursor::Plain {
                offset: 4096,
                inode: Some(12345),
            },
        );
        state.insert(
            "proxy-host-1_access.log.2.gz".to_string(),
            FileCursor::Archived { processed: true },
        );

        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_corrupt_document_is_backed_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log_state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = ProgressStore::new(&path);
        assert!(store.load().is_empty());
        assert!(!path.exists());
        assert!(dir.path().join("log_state.json.bak").exists());
    }

    #[test]
    fn test_invalid_entry_is_reset_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log_state.json");
        std::fs::write(
            &path,
            r#"{
                "proxy-host-1_access.log": "garbage",
                "proxy-host-1_access.log.1.gz": 42,
                "proxy-host-2_access.log": {"offset": 100, "inode": 7}
            }"#,
        )
        .unwrap();

        let state = ProgressStore::new(&path).load();
        assert_eq!(
            state.get("proxy-host-1_access.log"),
            Some(&FileCursor::new_plain())
        );
        assert_eq!(
            state.get("proxy-host-1_access.log.1.gz"),
            Some(&FileCursor::new_archived())
        );
        assert_eq!(
            state.get("proxy-host-2_access.log"),
            Some(&FileCursor::Plain {
                offset: 100,
                inode: Some(7)
            })
        );
    }

    #[test]
    fn test_malformed_fields_are_reset_individually() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log_state.json");
        std::fs::write(
            &path,
            r#"{"proxy-host-1_access.log": {"offset": "not a number", "inode": "nope"}}"#,
        )
        .unwrap();

        let state = ProgressStore::new(&path).load();
        assert_eq!(
            state.get("proxy-host-1_access.log"),
            Some(&FileCursor::Plain {
                offset: 0,
                inode: None
            })
        );
    }

    #[test]
    fn test_unknown_suffix_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log_state.json");
        std::fs::write(&path, r#"{"notes.txt": {"offset": 5}}"#).unwrap();

        assert!(ProgressStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_save_is_atomic_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log_state.json");
        let store = ProgressStore::new(&path);

        store.save(&HashMap::new()).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("log_state.tmp").exists());
    }
}
