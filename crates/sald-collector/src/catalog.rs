//! Log file discovery
//!
//! Enumerates the configured log directory for currently-active access
//! logs (`proxy-host-*_access.log`) and their rotated gzip archives
//! (`proxy-host-*_access.log.<N>.gz`), classifying each file once at
//! discovery time. Archives are emitted newest-rotation-first, followed
//! by the active files.

use regex::Regex;
use sald_common::SaldError;
use std::path::{Path, PathBuf};
use tracing::warn;

/// How a cataloged file is read and tracked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// Currently-growing plain file, tailed by offset and inode
    Plain,
    /// Rotated, compressed, immutable archive
    Archived {
        /// Numeric rotation index parsed from the filename; 0 when absent
        rotation: u32,
    },
}

/// One discovered log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogedFile {
    pub path: PathBuf,
    /// Base filename, the key used in the progress state
    pub name: String,
    pub kind: FileKind,
}

/// Discovers and orders candidate log files
pub struct FileCatalog {
    log_dir: PathBuf,
    active_pattern: Regex,
    archive_pattern: Regex,
}

impl FileCatalog {
    pub fn new(log_dir: impl Into<PathBuf>) -> Result<Self, SaldError> {
        let active_pattern = Regex::new(r"^proxy-host-.+_access\.log$")
            .map_err(|e| SaldError::Parse(format!("invalid active-file pattern: {}", e)))?;
        let archive_pattern = Regex::new(r"^proxy-host-.+_access\.log\.([^.]+)\.gz$")
            .map_err(|e| SaldError::Parse(format!("invalid archive pattern: {}", e)))?;

        Ok(Self {
            log_dir: log_dir.into(),
            active_pattern,
            archive_pattern,
        })
    }

    /// The directory being scanned
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Discover candidate files in processing order
    ///
    /// Returns an empty sequence when the directory is absent or
    /// unreadable; the caller treats that as "nothing to do", not a fault.
    pub fn discover(&self) -> Vec<CatalogedFile> {
        let entries = match std::fs::read_dir(&self.log_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.log_dir.display(), error = %e, "Log directory not readable, nothing to collect");
                return Vec::new();
            },
        };

        let mut archives = Vec::new();
        let mut active = Vec::new();

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if let Some(captures) = self.archive_pattern.captures(name) {
                let rotation = captures
                    .get(1)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(0);
                archives.push(CatalogedFile {
                    path: path.clone(),
                    name: name.to_string(),
                    kind: FileKind::Archived { rotation },
                });
            } else if self.active_pattern.is_match(name) {
                active.push(CatalogedFile {
                    path: path.clone(),
                    name: name.to_string(),
                    kind: FileKind::Plain,
                });
            }
        }

        // Newest rotation first; ties broken by name for a stable order.
        archives.sort_by(|a, b| {
            let (ra, rb) = (rotation_of(a), rotation_of(b));
            rb.cmp(&ra).then_with(|| a.name.cmp(&b.name))
        });
        active.sort_by(|a, b| a.name.cmp(&b.name));

        archives.extend(active);
        archives
    }
}

fn rotation_of(file: &CatalogedFile) -> u32 {
    match file.kind {
        FileKind::Archived { rotation } => rotation,
        FileKind::Plain => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_missing_directory_yields_empty_catalog() {
        let catalog = FileCatalog::new("/nonexistent/log/dir").unwrap();
        assert!(catalog.discover().is_empty());
    }

    #[test]
    fn test_orders_archives_newest_rotation_first_then_active() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "proxy-host-1_access.log");
        touch(dir.path(), "proxy-host-1_access.log.1.gz");
        touch(dir.path(), "proxy-host-1_access.log.3.gz");
        touch(dir.path(), "proxy-host-1_access.log.2.gz");
        touch(dir.path(), "proxy-host-2_access.log");

        let files = FileCatalog::new(dir.path()).unwrap().discover();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "proxy-host-1_access.log.3.gz",
                "proxy-host-1_access.log.2.gz",
                "proxy-host-1_access.log.1.gz",
                "proxy-host-1_access.log",
                "proxy-host-2_access.log",
            ]
        );
    }

    #[test]
    fn test_non_numeric_rotation_index_sorts_as_zero() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "proxy-host-1_access.log.old.gz");
        touch(dir.path(), "proxy-host-1_access.log.2.gz");

        let files = FileCatalog::new(dir.path()).unwrap().discover();
        assert_eq!(files[0].name, "proxy-host-1_access.log.2.gz");
        assert_eq!(files[1].name, "proxy-host-1_access.log.old.gz");
        assert_eq!(files[1].kind, FileKind::Archived { rotation: 0 });
    }

    #[test]
    fn test_ignores_unrelated_files() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "error.log");
        touch(dir.path(), "proxy-host-1_access.log.bak");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "proxy-host-1_access.log");

        let files = FileCatalog::new(dir.path()).unwrap().discover();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "proxy-host-1_access.log");
        assert_eq!(files[0].kind, FileKind::Plain);
    }
}
