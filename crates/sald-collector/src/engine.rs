//! Ingestion engine
//!
//! Orchestrates one collection run: discover files, consult each file's
//! cursor, read only new content, parse, drop everything at or below the
//! run's timestamp watermark, dedup against the store's existing keys,
//! enrich with geolocation, and append the surviving records in a single
//! batch before committing the updated cursors.
//!
//! Fault scope matches the damage: a bad line is skipped, a bad file is
//! logged and retried next run (its cursor stays put), and a store fault
//! aborts the whole batch with cursors unsaved so the same byte ranges
//! are re-read next time. Re-reading is safe; the dedup key makes
//! re-insertion a no-op.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogedFile, FileCatalog, FileKind};
use crate::config::CollectorConfig;
use crate::geo::{GeoResolver, UNKNOWN_COUNTRY};
use crate::parser::{LineParser, ParseOutcome, ParsedLogRecord};
use crate::state::{FileCursor, ProgressStore};
use crate::status::StatusHandle;
use crate::store::{DedupKey, LogStore, NewLogEntry};
use sald_common::SaldError;

/// Outcome of one collection run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Files the catalog produced this run
    pub files_seen: usize,
    /// Files that faulted and will be retried next run
    pub files_failed: usize,
    /// Newly stored records
    pub records_stored: u64,
}

/// The log ingestion engine
///
/// Safe to invoke repeatedly; a run never re-ingests stored data. Within
/// one run, files are processed sequentially in catalog order.
pub struct IngestionEngine {
    catalog: FileCatalog,
    parser: LineParser,
    progress: ProgressStore,
    store: Arc<dyn LogStore>,
    geo: Arc<GeoResolver>,
}

impl IngestionEngine {
    pub fn new(
        config: CollectorConfig,
        store: Arc<dyn LogStore>,
        geo: Arc<GeoResolver>,
    ) -> Result<Self, SaldError> {
        Ok(Self {
            catalog: FileCatalog::new(&config.log_dir)?,
            parser: LineParser::new()?,
            progress: ProgressStore::new(&config.state_path),
            store,
            geo,
        })
    }

    /// Execute one collection run
    ///
    /// Returns a run-level error only when the store is unusable; in that
    /// case no cursor is saved and the next invocation retries the same
    /// window.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let files = self.catalog.discover();
        if files.is_empty() {
            info!(dir = %self.catalog.log_dir().display(), "No log files to collect");
            return Ok(summary);
        }
        info!(count = files.len(), "Starting collection pass");

        let mut cursors = self.progress.load();

        // Established once for the whole run, not re-queried per file.
        let watermark = self
            .store
            .max_timestamp()
            .await
            .context("Failed to query the stored timestamp watermark")?
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        debug!(watermark = %watermark, "Run watermark established");

        let mut pending: Vec<NewLogEntry> = Vec::new();
        let mut seen_keys: HashSet<DedupKey> = HashSet::new();

        for file in &files {
            summary.files_seen += 1;
            match self
                .collect_file(file, &mut cursors, watermark, &mut seen_keys, &mut pending)
                .await
            {
                Ok(added) => {
                    debug!(file = %file.name, added, "File done");
                },
                Err(e) => {
                    // Cursor untouched: the file is retried on the next run.
                    summary.files_failed += 1;
                    error!(file = %file.name, error = %e, "Error processing file, continuing with next");
                },
            }
        }

        if pending.is_empty() {
            info!("No new unique log entries found");
        } else {
            summary.records_stored = self
                .store
                .append_batch(&pending)
                .await
                .context("Batch insert failed; cursors left unsaved for retry")?;
            info!(stored = summary.records_stored, "Wrote new log entries to the store");
        }

        // Saved even when nothing was inserted: confirmed offsets for
        // "no new data" files still have to survive the run.
        if let Err(e) = self.progress.save(&cursors) {
            error!(path = %self.progress.path().display(), error = %e, "Failed to save progress state");
        }

        Ok(summary)
    }

    async fn collect_file(
        &self,
        file: &CatalogedFile,
        cursors: &mut HashMap<String, FileCursor>,
        watermark: DateTime<Utc>,
        seen_keys: &mut HashSet<DedupKey>,
        pending: &mut Vec<NewLogEntry>,
    ) -> Result<usize> {
        match file.kind {
            FileKind::Archived { .. } => {
                if matches!(
                    cursors.get(&file.name),
                    Some(FileCursor::Archived { processed: true })
                ) {
                    debug!(file = %file.name, "Archive already processed, skipping");
                    return Ok(0);
                }

                let lines = read_archive_lines(&file.path)
                    .with_context(|| format!("Failed to read archive {}", file.path.display()))?;
                let records = self.parse_lines(&lines, watermark);
                let added = self.enqueue_new_records(records, seen_keys, pending).await?;

                cursors.insert(file.name.clone(), FileCursor::Archived { processed: true });
                info!(file = %file.name, added, "Archive collected");
                Ok(added)
            },
            FileKind::Plain => {
                let metadata = std::fs::metadata(&file.path)
                    .with_context(|| format!("Failed to stat {}", file.path.display()))?;
                let inode = inode_of(&metadata);
                let size = metadata.len();

                let (last_offset, last_inode) = match cursors.get(&file.name) {
                    Some(FileCursor::Plain { offset, inode }) => (*offset, *inode),
                    _ => (0, None),
                };

                let start_offset = if last_inode.is_none() {
                    info!(file = %file.name, "File seen for the first time");
                    0
                } else if inode != last_inode {
                    warn!(file = %file.name, "Inode changed (rotated in place?), reading from start");
                    0
                } else if size < last_offset {
                    warn!(file = %file.name, size, offset = last_offset, "File shrank (truncated?), reading from start");
                    0
                } else if size == last_offset {
                    debug!(file = %file.name, offset = last_offset, "No new data");
                    cursors.insert(file.name.clone(), FileCursor::Plain { offset: size, inode });
                    return Ok(0);
                } else {
                    debug!(file = %file.name, offset = last_offset, "Reading new bytes from stored offset");
                    last_offset
                };

                let (lines, end_offset) = read_plain_lines(&file.path, start_offset)
                    .with_context(|| format!("Failed to read {}", file.path.display()))?;
                let records = self.parse_lines(&lines, watermark);
                let added = self.enqueue_new_records(records, seen_keys, pending).await?;

                cursors.insert(
                    file.name.clone(),
                    FileCursor::Plain {
                        offset: end_offset,
                        inode,
                    },
                );
                info!(file = %file.name, added, offset = end_offset, "File collected");
                Ok(added)
            },
        }
    }

    /// Parse raw lines, keeping accepted records above the watermark
    fn parse_lines(&self, lines: &[String], watermark: DateTime<Utc>) -> Vec<ParsedLogRecord> {
        lines
            .iter()
            .filter_map(|line| match self.parser.parse(line) {
                ParseOutcome::Accepted(record) if record.timestamp > watermark => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Dedup one file's surviving records and queue the new ones
    ///
    /// Checks the store for keys at or after the batch's earliest
    /// timestamp, and the run-level seen set so the same record arriving
    /// from two files within one run is stored once.
    async fn enqueue_new_records(
        &self,
        records: Vec<ParsedLogRecord>,
        seen_keys: &mut HashSet<DedupKey>,
        pending: &mut Vec<NewLogEntry>,
    ) -> Result<usize> {
        let Some(min_timestamp) = records.iter().map(|r| r.timestamp).min() else {
            return Ok(0);
        };

        let existing = self
            .store
            .existing_keys(min_timestamp)
            .await
            .context("Failed to query existing dedup keys")?;

        let mut added = 0;
        for record in records {
            let key = record.dedup_key();
            if existing.contains(&key) || seen_keys.contains(&key) {
                continue;
            }

            let country = self
                .geo
                .resolve(&record.remote_ip)
                .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());

            pending.push(NewLogEntry {
                ip_address: record.remote_ip,
                timestamp: record.timestamp,
                status_code: record.status_code,
                country,
                request_path: record.request_path,
                domain: record.domain,
                raw_log: record.raw_line,
            });
            seen_keys.insert(key);
            added += 1;
        }
        Ok(added)
    }
}

/// Run the engine behind the status flag
///
/// Returns `None` immediately when a run is already in progress; skipped
/// triggers are not queued. Otherwise the status moves Running ->
/// Finished/Error around the run.
pub async fn run_collection(
    engine: &IngestionEngine,
    status: &StatusHandle,
) -> Option<Result<RunSummary>> {
    if !status.try_begin() {
        warn!("Collection already running, trigger ignored");
        return None;
    }

    match engine.run().await {
        Ok(summary) => {
            info!(
                stored = summary.records_stored,
                failed_files = summary.files_failed,
                "Collection run finished"
            );
            status.finish();
            Some(Ok(summary))
        },
        Err(e) => {
            error!(error = %e, "Collection run failed");
            status.fail();
            Some(Err(e))
        },
    }
}

/// Read new lines from a plain file starting at `start_offset`
///
/// Byte offsets come from the exact counts `read_until` consumed, so the
/// returned end offset is the position after the last line read. Content
/// that is not valid UTF-8 is replaced, not fatal.
fn read_plain_lines(path: &Path, start_offset: u64) -> Result<(Vec<String>, u64)> {
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    if start_offset > 0 {
        reader.seek(SeekFrom::Start(start_offset))?;
    }

    let mut lines = Vec::new();
    let mut offset = start_offset;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        offset += read as u64;
        push_line(&mut lines, &buf);
    }
    Ok((lines, offset))
}

/// Read the whole decompressed content of a gzip archive
fn read_archive_lines(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(GzDecoder::new(file));

    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        push_line(&mut lines, &buf);
    }
    Ok(lines)
}

fn push_line(lines: &mut Vec<String>, raw: &[u8]) {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();
    if !line.is_empty() {
        lines.push(line.to_string());
    }
}

#[cfg(unix)]
fn inode_of(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn inode_of(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}
