//! Log Writer
//!
//! Appends events to the active shard, rotates shards by count, and keeps the
//! manifest consistent.
//!
//! ## Ownership Model
//! One `LogWriter` exclusively owns its directory's active shard handle and
//! in-memory counters. There is no cross-process locking; two writers pointed
//! at the same directory produce undefined results. Within a process, route
//! all appends through one owning task.
//!
//! ## Crash Semantics
//! Event data is flushed to the active shard as it is appended, but the
//! manifest is only persisted at `close`. A crash before `close` can leave
//! the active shard holding more physical lines than the last persisted
//! manifest records; resume reconciles by recounting the file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::WriterConfig;
use crate::error::{ChronicleError, Result};

use super::manifest::{Manifest, ShardMeta};
use super::{manifest_path, shard_file_name};

/// Appends serialized events to a sharded log
pub struct LogWriter {
    /// Directory holding the manifest and shard files
    data_dir: PathBuf,

    /// Path of `index.json` inside `data_dir`
    manifest_path: PathBuf,

    /// In-memory manifest; persisted only at `close`
    manifest: Manifest,

    /// Open handle for the active (last) shard, if one has been opened
    active: Option<BufWriter<File>>,

    /// Set by a successful `close`; all operations fail afterwards
    closed: bool,
}

impl LogWriter {
    /// Open a writer for a directory
    ///
    /// With `resume = false` the logical shard sequence restarts at 1 and any
    /// prior manifest is discarded (stale shard files are overwritten as the
    /// new sequence reaches them, never deleted). With `resume = true` the
    /// existing manifest is loaded and the last shard becomes active again;
    /// its on-disk line count is ground truth and any drift from the manifest
    /// is corrected.
    pub fn open(config: WriterConfig) -> Result<Self> {
        if config.max_events_per_shard == 0 {
            return Err(ChronicleError::Config(
                "max_events_per_shard must be positive".to_string(),
            ));
        }

        fs::create_dir_all(&config.data_dir)?;
        let manifest_path = manifest_path(&config.data_dir);

        let mut writer = if config.resume {
            let mut manifest = Manifest::load(&manifest_path)?;

            if manifest.max_events_per_shard != config.max_events_per_shard {
                tracing::warn!(
                    stored = manifest.max_events_per_shard,
                    configured = config.max_events_per_shard,
                    "shard bound changed on resume; configured bound governs rotation"
                );
                manifest.max_events_per_shard = config.max_events_per_shard;
            }

            Self {
                data_dir: config.data_dir,
                manifest_path,
                manifest,
                active: None,
                closed: false,
            }
        } else {
            tracing::info!(
                dir = %config.data_dir.display(),
                max_events_per_shard = config.max_events_per_shard,
                "starting fresh event log"
            );

            Self {
                data_dir: config.data_dir,
                manifest_path,
                manifest: Manifest::new(config.max_events_per_shard),
                active: None,
                closed: false,
            }
        };

        writer.reopen_active_shard()?;
        Ok(writer)
    }

    /// Append one already-serialized event
    ///
    /// The line must not contain a line terminator; a terminator is added by
    /// the writer. No schema validation is performed; ordering-field
    /// correctness is the producer's responsibility. The Nth append into a
    /// shard fills it; append N+1 seals it and opens shard `seq + 1`.
    pub fn append_line(&mut self, line: &str) -> Result<()> {
        if self.closed {
            return Err(ChronicleError::Closed);
        }
        if line.contains('\n') || line.contains('\r') {
            return Err(ChronicleError::Decode(
                "event must be a single line without embedded line terminators".to_string(),
            ));
        }

        let bound = self.manifest.max_events_per_shard;
        let full = self
            .manifest
            .shards
            .last()
            .map_or(true, |shard| shard.events >= bound);

        let mut shard = match self.active.take() {
            Some(handle) if !full => handle,
            handle => self.roll_shard(handle)?,
        };

        // Restore the handle before surfacing any write error so a failed
        // append cannot trigger a spurious rotation on the next call.
        let written = write_event_line(&mut shard, line);
        self.active = Some(shard);
        written?;

        if let Some(last) = self.manifest.shards.last_mut() {
            last.events += 1;
        }
        self.manifest.total_events += 1;

        Ok(())
    }

    /// Serialize an event object to one compact line and append it
    pub fn append_value(&mut self, event: &serde_json::Value) -> Result<()> {
        let line = serde_json::to_string(event).map_err(|e| {
            ChronicleError::Decode(format!("failed to serialize event: {}", e))
        })?;
        self.append_line(&line)
    }

    /// Flush the active shard and persist the manifest atomically
    ///
    /// A second `close`, or any append after a successful `close`, fails with
    /// `Closed`. A `close` that fails leaves the writer open so the caller
    /// can retry.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(ChronicleError::Closed);
        }

        if let Some(shard) = self.active.as_mut() {
            shard.flush()?;
            shard.get_ref().sync_all()?;
        }

        self.manifest.save_atomic(&self.manifest_path)?;

        self.active = None;
        self.closed = true;

        tracing::info!(
            shards = self.manifest.shards.len(),
            total_events = self.manifest.total_events,
            "event log closed"
        );

        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The in-memory manifest (persisted state may lag until `close`)
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Number of shards, including the active one
    pub fn shard_count(&self) -> usize {
        self.manifest.shards.len()
    }

    /// Total events appended across all shards
    pub fn total_events(&self) -> u64 {
        self.manifest.total_events
    }

    /// The directory this writer owns
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Seal the previous shard (if any) and open the next one
    ///
    /// Adds the new shard's manifest entry; the entry's count grows as events
    /// are appended.
    fn roll_shard(&mut self, prev: Option<BufWriter<File>>) -> Result<BufWriter<File>> {
        if let Some(mut sealed) = prev {
            sealed.flush()?;
            sealed.get_ref().sync_all()?;
            if let Some(last) = self.manifest.shards.last() {
                tracing::debug!(seq = last.seq, events = last.events, "sealed shard");
            }
        }

        let seq = self.manifest.shards.last().map_or(1, |shard| shard.seq + 1);
        let file_name = shard_file_name(seq);
        let path = self.data_dir.join(&file_name);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        tracing::debug!(seq, file = %file_name, "opened shard");

        self.manifest.shards.push(ShardMeta {
            seq,
            file: file_name,
            events: 0,
        });

        Ok(BufWriter::new(file))
    }

    /// Reconcile and reopen the last shard after a resume
    ///
    /// The on-disk count of complete lines is ground truth: a torn trailing
    /// fragment is truncated away, and manifest counts are corrected if they
    /// drifted (e.g. a crash between appends and the last persisted close).
    fn reopen_active_shard(&mut self) -> Result<()> {
        let Some(last) = self.manifest.shards.last().cloned() else {
            return Ok(());
        };

        let path = self.data_dir.join(&last.file);
        let on_disk = recover_complete_lines(&path)?;

        if on_disk != last.events {
            tracing::warn!(
                seq = last.seq,
                manifest_events = last.events,
                on_disk,
                "manifest drift on resume; using on-disk line count"
            );
            if let Some(entry) = self.manifest.shards.last_mut() {
                entry.events = on_disk;
            }
            self.manifest.total_events =
                self.manifest.shards.iter().map(|shard| shard.events).sum();
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.active = Some(BufWriter::new(file));

        tracing::info!(
            seq = last.seq,
            events = on_disk,
            "resumed event log on active shard"
        );

        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(
                dir = %self.data_dir.display(),
                "LogWriter dropped without close; manifest not persisted"
            );
        }
    }
}

/// Write one event line and flush it to the OS
fn write_event_line(shard: &mut BufWriter<File>, line: &str) -> io::Result<()> {
    shard.write_all(line.as_bytes())?;
    shard.write_all(b"\n")?;
    shard.flush()
}

/// Count complete (newline-terminated) lines, truncating a torn tail
///
/// A missing file counts as empty: the shard is recreated on the next append.
fn recover_complete_lines(path: &Path) -> Result<u64> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(
                file = %path.display(),
                "active shard file missing at resume; treating as empty"
            );
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let complete = bytes.iter().filter(|&&b| b == b'\n').count() as u64;

    // Anything after the last newline is a torn write from a crash mid-append.
    let keep = bytes.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    if keep < bytes.len() {
        tracing::warn!(
            file = %path.display(),
            dropped_bytes = bytes.len() - keep,
            "truncating torn trailing line from active shard"
        );
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(keep as u64)?;
        file.sync_all()?;
    }

    Ok(complete)
}
