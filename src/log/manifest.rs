//! Manifest
//!
//! Durable, crash-safe description of the shard layout. The manifest is the
//! single source of truth consumers fetch first; shards are fetched on demand
//! afterwards. It is only ever replaced atomically, never patched in place.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChronicleError, Result};

/// One shard's entry in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardMeta {
    /// 1-based sequence number, strictly increasing and gap-free
    pub seq: u64,

    /// File name, a pure function of `seq` (see [`shard_file_name`](super::shard_file_name))
    pub file: String,

    /// Number of event lines the shard holds
    pub events: u64,
}

/// Durable record of shard layout and totals (`index.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version; missing or non-positive values normalize to 1
    #[serde(default)]
    pub version: i64,

    /// When this manifest was written (stamped by `save_atomic`)
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,

    /// Rotation bound the shards were written under
    pub max_events_per_shard: u64,

    /// Shard entries, oldest to newest; the last entry is the active shard
    pub shards: Vec<ShardMeta>,

    /// Sum of all shard event counts
    pub total_events: u64,
}

impl Manifest {
    /// Create an empty manifest for a fresh log
    pub fn new(max_events_per_shard: u64) -> Self {
        Self {
            version: 1,
            generated_at: None,
            max_events_per_shard,
            shards: Vec::new(),
            total_events: 0,
        }
    }

    /// Load a manifest from disk
    ///
    /// Returns:
    /// - `Err(Io)` — the file cannot be read
    /// - `Err(Decode)` — the content is not a valid manifest
    ///
    /// A missing or non-positive `version` field defaults to 1.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;

        let mut manifest: Self = serde_json::from_str(&raw).map_err(|e| {
            ChronicleError::Decode(format!("malformed manifest {}: {}", path.display(), e))
        })?;

        if manifest.version <= 0 {
            manifest.version = 1;
        }

        Ok(manifest)
    }

    /// Persist the manifest with atomic-replace semantics
    ///
    /// Normalizes `version`, stamps `generated_at`, then writes the full
    /// serialization to a temporary file in the same directory and renames it
    /// over the destination. A reader never observes a partially written
    /// manifest; a crash before the rename leaves the previous one intact.
    pub fn save_atomic(&mut self, path: &Path) -> Result<()> {
        if self.version <= 0 {
            self.version = 1;
        }
        self.generated_at = Some(Utc::now());

        let body = serde_json::to_vec_pretty(self).map_err(|e| {
            ChronicleError::Decode(format!("failed to serialize manifest: {}", e))
        })?;

        // Temp file must live in the destination directory: rename(2) is only
        // atomic within one filesystem.
        let file_name = path
            .file_name()
            .ok_or_else(|| {
                ChronicleError::Config(format!("invalid manifest path: {}", path.display()))
            })?
            .to_string_lossy();
        let tmp_path = path.with_file_name(format!("{}.tmp", file_name));

        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&body)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, path)?;

        tracing::debug!(
            path = %path.display(),
            shards = self.shards.len(),
            total_events = self.total_events,
            "manifest persisted"
        );

        Ok(())
    }
}
