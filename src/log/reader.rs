//! Log Reader
//!
//! Consumer-side access: fetch the manifest first, then shard files on
//! demand. Sealed shards are immutable, so their contents may be cached
//! indefinitely; only the manifest and the active shard can change between
//! reads.
//!
//! A shard whose last line is missing its terminator was torn by a crash
//! mid-append; readers discard that trailing fragment rather than fail.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ChronicleError, Result};

use super::manifest::{Manifest, ShardMeta};
use super::manifest_path;

/// Read the complete (newline-terminated) lines of one shard file
///
/// A trailing fragment with no terminator is discarded.
pub fn read_shard_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path)?;

    let mut pieces: Vec<&[u8]> = bytes.split(|&b| b == b'\n').collect();

    // The final piece is whatever follows the last newline: empty for a
    // well-terminated file, a torn fragment otherwise.
    if let Some(fragment) = pieces.pop() {
        if !fragment.is_empty() {
            tracing::debug!(
                file = %path.display(),
                fragment_bytes = fragment.len(),
                "discarding trailing incomplete line"
            );
        }
    }

    pieces
        .into_iter()
        .map(|raw| {
            std::str::from_utf8(raw)
                .map(str::to_string)
                .map_err(|e| {
                    ChronicleError::Decode(format!(
                        "shard {} contains invalid UTF-8: {}",
                        path.display(),
                        e
                    ))
                })
        })
        .collect()
}

/// Reads a sharded event log the way the front-end consumes it
pub struct LogReader {
    /// Directory holding the manifest and shard files
    data_dir: PathBuf,

    /// Manifest snapshot taken at open
    manifest: Manifest,
}

impl LogReader {
    /// Open a log directory by loading its manifest
    pub fn open(dir: &Path) -> Result<Self> {
        let manifest = Manifest::load(&manifest_path(dir))?;
        Ok(Self {
            data_dir: dir.to_path_buf(),
            manifest,
        })
    }

    /// The manifest snapshot this reader was opened with
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Read one shard's event lines
    pub fn read_shard(&self, shard: &ShardMeta) -> Result<Vec<String>> {
        read_shard_lines(&self.data_dir.join(&shard.file))
    }

    /// Read every event line in replay order (oldest shard first)
    pub fn read_all(&self) -> Result<Vec<String>> {
        let mut lines = Vec::with_capacity(self.manifest.total_events as usize);
        for shard in &self.manifest.shards {
            lines.extend(self.read_shard(shard)?);
        }
        Ok(lines)
    }
}
