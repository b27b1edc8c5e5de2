//! Sharded Event Log Module
//!
//! Append-only storage for the simulation's event stream, laid out so a
//! static front-end can replay history by fetching small immutable files.
//!
//! ## Responsibilities
//! - Append serialized events to the active shard
//! - Rotate shards by event count
//! - Keep a durable manifest of the shard layout (atomic replace)
//! - Consumer-side shard reads that survive a torn trailing line
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//! ├── index.json           manifest: version, bound, shard list, totals
//! ├── events_000001.jsonl  sealed shard (immutable, cacheable)
//! ├── events_000002.jsonl  sealed shard
//! └── events_000003.jsonl  active shard (append target)
//! ```
//!
//! Shard files are UTF-8 text, one JSON object per line, newline-terminated,
//! no enclosing array. Only the manifest and the active shard ever change;
//! every sealed shard is immutable.

mod manifest;
mod reader;
mod writer;

pub use manifest::{Manifest, ShardMeta};
pub use reader::{read_shard_lines, LogReader};
pub use writer::LogWriter;

use std::path::{Path, PathBuf};

// =============================================================================
// Layout Conventions (shared by writer, reader, and rebuild)
// =============================================================================

/// File name of the manifest inside a log directory
pub const MANIFEST_FILENAME: &str = "index.json";

/// Manifest path for a log directory
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILENAME)
}

/// Shard file name for a sequence number
///
/// Zero-padded to six digits so lexical and numeric ordering coincide:
/// `shard_file_name(42)` → `"events_000042.jsonl"`.
pub fn shard_file_name(seq: u64) -> String {
    format!("events_{:06}.jsonl", seq)
}
