//! Configuration for chronicle
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Configuration for a [`LogWriter`](crate::LogWriter) instance
///
/// The writer owns one data directory with the layout:
///   {data_dir}/
///     ├── index.json           (manifest)
///     ├── events_000001.jsonl  (sealed shard)
///     └── events_000002.jsonl  (active shard)
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Directory holding the manifest and all shard files
    pub data_dir: PathBuf,

    /// Rotation bound: the active shard is sealed once it holds this many
    /// events. Must be positive.
    pub max_events_per_shard: u64,

    /// If true, continue an existing log: the manifest is loaded and the last
    /// shard becomes active again. If false, the logical shard sequence
    /// restarts at 1 (stale files are overwritten as the sequence reaches
    /// them, never deleted).
    pub resume: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./chronicle_data"),
            max_events_per_shard: 1000,
            resume: false,
        }
    }
}

impl WriterConfig {
    /// Create a new config builder
    pub fn builder() -> WriterConfigBuilder {
        WriterConfigBuilder::default()
    }
}

/// Builder for WriterConfig
#[derive(Default)]
pub struct WriterConfigBuilder {
    config: WriterConfig,
}

impl WriterConfigBuilder {
    /// Set the data directory (manifest + shards)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the shard rotation bound
    pub fn max_events_per_shard(mut self, count: u64) -> Self {
        self.config.max_events_per_shard = count;
        self
    }

    /// Resume an existing log instead of starting a fresh sequence
    pub fn resume(mut self, resume: bool) -> Self {
        self.config.resume = resume;
        self
    }

    pub fn build(self) -> WriterConfig {
        self.config
    }
}

/// What a rebuild does with an input line that is not a valid event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedLinePolicy {
    /// Abort the whole rebuild on the first malformed line (safest)
    #[default]
    Fail,

    /// Skip malformed lines and count them (bulk recovery of dirty logs)
    Skip,
}

/// Options for [`rebuild_from_logs_with`](crate::rebuild_from_logs_with)
#[derive(Debug, Clone)]
pub struct RebuildOptions {
    /// Rotation bound for the rebuilt shards. Must be positive.
    pub max_events_per_shard: u64,

    /// Policy for lines that fail to parse as ordered events
    pub malformed: MalformedLinePolicy,
}

impl RebuildOptions {
    /// Fail-fast options with the given shard bound
    pub fn new(max_events_per_shard: u64) -> Self {
        Self {
            max_events_per_shard,
            malformed: MalformedLinePolicy::Fail,
        }
    }

    /// Switch to tolerant mode: skip and count malformed lines
    pub fn tolerant(mut self) -> Self {
        self.malformed = MalformedLinePolicy::Skip;
        self
    }
}
