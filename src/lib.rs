//! # chronicle
//!
//! A sharded, append-only event log for long-running agent simulations:
//! - One JSON object per line, shards rotated by event count
//! - Durable manifest (`index.json`) replaced atomically, never patched
//! - Crash-tolerant resume that reconciles against on-disk state
//! - Offline rebuild merging arbitrary raw logs into one canonical order
//!
//! The layout is built for a serverless front-end: consumers fetch the small
//! manifest first, then immutable shard files on demand, so history replay
//! needs no live backend.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Event Producers                          │
//! │         (agent loop, one JSON object per event)              │
//! └──────────────────────────┬───────────────────────────────────┘
//!                            │ append_line
//! ┌──────────────────────────▼───────────────────────────────────┐
//! │                        LogWriter                             │
//! │        (active shard handle, count-based rotation)           │
//! └──────┬───────────────────────────────────────────┬───────────┘
//!        │                                           │ close
//!        ▼                                           ▼
//! ┌─────────────┐  ┌─────────────┐  ...       ┌─────────────┐
//! │events_000001│  │events_000002│            │ index.json  │
//! │  (sealed)   │  │  (active)   │            │ (manifest,  │
//! └─────────────┘  └─────────────┘            │ atomic swap)│
//!        ▲                ▲                   └──────▲──────┘
//!        │                │                          │
//! ┌──────┴────────────────┴──────────────────────────┴───────────┐
//! │              LogReader / static front-end                    │
//! └──────────────────────────────────────────────────────────────┘
//!
//! rebuild_from_logs: raw logs ──parse──sort──▶ fresh shards + manifest
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod event;
pub mod log;
pub mod rebuild;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ChronicleError, Result};
pub use config::{MalformedLinePolicy, RebuildOptions, WriterConfig};
pub use event::EventKey;
pub use log::{LogReader, LogWriter, Manifest, ShardMeta};
pub use rebuild::{rebuild_from_logs, rebuild_from_logs_with};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of chronicle
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
