//! Tests for the log writer
//!
//! These tests verify:
//! - Count-based shard rotation (the Nth append fills a shard, append N+1
//!   opens the next)
//! - Manifest totals tracking every append
//! - Fresh-mode restart of the logical shard sequence
//! - Resume into a partially filled last shard
//! - Drift reconciliation and torn-tail truncation on resume
//! - Close semantics (manifest persisted, writer unusable afterwards)
//! - Error taxonomy: Config, Decode, Closed

use std::fs;
use std::path::Path;

use chronicle::log::shard_file_name;
use chronicle::{ChronicleError, LogWriter, Manifest, WriterConfig};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_writer(dir: &Path, bound: u64, resume: bool) -> LogWriter {
    let config = WriterConfig::builder()
        .data_dir(dir)
        .max_events_per_shard(bound)
        .resume(resume)
        .build();
    LogWriter::open(config).unwrap()
}

fn append_events(writer: &mut LogWriter, count: usize) {
    for i in 0..count {
        writer
            .append_line(&format!(r#"{{"event": {}}}"#, i))
            .unwrap();
    }
}

fn shard_sizes(writer: &LogWriter) -> Vec<u64> {
    writer.manifest().shards.iter().map(|s| s.events).collect()
}

fn shard_lines(dir: &Path, seq: u64) -> Vec<String> {
    fs::read_to_string(dir.join(shard_file_name(seq)))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_zero_shard_bound_is_config_error() {
    let temp = TempDir::new().unwrap();

    let config = WriterConfig::builder()
        .data_dir(temp.path())
        .max_events_per_shard(0)
        .build();

    let result = LogWriter::open(config);
    assert!(matches!(result, Err(ChronicleError::Config(_))));
}

#[test]
fn test_open_creates_data_dir() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("logs/run-1");

    let writer = open_writer(&nested, 10, false);
    assert!(nested.is_dir());
    assert_eq!(writer.shard_count(), 0);
}

// =============================================================================
// Rotation Tests
// =============================================================================

#[test]
fn test_first_append_opens_shard_one() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 10, false);

    assert_eq!(writer.shard_count(), 0);
    writer.append_line(r#"{"event": 0}"#).unwrap();

    assert_eq!(writer.shard_count(), 1);
    assert_eq!(writer.manifest().shards[0].seq, 1);
    assert!(temp.path().join(shard_file_name(1)).exists());
}

#[test]
fn test_exactly_k_appends_fill_one_shard() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 3, false);

    append_events(&mut writer, 3);

    assert_eq!(shard_sizes(&writer), vec![3]);
    assert!(!temp.path().join(shard_file_name(2)).exists());
}

#[test]
fn test_append_k_plus_one_opens_next_shard() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 3, false);

    append_events(&mut writer, 4);

    assert_eq!(shard_sizes(&writer), vec![3, 1]);
    assert_eq!(writer.manifest().shards[1].seq, 2);
}

#[test]
fn test_shard_count_is_ceil_n_over_k() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 4, false);

    append_events(&mut writer, 10);

    // ceil(10/4) = 3 shards; totals must agree with the sum of shard counts
    assert_eq!(shard_sizes(&writer), vec![4, 4, 2]);
    assert_eq!(writer.total_events(), 10);
}

#[test]
fn test_seven_appends_bound_three_yields_3_3_1() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 3, false);

    append_events(&mut writer, 7);

    assert_eq!(shard_sizes(&writer), vec![3, 3, 1]);

    let seqs: Vec<u64> = writer.manifest().shards.iter().map(|s| s.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[test]
fn test_events_land_in_their_shards() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 2, false);

    append_events(&mut writer, 5);
    writer.close().unwrap();

    assert_eq!(
        shard_lines(temp.path(), 1),
        vec![r#"{"event": 0}"#, r#"{"event": 1}"#]
    );
    assert_eq!(
        shard_lines(temp.path(), 2),
        vec![r#"{"event": 2}"#, r#"{"event": 3}"#]
    );
    assert_eq!(shard_lines(temp.path(), 3), vec![r#"{"event": 4}"#]);
}

// =============================================================================
// Append Validation Tests
// =============================================================================

#[test]
fn test_append_rejects_embedded_newline() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 10, false);

    let result = writer.append_line("{\"a\": 1}\n{\"b\": 2}");
    assert!(matches!(result, Err(ChronicleError::Decode(_))));
    assert_eq!(writer.total_events(), 0);
}

#[test]
fn test_append_value_serializes_one_line() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 10, false);

    writer
        .append_value(&json!({
            "sim_time": "2030-01-01T00:00:00Z",
            "timestamp": "2026-01-01T00:00:00Z",
            "note": "multi\nline\npayload",
        }))
        .unwrap();
    writer.close().unwrap();

    let lines = shard_lines(temp.path(), 1);
    assert_eq!(lines.len(), 1);

    let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(parsed["note"], "multi\nline\npayload");
}

#[test]
fn test_data_is_on_disk_before_close() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 10, false);

    append_events(&mut writer, 2);

    // Appends flush per event; only the manifest waits for close.
    assert_eq!(shard_lines(temp.path(), 1).len(), 2);
    assert!(!temp.path().join("index.json").exists());
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_persists_manifest() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 3, false);

    append_events(&mut writer, 7);
    writer.close().unwrap();

    let manifest = Manifest::load(&temp.path().join("index.json")).unwrap();
    assert_eq!(manifest.version, 1);
    assert_eq!(manifest.max_events_per_shard, 3);
    assert_eq!(manifest.total_events, 7);

    let sizes: Vec<u64> = manifest.shards.iter().map(|s| s.events).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[test]
fn test_close_with_no_appends_persists_empty_manifest() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 3, false);

    writer.close().unwrap();

    let manifest = Manifest::load(&temp.path().join("index.json")).unwrap();
    assert!(manifest.shards.is_empty());
    assert_eq!(manifest.total_events, 0);
}

#[test]
fn test_second_close_is_closed_error() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 3, false);

    writer.close().unwrap();
    assert!(matches!(writer.close(), Err(ChronicleError::Closed)));
}

#[test]
fn test_append_after_close_is_closed_error() {
    let temp = TempDir::new().unwrap();
    let mut writer = open_writer(temp.path(), 3, false);

    append_events(&mut writer, 1);
    writer.close().unwrap();

    let result = writer.append_line(r#"{"event": 99}"#);
    assert!(matches!(result, Err(ChronicleError::Closed)));
}

// =============================================================================
// Fresh Mode Tests
// =============================================================================

#[test]
fn test_fresh_open_restarts_shard_sequence() {
    let temp = TempDir::new().unwrap();

    let mut writer = open_writer(temp.path(), 2, false);
    append_events(&mut writer, 5);
    writer.close().unwrap();

    // Second run, fresh mode: logical state restarts at shard 1.
    let mut writer = open_writer(temp.path(), 2, false);
    append_events(&mut writer, 1);
    writer.close().unwrap();

    let manifest = Manifest::load(&temp.path().join("index.json")).unwrap();
    assert_eq!(manifest.total_events, 1);
    assert_eq!(manifest.shards.len(), 1);

    // Shard 1 was overwritten; stale shard files from the longer prior run
    // remain on disk but are no longer referenced.
    assert_eq!(shard_lines(temp.path(), 1), vec![r#"{"event": 0}"#]);
    assert!(temp.path().join(shard_file_name(3)).exists());
}

// =============================================================================
// Resume Tests
// =============================================================================

#[test]
fn test_resume_fills_partial_shard_before_rotating() {
    let temp = TempDir::new().unwrap();

    let mut writer = open_writer(temp.path(), 3, false);
    append_events(&mut writer, 7);
    writer.close().unwrap();

    // [3, 3, 1] on disk; two more appends must complete the last shard.
    let mut writer = open_writer(temp.path(), 3, true);
    append_events(&mut writer, 2);
    writer.close().unwrap();

    let manifest = Manifest::load(&temp.path().join("index.json")).unwrap();
    let sizes: Vec<u64> = manifest.shards.iter().map(|s| s.events).collect();
    assert_eq!(sizes, vec![3, 3, 3]);
    assert_eq!(manifest.total_events, 9);
}

#[test]
fn test_resume_rotates_after_filling_active_shard() {
    let temp = TempDir::new().unwrap();

    let mut writer = open_writer(temp.path(), 3, false);
    append_events(&mut writer, 7);
    writer.close().unwrap();

    let mut writer = open_writer(temp.path(), 3, true);
    append_events(&mut writer, 3);
    writer.close().unwrap();

    let manifest = Manifest::load(&temp.path().join("index.json")).unwrap();
    let sizes: Vec<u64> = manifest.shards.iter().map(|s| s.events).collect();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
}

#[test]
fn test_resume_on_full_last_shard_rotates_immediately() {
    let temp = TempDir::new().unwrap();

    let mut writer = open_writer(temp.path(), 2, false);
    append_events(&mut writer, 4);
    writer.close().unwrap();

    let mut writer = open_writer(temp.path(), 2, true);
    append_events(&mut writer, 1);
    writer.close().unwrap();

    let manifest = Manifest::load(&temp.path().join("index.json")).unwrap();
    let sizes: Vec<u64> = manifest.shards.iter().map(|s| s.events).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
}

#[test]
fn test_resume_without_manifest_is_io_error() {
    let temp = TempDir::new().unwrap();

    let config = WriterConfig::builder()
        .data_dir(temp.path())
        .max_events_per_shard(3)
        .resume(true)
        .build();

    let result = LogWriter::open(config);
    assert!(matches!(result, Err(ChronicleError::Io(_))));
}

#[test]
fn test_resume_appends_preserve_existing_lines() {
    let temp = TempDir::new().unwrap();

    let mut writer = open_writer(temp.path(), 5, false);
    append_events(&mut writer, 2);
    writer.close().unwrap();

    let mut writer = open_writer(temp.path(), 5, true);
    writer.append_line(r#"{"event": "resumed"}"#).unwrap();
    writer.close().unwrap();

    assert_eq!(
        shard_lines(temp.path(), 1),
        vec![
            r#"{"event": 0}"#,
            r#"{"event": 1}"#,
            r#"{"event": "resumed"}"#
        ]
    );
}

// =============================================================================
// Crash Reconciliation Tests
// =============================================================================

#[test]
fn test_resume_recounts_drifted_shard() {
    let temp = TempDir::new().unwrap();

    let mut writer = open_writer(temp.path(), 10, false);
    append_events(&mut writer, 3);
    writer.close().unwrap();

    // Simulate a crash after two further appends: the shard file gained
    // lines the persisted manifest never recorded.
    let shard_path = temp.path().join(shard_file_name(1));
    let mut contents = fs::read_to_string(&shard_path).unwrap();
    contents.push_str("{\"event\": 3}\n{\"event\": 4}\n");
    fs::write(&shard_path, contents).unwrap();

    let writer = open_writer(temp.path(), 10, true);
    assert_eq!(writer.total_events(), 5);
    assert_eq!(writer.manifest().shards[0].events, 5);
}

#[test]
fn test_resume_truncates_torn_trailing_line() {
    let temp = TempDir::new().unwrap();

    let mut writer = open_writer(temp.path(), 10, false);
    append_events(&mut writer, 2);
    writer.close().unwrap();

    // Simulate a crash mid-append: a trailing fragment with no newline.
    let shard_path = temp.path().join(shard_file_name(1));
    let mut contents = fs::read_to_string(&shard_path).unwrap();
    contents.push_str("{\"event\": 2, \"trunc");
    fs::write(&shard_path, contents).unwrap();

    let mut writer = open_writer(temp.path(), 10, true);
    assert_eq!(writer.total_events(), 2);

    writer.append_line(r#"{"event": "after-crash"}"#).unwrap();
    writer.close().unwrap();

    // The torn fragment is gone; the new event starts on its own line.
    assert_eq!(
        shard_lines(temp.path(), 1),
        vec![
            r#"{"event": 0}"#,
            r#"{"event": 1}"#,
            r#"{"event": "after-crash"}"#
        ]
    );
}
