//! Rebuilder
//!
//! Constructs a canonical, globally ordered, re-sharded log from an arbitrary
//! set of raw log files, e.g. multiple per-process logs produced before a
//! canonical writer existed, or logs that need re-sharding after a bound
//! change. Runs offline, independent of any live writer.
//!
//! ## Phases
//! 1. Parse: every line of every input becomes one event (parallel across
//!    input files; per-file results are concatenated in input order).
//! 2. Sort: stable sort by `sim_time`, ties by `timestamp`; remaining ties
//!    keep encounter order so that replay is deterministic even when several
//!    agents act in the same simulated instant.
//! 3. Write: partition into fresh shards of exactly the requested bound
//!    (final shard may be shorter) using the writer's naming convention, then
//!    persist a fresh manifest atomically.
//!
//! Original line text is written back verbatim, so identical inputs and bound
//! produce byte-identical shards across runs.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::{MalformedLinePolicy, RebuildOptions};
use crate::error::{ChronicleError, Result};
use crate::event::EventKey;
use crate::log::{manifest_path, shard_file_name, Manifest, ShardMeta};

/// One input line with its extracted ordering key
struct SortableEvent {
    key: EventKey,
    line: String,
}

/// Rebuild a canonical sharded log, failing on the first malformed line
///
/// See [`rebuild_from_logs_with`] for the tolerant variant.
pub fn rebuild_from_logs(
    output_dir: &Path,
    inputs: &[PathBuf],
    max_events_per_shard: u64,
) -> Result<Manifest> {
    rebuild_from_logs_with(output_dir, inputs, &RebuildOptions::new(max_events_per_shard))
}

/// Rebuild a canonical sharded log with explicit options
///
/// On success the output directory holds freshly written shards and an
/// atomically replaced manifest, indistinguishable from organic writer
/// output; the new manifest is returned.
pub fn rebuild_from_logs_with(
    output_dir: &Path,
    inputs: &[PathBuf],
    options: &RebuildOptions,
) -> Result<Manifest> {
    if options.max_events_per_shard == 0 {
        return Err(ChronicleError::Config(
            "max_events_per_shard must be positive".to_string(),
        ));
    }

    let (mut events, skipped) = parse_inputs(inputs, options.malformed)?;

    if skipped > 0 {
        tracing::warn!(skipped, "rebuild skipped malformed input lines");
    }

    // Stable sort: equal keys keep encounter order (input-file order, then
    // in-file line order).
    events.sort_by(|a, b| a.key.cmp(&b.key));

    fs::create_dir_all(output_dir)?;

    let mut manifest = Manifest::new(options.max_events_per_shard);
    for (index, chunk) in events.chunks(options.max_events_per_shard as usize).enumerate() {
        let shard = write_shard(output_dir, index as u64 + 1, chunk)?;
        manifest.shards.push(shard);
    }
    manifest.total_events = events.len() as u64;

    manifest.save_atomic(&manifest_path(output_dir))?;

    tracing::info!(
        inputs = inputs.len(),
        events = manifest.total_events,
        skipped,
        shards = manifest.shards.len(),
        dir = %output_dir.display(),
        "rebuild complete"
    );

    Ok(manifest)
}

// =============================================================================
// Parse Phase
// =============================================================================

/// Parse every input file, in parallel, preserving input order
fn parse_inputs(
    inputs: &[PathBuf],
    policy: MalformedLinePolicy,
) -> Result<(Vec<SortableEvent>, u64)> {
    let per_file: Vec<Result<(Vec<SortableEvent>, u64)>> = if inputs.len() <= 1 {
        inputs
            .iter()
            .map(|path| parse_input_file(path, policy))
            .collect()
    } else {
        crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .iter()
                .map(|path| scope.spawn(move |_| parse_input_file(path, policy)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(ChronicleError::Decode(
                            "rebuild parse worker panicked".to_string(),
                        ))
                    })
                })
                .collect()
        })
        .map_err(|_| ChronicleError::Decode("rebuild parse phase panicked".to_string()))?
    };

    let mut events = Vec::new();
    let mut skipped = 0u64;
    for result in per_file {
        let (file_events, file_skipped) = result?;
        events.extend(file_events);
        skipped += file_skipped;
    }

    Ok((events, skipped))
}

/// Parse one raw log file into ordered events
fn parse_input_file(
    path: &Path,
    policy: MalformedLinePolicy,
) -> Result<(Vec<SortableEvent>, u64)> {
    let reader = BufReader::new(File::open(path)?);

    let mut events = Vec::new();
    let mut skipped = 0u64;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;

        match event_key_for_line(&line) {
            Ok(key) => events.push(SortableEvent { key, line }),
            Err(reason) => match policy {
                MalformedLinePolicy::Fail => {
                    return Err(ChronicleError::Decode(format!(
                        "{}:{}: {}",
                        path.display(),
                        index + 1,
                        reason
                    )));
                }
                MalformedLinePolicy::Skip => {
                    skipped += 1;
                    tracing::debug!(
                        file = %path.display(),
                        line = index + 1,
                        reason = %reason,
                        "skipping malformed line"
                    );
                }
            },
        }
    }

    tracing::debug!(
        file = %path.display(),
        events = events.len(),
        skipped,
        "parsed input log"
    );

    Ok((events, skipped))
}

/// Extract the ordering key, with a plain reason string on failure
fn event_key_for_line(line: &str) -> std::result::Result<EventKey, String> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| format!("invalid JSON: {}", e))?;

    EventKey::from_value(&value).map_err(|e| match e {
        ChronicleError::Decode(reason) => reason,
        other => other.to_string(),
    })
}

// =============================================================================
// Write Phase
// =============================================================================

/// Write one rebuilt shard file and return its manifest entry
fn write_shard(dir: &Path, seq: u64, events: &[SortableEvent]) -> Result<ShardMeta> {
    let file_name = shard_file_name(seq);
    let file = File::create(dir.join(&file_name))?;
    let mut writer = BufWriter::new(file);

    for event in events {
        writer.write_all(event.line.as_bytes())?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;

    Ok(ShardMeta {
        seq,
        file: file_name,
        events: events.len() as u64,
    })
}
