//! chronicle CLI
//!
//! Command-line interface for offline log maintenance: rebuild arbitrary raw
//! logs into a canonical sharded log, and inspect a log directory's manifest.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use chronicle::{rebuild_from_logs_with, LogReader, RebuildOptions};

/// chronicle CLI
#[derive(Parser, Debug)]
#[command(name = "chronicle-cli")]
#[command(about = "Sharded append-only event log tools")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge raw log files into a canonical, globally ordered sharded log
    Rebuild {
        /// Output directory for the rebuilt shards and manifest
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum events per shard in the rebuilt log
        #[arg(short, long, default_value = "1000")]
        max_events_per_shard: u64,

        /// Skip and count malformed lines instead of aborting
        #[arg(long)]
        tolerant: bool,

        /// Input log files, merged in the order given
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Print a log directory's manifest summary
    Inspect {
        /// Log directory containing index.json
        #[arg(short, long)]
        dir: PathBuf,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chronicle=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Rebuild {
            output,
            max_events_per_shard,
            tolerant,
            inputs,
        } => rebuild(&output, &inputs, max_events_per_shard, tolerant),
        Commands::Inspect { dir } => inspect(&dir),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn rebuild(
    output: &PathBuf,
    inputs: &[PathBuf],
    max_events_per_shard: u64,
    tolerant: bool,
) -> chronicle::Result<()> {
    let mut options = RebuildOptions::new(max_events_per_shard);
    if tolerant {
        options = options.tolerant();
    }

    let manifest = rebuild_from_logs_with(output, inputs, &options)?;

    println!(
        "rebuilt {} events into {} shards at {}",
        manifest.total_events,
        manifest.shards.len(),
        output.display()
    );
    Ok(())
}

fn inspect(dir: &PathBuf) -> chronicle::Result<()> {
    let reader = LogReader::open(dir)?;
    let manifest = reader.manifest();

    println!("manifest: {}", dir.join("index.json").display());
    println!("version: {}", manifest.version);
    match &manifest.generated_at {
        Some(at) => println!("generated_at: {}", at.to_rfc3339()),
        None => println!("generated_at: (unset)"),
    }
    println!("max_events_per_shard: {}", manifest.max_events_per_shard);
    println!("total_events: {}", manifest.total_events);
    println!("shards ({}):", manifest.shards.len());
    for shard in &manifest.shards {
        println!("  {:>6}  {}  {} events", shard.seq, shard.file, shard.events);
    }
    Ok(())
}
