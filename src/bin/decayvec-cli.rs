//! DECAYVEC CLI
//!
//! Replays a JSON-lines event log through a decayed vector and prints the
//! resulting state, or evaluates a decay factor.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use decayvec::vector::magnitude;
use decayvec::{DecayConfig, DecayedVector, MassDecay, VectorState};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// DECAYVEC CLI - Time-Decayed Embedding Tools
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Absorb every event in a JSON-lines file and print the final state
    Replay {
        /// Event file, one `{"vector":[..],"weight":1.0,"at":"RFC3339"}` per line
        #[arg(short, long)]
        events: PathBuf,

        /// Embedding dimension
        #[arg(short, long)]
        dimension: usize,

        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Half-life in days (overrides config file)
        #[arg(long)]
        half_life_days: Option<f64>,

        /// Use the legacy additive mass rule
        #[arg(long, default_value_t = false)]
        additive: bool,

        /// Snapshot time (defaults to the last event's time)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Print the decay factor after a given elapsed time
    Factor {
        /// Half-life in days
        #[arg(long, default_value_t = 7.0)]
        half_life_days: f64,

        /// Elapsed time in days
        #[arg(long)]
        elapsed_days: f64,
    },
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    vector: Vec<f32>,
    weight: f64,
    at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    state: VectorState,
    snapshot_at: DateTime<Utc>,
    snapshot: Vec<f32>,
    snapshot_norm: f32,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("decayvec=info".parse()?))
        .init();

    let args = Args::parse();

    match args.command {
        Cmd::Replay {
            events,
            dimension,
            config,
            half_life_days,
            additive,
            at,
        } => {
            let mut decay_config = match config {
                Some(path) => DecayConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => DecayConfig::default(),
            };
            if let Some(days) = half_life_days {
                decay_config = decay_config.with_half_life_days(days);
            }
            if additive {
                decay_config = decay_config.with_mass_decay(MassDecay::Additive);
            }

            let report = replay(&events, dimension, decay_config, at)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Cmd::Factor {
            half_life_days,
            elapsed_days,
        } => {
            println!("{}", decay_factor(half_life_days, elapsed_days)?);
        }
    }

    Ok(())
}

/// Fraction of an event's weight left after `elapsed_days`.
fn decay_factor(half_life_days: f64, elapsed_days: f64) -> anyhow::Result<f64> {
    if !(elapsed_days.is_finite() && elapsed_days >= 0.0) {
        anyhow::bail!("elapsed days must be finite and >= 0, got {}", elapsed_days);
    }
    let config = DecayConfig::default().with_half_life_days(half_life_days);
    config.validate()?;
    let elapsed_secs = elapsed_days * decayvec::config::SECONDS_PER_DAY;
    Ok((-elapsed_secs / config.tau_secs()).exp())
}

fn replay(
    path: &Path,
    dimension: usize,
    config: DecayConfig,
    at: Option<DateTime<Utc>>,
) -> anyhow::Result<ReplayReport> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: EventRecord = serde_json::from_str(line)
            .with_context(|| format!("line {}: malformed event", lineno + 1))?;
        records.push((lineno + 1, record));
    }

    let start = records
        .first()
        .map(|(_, r)| r.at)
        .unwrap_or_else(Utc::now);
    let mut vector = DecayedVector::zeroed(dimension, config, start)?;

    info!(
        "Replaying {} events (dimension {}, half-life {} days)",
        records.len(),
        dimension,
        vector.half_life_days()
    );

    for (lineno, record) in &records {
        vector
            .absorb(&record.vector, record.weight, record.at)
            .with_context(|| format!("line {}: event rejected", lineno))?;
        debug!(line = *lineno, weight_sum = vector.weight_sum(), "Absorbed event");
    }

    let snapshot_at = at.unwrap_or_else(|| vector.updated_at());
    let snapshot = vector.snapshot_at(snapshot_at);
    let snapshot_norm = magnitude(&snapshot);

    Ok(ReplayReport {
        state: vector.into_state(),
        snapshot_at,
        snapshot,
        snapshot_norm,
    })
}
