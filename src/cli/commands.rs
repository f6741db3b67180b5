//! CLI command implementations.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::buffer::FlagBuffer;
use crate::report::{self, Level};
use crate::scope::{self, Scope};
use crate::types::config::Config;
use crate::{FlagError, FlagResult};

/// Initializes configuration in the specified directory.
pub async fn init(path: Option<PathBuf>) -> FlagResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join("flagtrail.toml");

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        println!("Use 'flagtrail config' to inspect it.");
        return Ok(());
    }

    let config = Config::default_config();
    config.save(&config_path)?;

    println!("flagtrail initialized successfully!");
    println!("Configuration created at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Adjust [flags] capacity if 100 evaluations is not enough");
    println!("  2. Check the result: flagtrail doctor");

    Ok(())
}

/// Prints the effective configuration as TOML.
pub async fn config_cmd(config_path: &Path, config: &Config) -> FlagResult<()> {
    if config_path.exists() {
        println!("# Loaded from {}", config_path.display());
    } else {
        println!("# {} not found, showing defaults", config_path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Diagnoses configuration problems.
pub async fn doctor(config_path: &Path) -> FlagResult<()> {
    println!("Diagnosing flagtrail configuration...\n");

    let mut issues: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        warnings.push(format!(
            "{} not found - defaults will be used (run 'flagtrail init')",
            config_path.display()
        ));
    } else {
        match Config::load(config_path) {
            Ok(config) => {
                println!("✓ Configuration loaded");
                println!("✓ Flag capacity: {}", config.flags.capacity);
                if !config.flags.enabled {
                    warnings.push("Flag recording is disabled - reports will carry no flags".to_string());
                }
            }
            Err(e) => issues.push(e.to_string()),
        }
    }

    println!();
    if issues.is_empty() && warnings.is_empty() {
        println!("✓ All good! flagtrail is ready to use.");
    } else {
        if !warnings.is_empty() {
            println!("Warnings:");
            for warning in &warnings {
                println!("  ⚠ {}", warning);
            }
        }
        if !issues.is_empty() {
            println!("Problems:");
            for issue in &issues {
                println!("  ✗ {}", issue);
            }
        }
    }

    Ok(())
}

fn parse_evaluation(raw: &str) -> FlagResult<(&str, bool)> {
    let invalid = || {
        FlagError::other(format!(
            "invalid evaluation '{}': expected NAME=true or NAME=false",
            raw
        ))
    };

    let (name, value) = raw.split_once('=').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    let result = value.trim().parse::<bool>().map_err(|_| invalid())?;
    Ok((name, result))
}

/// Records evaluations in a fresh scope and prints the report built from it.
pub async fn record(flags: &[String], message: &str, config: &Config) -> FlagResult<()> {
    let evaluations = flags
        .iter()
        .map(String::as_str)
        .map(parse_evaluation)
        .collect::<FlagResult<Vec<_>>>()?;

    let report = scope::with_scope(Scope::from_config(&config.flags)?, || {
        for (name, result) in &evaluations {
            scope::record_evaluation(name, *result);
        }
        report::capture_message(message, Level::Error)
    });

    println!("{}", report.to_json()?);
    Ok(())
}

/// Outcome of a [`simulate`] run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    /// Number of `set` calls made by the writer.
    pub writes: u64,

    /// Number of snapshots taken by the reader.
    pub snapshots: u64,

    /// Snapshots with duplicate names or more entries than the capacity.
    pub faults: u64,

    /// Evictions reported by the buffer.
    pub evictions: u64,

    /// Buffer size once both threads finished.
    pub final_len: usize,

    /// Wall time of the whole run.
    pub elapsed: Duration,
}

/// Runs one writer thread and one snapshotting reader against a shared buffer.
///
/// Every snapshot is checked for duplicate names and for exceeding the
/// capacity; each violation counts as a fault.
pub fn run_simulation(writes: u64, snapshots: u64, capacity: usize) -> FlagResult<SimulationSummary> {
    let buffer = Arc::new(FlagBuffer::new(capacity)?);
    let started = Instant::now();

    let progress = ProgressBar::new(writes);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} sets")
            .map_err(|e| FlagError::other(e.to_string()))?,
    );

    let writer = {
        let buffer = Arc::clone(&buffer);
        let progress = progress.clone();
        std::thread::spawn(move || {
            for i in 0..writes {
                buffer.set(&format!("key_{}", i), true);
                if i % 10_000 == 0 {
                    progress.set_position(i);
                }
            }
        })
    };

    let reader = {
        let buffer = Arc::clone(&buffer);
        std::thread::spawn(move || {
            let mut faults = 0u64;
            for _ in 0..snapshots {
                let snapshot = buffer.snapshot();
                let unique: HashSet<&str> = snapshot.iter().map(|e| e.flag.as_str()).collect();
                if unique.len() != snapshot.len() || snapshot.len() > capacity {
                    faults += 1;
                }
            }
            faults
        })
    };

    writer
        .join()
        .map_err(|_| FlagError::other("writer thread panicked"))?;
    let faults = reader
        .join()
        .map_err(|_| FlagError::other("reader thread panicked"))?;
    progress.finish_and_clear();

    let stats = buffer.stats();
    let summary = SimulationSummary {
        writes,
        snapshots,
        faults,
        evictions: stats.evictions,
        final_len: stats.size,
        elapsed: started.elapsed(),
    };

    tracing::info!(
        writes,
        snapshots,
        faults,
        evictions = summary.evictions,
        "Simulation finished"
    );
    Ok(summary)
}

/// CLI wrapper around [`run_simulation`].
pub async fn simulate(
    writes: u64,
    snapshots: u64,
    capacity: Option<usize>,
    config: &Config,
) -> FlagResult<()> {
    let capacity = capacity.unwrap_or(config.flags.capacity);
    println!(
        "Simulating {} sets against {} snapshots (capacity {})...",
        writes, snapshots, capacity
    );

    let summary = tokio::task::spawn_blocking(move || run_simulation(writes, snapshots, capacity))
        .await
        .map_err(|e| FlagError::other(e.to_string()))??;

    println!("  Sets:       {}", summary.writes);
    println!("  Snapshots:  {}", summary.snapshots);
    println!("  Evictions:  {}", summary.evictions);
    println!("  Final size: {}", summary.final_len);
    println!("  Elapsed:    {:.2?}", summary.elapsed);

    if summary.faults > 0 {
        return Err(FlagError::other(format!(
            "{} inconsistent snapshots observed",
            summary.faults
        )));
    }

    println!("✓ No inconsistent snapshots");
    Ok(())
}

/// Shows version.
pub fn version() {
    println!("flagtrail {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Recent feature flag evaluations for error reports");
}
