//! Run summaries and stored statistics
//!
//! This module provides the summary printed after a run and the statistics
//! shown by `--stats`, read back from the storage layer.

use crate::harvest::{HarvestOutcome, PipelineMode};
use crate::storage::{RunRecord, Storage};
use crate::HarvestError;
use std::time::Duration;

/// Summary of one finished run
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub handle: String,
    pub mode: PipelineMode,

    /// Items emitted by discovery
    pub discovered: usize,

    /// Records written
    pub enriched: usize,

    /// Items enrichment dropped
    pub failed: usize,

    pub scrolls: u32,

    /// Why discovery stopped
    pub stop: String,

    pub elapsed: Duration,

    /// Where the records were written
    pub outputs: Vec<String>,
}

impl HarvestSummary {
    /// Builds a summary from a run outcome and the sinks it was written to
    pub fn from_outcome(outcome: &HarvestOutcome, outputs: Vec<String>) -> Self {
        Self {
            handle: outcome.handle.clone(),
            mode: outcome.mode,
            discovered: outcome.discovery.emitted,
            enriched: outcome.records.len(),
            failed: outcome.failures.len(),
            scrolls: outcome.discovery.scrolls,
            stop: outcome.discovery.stop.to_string(),
            elapsed: outcome.elapsed,
            outputs,
        }
    }

    /// Returns the share of discovered items that were enriched, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.discovered == 0 {
            return 0.0;
        }
        (self.enriched as f64 / self.discovered as f64) * 100.0
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &HarvestSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Profile: @{}", summary.handle);
    println!("Mode: {}", summary.mode);
    println!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    println!("Discovery:");
    println!("  Items discovered: {}", summary.discovered);
    println!("  Scrolls: {}", summary.scrolls);
    println!("  Stopped: {}", summary.stop);
    println!();

    println!("Enrichment:");
    println!(
        "  Records enriched: {} ({:.1}%)",
        summary.enriched,
        summary.success_rate()
    );
    println!("  Items failed: {}", summary.failed);
    println!();

    if !summary.outputs.is_empty() {
        println!("Output:");
        for output in &summary.outputs {
            println!("  - {}", output);
        }
    }
}

/// Statistics for the latest stored run
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub run: RunRecord,
    pub records: u64,
    pub failures: u64,
    pub total_runs: u64,
}

/// Loads statistics for the most recent run
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(Some(RunStatistics))` - The latest run and its counts
/// * `Ok(None)` - No runs stored yet
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_run_statistics(storage: &dyn Storage) -> Result<Option<RunStatistics>, HarvestError> {
    let Some(run) = storage.get_latest_run()? else {
        return Ok(None);
    };

    let records = storage.count_records(run.id)?;
    let failures = storage.count_failures(run.id)?;
    let total_runs = storage.count_runs()?;

    Ok(Some(RunStatistics {
        run,
        records,
        failures,
        total_runs,
    }))
}

/// Prints stored statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    let run = &stats.run;
    println!("=== Harvest Statistics ===\n");

    println!("Latest run #{} of {}:", run.id, stats.total_runs);
    println!("  Profile: @{}", run.handle);
    println!("  Mode: {}", run.mode);
    println!("  Status: {}", run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Config hash: {}", run.config_hash);
    println!();

    println!("Discovery:");
    println!("  Target count: {}", run.target_count);
    println!("  Items discovered: {}", run.discovered);
    println!("  Scrolls: {}", run.scrolls);
    match (&run.stop_reason, &run.stop_detail) {
        (Some(reason), Some(detail)) => println!("  Stopped: {} ({})", reason, detail),
        (Some(reason), None) => println!("  Stopped: {}", reason),
        _ => println!("  Stopped: unknown"),
    }
    println!();

    println!("Enrichment:");
    println!("  Records stored: {}", stats.records);
    println!("  Items failed: {}", stats.failures);
}
