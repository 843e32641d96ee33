//! Output module for writing harvest results
//!
//! This module handles:
//! - Writing records to a per-profile CSV file
//! - Recording runs, records and failures in SQLite
//! - Printing run summaries and stored statistics

mod csv;
mod sqlite_output;
pub mod stats;
mod traits;

pub use csv::{write_row, CsvSink};
pub use sqlite_output::SqliteSink;
pub use stats::{
    load_run_statistics, print_statistics, print_summary, HarvestSummary, RunStatistics,
};
pub use traits::{OutputError, OutputResult, RecordSink};

use crate::config::Config;
use crate::harvest::HarvestOutcome;
use crate::storage::open_storage;
use crate::HarvestError;
use std::path::PathBuf;

/// Directory CSV files go to when none is configured
///
/// The user's desktop, or the working directory when there is none.
pub fn default_csv_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Builds the sinks a configuration asks for
///
/// The CSV sink is always present. The SQLite sink is added when
/// `output.database-path` is set.
///
/// # Arguments
///
/// * `config` - The validated configuration, target included
/// * `handle` - The normalized profile handle
/// * `config_hash` - Hash recorded with stored runs
pub fn build_sinks(
    config: &Config,
    handle: &str,
    config_hash: &str,
) -> Result<Vec<Box<dyn RecordSink>>, HarvestError> {
    let csv_dir = config
        .output
        .csv_dir
        .clone()
        .unwrap_or_else(default_csv_dir);

    let mut sinks: Vec<Box<dyn RecordSink>> = vec![Box::new(CsvSink::new(&csv_dir, handle))];

    if let Some(path) = &config.output.database_path {
        let storage = open_storage(path)?;
        sinks.push(Box::new(SqliteSink::new(
            storage,
            path.clone(),
            config.target.count as usize,
            config_hash,
        )));
    }

    Ok(sinks)
}

/// Writes an outcome to every sink
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The locations written, in sink order
/// * `Err(HarvestError)` - A sink failed; later sinks are not attempted
pub fn write_outcome(
    sinks: &mut [Box<dyn RecordSink>],
    outcome: &HarvestOutcome,
) -> Result<Vec<String>, HarvestError> {
    let mut locations = Vec::with_capacity(sinks.len());
    for sink in sinks.iter_mut() {
        sink.write_outcome(outcome)?;
        locations.push(sink.location());
    }
    Ok(locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_csv_dir_is_absolute_or_dot() {
        let dir = default_csv_dir();
        assert!(dir.is_absolute() || dir == PathBuf::from("."));
    }

    #[test]
    fn test_build_sinks_csv_only() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.csv_dir = Some(dir.path().to_path_buf());

        let sinks = build_sinks(&config, "someone", "hash").unwrap();

        assert_eq!(sinks.len(), 1);
        assert_eq!(
            sinks[0].location(),
            dir.path().join("someone.csv").display().to_string()
        );
    }

    #[test]
    fn test_build_sinks_with_database() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.csv_dir = Some(dir.path().to_path_buf());
        config.output.database_path = Some(dir.path().join("harvest.db"));

        let sinks = build_sinks(&config, "someone", "hash").unwrap();

        assert_eq!(sinks.len(), 2);
        assert!(dir.path().join("harvest.db").exists());
    }
}
