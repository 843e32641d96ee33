//! SQLite record sink
//!
//! This module provides a sink that records a finished run, its records
//! and its enrichment failures in the storage backend.

use crate::harvest::HarvestOutcome;
use crate::output::traits::{OutputResult, RecordSink};
use crate::storage::{RunStatus, SqliteStorage, Storage};
use std::path::PathBuf;
use tracing::{debug, info};

/// SQLite-based record sink
///
/// Each call to [`RecordSink::write_outcome`] creates a new run row.
pub struct SqliteSink {
    storage: SqliteStorage,
    path: PathBuf,
    target_count: usize,
    config_hash: String,
    last_run: Option<i64>,
}

impl SqliteSink {
    /// Creates a new SQLite sink
    ///
    /// # Arguments
    ///
    /// * `storage` - The opened storage backend
    /// * `path` - Where the database lives, for the run summary
    /// * `target_count` - The requested item count, recorded with the run
    /// * `config_hash` - Hash of the configuration the run used
    pub fn new(
        storage: SqliteStorage,
        path: PathBuf,
        target_count: usize,
        config_hash: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            path,
            target_count,
            config_hash: config_hash.into(),
            last_run: None,
        }
    }

    /// ID of the run written most recently
    pub fn last_run(&self) -> Option<i64> {
        self.last_run
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }
}

impl RecordSink for SqliteSink {
    fn write_outcome(&mut self, outcome: &HarvestOutcome) -> OutputResult<()> {
        let run_id = self.storage.create_run(
            &outcome.handle,
            self.target_count,
            outcome.mode,
            &self.config_hash,
        )?;
        debug!("Created run {} for @{}", run_id, outcome.handle);

        for (index, record) in outcome.records.iter().enumerate() {
            self.storage.insert_record(run_id, index + 1, record)?;
        }
        for failure in &outcome.failures {
            self.storage.insert_failure(run_id, failure)?;
        }

        let status = if outcome.is_partial() {
            RunStatus::Partial
        } else {
            RunStatus::Completed
        };
        self.storage
            .complete_run(run_id, status, &outcome.discovery)?;

        info!(
            "Stored run {} ({} records, {} failures) in {}",
            run_id,
            outcome.records.len(),
            outcome.failures.len(),
            self.path.display()
        );
        self.last_run = Some(run_id);
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
