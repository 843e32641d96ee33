//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::harvest::{DiscoveryReport, EnrichmentFailure, PipelineMode};
use crate::item::EnrichedRecord;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new harvest run
    ///
    /// # Arguments
    ///
    /// * `handle` - Profile handle being harvested
    /// * `target_count` - Requested item count
    /// * `mode` - Pipeline wiring used for the run
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(
        &mut self,
        handle: &str,
        target_count: usize,
        mode: PipelineMode,
        config_hash: &str,
    ) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished, recording how discovery ended
    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        discovery: &DiscoveryReport,
    ) -> StorageResult<()>;

    // ===== Records =====

    /// Stores one enriched record at its 1-based output position
    fn insert_record(
        &mut self,
        run_id: i64,
        position: usize,
        record: &EnrichedRecord,
    ) -> StorageResult<()>;

    /// Stores one dropped item
    fn insert_failure(&mut self, run_id: i64, failure: &EnrichmentFailure) -> StorageResult<()>;

    /// Loads a run's records in output order
    fn load_records(&self, run_id: i64) -> StorageResult<Vec<EnrichedRecord>>;

    /// Loads a run's dropped items in position order
    fn load_failures(&self, run_id: i64) -> StorageResult<Vec<EnrichmentFailure>>;

    // ===== Statistics =====

    fn count_runs(&self) -> StorageResult<u64>;

    fn count_records(&self, run_id: i64) -> StorageResult<u64>;

    fn count_failures(&self, run_id: i64) -> StorageResult<u64>;
}
