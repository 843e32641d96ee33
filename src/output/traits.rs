//! Record sink traits and error types
//!
//! This module defines the trait interface for the places a finished run
//! is written to, and the associated error type.

use crate::harvest::HarvestOutcome;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for record sinks
///
/// A sink receives the merged outcome of a run once both stages are done.
/// Records arrive in processing order and must be written in that order.
pub trait RecordSink {
    /// Writes every record of the outcome
    ///
    /// # Arguments
    ///
    /// * `outcome` - The merged result of a run
    fn write_outcome(&mut self, outcome: &HarvestOutcome) -> OutputResult<()>;

    /// Human-readable location of the written output, shown in the run summary
    fn location(&self) -> String;
}
