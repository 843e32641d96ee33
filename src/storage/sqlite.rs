//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::harvest::{DiscoveryReport, EnrichmentFailure, PipelineMode};
use crate::item::{EnrichedRecord, FineMetric};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, handle, target_count, mode, config_hash, started_at, finished_at, \
                           status, stop_reason, stop_detail, discovered, scrolls";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let mode: String = row.get(3)?;
    let status: String = row.get(7)?;

    Ok(RunRecord {
        id: row.get(0)?,
        handle: row.get(1)?,
        target_count: row.get::<_, i64>(2)? as usize,
        mode: mode.parse().unwrap_or_default(),
        config_hash: row.get(4)?,
        started_at: row.get(5)?,
        finished_at: row.get(6)?,
        status: RunStatus::from_db_string(&status).unwrap_or(RunStatus::Running),
        stop_reason: row.get(8)?,
        stop_detail: row.get(9)?,
        discovered: row.get::<_, i64>(10)? as usize,
        scrolls: row.get::<_, i64>(11)? as u32,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(
        &mut self,
        handle: &str,
        target_count: usize,
        mode: PipelineMode,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (handle, target_count, mode, config_hash, started_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                handle,
                target_count as i64,
                mode.as_str(),
                config_hash,
                now,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS))?;

        stmt.query_row(params![run_id], row_to_run)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        Ok(stmt.query_row([], row_to_run).optional()?)
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        discovery: &DiscoveryReport,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs
             SET status = ?1, finished_at = ?2, stop_reason = ?3, stop_detail = ?4,
                 discovered = ?5, scrolls = ?6
             WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                discovery.stop.as_str(),
                discovery.stop.detail(),
                discovery.emitted as i64,
                discovery.scrolls as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Records =====

    fn insert_record(
        &mut self,
        run_id: i64,
        position: usize,
        record: &EnrichedRecord,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO records
                (run_id, position, url, views, likes, comments, shares, caption, upload_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                position as i64,
                record.id,
                record.coarse_metric,
                record.get(FineMetric::Likes),
                record.get(FineMetric::Comments),
                record.get(FineMetric::Shares),
                record.get(FineMetric::Caption),
                record.get(FineMetric::UploadTime)
            ],
        )?;
        Ok(())
    }

    fn insert_failure(&mut self, run_id: i64, failure: &EnrichmentFailure) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO failures (run_id, position, url, reason) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, failure.position as i64, failure.id, failure.reason],
        )?;
        Ok(())
    }

    fn load_records(&self, run_id: i64) -> StorageResult<Vec<EnrichedRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, views, likes, comments, shares, caption, upload_time
             FROM records WHERE run_id = ?1 ORDER BY position",
        )?;

        let records = stmt
            .query_map(params![run_id], |row| {
                let mut record = EnrichedRecord {
                    id: row.get(0)?,
                    coarse_metric: row.get(1)?,
                    fine_metrics: Default::default(),
                };
                for (offset, metric) in FineMetric::ALL.iter().enumerate() {
                    record.set(*metric, row.get(2 + offset)?);
                }
                Ok(record)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn load_failures(&self, run_id: i64) -> StorageResult<Vec<EnrichmentFailure>> {
        let mut stmt = self.conn.prepare(
            "SELECT position, url, reason FROM failures WHERE run_id = ?1 ORDER BY position",
        )?;

        let failures = stmt
            .query_map(params![run_id], |row| {
                Ok(EnrichmentFailure {
                    position: row.get::<_, i64>(0)? as usize,
                    id: row.get(1)?,
                    reason: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(failures)
    }

    // ===== Statistics =====

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_records(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_failures(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM failures WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
