//! Persistence module for access log storage
//!
//! This module stores parsed log records and the block log, and answers
//! the windowed per-IP count query the threshold analysis relies on.

pub mod sqlite_store;

pub use sqlite_store::SqliteLogStore;

use crate::models::{BlockRecord, LogRecord, ThresholdResult};
use chrono::NaiveDateTime;
use std::net::IpAddr;
use thiserror::Error;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// Trait for access log storage backends
///
/// Batch writes are atomic: either every row of the batch is committed
/// or none is.
pub trait LogStore: Send + Sync {
    // =====================
    // Log Entries
    // =====================

    /// Insert all records in a single transaction
    ///
    /// Returns the number of rows written. Records are not deduplicated.
    fn save_log_entries(&self, records: &[LogRecord]) -> Result<usize, PersistenceError>;

    /// Count records per IP with `start <= timestamp < end`, keeping only
    /// IPs whose count is strictly greater than `threshold`
    fn find_above_threshold(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        threshold: u32,
    ) -> Result<ThresholdResult, PersistenceError>;

    /// All stored requests made by `ip`, oldest first
    fn get_requests_by_ip(&self, ip: &IpAddr) -> Result<Vec<LogRecord>, PersistenceError>;

    /// Number of stored log records
    fn count_log_entries(&self) -> Result<usize, PersistenceError>;

    // =====================
    // Block Log
    // =====================

    /// Insert all block records in a single transaction
    fn save_block_records(&self, records: &[BlockRecord]) -> Result<usize, PersistenceError>;

    /// Stored block records in insertion order
    fn get_block_records(&self) -> Result<Vec<BlockRecord>, PersistenceError>;

    // =====================
    // Maintenance
    // =====================

    /// Remove every log entry and block record
    fn clear_all(&self) -> Result<(), PersistenceError>;
}
