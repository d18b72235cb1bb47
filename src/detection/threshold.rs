//! Request threshold detection
//!
//! Counts stored requests per IP inside a `[start, start + duration)`
//! window and flags every IP whose count is strictly above the threshold.

use crate::models::{format_timestamp, BlockRecord, Duration, LogRecord, ThresholdResult};
use crate::persistence::{LogStore, PersistenceError};
use chrono::NaiveDateTime;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during threshold analysis
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Storage error: {0}")]
    Storage(#[from] PersistenceError),

    #[error("{duration} window starting at {start} ends after year 9999")]
    WindowOverflow {
        start: NaiveDateTime,
        duration: Duration,
    },
}

/// Reason stored in the block log for a flagged IP
pub fn block_reason(
    duration: Duration,
    threshold: u32,
    count: u64,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> String {
    format!(
        "{} threshold ({}) crossed ({}) in the following dates range: {} - {}",
        duration.name(),
        threshold,
        count,
        format_timestamp(start),
        format_timestamp(end)
    )
}

/// Finds IPs that made too many requests in a window, backed by a [`LogStore`]
pub struct ThresholdAnalyzer {
    store: Arc<dyn LogStore>,
}

impl ThresholdAnalyzer {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        ThresholdAnalyzer { store }
    }

    /// Exclusive end of the window opened at `start`
    pub fn window_end(
        start: NaiveDateTime,
        duration: Duration,
    ) -> Result<NaiveDateTime, AnalyzerError> {
        duration
            .window_end(start)
            .ok_or(AnalyzerError::WindowOverflow { start, duration })
    }

    /// IPs with more than `threshold` requests in `[start, start + duration)`
    pub fn find_above_threshold(
        &self,
        start: NaiveDateTime,
        duration: Duration,
        threshold: u32,
    ) -> Result<ThresholdResult, AnalyzerError> {
        let end = Self::window_end(start, duration)?;

        log::debug!(
            "Counting requests in [{}, {}) above threshold {}",
            format_timestamp(&start),
            format_timestamp(&end),
            threshold
        );

        let results = self.store.find_above_threshold(start, end, threshold)?;

        for (ip, count) in &results {
            log::warn!(
                "IP {} made {} requests ({} threshold {})",
                ip,
                count,
                duration,
                threshold
            );
        }

        Ok(results)
    }

    /// Stored requests for one IP, oldest first
    pub fn requests_by_ip(&self, ip: &IpAddr) -> Result<Vec<LogRecord>, AnalyzerError> {
        Ok(self.store.get_requests_by_ip(ip)?)
    }

    /// One block record per flagged IP, ordered by IP
    pub fn block_records(
        results: &ThresholdResult,
        start: NaiveDateTime,
        duration: Duration,
        threshold: u32,
    ) -> Result<Vec<BlockRecord>, AnalyzerError> {
        let end = Self::window_end(start, duration)?;

        let mut flagged: Vec<(&IpAddr, &u64)> = results.iter().collect();
        flagged.sort_by(|a, b| a.0.cmp(b.0));

        Ok(flagged
            .into_iter()
            .map(|(ip, count)| {
                BlockRecord::new(
                    *ip,
                    block_reason(duration, threshold, *count, &start, &end),
                )
            })
            .collect())
    }

    /// Write a block record for every flagged IP as one atomic batch
    ///
    /// Returns the number of records written; nothing is written for an
    /// empty result.
    pub fn log_blocked(
        &self,
        results: &ThresholdResult,
        start: NaiveDateTime,
        duration: Duration,
        threshold: u32,
    ) -> Result<usize, AnalyzerError> {
        let records = Self::block_records(results, start, duration, threshold)?;
        let written = self.store.save_block_records(&records)?;

        if written > 0 {
            log::info!("Logged {} blocked IP(s)", written);
        }

        Ok(written)
    }
}
