//! SQLite implementation of the LogStore trait

use super::{LogStore, PersistenceError};
use crate::models::{format_timestamp, BlockRecord, LogRecord, ThresholdResult, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::net::IpAddr;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-based access log storage
pub struct SqliteLogStore {
    conn: Mutex<Connection>,
}

impl SqliteLogStore {
    /// Open (or create) the database at the specified path
    ///
    /// Creates the database file and initializes the schema if it doesn't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteLogStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (useful for testing)
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteLogStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.lock()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn.lock().map_err(|_| PersistenceError::LockPoisoned)
    }

    /// Network representation of an address: 4 octets for IPv4, 16 for IPv6
    fn encode_ip(ip: &IpAddr) -> Vec<u8> {
        match ip {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        }
    }

    fn decode_ip(bytes: &[u8]) -> Result<IpAddr, PersistenceError> {
        if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
            return Ok(IpAddr::from(octets));
        }
        if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
            return Ok(IpAddr::from(octets));
        }
        Err(PersistenceError::InvalidData(format!(
            "IP address column holds {} bytes",
            bytes.len()
        )))
    }

    fn parse_timestamp(value: &str) -> Result<NaiveDateTime, PersistenceError> {
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
            .map_err(|_| PersistenceError::InvalidData(format!("Invalid timestamp: {}", value)))
    }
}

impl LogStore for SqliteLogStore {
    fn save_log_entries(&self, records: &[LogRecord]) -> Result<usize, PersistenceError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO log_entries (timestamp, ip, request, status, user_agent)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.formatted_timestamp(),
                    Self::encode_ip(&record.ip()),
                    record.request(),
                    record.status(),
                    record.user_agent()
                ])?;
            }
        }
        tx.commit()?;

        Ok(records.len())
    }

    fn find_above_threshold(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        threshold: u32,
    ) -> Result<ThresholdResult, PersistenceError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT ip, COUNT(*) AS cnt FROM log_entries
             WHERE timestamp >= ?1 AND timestamp < ?2
             GROUP BY ip
             HAVING cnt > ?3",
        )?;

        let rows = stmt
            .query_map(
                params![format_timestamp(&start), format_timestamp(&end), threshold],
                |row| {
                    let ip: Vec<u8> = row.get(0)?;
                    let count: i64 = row.get(1)?;
                    Ok((ip, count))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = ThresholdResult::with_capacity(rows.len());
        for (ip, count) in rows {
            let count = u64::try_from(count).map_err(|_| {
                PersistenceError::InvalidData(format!("Negative request count: {}", count))
            })?;
            result.insert(Self::decode_ip(&ip)?, count);
        }

        Ok(result)
    }

    fn get_requests_by_ip(&self, ip: &IpAddr) -> Result<Vec<LogRecord>, PersistenceError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT timestamp, ip, request, status, user_agent FROM log_entries
             WHERE ip = ?1
             ORDER BY timestamp ASC, id ASC",
        )?;

        let rows = stmt
            .query_map(params![Self::encode_ip(ip)], |row| {
                let timestamp: String = row.get(0)?;
                let ip: Vec<u8> = row.get(1)?;
                let request: String = row.get(2)?;
                let status: i64 = row.get(3)?;
                let user_agent: String = row.get(4)?;
                Ok((timestamp, ip, request, status, user_agent))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(timestamp, ip, request, status, user_agent)| {
                LogRecord::new(
                    Self::parse_timestamp(&timestamp)?,
                    Self::decode_ip(&ip)?,
                    request,
                    status,
                    user_agent,
                )
                .map_err(|e| PersistenceError::InvalidData(e.to_string()))
            })
            .collect()
    }

    fn count_log_entries(&self) -> Result<usize, PersistenceError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM log_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn save_block_records(&self, records: &[BlockRecord]) -> Result<usize, PersistenceError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO blocked_ips (ip, reason) VALUES (?1, ?2)")?;
            for record in records {
                stmt.execute(params![Self::encode_ip(&record.ip), record.reason])?;
            }
        }
        tx.commit()?;

        Ok(records.len())
    }

    fn get_block_records(&self) -> Result<Vec<BlockRecord>, PersistenceError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT ip, reason, created_at FROM blocked_ips ORDER BY id")?;

        let rows = stmt
            .query_map([], |row| {
                let ip: Vec<u8> = row.get(0)?;
                let reason: String = row.get(1)?;
                let created_at: String = row.get(2)?;
                Ok((ip, reason, created_at))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(ip, reason, created_at)| -> Result<BlockRecord, PersistenceError> {
                Ok(BlockRecord {
                    ip: Self::decode_ip(&ip)?,
                    reason,
                    created_at: Some(Self::parse_timestamp(&created_at)?),
                })
            })
            .collect()
    }

    fn clear_all(&self) -> Result<(), PersistenceError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "DELETE FROM log_entries;
             DELETE FROM blocked_ips;",
        )?;
        Ok(())
    }
}
