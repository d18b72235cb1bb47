use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

/// chrono format of every timestamp read from or written to a log line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Lowest accepted HTTP status
pub const MIN_STATUS: i64 = 1;
/// Highest accepted HTTP status
pub const MAX_STATUS: i64 = 1_000;

/// Reasons a single log line is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected exactly {expected} fields, {found} found")]
    FieldCount { expected: usize, found: usize },

    #[error("unable to parse date ({value}), expected yyyy-MM-dd HH:mm:ss.SSS")]
    DateFormat { value: String },

    #[error("HTTP status {status} is outside 1..=1000")]
    StatusRange { status: i64 },

    #[error("HTTP status ({value}) is not a number")]
    InvalidStatus { value: String },

    #[error("invalid IP address ({value})")]
    InvalidAddress { value: String },

    #[error("line is not valid UTF-8")]
    Encoding,
}

/// Format a timestamp with millisecond precision
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(timestamp))
}

/// One validated access log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    #[serde(serialize_with = "serialize_timestamp")]
    timestamp: NaiveDateTime,
    ip: IpAddr,
    request: String,
    status: u16,
    user_agent: String,
}

impl LogRecord {
    /// Build a record, rejecting statuses outside 1..=1000
    pub fn new(
        timestamp: NaiveDateTime,
        ip: IpAddr,
        request: impl Into<String>,
        status: i64,
        user_agent: impl Into<String>,
    ) -> Result<Self, RecordError> {
        if !(MIN_STATUS..=MAX_STATUS).contains(&status) {
            return Err(RecordError::StatusRange { status });
        }

        Ok(LogRecord {
            timestamp,
            ip,
            request: request.into(),
            status: status as u16,
            user_agent: user_agent.into(),
        })
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Timestamp rendered as `yyyy-MM-dd HH:mm:ss.SSS`
    pub fn formatted_timestamp(&self) -> String {
        format_timestamp(&self.timestamp)
    }

    /// Serialize back into the pipe-delimited access log form
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|\"{}\"|{}|\"{}\"",
            self.formatted_timestamp(),
            self.ip,
            self.request,
            self.status,
            self.user_agent
        )
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogRecord{{date={}, ip={}, request={}, status={}, userAgent={}}}",
            self.formatted_timestamp(),
            self.ip,
            self.request,
            self.status,
            self.user_agent
        )
    }
}
