//! Access log parsing
//!
//! Turns pipe-delimited access log lines into validated [`LogRecord`]s.
//! Parsing is fail-fast: the first bad line aborts the whole call and no
//! partial result is returned.

use crate::models::{LogRecord, RecordError, TIMESTAMP_FORMAT};
use chrono::{NaiveDateTime, Timelike};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Separator between the fields of a log line
pub const FIELD_DELIMITER: char = '|';

/// Number of fields every log line must have
pub const FIELD_COUNT: usize = 5;

const TIMESTAMP_PATTERN: &str = r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}$";

/// Errors that can occur while parsing an access log
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: RecordError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid timestamp pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ParseError {
    /// The record-level failure, if this error came from a log line
    pub fn record_error(&self) -> Option<&RecordError> {
        match self {
            ParseError::Line { source, .. } => Some(source),
            _ => None,
        }
    }

    /// 1-based number of the offending line, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Line { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Parser for pipe-delimited access log lines
#[derive(Debug, Clone)]
pub struct LogRecordParser {
    timestamp_pattern: Regex,
}

impl LogRecordParser {
    pub fn new() -> Result<Self, ParseError> {
        Ok(LogRecordParser {
            timestamp_pattern: Regex::new(TIMESTAMP_PATTERN)?,
        })
    }

    /// Read and parse every line of the file at `path`
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<LogRecord>, ParseError> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| match e.kind() {
                ErrorKind::InvalidData => ParseError::Line {
                    line: idx + 1,
                    source: RecordError::Encoding,
                },
                _ => ParseError::Io(e),
            })?;
            let record = self.parse_line(&line).map_err(|source| ParseError::Line {
                line: idx + 1,
                source,
            })?;
            records.push(record);
        }

        log::debug!("Parsed {} record(s) from {:?}", records.len(), path.as_ref());
        Ok(records)
    }

    /// Parse a sequence of raw lines, stopping at the first invalid one
    pub fn parse<I, S>(&self, lines: I) -> Result<Vec<LogRecord>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .enumerate()
            .map(|(idx, line)| {
                self.parse_line(line.as_ref())
                    .map_err(|source| ParseError::Line {
                        line: idx + 1,
                        source,
                    })
            })
            .collect()
    }

    /// Parse one log line
    ///
    /// Format: `<yyyy-MM-dd HH:mm:ss.SSS>|<ip>|"<request>"|<status>|"<user agent>"`
    pub fn parse_line(&self, line: &str) -> Result<LogRecord, RecordError> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();

        if fields.len() != FIELD_COUNT {
            return Err(RecordError::FieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
            });
        }

        let timestamp = self.parse_timestamp(fields[0])?;

        let ip = IpAddr::from_str(fields[1]).map_err(|_| RecordError::InvalidAddress {
            value: fields[1].to_string(),
        })?;

        let status = fields[3]
            .parse::<i64>()
            .map_err(|_| RecordError::InvalidStatus {
                value: fields[3].to_string(),
            })?;

        LogRecord::new(
            timestamp,
            ip,
            strip_quotes(fields[2]),
            status,
            strip_quotes(fields[4]),
        )
    }

    fn parse_timestamp(&self, value: &str) -> Result<NaiveDateTime, RecordError> {
        let invalid = || RecordError::DateFormat {
            value: value.to_string(),
        };

        if !self.timestamp_pattern.is_match(value) {
            return Err(invalid());
        }

        let timestamp =
            NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|_| invalid())?;

        // chrono reads second 60 as a leap second
        if timestamp.nanosecond() >= 1_000_000_000 {
            return Err(invalid());
        }

        Ok(timestamp)
    }
}

fn strip_quotes(field: &str) -> String {
    field.replace('"', "")
}
