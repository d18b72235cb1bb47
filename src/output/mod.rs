use crate::models::{sorted_flagged, LogRecord, ThresholdResult};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::net::IpAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing reports
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Output handler for threshold reports and request listings
pub struct OutputHandler {
    format: OutputFormat,
    writer: Option<Box<dyn Write + Send>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Console,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            "console" => OutputFormat::Console,
            _ => OutputFormat::Jsonl, // Default
        }
    }
}

impl OutputHandler {
    /// Create a new output handler
    ///
    /// Console output always goes to stdout; the other formats append to
    /// `file_path` when one is given.
    pub fn new(format: OutputFormat, file_path: Option<PathBuf>) -> Result<Self, OutputError> {
        let writer: Option<Box<dyn Write + Send>> = match (&format, file_path) {
            (OutputFormat::Console, _) => None,
            (_, Some(path)) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Box::new(BufWriter::new(file)))
            }
            (_, None) => None,
        };

        Ok(OutputHandler { format, writer })
    }

    /// Write the flagged IPs, ordered by IP
    pub fn write_flagged(&mut self, results: &ThresholdResult) -> Result<(), OutputError> {
        let output = self.render_flagged(results)?;
        self.write_output(&output)
    }

    /// Write the stored requests of one IP
    pub fn write_requests(&mut self, ip: &IpAddr, records: &[LogRecord]) -> Result<(), OutputError> {
        let output = self.render_requests(ip, records)?;
        self.write_output(&output)
    }

    fn render_flagged(&self, results: &ThresholdResult) -> Result<String, OutputError> {
        let rows = sorted_flagged(results);
        let mut output = String::new();

        match self.format {
            OutputFormat::Json => {
                for row in &rows {
                    output.push_str(&serde_json::to_string_pretty(row)?);
                    output.push('\n');
                }
            }
            OutputFormat::Jsonl => {
                for row in &rows {
                    output.push_str(&serde_json::to_string(row)?);
                    output.push('\n');
                }
            }
            OutputFormat::Console => {
                if rows.is_empty() {
                    output.push_str("No IPs above threshold\n");
                }
                for row in &rows {
                    output.push_str(&format!("{} - {} requests\n", row.ip, row.count));
                }
            }
        }

        Ok(output)
    }

    fn render_requests(&self, ip: &IpAddr, records: &[LogRecord]) -> Result<String, OutputError> {
        let mut output = String::new();

        match self.format {
            OutputFormat::Json => {
                for record in records {
                    output.push_str(&serde_json::to_string_pretty(record)?);
                    output.push('\n');
                }
            }
            OutputFormat::Jsonl => {
                for record in records {
                    output.push_str(&serde_json::to_string(record)?);
                    output.push('\n');
                }
            }
            OutputFormat::Console => {
                output.push_str(&format!("Requests from {} ({}):\n", ip, records.len()));
                for record in records {
                    output.push_str(&format!("  {}\n", record.to_line()));
                }
            }
        }

        Ok(output)
    }

    fn write_output(&mut self, data: &str) -> Result<(), OutputError> {
        match &mut self.writer {
            Some(writer) => {
                writer.write_all(data.as_bytes())?;
                writer.flush()?;
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(data.as_bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> Result<(), OutputError> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}
