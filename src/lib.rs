pub mod app;
pub mod cli;
pub mod config;
pub mod detection;
pub mod error;
pub mod input;
pub mod models;
pub mod output;
pub mod persistence;

// Re-export commonly used types
pub use models::{BlockRecord, Duration, LogRecord, RecordError, ThresholdResult};
pub use input::{LogRecordParser, ParseError};
pub use detection::{AnalyzerError, ThresholdAnalyzer};
pub use persistence::{LogStore, PersistenceError, SqliteLogStore};
pub use error::AppError;
