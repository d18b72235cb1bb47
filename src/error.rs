use crate::config::ConfigError;
use crate::detection::AnalyzerError;
use crate::input::ParseError;
use crate::output::OutputError;
use crate::persistence::PersistenceError;
use thiserror::Error;

/// Any failure of a parser run, reported once by the binary
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unable to parse access log: {0}")]
    Parse(#[from] ParseError),

    #[error("Storage error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Analysis failed: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("Unable to write report: {0}")]
    Output(#[from] OutputError),
}
