pub mod threshold;

pub use threshold::{block_reason, AnalyzerError, ThresholdAnalyzer};
