pub mod block;
pub mod duration;
pub mod record;

pub use block::{sorted_flagged, BlockRecord, FlaggedIp, ThresholdResult};
pub use duration::Duration;
pub use record::{format_timestamp, LogRecord, RecordError, TIMESTAMP_FORMAT};
