pub mod log_parser;

pub use log_parser::{LogRecordParser, ParseError, FIELD_COUNT, FIELD_DELIMITER};
