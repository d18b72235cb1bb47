//! One parser run: optional ingestion, threshold analysis, block logging

use crate::cli::Opt;
use crate::config::Config;
use crate::detection::ThresholdAnalyzer;
use crate::error::AppError;
use crate::input::LogRecordParser;
use crate::models::ThresholdResult;
use crate::output::{OutputFormat, OutputHandler};
use crate::persistence::{LogStore, SqliteLogStore};
use std::path::Path;
use std::sync::Arc;

/// What a run did
#[derive(Debug)]
pub struct RunSummary {
    /// Records loaded from `--accesslog`
    pub ingested: usize,
    /// IPs above the threshold with their request counts
    pub flagged: ThresholdResult,
    /// Rows written to the block log
    pub blocked: usize,
}

/// Parse the access log at `path` and store every record as one batch
///
/// Nothing is stored when any line is invalid.
pub fn ingest(path: &Path, store: &dyn LogStore) -> Result<usize, AppError> {
    let parser = LogRecordParser::new()?;
    let records = parser.parse_file(path)?;
    let written = store.save_log_entries(&records)?;

    log::info!("Loaded {} record(s) from {:?}", written, path);
    Ok(written)
}

/// Run against the database named in `config`
pub fn run(opt: &Opt, config: &Config) -> Result<RunSummary, AppError> {
    let store = SqliteLogStore::new(&config.database.path)?;
    log::info!("Using database {:?}", config.database.path);
    run_with_store(opt, config, Arc::new(store))
}

/// Run against an already opened store
pub fn run_with_store(
    opt: &Opt,
    config: &Config,
    store: Arc<dyn LogStore>,
) -> Result<RunSummary, AppError> {
    let mut output = OutputHandler::new(
        OutputFormat::from_str(&config.output.format),
        config.output.file_path.clone(),
    )?;

    let ingested = match &opt.accesslog {
        Some(path) => ingest(path, store.as_ref())?,
        None => 0,
    };

    let analyzer = ThresholdAnalyzer::new(store);
    let flagged = analyzer.find_above_threshold(opt.start_date, opt.duration, opt.threshold)?;
    log::info!(
        "{} IP(s) above the {} threshold of {}",
        flagged.len(),
        opt.duration,
        opt.threshold
    );
    output.write_flagged(&flagged)?;

    let blocked = if opt.no_block_log {
        0
    } else {
        analyzer.log_blocked(&flagged, opt.start_date, opt.duration, opt.threshold)?
    };

    if let Some(ip) = &opt.ip {
        let requests = analyzer.requests_by_ip(ip)?;
        output.write_requests(ip, &requests)?;
    }

    output.flush()?;

    Ok(RunSummary {
        ingested,
        flagged,
        blocked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ParseError;
    use crate::models::{Duration, RecordError};
    use std::io::Write;
    use std::net::IpAddr;
    use structopt::StructOpt;

    const UA: &str = "swcd (unknown version) CFNetwork/808.2.16 Darwin/15.6.0";

    fn write_log(lines: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    /// `count` lines for `ip` starting at 13:00:00, one second apart
    fn burst(ip: &str, count: u32) -> Vec<String> {
        (0..count)
            .map(|i| {
                format!(
                    "2017-01-01 13:{:02}:{:02}.000|{}|\"GET / HTTP/1.1\"|200|\"{}\"",
                    i / 60,
                    i % 60,
                    ip,
                    UA
                )
            })
            .collect()
    }

    fn opt(args: &[&str]) -> Opt {
        Opt::from_iter(std::iter::once("parser").chain(args.iter().copied()))
    }

    fn jsonl_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.output.format = "jsonl".to_string();
        config.output.file_path = Some(dir.join("flagged.jsonl"));
        config
    }

    #[test]
    fn test_ingest_analyze_and_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut lines = burst("192.168.1.10", 6);
        lines.extend(burst("192.168.1.20", 3));
        let log = write_log(&lines);

        let log_arg = format!("--accesslog={}", log.path().display());
        let opt = opt(&[
            "--startDate=2017-01-01.13:00:00",
            "--duration=hourly",
            "--threshold=5",
            &log_arg,
        ]);
        let config = jsonl_config(dir.path());
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());

        let summary = run_with_store(&opt, &config, store.clone()).unwrap();

        assert_eq!(summary.ingested, 9);
        assert_eq!(summary.flagged.len(), 1);
        assert_eq!(
            summary.flagged.get(&"192.168.1.10".parse::<IpAddr>().unwrap()),
            Some(&6)
        );
        assert_eq!(summary.blocked, 1);

        let blocked = store.get_block_records().unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(
            blocked[0].reason,
            "hourly threshold (5) crossed (6) in the following dates range: \
             2017-01-01 13:00:00.000 - 2017-01-01 14:00:00.000"
        );

        let report = std::fs::read_to_string(dir.path().join("flagged.jsonl")).unwrap();
        assert_eq!(report.lines().count(), 1);
        assert!(report.contains("\"192.168.1.10\""));
    }

    #[test]
    fn test_nothing_flagged_writes_no_block_rows() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(&burst("10.0.0.1", 3));
        let log_arg = format!("--accesslog={}", log.path().display());
        let opt = opt(&[
            "--startDate=2017-01-01.13:00:00",
            "--duration=daily",
            "--threshold=3",
            &log_arg,
        ]);
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());

        let summary = run_with_store(&opt, &jsonl_config(dir.path()), store.clone()).unwrap();

        assert_eq!(summary.ingested, 3);
        assert!(summary.flagged.is_empty());
        assert_eq!(summary.blocked, 0);
        assert!(store.get_block_records().unwrap().is_empty());
    }

    #[test]
    fn test_no_block_log_flag() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(&burst("10.0.0.1", 4));
        let log_arg = format!("--accesslog={}", log.path().display());
        let opt = opt(&[
            "--startDate=2017-01-01.13:00:00",
            "--duration=hourly",
            "--threshold=1",
            "--no-block-log",
            &log_arg,
        ]);
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());

        let summary = run_with_store(&opt, &jsonl_config(dir.path()), store.clone()).unwrap();

        assert_eq!(summary.flagged.len(), 1);
        assert_eq!(summary.blocked, 0);
        assert!(store.get_block_records().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_log_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut lines = burst("10.0.0.1", 3);
        lines.push("2017-01-01 13:00:00|10.0.0.1|\"GET / HTTP/1.1\"|200|\"UA\"".to_string());
        let log = write_log(&lines);
        let log_arg = format!("--accesslog={}", log.path().display());
        let opt = opt(&[
            "--startDate=2017-01-01.13:00:00",
            "--duration=hourly",
            "--threshold=1",
            &log_arg,
        ]);
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());

        let err = run_with_store(&opt, &jsonl_config(dir.path()), store.clone()).unwrap_err();

        match err {
            AppError::Parse(ParseError::Line { line, source }) => {
                assert_eq!(line, 4);
                assert!(matches!(source, RecordError::DateFormat { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(store.count_log_entries().unwrap(), 0);
    }

    #[test]
    fn test_missing_access_log() {
        let dir = tempfile::tempdir().unwrap();
        let log_arg = format!("--accesslog={}", dir.path().join("missing.log").display());
        let opt = opt(&[
            "--startDate=2017-01-01.13:00:00",
            "--duration=hourly",
            "--threshold=1",
            &log_arg,
        ]);
        let store = Arc::new(SqliteLogStore::in_memory().unwrap());

        let err = run_with_store(&opt, &jsonl_config(dir.path()), store).unwrap_err();
        assert!(matches!(err, AppError::Parse(ParseError::Io(_))));
    }

    #[test]
    fn test_run_against_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(&burst("10.0.0.1", 4));
        let log_arg = format!("--accesslog={}", log.path().display());

        let mut config = jsonl_config(dir.path());
        config.database.path = dir.path().join("access.db");

        let first = opt(&[
            "--startDate=2017-01-01.13:00:00",
            "--duration=hourly",
            "--threshold=3",
            &log_arg,
        ]);
        let summary = run(&first, &config).unwrap();
        assert_eq!(summary.ingested, 4);
        assert_eq!(summary.flagged.len(), 1);

        // analysis only, over what the first run stored
        let second = opt(&[
            "--startDate=2017-01-01.13:00:00",
            "--duration=daily",
            "--threshold=3",
            "--ip=10.0.0.1",
        ]);
        let summary = run(&second, &config).unwrap();
        assert_eq!(summary.ingested, 0);
        assert_eq!(
            summary.flagged.get(&"10.0.0.1".parse::<IpAddr>().unwrap()),
            Some(&4)
        );
        assert_eq!(second.duration, Duration::Daily);

        let store = SqliteLogStore::new(&config.database.path).unwrap();
        assert_eq!(store.count_log_entries().unwrap(), 4);
        assert_eq!(store.get_block_records().unwrap().len(), 2);
    }
}
