use crate::models::Duration;
use chrono::NaiveDateTime;
use std::net::IpAddr;
use std::path::PathBuf;
use structopt::StructOpt;

/// Format of the `--startDate` option
pub const START_DATE_FORMAT: &str = "%Y-%m-%d.%H:%M:%S";

fn parse_start_date(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, START_DATE_FORMAT).map_err(|_| {
        format!(
            "invalid start date '{}', expected yyyy-MM-dd.HH:mm:ss",
            value
        )
    })
}

/// Load an access log and report IPs that crossed a request threshold
#[derive(StructOpt, Debug)]
#[structopt(name = "parser", about = "Access log threshold detector")]
pub struct Opt {
    /// Start of the analysis window (yyyy-MM-dd.HH:mm:ss)
    #[structopt(long = "startDate", parse(try_from_str = parse_start_date))]
    pub start_date: NaiveDateTime,

    /// Window length: hourly or daily
    #[structopt(long)]
    pub duration: Duration,

    /// Flag IPs with strictly more requests than this inside the window
    #[structopt(long)]
    pub threshold: u32,

    /// Access log to load into the database before the analysis
    #[structopt(long, parse(from_os_str))]
    pub accesslog: Option<PathBuf>,

    /// Path to configuration file
    #[structopt(long, parse(from_os_str), default_value = "parser.toml")]
    pub config: PathBuf,

    /// Also list the stored requests of this IP
    #[structopt(long)]
    pub ip: Option<IpAddr>,

    /// Report flagged IPs without writing them to the block log
    #[structopt(long = "no-block-log")]
    pub no_block_log: bool,
}
