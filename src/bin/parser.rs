use std::process;
use structopt::clap::ErrorKind;
use structopt::StructOpt;

use logwarden::app;
use logwarden::cli::Opt;
use logwarden::config::{Config, ConfigError};
use logwarden::AppError;

fn main() {
    let opt = match Opt::from_iter_safe(std::env::args_os()) {
        Ok(opt) => opt,
        Err(e) if matches!(e.kind, ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed) => {
            e.exit()
        }
        Err(e) => fail(ConfigError::Cli(e.message).into()),
    };

    if let Err(e) = run(&opt) {
        fail(e);
    }
}

fn run(opt: &Opt) -> Result<(), AppError> {
    let config = Config::load_or_default(&opt.config)?;

    let env_filters = std::env::var(env_logger::DEFAULT_FILTER_ENV).ok();
    config
        .logging
        .logger_builder(env_filters.as_deref())?
        .init();

    if !opt.config.exists() {
        log::warn!("Config file {:?} not found, using defaults", opt.config);
    }
    log::info!("Starting access log analysis");

    let summary = app::run(opt, &config)?;

    if summary.flagged.is_empty() {
        log::info!("No IPs crossed the threshold, block log unchanged");
    } else {
        log::info!(
            "{} IP(s) crossed the threshold, {} block record(s) written",
            summary.flagged.len(),
            summary.blocked
        );
    }

    Ok(())
}

fn fail(error: AppError) -> ! {
    eprintln!("{}", error);
    process::exit(1);
}
