//! `harvest`: crawl the URL list of a project into Markdown posts.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use harvest_engine::run_config_file;
use harvest_logging::{harvest_error, harvest_info, LogDestination};

#[derive(Parser, Debug)]
#[command(
    name = "harvest",
    version,
    about = "Fetch listed pages and write them as Markdown with front matter"
)]
struct Args {
    /// JSON config naming the project root and the fields to extract.
    config: PathBuf,

    /// Also append log records to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log per-field and per-image detail.
    #[arg(short, long)]
    verbose: bool,

    /// Date used for filenames of pages without their own date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

fn main() -> ExitCode {
    let args = Args::parse();
    let destination = match &args.log_file {
        Some(path) => LogDestination::TerminalAndFile(path.clone()),
        None => LogDestination::Terminal,
    };
    harvest_logging::initialize(&destination, args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            harvest_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let crawl_date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime
        .block_on(run_config_file(&args.config, crawl_date))
        .with_context(|| format!("crawl with {:?} did not start", args.config))?;

    for outcome in report.outcomes() {
        if let Some(detail) = &outcome.detail {
            harvest_info!("{} [{}] {}", outcome.url, outcome.state, detail);
        }
    }
    harvest_info!(
        "{} written, {} skipped, {} failed",
        report.written(),
        report.skipped(),
        report.failed()
    );
    Ok(())
}
