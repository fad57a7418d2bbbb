use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use log::{error, warn};

use rusty_air::data::columns;
use rusty_air::data::loader::load_file;
use rusty_air::state::Session;
use rusty_air::Severity;

/// Filter an air-quality table and print the dashboard aggregates as JSON.
#[derive(Parser, Debug)]
#[command(name = "rusty-air")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Measurement table (.csv, .json or .parquet)
    #[arg(value_name = "DATASET")]
    dataset: PathBuf,

    /// First day to include (YYYY-MM-DD); defaults to the earliest date
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD); defaults to the latest date
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Earliest year to include
    #[arg(long)]
    year_min: Option<i32>,

    /// Latest year to include
    #[arg(long)]
    year_max: Option<i32>,

    /// Pollutant column to analyse (repeatable); defaults to all six
    #[arg(long = "pollutant", value_name = "COLUMN")]
    pollutants: Vec<String>,

    /// Environmental parameter column to include (repeatable)
    #[arg(long = "parameter", value_name = "COLUMN")]
    parameters: Vec<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let table = load_file(&args.dataset)?;

    let mut session = Session::default();
    session
        .set_table(table)
        .context("building the time index")?;

    let Some(mut criteria) = session.criteria.clone() else {
        anyhow::bail!("dataset has no observations");
    };
    if let Some(start) = args.start {
        criteria.start_date = start;
    }
    if let Some(end) = args.end {
        criteria.end_date = end;
    }
    if let Some(min) = args.year_min {
        criteria.year_min = min;
    }
    if let Some(max) = args.year_max {
        criteria.year_max = max;
    }
    if !args.pollutants.is_empty() {
        for p in args.pollutants.iter().filter(|p| !columns::is_pollutant(p)) {
            warn!("'{p}' is not one of the standard pollutant columns");
        }
        criteria.pollutants = args.pollutants.clone();
    }
    for p in args.parameters.iter().filter(|p| !columns::is_parameter(p)) {
        warn!("'{p}' is not one of the standard parameter columns");
    }
    criteria.parameters = args.parameters.clone();
    session.set_criteria(criteria);

    let view = match session.view() {
        Ok(view) => view,
        Err(e) => {
            match e.severity() {
                Severity::Session => error!("cannot analyse this dataset: {e}"),
                Severity::View => error!("nothing to show for this selection: {e}"),
            }
            return Err(e.into());
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.pretty {
        serde_json::to_writer_pretty(&mut out, &view)?;
    } else {
        serde_json::to_writer(&mut out, &view)?;
    }
    writeln!(out)?;
    Ok(())
}
