use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use footy_ingest::config::Config;
use footy_ingest::ingest::{IngestRequest, ingest};
use footy_ingest::reconcile::{cleanup, merge};
use footy_ingest::{ingest_log, logging, queries, schema};

#[derive(Debug, Parser)]
#[command(name = "footy", about = "Football stats ingestion and repair")]
struct Cli {
    /// SQLite database path; overrides FOOTY_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest one request object, or an array of them, from a JSON file or stdin.
    Ingest {
        /// Input file; `-` or omitted reads stdin.
        input: Option<PathBuf>,
        /// Batch label used when a request carries none.
        #[arg(long)]
        label: Option<String>,
    },
    /// Merge leagues whose names differ only by case.
    MergeLeagues {
        /// Report the groups and survivors without writing.
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove rows left behind by corrupted syncs.
    Cleanup {
        #[command(subcommand)]
        action: CleanupAction,
    },
    /// List seasons with standings, flagging each league's current one.
    Seasons {
        #[arg(long)]
        league_id: Option<i64>,
    },
    /// Show the most recent ingestion log entries.
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
enum CleanupAction {
    Preview,
    Teams,
    Leagues,
    All,
}

fn main() -> ExitCode {
    logging::init();
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when some ingestion request was rejected.
fn run(cli: Cli) -> Result<bool> {
    let config = Config::load(cli.db)?;
    let mut conn = schema::open_db(&config.db_path)?;
    info!(db = %config.db_path.display(), "database ready");

    match cli.command {
        Command::Ingest { input, label } => {
            let raw = read_input(input)?;
            let mut requests = parse_requests(&raw)?;
            let mut all_ok = true;
            for req in &mut requests {
                if req.label.is_none() {
                    req.label = label.clone();
                }
                let response = ingest(&mut conn, req);
                all_ok &= response.is_success();
                print_json(&response)?;
            }
            Ok(all_ok)
        }
        Command::MergeLeagues { dry_run: true } => {
            print_json(&merge::plan_merges(&conn)?)?;
            Ok(true)
        }
        Command::MergeLeagues { dry_run: false } => {
            let report = merge::merge_duplicate_leagues(&mut conn)?;
            print_json(&report)?;
            Ok(report.failed_steps() == 0)
        }
        Command::Cleanup { action } => {
            match action {
                CleanupAction::Preview => print_json(&cleanup::preview(&mut conn)?)?,
                CleanupAction::Teams => print_json(&cleanup::cleanup_bad_teams(&mut conn)?)?,
                CleanupAction::Leagues => print_json(&cleanup::cleanup_bad_leagues(&mut conn)?)?,
                CleanupAction::All => print_json(&cleanup::cleanup_all(&mut conn)?)?,
            }
            Ok(true)
        }
        Command::Seasons { league_id } => {
            let seasons = queries::standings_seasons(&conn, league_id).context("list seasons")?;
            print_json(&seasons)?;
            Ok(true)
        }
        Command::Log { limit } => {
            let entries = ingest_log::recent(&conn, limit).context("read ingestion log")?;
            print_json(&entries)?;
            Ok(true)
        }
    }
}

fn read_input(input: Option<PathBuf>) -> Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => {
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
        }
        _ => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("read stdin")?;
            Ok(raw)
        }
    }
}

fn parse_requests(raw: &str) -> Result<Vec<IngestRequest>> {
    let value: Value = serde_json::from_str(raw).context("input is not JSON")?;
    let requests = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<serde_json::Result<Vec<IngestRequest>>>(),
        other => serde_json::from_value(other).map(|req| vec![req]),
    };
    requests.context("input is not an ingestion request")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
