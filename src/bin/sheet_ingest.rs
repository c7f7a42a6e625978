use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use footy_ingest::config::Config;
use footy_ingest::ingest::ingest_request;
use footy_ingest::{logging, schema, sections};

/// Import a spreadsheet export (one sheet saved as CSV) section by section.
#[derive(Debug, Parser)]
#[command(name = "sheet_ingest")]
struct Args {
    /// CSV files, one per sheet.
    #[arg(required = true)]
    sheets: Vec<PathBuf>,
    #[arg(long)]
    db: Option<PathBuf>,
    /// League for sections whose title does not name one.
    #[arg(long)]
    league: Option<String>,
    #[arg(long, default_value = "excel_import")]
    label: String,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    let config = Config::load(args.db)?;
    let mut conn = schema::open_db(&config.db_path)?;

    let mut failures = Vec::new();
    let mut requests_total = 0usize;
    let mut inserted = 0usize;
    let mut updated = 0usize;
    let mut skipped = 0usize;

    for sheet in &args.sheets {
        let file = File::open(sheet).with_context(|| format!("open {}", sheet.display()))?;
        let rows = sections::rows_from_csv(file)
            .with_context(|| format!("read {}", sheet.display()))?;
        let found = sections::split_sections(&rows);
        println!("{}: {} sections", sheet.display(), found.len());

        let requests = sections::group_into_requests(
            found,
            args.league.as_deref(),
            Some(args.label.as_str()),
        );
        for req in requests {
            requests_total += 1;
            match ingest_request(&mut conn, &req) {
                Ok(counts) => {
                    inserted += counts.rows_inserted();
                    updated += counts.rows_updated();
                    skipped += counts.rows_skipped;
                    println!(
                        "  {} {}: tables={} inserted={} updated={} skipped={}",
                        req.league,
                        req.season,
                        req.tables.len(),
                        counts.rows_inserted(),
                        counts.rows_updated(),
                        counts.rows_skipped
                    );
                }
                Err(err) => {
                    failures.push(format!(
                        "{} {} ({}): {err}",
                        req.league,
                        req.season,
                        sheet.display()
                    ));
                }
            }
        }
    }

    println!("Sheet import complete");
    println!("DB: {}", config.db_path.display());
    println!("Requests: {}/{}", requests_total - failures.len(), requests_total);
    println!("Rows inserted: {inserted}, updated: {updated}, skipped: {skipped}");
    if !failures.is_empty() {
        println!("  errors: {}", failures.len());
        for err in failures.iter().take(6) {
            println!("   - {err}");
        }
        return Err(anyhow!("{} request(s) rolled back", failures.len()));
    }
    Ok(())
}
