//! Seasonal snowfall from an NCDC "daily summaries" CSV.
//!
//! Loads the wide CSV, assigns winter seasons, accumulates snowfall per
//! station-season and writes one Parquet file with the overlay date column.
//! `--list-stations` prints station coverage instead.
use anyhow::{Context, Result};
use clap::Parser;
use ghcn_season::{
    element::ElementSet,
    logging,
    read::load_wide_csv,
    schema::{monthly_record_batch, to_record_batch, write_parquet_atomic, OutputLayout, OutputRows},
    season::{monthly::monthly_averages, seasonal, stations::summarize_stations},
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Cumulative seasonal snowfall from a daily-summaries CSV")]
struct Args {
    /// NCDC daily-summaries CSV
    #[arg(short, long)]
    input: PathBuf,
    /// Seasonal Parquet output
    #[arg(short, long, default_value = "cumulative_snow.parquet")]
    output: PathBuf,
    /// Only this station id
    #[arg(long)]
    station: Option<String>,
    /// First winter year to keep (a winter year ends in June)
    #[arg(long)]
    start_year: Option<i32>,
    /// Last winter year to keep
    #[arg(long)]
    end_year: Option<i32>,
    /// Print stations with their SNOW coverage and exit
    #[arg(long)]
    list_stations: bool,
    /// Also write the Jul..Jun monthly climatology here
    #[arg(long)]
    monthly: Option<PathBuf>,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let records = load_wide_csv(&args.input, args.station.as_deref())
        .with_context(|| format!("loading {}", args.input.display()))?;
    if records.is_empty() {
        warn!(station = ?args.station, "no records matched");
    }

    if args.list_stations {
        for s in summarize_stations(&records) {
            println!(
                "{}\t{}\t{}\t{}..{}",
                s.station_id,
                s.name.as_deref().unwrap_or(""),
                s.datapoints,
                s.first_date,
                s.last_date
            );
        }
        return Ok(());
    }

    if let Some(path) = &args.monthly {
        let batch = monthly_record_batch(&monthly_averages(&records))?;
        write_parquet_atomic(path, &batch)?;
        info!(path = %path.display(), "wrote monthly climatology");
    }

    let layout = OutputLayout {
        elements: ElementSet::new(records.iter().flat_map(|r| r.values.keys().cloned())),
        with_name: true,
        with_seasons: true,
    };
    let rows = OutputRows::Seasonal(seasonal(records, (args.start_year, args.end_year)));
    let batch = to_record_batch(&rows, &layout)?;
    let bytes = write_parquet_atomic(&args.output, &batch)?;
    info!(
        rows = rows.len(),
        bytes,
        path = %args.output.display(),
        "wrote seasonal parquet"
    );
    Ok(())
}
