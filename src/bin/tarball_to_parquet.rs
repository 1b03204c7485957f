use anyhow::Result;
use clap::Parser;
use ghcn_season::{logging, read::read_csv_tarball, schema::write_parquet_atomic};
use std::{path::PathBuf, time::Instant};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert a tarball of CSVs to a single Parquet file")]
struct Args {
    /// `.tar.gz` containing CSV files
    tar_path: PathBuf,
    output_path: PathBuf,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    let start = Instant::now();

    let batch = read_csv_tarball(&args.tar_path)?;
    let bytes = write_parquet_atomic(&args.output_path, &batch)?;
    info!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        bytes,
        path = %args.output_path.display(),
        "completed in {:?}",
        start.elapsed()
    );
    Ok(())
}
