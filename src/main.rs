use anyhow::{Context, Result};
use clap::Parser;
use ghcn_season::{
    batch::{run_batch, PartitionOutcome},
    config::BatchConfig,
    element::Element,
    logging,
    read::InputFormat,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert GHCN-Daily observations into one wide Parquet file per year"
)]
struct Args {
    /// YAML config; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Root of the hive-partitioned (or flat by-year) input
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<InputFormat>,
    /// Root under which `YEAR=<y>/data.parquet` is written
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    start_year: Option<i32>,
    #[arg(long)]
    end_year: Option<i32>,
    /// Partitions processed at once
    #[arg(long)]
    concurrency: Option<usize>,
    /// Comma-separated element codes, e.g. `SNOW,SNWD,TMAX`
    #[arg(long, value_delimiter = ',')]
    elements: Option<Vec<String>>,
    /// Keep only stations whose id starts with this, e.g. `US`
    #[arg(long)]
    station_prefix: Option<String>,
    /// Add winter-season, cumulative-snow and normalized-date columns
    #[arg(long)]
    with_seasons: bool,
    /// Only schedule years that have input
    #[arg(long)]
    skip_missing: bool,
    /// Skip years a previous run already wrote
    #[arg(long)]
    resume: bool,
    /// Write the run summary as JSON here
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(BatchConfig, Option<PathBuf>)> {
        let mut cfg = match &self.config {
            Some(path) => BatchConfig::from_yaml_file(path)?,
            None => BatchConfig::default(),
        };
        if let Some(v) = self.input {
            cfg.input_root = v;
        }
        if let Some(v) = self.format {
            cfg.input_format = v;
        }
        if let Some(v) = self.output {
            cfg.output_root = v;
        }
        if let Some(v) = self.start_year {
            cfg.year_range[0] = v;
        }
        if let Some(v) = self.end_year {
            cfg.year_range[1] = v;
        }
        if let Some(v) = self.concurrency {
            cfg.concurrency_limit = Some(v);
        }
        if let Some(v) = self.elements {
            cfg.tracked_elements = v.iter().map(|e| Element::parse(e)).collect();
        }
        if let Some(v) = self.station_prefix {
            cfg.station_prefix = Some(v);
        }
        cfg.with_seasons |= self.with_seasons;
        cfg.skip_missing |= self.skip_missing;
        cfg.resume |= self.resume;
        Ok((cfg, self.summary_json))
    }
}

fn main() -> Result<()> {
    logging::init();
    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    let (cfg, summary_json) = Args::parse().into_config()?;
    info!(
        input = %cfg.input_root.display(),
        output = %cfg.output_root.display(),
        start = cfg.year_range[0],
        end = cfg.year_range[1],
        "startup"
    );

    let summary = run_batch(&cfg)?;
    if let Some(path) = &summary_json {
        summary
            .write_json(path)
            .with_context(|| format!("writing summary to {}", path.display()))?;
        info!(path = %path.display(), "wrote run summary");
    }

    for report in summary.failed() {
        if let PartitionOutcome::Failed { error } = &report.outcome {
            error!(year = report.year, %error, "failed partition");
        }
    }

    let summary = summary.into_result()?;
    info!(
        done = summary.done().count(),
        failed = summary.failed().count(),
        skipped = summary.skipped().count(),
        "all done"
    );
    Ok(())
}
