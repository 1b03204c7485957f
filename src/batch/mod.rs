// src/batch/mod.rs
pub mod status;
pub mod summary;

use anyhow::{Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use std::{
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    sync::Arc,
    time::Instant,
};
use tracing::{error, info, instrument, warn};

use crate::config::BatchConfig;
use crate::error::PartitionError;
use crate::history::{run_fingerprint, run_key, PartitionRunRow, TableHistory, HISTORY_DIR};
use crate::process::{convert_observations, pivot};
use crate::read::{HiveSource, ObservationSource, ScanFilter};
use crate::schema::{OutputLayout, OutputRows, ParquetSink, PartitionSink};
use crate::season::seasonal;

pub use status::{PartitionState, StatusBoard};
pub use summary::{PartitionOutcome, PartitionReport, RunSummary};

/// What a successful partition produced.
struct Written {
    rows: usize,
    dropped_rows: usize,
    path: PathBuf,
}

/// Runs year-partitions through convert → pivot → season → write on a fixed
/// number of workers. A failing partition never affects the others.
pub struct BatchRunner {
    source: Arc<dyn ObservationSource>,
    sink: Arc<dyn PartitionSink>,
    filter: ScanFilter,
    layout: OutputLayout,
    concurrency: usize,
    history: Option<Arc<TableHistory<PartitionRunRow>>>,
    resume: bool,
}

impl BatchRunner {
    pub fn new(
        source: Arc<dyn ObservationSource>,
        sink: Arc<dyn PartitionSink>,
        filter: ScanFilter,
        layout: OutputLayout,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            sink,
            filter,
            layout,
            concurrency: concurrency.max(1),
            history: None,
            resume: false,
        }
    }

    /// Record each written partition; with `resume`, skip ones already recorded.
    pub fn with_history(mut self, history: Arc<TableHistory<PartitionRunRow>>, resume: bool) -> Self {
        self.history = Some(history);
        self.resume = resume;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process `years` and report on every one of them. A year listed twice
    /// is processed once.
    pub fn run(&self, years: &[i32]) -> Result<RunSummary> {
        let started = Utc::now();
        let fingerprint = run_fingerprint(&self.source.identity(), &self.filter, &self.layout);

        let mut years = years.to_vec();
        years.sort_unstable();
        years.dedup();
        let (skipped, scheduled): (Vec<i32>, Vec<i32>) = years
            .into_iter()
            .partition(|&y| self.already_written(y, &fingerprint));
        if !skipped.is_empty() {
            info!(count = skipped.len(), "skipping partitions recorded by a previous run");
        }

        let board = StatusBoard::new(&scheduled);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("partition-{}", i))
            .build()
            .context("building partition worker pool")?;

        info!(
            partitions = scheduled.len(),
            workers = self.concurrency,
            "starting batch"
        );
        let mut reports: Vec<PartitionReport> = pool.install(|| {
            scheduled
                .par_iter()
                .map(|&year| self.run_one(year, &board, &fingerprint))
                .collect()
        });
        reports.extend(skipped.into_iter().map(|year| PartitionReport {
            year,
            outcome: PartitionOutcome::Skipped,
            elapsed_ms: 0,
        }));

        let summary = RunSummary::new(started, self.concurrency, reports);
        info!(
            done = summary.done().count(),
            failed = summary.failed().count(),
            skipped = summary.skipped().count(),
            rows = summary.total_rows(),
            "batch finished"
        );
        Ok(summary)
    }

    fn already_written(&self, year: i32, fingerprint: &str) -> bool {
        self.resume
            && self
                .history
                .as_ref()
                .is_some_and(|h| h.get(&run_key(year, fingerprint)))
    }

    /// Worker boundary: every outcome, including a panic, becomes a report.
    fn run_one(&self, year: i32, board: &StatusBoard, fingerprint: &str) -> PartitionReport {
        board.transition(year, PartitionState::Running);
        let started = Utc::now();
        let clock = Instant::now();

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.process_partition(year)));
        let outcome = match result {
            Ok(Ok(written)) => {
                board.transition(year, PartitionState::Done);
                self.record(year, fingerprint, &written, started);
                PartitionOutcome::Done {
                    rows: written.rows,
                    dropped_rows: written.dropped_rows,
                    path: written.path,
                }
            }
            Ok(Err(e)) => {
                error!(year, error = ?e, "partition failed");
                board.transition(year, PartitionState::Failed);
                PartitionOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!(year, panic = %msg, "partition panicked");
                board.transition(year, PartitionState::Failed);
                PartitionOutcome::Failed {
                    error: format!("panicked: {}", msg),
                }
            }
        };

        PartitionReport {
            year,
            outcome,
            elapsed_ms: clock.elapsed().as_millis() as u64,
        }
    }

    #[instrument(level = "info", skip(self))]
    fn process_partition(&self, year: i32) -> Result<Written, PartitionError> {
        let raw = self.source.scan(year, &self.filter)?;
        let scanned = raw.len();
        let (converted, dropped_rows) = convert_observations(raw);
        if dropped_rows > 0 {
            warn!(dropped_rows, "non-numeric readings dropped");
        }

        let wide = pivot(converted, &self.filter.elements);
        let rows = if self.layout.with_seasons {
            OutputRows::Seasonal(seasonal(wide, (None, None)))
        } else {
            OutputRows::Wide(wide)
        };

        let path = self.sink.write_partition(year, &rows, &self.layout)?;
        info!(scanned, rows = rows.len(), path = %path.display(), "partition written");
        Ok(Written {
            rows: rows.len(),
            dropped_rows,
            path,
        })
    }

    fn record(&self, year: i32, fingerprint: &str, written: &Written, started: chrono::DateTime<Utc>) {
        let Some(history) = &self.history else {
            return;
        };
        let row = PartitionRunRow {
            year,
            fingerprint: fingerprint.to_string(),
            rows: written.rows as u64,
            output_path: written.path.display().to_string(),
            started,
            finished: Utc::now(),
        };
        if let Err(e) = history.add(&row) {
            warn!(year, error = ?e, "could not record partition in history");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Years to schedule: the configured range, or with `skip_missing` only
/// those that have input under the root.
pub fn plan_years(cfg: &BatchConfig, source: &HiveSource) -> Result<Vec<i32>> {
    let years = cfg.years();
    if !cfg.skip_missing {
        return Ok(years);
    }
    let available = source.available_years()?;
    let planned: Vec<i32> = years.into_iter().filter(|y| available.contains(y)).collect();
    info!(
        available = available.len(),
        planned = planned.len(),
        "restricted year range to available input"
    );
    Ok(planned)
}

/// Hive input, Parquet output and run history, all wired from config.
/// The config is validated here, before anything touches the filesystem.
pub fn run_batch(cfg: &BatchConfig) -> Result<RunSummary> {
    cfg.validate().context("invalid configuration")?;
    let elements = cfg.elements();
    let source = HiveSource::new(&cfg.input_root, cfg.input_format);
    let years = plan_years(cfg, &source)?;

    let history = TableHistory::new_partition_runs(cfg.output_root.join(HISTORY_DIR))
        .context("opening run history")?;
    let history = Arc::new(history);

    let runner = BatchRunner::new(
        Arc::new(source),
        Arc::new(ParquetSink::new(&cfg.output_root)),
        ScanFilter {
            elements: elements.clone(),
            station_prefix: cfg.station_prefix.clone(),
        },
        OutputLayout {
            elements,
            with_name: false,
            with_seasons: cfg.with_seasons,
        },
        cfg.effective_concurrency(),
    )
    .with_history(Arc::clone(&history), cfg.resume);

    let summary = runner.run(&years)?;
    if let Err(e) = history.vacuum() {
        warn!(error = ?e, "history vacuum failed");
    }
    Ok(summary)
}
