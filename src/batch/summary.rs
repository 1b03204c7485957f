// src/batch/summary.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use crate::error::ScheduleExhaustionError;

/// How one partition ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionOutcome {
    Done {
        rows: usize,
        /// Readings dropped because they were not numeric.
        dropped_rows: usize,
        path: PathBuf,
    },
    Failed {
        error: String,
    },
    /// Already written by an earlier run with the same layout.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionReport {
    pub year: i32,
    #[serde(flatten)]
    pub outcome: PartitionOutcome,
    pub elapsed_ms: u64,
}

impl PartitionReport {
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, PartitionOutcome::Done { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, PartitionOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, PartitionOutcome::Skipped)
    }
}

/// Result of a batch run, one report per scheduled year, sorted by year.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub concurrency: usize,
    pub partitions: Vec<PartitionReport>,
}

impl RunSummary {
    pub fn new(
        started: DateTime<Utc>,
        concurrency: usize,
        mut partitions: Vec<PartitionReport>,
    ) -> Self {
        partitions.sort_by_key(|p| p.year);
        Self {
            started,
            finished: Utc::now(),
            concurrency,
            partitions,
        }
    }

    pub fn done(&self) -> impl Iterator<Item = &PartitionReport> {
        self.partitions.iter().filter(|p| p.is_done())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PartitionReport> {
        self.partitions.iter().filter(|p| p.is_failed())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &PartitionReport> {
        self.partitions.iter().filter(|p| p.is_skipped())
    }

    pub fn total_rows(&self) -> usize {
        self.partitions
            .iter()
            .map(|p| match p.outcome {
                PartitionOutcome::Done { rows, .. } => rows,
                _ => 0,
            })
            .sum()
    }

    /// Fails only when partitions were scheduled and none of them ended up
    /// written, either now or by a previous run.
    pub fn into_result(self) -> Result<Self, ScheduleExhaustionError> {
        let scheduled = self.partitions.len();
        let ok = self.done().count() + self.skipped().count();
        if scheduled > 0 && ok == 0 {
            return Err(ScheduleExhaustionError {
                scheduled,
                failed: self.failed().count(),
            });
        }
        Ok(self)
    }

    /// Pretty JSON via `<path>.tmp` then rename.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        {
            let file =
                File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), self)
                .context("serializing run summary")?;
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))?;
        Ok(())
    }
}
