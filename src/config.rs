// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use sysinfo::System;
use tracing::info;

use crate::element::{Element, ElementSet};
use crate::read::InputFormat;

/// Upper bound on the memory-derived default worker count.
pub const MAX_DEFAULT_CONCURRENCY: usize = 16;

/// Everything a batch run needs. Shared read-only by all workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub input_root: PathBuf,
    pub input_format: InputFormat,
    pub output_root: PathBuf,
    /// Inclusive `[start, end]` of calendar years to process.
    pub year_range: [i32; 2],
    /// Worker count; `None` derives it from available memory.
    pub concurrency_limit: Option<usize>,
    /// Memory budget assumed per in-flight partition when deriving the worker count.
    pub memory_per_partition_mb: u64,
    pub tracked_elements: Vec<Element>,
    pub station_prefix: Option<String>,
    /// Add season, cumulative-snow and normalized-date columns.
    pub with_seasons: bool,
    /// Only schedule years that have input, instead of failing the missing ones.
    pub skip_missing: bool,
    /// Skip years already recorded as done in the run history.
    pub resume: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("noaa_ghcn_local"),
            input_format: InputFormat::Auto,
            output_root: PathBuf::from("us_wide_final"),
            year_range: [1850, 2025],
            concurrency_limit: None,
            memory_per_partition_mb: 1024,
            tracked_elements: ElementSet::default().iter().cloned().collect(),
            station_prefix: None,
            with_seasons: false,
            skip_missing: false,
            resume: false,
        }
    }
}

impl BatchConfig {
    /// Load from YAML; absent keys keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracked_elements.is_empty() {
            bail!("tracked_elements must not be empty");
        }
        let [start, end] = self.year_range;
        if start > end {
            bail!("year_range start {} is after end {}", start, end);
        }
        if self.concurrency_limit == Some(0) {
            bail!("concurrency_limit must be at least 1");
        }
        if self.memory_per_partition_mb == 0 {
            bail!("memory_per_partition_mb must be at least 1");
        }
        Ok(())
    }

    pub fn elements(&self) -> ElementSet {
        ElementSet::new(self.tracked_elements.iter().cloned())
    }

    pub fn years(&self) -> Vec<i32> {
        (self.year_range[0]..=self.year_range[1]).collect()
    }

    /// Configured limit, or what fits in currently available memory.
    pub fn effective_concurrency(&self) -> usize {
        if let Some(n) = self.concurrency_limit {
            return n;
        }
        let mut sys = System::new();
        sys.refresh_memory();
        let n = memory_bound_workers(sys.available_memory(), self.memory_per_partition_mb);
        info!(
            available_mb = sys.available_memory() / (1024 * 1024),
            per_partition_mb = self.memory_per_partition_mb,
            workers = n,
            "derived concurrency from available memory"
        );
        n
    }
}

/// `available / per_partition`, clamped to `[1, MAX_DEFAULT_CONCURRENCY]`.
pub fn memory_bound_workers(available_bytes: u64, per_partition_mb: u64) -> usize {
    let per = per_partition_mb.max(1).saturating_mul(1024 * 1024);
    let n = (available_bytes / per) as usize;
    n.clamp(1, MAX_DEFAULT_CONCURRENCY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_defaults() {
        let cfg: BatchConfig = serde_yaml::from_str(
            "output_root: out\nyear_range: [2000, 2002]\ntracked_elements: [SNOW, TAVG]\nconcurrency_limit: 3\n",
        )
        .unwrap();
        assert_eq!(cfg.output_root, PathBuf::from("out"));
        assert_eq!(cfg.years(), vec![2000, 2001, 2002]);
        assert_eq!(cfg.elements().len(), 2);
        assert_eq!(cfg.effective_concurrency(), 3);
        assert_eq!(cfg.input_format, InputFormat::Auto);
        cfg.validate().unwrap();
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<BatchConfig>("concurency_limit: 3\n").is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = BatchConfig::default();
        cfg.year_range = [2020, 2019];
        assert!(cfg.validate().is_err());

        let mut cfg = BatchConfig::default();
        cfg.concurrency_limit = Some(0);
        assert!(cfg.validate().is_err());

        let mut cfg = BatchConfig::default();
        cfg.tracked_elements.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn memory_bound_is_clamped() {
        let gib = 1024 * 1024 * 1024;
        assert_eq!(memory_bound_workers(0, 1024), 1);
        assert_eq!(memory_bound_workers(5 * gib, 1024), 5);
        assert_eq!(memory_bound_workers(512 * gib, 1024), MAX_DEFAULT_CONCURRENCY);
    }
}
