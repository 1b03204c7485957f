// src/read/mod.rs
pub mod hive;
pub mod tarball;
pub mod wide_csv;

use serde::{Deserialize, Serialize};

use crate::element::ElementSet;
use crate::error::PartitionError;
use crate::process::RawObservation;

pub use hive::HiveSource;
pub use tarball::read_csv_tarball;
pub use wide_csv::load_wide_csv;

/// Which file types a source picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Parquet,
    Csv,
    #[default]
    Auto,
}

/// Row filter pushed down into a scan.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    pub elements: ElementSet,
    /// Keep only stations whose id starts with this, e.g. `US`.
    pub station_prefix: Option<String>,
}

impl ScanFilter {
    pub fn keeps_station(&self, station_id: &str) -> bool {
        self.station_prefix
            .as_deref()
            .map_or(true, |p| station_id.starts_with(p))
    }
}

/// Long-format input for one year-partition.
///
/// Every call to `scan` opens its own file handles and drops them before
/// returning; nothing is shared between concurrent scans of different years.
/// Rows come back in a fixed order (files in lexicographic path order, rows in
/// file order) so that duplicate readings resolve the same way on every run.
pub trait ObservationSource: Send + Sync {
    fn scan(&self, year: i32, filter: &ScanFilter) -> Result<Vec<RawObservation>, PartitionError>;

    /// Stable description of where rows come from; two sources with the same
    /// identity yield the same rows.
    fn identity(&self) -> String;
}
