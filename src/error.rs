// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

use crate::element::Element;

/// A single raw reading that could not be turned into a number.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert {element} value {raw:?}: not numeric")]
pub struct ConversionError {
    pub element: Element,
    pub raw: String,
}

/// Whole-partition failure. Caught at the worker boundary and recorded in the run summary.
#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("no input found for year {year} under {root}")]
    MissingInput { year: i32, root: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("malformed input in {path} at row {row}: {reason}")]
    Malformed {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Fatal run outcome: nothing succeeded.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("no partition succeeded: {failed} of {scheduled} failed")]
pub struct ScheduleExhaustionError {
    pub scheduled: usize,
    pub failed: usize,
}
