// src/process/mod.rs
pub mod convert;
pub mod date_parser;
pub mod pivot;
pub mod utils;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::element::Element;

pub use convert::convert;
pub use pivot::{pivot, pivot_key, WideRecord};

/// One long-format row exactly as read: a single element reading for one station and day.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub station_id: String,
    pub date: NaiveDate,
    pub element: Element,
    /// Raw text of `DATA_VALUE`; may be empty.
    pub raw_value: String,
}

/// A `RawObservation` whose value has been converted into inches / °F.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedObservation {
    pub station_id: String,
    pub date: NaiveDate,
    pub element: Element,
    pub value: f64,
}

/// Warn about the first few bad readings of a partition, count the rest silently.
const MAX_LOGGED_DROPS: usize = 5;

/// Convert every row, dropping (and counting) readings that are not numeric.
///
/// Input order is preserved: the pivot's first-wins rule depends on it.
pub fn convert_observations(raw: Vec<RawObservation>) -> (Vec<ConvertedObservation>, usize) {
    let mut out = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;

    for obs in raw {
        match convert(&obs.element, &obs.raw_value) {
            Ok(value) => out.push(ConvertedObservation {
                station_id: obs.station_id,
                date: obs.date,
                element: obs.element,
                value,
            }),
            Err(e) => {
                dropped += 1;
                if dropped <= MAX_LOGGED_DROPS {
                    warn!(station = %obs.station_id, date = %obs.date, error = %e, "dropping row");
                }
            }
        }
    }

    if dropped > MAX_LOGGED_DROPS {
        warn!(dropped, "dropped unconvertible rows");
    }
    debug!(kept = out.len(), dropped, "converted observations");
    (out, dropped)
}
