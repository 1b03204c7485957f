// src/season/mod.rs
pub mod assign;
pub mod cumulative;
pub mod monthly;
pub mod normalize;
pub mod stations;

pub use assign::{assign, assign_record, filter_winter_years, season_start, SeasonedRecord};
pub use cumulative::{cumulative_snow, AggregatedRecord};
pub use normalize::{denormalize, normalize, normalize_records, NormalizedRecord};

use crate::process::WideRecord;

/// Seasons, running snowfall and overlay dates for a set of wide records.
/// Output is ordered by station, season, date.
pub fn seasonal(
    records: Vec<WideRecord>,
    winter_years: (Option<i32>, Option<i32>),
) -> Vec<NormalizedRecord> {
    let seasoned: Vec<SeasonedRecord> = records.into_iter().map(assign_record).collect();
    let seasoned = filter_winter_years(seasoned, winter_years.0, winter_years.1);
    normalize_records(cumulative_snow(seasoned))
}
