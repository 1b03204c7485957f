use chrono::{Datelike, NaiveDate};

use crate::process::WideRecord;

/// First month of a winter season.
pub const SEASON_START_MONTH: u32 = 7;

/// A wide record tagged with the winter season it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonedRecord {
    pub record: WideRecord,
    /// Season label: the calendar year the season ends in.
    pub winter_year: i32,
    /// July 1 of `winter_year - 1`.
    pub winter_season_start: NaiveDate,
}

/// Winter seasons run July 1 (Y-1) through June 30 (Y) and are labelled Y.
///
/// June 30 closes the season ending that day; July 1 opens the next one.
pub fn assign(date: NaiveDate) -> (i32, NaiveDate) {
    let year = date.year();
    let winter_year = if date.month() < SEASON_START_MONTH {
        year
    } else {
        year + 1
    };
    (winter_year, season_start(winter_year))
}

/// Start date of the season labelled `winter_year`.
pub fn season_start(winter_year: i32) -> NaiveDate {
    // July 1 exists in every representable year
    NaiveDate::from_ymd_opt(winter_year - 1, SEASON_START_MONTH, 1).unwrap_or(NaiveDate::MIN)
}

pub fn assign_record(record: WideRecord) -> SeasonedRecord {
    let (winter_year, winter_season_start) = assign(record.date);
    SeasonedRecord {
        record,
        winter_year,
        winter_season_start,
    }
}

/// Keep records whose season lies within the optional inclusive bounds.
pub fn filter_winter_years(
    records: Vec<SeasonedRecord>,
    start: Option<i32>,
    end: Option<i32>,
) -> Vec<SeasonedRecord> {
    records
        .into_iter()
        .filter(|r| start.map_or(true, |s| r.winter_year >= s))
        .filter(|r| end.map_or(true, |e| r.winter_year <= e))
        .collect()
}
