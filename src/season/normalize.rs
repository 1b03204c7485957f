use chrono::NaiveDate;

use crate::season::assign::season_start;
use crate::season::cumulative::AggregatedRecord;

/// Label of the shared reference season, 1999-07-01 .. 2000-06-30.
/// 2000 is a leap year, so the reference season contains Feb 29.
pub const REFERENCE_WINTER_YEAR: i32 = 2000;

pub fn reference_season_start() -> NaiveDate {
    season_start(REFERENCE_WINTER_YEAR)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub aggregated: AggregatedRecord,
    pub normalized_date: NaiveDate,
}

/// Translate `date` onto the reference season by its day offset from its own season start.
///
/// A season without a Feb 29 is one day shorter than the reference season, so
/// its dates from Mar 1 on land one calendar day early (Mar 1 reads as Feb 29,
/// Jun 30 as Jun 29). Offsets are exact, month/day read-outs are not.
pub fn normalize(date: NaiveDate, winter_season_start: NaiveDate) -> NaiveDate {
    reference_season_start() + (date - winter_season_start)
}

/// Inverse of [`normalize`].
pub fn denormalize(normalized: NaiveDate, winter_season_start: NaiveDate) -> NaiveDate {
    winter_season_start + (normalized - reference_season_start())
}

pub fn normalize_records(records: Vec<AggregatedRecord>) -> Vec<NormalizedRecord> {
    records
        .into_iter()
        .map(|aggregated| {
            let s = &aggregated.seasoned;
            let normalized_date = normalize(s.record.date, s.winter_season_start);
            NormalizedRecord {
                aggregated,
                normalized_date,
            }
        })
        .collect()
}
