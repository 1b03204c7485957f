use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::element::Element;
use crate::process::WideRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub station_id: String,
    pub name: Option<String>,
    /// Days with a SNOW reading.
    pub datapoints: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// Per-station coverage, busiest station first.
pub fn summarize_stations(records: &[WideRecord]) -> Vec<StationSummary> {
    let mut by_station: BTreeMap<(&str, Option<&str>), StationSummary> = BTreeMap::new();
    for r in records {
        let key = (r.station_id.as_str(), r.name.as_deref());
        let s = by_station.entry(key).or_insert_with(|| StationSummary {
            station_id: r.station_id.clone(),
            name: r.name.clone(),
            datapoints: 0,
            first_date: r.date,
            last_date: r.date,
        });
        if r.values.contains_key(&Element::Snow) {
            s.datapoints += 1;
        }
        s.first_date = s.first_date.min(r.date);
        s.last_date = s.last_date.max(r.date);
    }

    let mut out: Vec<StationSummary> = by_station.into_values().collect();
    // stable: ties keep station order
    out.sort_by(|a, b| b.datapoints.cmp(&a.datapoints));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(station: &str, day: u32, snow: bool) -> WideRecord {
        let mut r = WideRecord::new(station, NaiveDate::from_ymd_opt(2020, 1, day).unwrap());
        r.name = Some(format!("{station} AIRPORT"));
        if snow {
            r.values.insert(Element::Snow, 0.0);
        }
        r
    }

    #[test]
    fn counts_snow_days_and_sorts_descending() {
        let out = summarize_stations(&[
            rec("A", 3, true),
            rec("B", 1, true),
            rec("B", 2, true),
            rec("A", 1, false),
        ]);
        assert_eq!(out[0].station_id, "B");
        assert_eq!(out[0].datapoints, 2);
        assert_eq!(out[1].station_id, "A");
        assert_eq!(out[1].datapoints, 1);
        assert_eq!(out[1].first_date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(out[1].last_date, NaiveDate::from_ymd_opt(2020, 1, 3).unwrap());
        assert_eq!(out[1].name.as_deref(), Some("A AIRPORT"));
    }
}
