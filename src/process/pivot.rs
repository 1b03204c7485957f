// src/process/pivot.rs

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::element::{Element, ElementSet};
use crate::process::ConvertedObservation;

/// One row per (station, date), one value per tracked element.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRecord {
    pub station_id: String,
    pub date: NaiveDate,
    /// Station display name, when the source carries one.
    pub name: Option<String>,
    pub values: BTreeMap<Element, f64>,
}

impl WideRecord {
    pub fn new(station_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            station_id: station_id.into(),
            date,
            name: None,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, element: &Element) -> Option<f64> {
        self.values.get(element).copied()
    }

    /// SNOW for the day, with a missing reading counted as no snow.
    pub fn snow(&self) -> f64 {
        self.get(&Element::Snow).unwrap_or(0.0)
    }

    /// First value for an element wins; later duplicates are discarded.
    fn set_first(&mut self, element: &Element, value: f64) {
        self.values.entry(element.clone()).or_insert(value);
    }
}

/// Pivot the observations sharing one `(station_id, date)` key.
///
/// Observations for other keys and for untracked elements are ignored.
pub fn pivot_key<'a, I>(
    station_id: &str,
    date: NaiveDate,
    observations: I,
    tracked: &ElementSet,
) -> WideRecord
where
    I: IntoIterator<Item = &'a ConvertedObservation>,
{
    let mut rec = WideRecord::new(station_id, date);
    for obs in observations {
        if obs.station_id == station_id && obs.date == date && tracked.contains(&obs.element) {
            rec.set_first(&obs.element, obs.value);
        }
    }
    rec
}

/// Pivot a whole partition into wide records, sorted by `(station_id, date)`.
///
/// "First" means first in the order of `observations`; readers yield files in
/// lexicographic path order and rows in file order, so the choice is stable
/// across runs.
pub fn pivot<I>(observations: I, tracked: &ElementSet) -> Vec<WideRecord>
where
    I: IntoIterator<Item = ConvertedObservation>,
{
    let mut by_key: BTreeMap<(String, NaiveDate), WideRecord> = BTreeMap::new();
    for obs in observations {
        if !tracked.contains(&obs.element) {
            continue;
        }
        let rec = by_key
            .entry((obs.station_id, obs.date))
            .or_insert_with_key(|(station, date)| WideRecord::new(station.clone(), *date));
        rec.set_first(&obs.element, obs.value);
    }
    by_key.into_values().collect()
}
