use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::element::Element;
use crate::process::WideRecord;

/// Calendar months in winter-season order.
pub const SEASON_MONTHS: [u32; 12] = [7, 8, 9, 10, 11, 12, 1, 2, 3, 4, 5, 6];

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Climatology for one calendar month, averaged across years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAverage {
    pub month: u32,
    pub label: &'static str,
    /// Mean monthly snowfall total.
    pub snow: Option<f64>,
    pub tavg: Option<f64>,
    pub tmax: Option<f64>,
    pub tmin: Option<f64>,
    /// Number of (year, month) buckets that contributed.
    pub years: usize,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn push(&mut self, v: Option<f64>) {
        if let Some(v) = v {
            self.sum += v;
            self.n += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

#[derive(Default)]
struct Bucket {
    snow: f64,
    tavg: Mean,
    tmax: Mean,
    tmin: Mean,
}

/// Two-step average: snow is summed and temperatures are averaged inside each
/// (year, month); those buckets are then averaged per month across years.
pub fn monthly_averages(records: &[WideRecord]) -> Vec<MonthlyAverage> {
    let mut buckets: BTreeMap<(i32, u32), Bucket> = BTreeMap::new();
    for r in records {
        let b = buckets.entry((r.date.year(), r.date.month())).or_default();
        b.snow += r.snow();
        b.tavg.push(r.get(&Element::Tavg));
        b.tmax.push(r.get(&Element::Tmax));
        b.tmin.push(r.get(&Element::Tmin));
    }

    let mut per_month: BTreeMap<u32, [Mean; 4]> = BTreeMap::new();
    for ((_, month), b) in &buckets {
        let acc = per_month.entry(*month).or_default();
        acc[0].push(Some(b.snow));
        acc[1].push(b.tavg.value());
        acc[2].push(b.tmax.value());
        acc[3].push(b.tmin.value());
    }

    SEASON_MONTHS
        .iter()
        .map(|&month| {
            let acc = per_month.get(&month);
            let pick = |i: usize| acc.and_then(|a| a[i].value());
            MonthlyAverage {
                month,
                label: MONTH_LABELS[(month - 1) as usize],
                snow: pick(0),
                tavg: pick(1),
                tmax: pick(2),
                tmin: pick(3),
                years: acc.map_or(0, |a| a[0].n),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(y: i32, m: u32, d: u32, snow: f64, tmax: Option<f64>) -> WideRecord {
        let mut r = WideRecord::new("S1", NaiveDate::from_ymd_opt(y, m, d).unwrap());
        r.values.insert(Element::Snow, snow);
        if let Some(t) = tmax {
            r.values.insert(Element::Tmax, t);
        }
        r
    }

    #[test]
    fn averages_monthly_totals_across_years() {
        let out = monthly_averages(&[
            rec(2019, 1, 1, 2.0, Some(30.0)),
            rec(2019, 1, 2, 4.0, Some(40.0)),
            rec(2020, 1, 5, 12.0, None),
            rec(2020, 7, 4, 0.0, Some(90.0)),
        ]);
        assert_eq!(out.len(), 12);
        assert_eq!(out[0].label, "Jul");
        assert_eq!(out[11].label, "Jun");

        let jan = &out[6];
        assert_eq!(jan.month, 1);
        assert_eq!(jan.snow, Some(9.0));
        assert_eq!(jan.tmax, Some(35.0));
        assert_eq!(jan.tavg, None);
        assert_eq!(jan.years, 2);

        let feb = &out[7];
        assert_eq!(feb.snow, None);
        assert_eq!(feb.years, 0);
    }
}
