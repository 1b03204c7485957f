use crate::season::assign::SeasonedRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    pub seasoned: SeasonedRecord,
    /// Running SNOW total since the first record of this station's season.
    pub cumulative_snow: f64,
}

/// Running snowfall per `(station_id, winter_year)`.
///
/// Records are sorted by station, season and date first, then scanned once; the
/// sum resets whenever the station or the season changes. Missing SNOW counts as 0.
pub fn cumulative_snow(mut records: Vec<SeasonedRecord>) -> Vec<AggregatedRecord> {
    records.sort_by(|a, b| {
        a.record
            .station_id
            .cmp(&b.record.station_id)
            .then(a.winter_year.cmp(&b.winter_year))
            .then(a.record.date.cmp(&b.record.date))
    });

    let mut out = Vec::with_capacity(records.len());
    let mut current: Option<(String, i32)> = None;
    let mut running = 0.0;

    for rec in records {
        let same_group = matches!(
            &current,
            Some((station, wy)) if *station == rec.record.station_id && *wy == rec.winter_year
        );
        if !same_group {
            current = Some((rec.record.station_id.clone(), rec.winter_year));
            running = 0.0;
        }
        running += rec.record.snow();
        out.push(AggregatedRecord {
            seasoned: rec,
            cumulative_snow: running,
        });
    }
    out
}
