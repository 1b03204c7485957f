// src/read/wide_csv.rs

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, instrument};

use crate::element::Element;
use crate::process::date_parser::parse_obs_date;
use crate::process::utils::clean_str;
use crate::process::WideRecord;

/// Columns of an NCDC daily-summaries export that are not element readings.
const METADATA_COLUMNS: [&str; 6] = ["STATION", "NAME", "DATE", "LATITUDE", "LONGITUDE", "ELEVATION"];

/// Load an NCDC "daily summaries" CSV, already in standard units.
///
/// Columns: `STATION`, `NAME`, `DATE`, then one column per element (`SNOW`,
/// `SNWD`, `WESD`, `WESF`, `TMAX`, ...). `*_ATTRIBUTES` columns are ignored.
/// Empty snow-pack readings become `0.0`; other empty readings stay absent.
///
/// Additional dataset documentation: <https://www.ncei.noaa.gov/data/daily-summaries/doc/GHCND_documentation.pdf>
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_wide_csv<P: AsRef<Path>>(path: P, station: Option<&str>) -> Result<Vec<WideRecord>> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(|h| clean_str(h).to_ascii_uppercase())
        .collect();
    let find = |name: &str| headers.iter().position(|h| h == name);
    let station_col = find("STATION").context("CSV has no STATION column")?;
    let date_col = find("DATE").context("CSV has no DATE column")?;
    let name_col = find("NAME");
    let element_cols: Vec<(usize, Element)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !METADATA_COLUMNS.contains(&h.as_str()) && !h.ends_with("_ATTRIBUTES"))
        .map(|(i, h)| (i, Element::parse(h)))
        .collect();

    let mut out = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        let station_id = clean_str(record.get(station_col).unwrap_or_default());
        if station.is_some_and(|s| s != station_id) {
            continue;
        }
        let raw_date = record.get(date_col).unwrap_or_default();
        let date = parse_obs_date(raw_date)
            .with_context(|| format!("unparseable DATE {:?} at record {}", raw_date, idx))?;

        let mut rec = WideRecord::new(station_id, date);
        rec.name = name_col
            .and_then(|i| record.get(i))
            .map(clean_str)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        for (i, element) in &element_cols {
            let cell = clean_str(record.get(*i).unwrap_or_default());
            if cell.is_empty() {
                if element.fills_zero() {
                    rec.values.insert(element.clone(), 0.0);
                }
                continue;
            }
            let v: f64 = cell.parse().with_context(|| {
                format!("non-numeric {} value {:?} at record {}", element, cell, idx)
            })?;
            rec.values.insert(element.clone(), v);
        }
        out.push(rec);
    }

    info!(records = out.len(), "loaded wide CSV");
    Ok(out)
}
