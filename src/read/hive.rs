// src/read/hive.rs

use anyhow::{anyhow, Context};
use arrow::{
    array::{Array, ArrayRef, StringArray},
    compute::cast,
    datatypes::DataType,
    record_batch::RecordBatch,
};
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, trace};

use crate::element::Element;
use crate::error::PartitionError;
use crate::process::date_parser::parse_obs_date;
use crate::process::utils::{clean_str, hive_segment};
use crate::process::RawObservation;
use crate::read::{InputFormat, ObservationSource, ScanFilter};

/// GHCN by-year column order for CSVs without a header row.
const POSITIONAL: ColumnMap = ColumnMap {
    id: 0,
    date: 1,
    element: Some(2),
    value: 3,
};

/// Reads `root/YEAR=<y>/**/*.{parquet,csv}` or a flat `root/<y>.csv`.
#[derive(Debug, Clone)]
pub struct HiveSource {
    root: PathBuf,
    format: InputFormat,
}

impl HiveSource {
    pub fn new(root: impl Into<PathBuf>, format: InputFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn wants(&self, ext: &str) -> bool {
        match self.format {
            InputFormat::Parquet => ext == "parquet",
            InputFormat::Csv => ext == "csv",
            InputFormat::Auto => ext == "parquet" || ext == "csv",
        }
    }

    /// Input files for `year`, sorted by full path.
    pub fn partition_files(&self, year: i32) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let dir = self.root.join(format!("YEAR={}", year));
        if dir.is_dir() {
            for ext in ["parquet", "csv"] {
                if !self.wants(ext) {
                    continue;
                }
                let pattern = format!("{}/**/*.{}", dir.display(), ext);
                for entry in glob(&pattern).context("invalid glob pattern")? {
                    files.push(entry?);
                }
            }
        }

        let flat = self.root.join(format!("{}.csv", year));
        if self.wants("csv") && flat.is_file() {
            files.push(flat);
        }

        files.sort();
        Ok(files)
    }

    /// Years that have input under the root, ascending.
    pub fn available_years(&self) -> anyhow::Result<Vec<i32>> {
        let mut years = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("reading input root {}", self.root.display()))?
        {
            let path = entry?.path();
            let year = if path.is_dir() {
                hive_segment(&path, "YEAR").and_then(|y| y.parse().ok())
            } else if path.extension().and_then(|e| e.to_str()) == Some("csv") && self.wants("csv") {
                path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse().ok())
            } else {
                None
            };
            if let Some(y) = year {
                years.push(y);
            }
        }
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }
}

impl ObservationSource for HiveSource {
    #[instrument(level = "debug", skip(self, filter), fields(root = %self.root.display()))]
    fn scan(&self, year: i32, filter: &ScanFilter) -> Result<Vec<RawObservation>, PartitionError> {
        let files = self.partition_files(year).map_err(|source| PartitionError::Read {
            path: self.root.clone(),
            source,
        })?;
        if files.is_empty() {
            return Err(PartitionError::MissingInput {
                year,
                root: self.root.clone(),
            });
        }

        let mut rows = Vec::new();
        for path in &files {
            // hive-level element pruning
            if let Some(code) = hive_segment(path, "ELEMENT") {
                if !filter.elements.contains(&Element::parse(code)) {
                    trace!(path = %path.display(), "skipping untracked element");
                    continue;
                }
            }
            let before = rows.len();
            match path.extension().and_then(|e| e.to_str()) {
                Some("parquet") => read_parquet_file(path, filter, &mut rows)?,
                _ => read_csv_file(path, filter, &mut rows)?,
            }
            debug!(path = %path.display(), rows = rows.len() - before, "scanned file");
        }
        Ok(rows)
    }

    fn identity(&self) -> String {
        format!("hive:{}:{:?}", self.root.display(), self.format)
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    id: usize,
    date: usize,
    element: Option<usize>,
    value: usize,
}

impl ColumnMap {
    fn from_names<'a>(names: impl Iterator<Item = &'a str>) -> Option<Self> {
        let mut id = None;
        let mut date = None;
        let mut element = None;
        let mut value = None;
        for (i, name) in names.enumerate() {
            match clean_str(name).to_ascii_uppercase().as_str() {
                "ID" | "STATION" => id = id.or(Some(i)),
                "DATE" => date = Some(i),
                "ELEMENT" => element = Some(i),
                "DATA_VALUE" => value = Some(i),
                _ => {}
            }
        }
        Some(Self {
            id: id?,
            date: date?,
            element,
            value: value?,
        })
    }
}

/// Turn one row's cells into an observation, or `None` when the filter drops it.
fn build_row(
    path: &Path,
    row: usize,
    station: &str,
    date: &str,
    element: Option<&str>,
    value: &str,
    filter: &ScanFilter,
) -> Result<Option<RawObservation>, PartitionError> {
    let station = clean_str(station);
    if !filter.keeps_station(station) {
        return Ok(None);
    }
    let code = element
        .map(clean_str)
        .or_else(|| hive_segment(path, "ELEMENT"))
        .ok_or_else(|| PartitionError::Malformed {
            path: path.to_path_buf(),
            row,
            reason: "no ELEMENT column or ELEMENT= path segment".into(),
        })?;
    let element = Element::parse(code);
    if !filter.elements.contains(&element) {
        return Ok(None);
    }
    let date = parse_obs_date(clean_str(date)).ok_or_else(|| PartitionError::Malformed {
        path: path.to_path_buf(),
        row,
        reason: format!("unparseable DATE {:?}", date),
    })?;
    Ok(Some(RawObservation {
        station_id: station.to_string(),
        date,
        element,
        raw_value: value.to_string(),
    }))
}

fn read_csv_file(
    path: &Path,
    filter: &ScanFilter,
    out: &mut Vec<RawObservation>,
) -> Result<(), PartitionError> {
    let read_err = |source: anyhow::Error| PartitionError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| read_err(e.into()))?;

    let mut columns: Option<ColumnMap> = None;
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| PartitionError::Malformed {
            path: path.to_path_buf(),
            row: idx,
            reason: e.to_string(),
        })?;

        let map = match columns {
            Some(m) => m,
            None => {
                let first = record.get(0).map(clean_str).unwrap_or_default();
                if first.eq_ignore_ascii_case("ID") || first.eq_ignore_ascii_case("STATION") {
                    columns = Some(ColumnMap::from_names(record.iter()).ok_or_else(|| {
                        PartitionError::Malformed {
                            path: path.to_path_buf(),
                            row: idx,
                            reason: "header lacks ID/STATION, DATE or DATA_VALUE".into(),
                        }
                    })?);
                    continue;
                }
                columns = Some(POSITIONAL);
                POSITIONAL
            }
        };

        let cell = |i: usize| record.get(i).unwrap_or_default();
        if let Some(obs) = build_row(
            path,
            idx,
            cell(map.id),
            cell(map.date),
            map.element.map(cell),
            cell(map.value),
            filter,
        )? {
            out.push(obs);
        }
    }
    Ok(())
}

/// Any column type rendered as strings; nulls become empty.
fn as_strings(col: &ArrayRef) -> anyhow::Result<StringArray> {
    let utf8 = cast(col, &DataType::Utf8)?;
    utf8.as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| anyhow!("cast to Utf8 did not produce a StringArray"))
}

fn text_at(a: &StringArray, row: usize) -> &str {
    if a.is_null(row) {
        ""
    } else {
        a.value(row)
    }
}

fn read_parquet_file(
    path: &Path,
    filter: &ScanFilter,
    out: &mut Vec<RawObservation>,
) -> Result<(), PartitionError> {
    let read_err = |source: anyhow::Error| PartitionError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|e| read_err(e.into()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| read_err(e.into()))?;
    let columns = ColumnMap::from_names(
        builder.schema().fields().iter().map(|f| f.name().as_str()),
    )
    .ok_or_else(|| PartitionError::Malformed {
        path: path.to_path_buf(),
        row: 0,
        reason: "schema lacks ID/STATION, DATE or DATA_VALUE".into(),
    })?;
    let reader = builder
        .with_batch_size(8192)
        .build()
        .map_err(|e| read_err(e.into()))?;

    let mut offset = 0usize;
    for batch in reader {
        let batch: RecordBatch = batch.map_err(|e| read_err(e.into()))?;
        let strings = |i: usize| as_strings(batch.column(i)).map_err(read_err);
        let ids = strings(columns.id)?;
        let dates = strings(columns.date)?;
        let values = strings(columns.value)?;
        let elements = columns.element.map(strings).transpose()?;

        for row in 0..batch.num_rows() {
            if let Some(obs) = build_row(
                path,
                offset + row,
                text_at(&ids, row),
                text_at(&dates, row),
                elements.as_ref().map(|a| text_at(a, row)),
                text_at(&values, row),
                filter,
            )? {
                out.push(obs);
            }
        }
        offset += batch.num_rows();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementSet;
    use arrow::array::Int64Array;
    use arrow::datatypes::{Field, Schema};
    use chrono::NaiveDate;
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn filter() -> ScanFilter {
        ScanFilter {
            elements: ElementSet::default(),
            station_prefix: None,
        }
    }

    fn write(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn reads_headered_and_positional_csv_in_path_order() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("YEAR=2020");
        write(
            &dir.join("b.csv"),
            "USC001,20200101,SNOW,25,,,,\nUSC001,20200101,TMAX,-33,,,,\n",
        );
        write(
            &dir.join("a.csv"),
            "ID,DATE,ELEMENT,DATA_VALUE\nUSC001,2020-01-01,SNOW,50\n",
        );

        let src = HiveSource::new(tmp.path(), InputFormat::Csv);
        let rows = src.scan(2020, &filter()).unwrap();
        let got: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.element.as_str(), r.raw_value.as_str()))
            .collect();
        assert_eq!(got, vec![("SNOW", "50"), ("SNOW", "25"), ("TMAX", "-33")]);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }

    #[test]
    fn flat_by_year_csv_and_station_prefix() {
        let tmp = tempdir().unwrap();
        write(
            &tmp.path().join("1999.csv"),
            "USC001,19990105,PRCP,12\nCA0001,19990105,PRCP,7\nUSC001,19990105,EVAP,3\n",
        );
        let src = HiveSource::new(tmp.path(), InputFormat::Auto);
        let f = ScanFilter {
            station_prefix: Some("US".into()),
            ..filter()
        };
        let rows = src.scan(1999, &f).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].station_id, "USC001");
        assert_eq!(src.available_years().unwrap(), vec![1999]);
    }

    #[test]
    fn missing_year_is_missing_input() {
        let tmp = tempdir().unwrap();
        let src = HiveSource::new(tmp.path(), InputFormat::Auto);
        let err = src.scan(1850, &filter()).unwrap_err();
        assert!(matches!(err, PartitionError::MissingInput { year: 1850, .. }));
    }

    #[test]
    fn bad_date_is_malformed() {
        let tmp = tempdir().unwrap();
        write(&tmp.path().join("YEAR=2001/x.csv"), "S1,2001/01/01,SNOW,3\n");
        let src = HiveSource::new(tmp.path(), InputFormat::Csv);
        let err = src.scan(2001, &filter()).unwrap_err();
        assert!(matches!(err, PartitionError::Malformed { row: 0, .. }));
    }

    #[test]
    fn parquet_takes_element_from_hive_path() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let schema = Arc::new(Schema::new(vec![
            Field::new("ID", DataType::Utf8, false),
            Field::new("DATE", DataType::Utf8, false),
            Field::new("DATA_VALUE", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["USW1", "USW1"])),
                Arc::new(StringArray::from(vec!["20200101", "20200102"])),
                Arc::new(Int64Array::from(vec![Some(50), None])),
            ],
        )?;
        for element in ["SNOW", "WT01"] {
            let dir = tmp.path().join("YEAR=2020").join(format!("ELEMENT={}", element));
            fs::create_dir_all(&dir)?;
            let mut w = ArrowWriter::try_new(File::create(dir.join("part-0.parquet"))?, schema.clone(), None)?;
            w.write(&batch)?;
            w.close()?;
        }

        let src = HiveSource::new(tmp.path(), InputFormat::Parquet);
        let rows = src.scan(2020, &filter())?;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.element == Element::Snow));
        assert_eq!(rows[0].raw_value, "50");
        assert_eq!(rows[1].raw_value, "");
        Ok(())
    }
}
