use anyhow::Result;
use arrow::array::{Array, Date32Array, Float64Array, Int32Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use ghcn_season::{
    batch::{run_batch, PartitionOutcome},
    config::BatchConfig,
    element::{Element, ElementSet},
    process::{convert_observations, pivot, RawObservation},
    read::InputFormat,
    season::seasonal,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{fs, path::Path};
use tempfile::tempdir;

fn read_all(path: &Path) -> Result<Vec<RecordBatch>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(fs::File::open(path)?)?.build()?;
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> &'a T {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {}", name))
        .as_any()
        .downcast_ref::<T>()
        .unwrap()
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn s1_snowfall_accumulates_across_new_year() {
    let raw = vec![
        RawObservation {
            station_id: "S1".into(),
            date: ymd(2019, 12, 31),
            element: Element::Snow,
            raw_value: "50".into(),
        },
        RawObservation {
            station_id: "S1".into(),
            date: ymd(2020, 1, 1),
            element: Element::Snow,
            raw_value: "25".into(),
        },
    ];
    let (converted, dropped) = convert_observations(raw);
    assert_eq!(dropped, 0);

    let wide = pivot(converted, &ElementSet::new([Element::Snow]));
    let out = seasonal(wide, (None, None));

    let snow: Vec<f64> = out
        .iter()
        .map(|r| r.aggregated.seasoned.record.snow())
        .collect();
    let years: Vec<i32> = out.iter().map(|r| r.aggregated.seasoned.winter_year).collect();
    let cumulative: Vec<f64> = out.iter().map(|r| r.aggregated.cumulative_snow).collect();
    assert_eq!(snow, vec![1.97, 0.98]);
    assert_eq!(years, vec![2020, 2020]);
    assert_eq!(cumulative, vec![1.97, 2.95]);
    assert_eq!(out[0].normalized_date, ymd(1999, 12, 31));
}

/// Long-format CSV partition with a header row.
fn write_partition(root: &Path, year: i32, body: &str) {
    let dir = root.join(format!("YEAR={}", year));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("part-0.csv"), format!("ID,DATE,ELEMENT,DATA_VALUE\n{}", body)).unwrap();
}

fn config(input: &Path, output: &Path) -> BatchConfig {
    BatchConfig {
        input_root: input.to_path_buf(),
        input_format: InputFormat::Csv,
        output_root: output.to_path_buf(),
        year_range: [2020, 2020],
        concurrency_limit: Some(2),
        tracked_elements: vec![Element::Snow, Element::Tmax],
        with_seasons: true,
        ..BatchConfig::default()
    }
}

#[test]
fn batch_writes_seasonal_partition_and_reruns_identically() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    write_partition(
        input.path(),
        2020,
        "S1,20200101,SNOW,25\n\
         S1,20200101,SNOW,999\n\
         S1,20200101,TMAX,-17\n\
         S1,20200102,SNOW,\n\
         S1,20200102,PRCP,12\n\
         S1,20200103,SNOW,abc\n\
         S1,20200705,SNOW,10\n",
    );

    let cfg = config(input.path(), output.path());
    let summary = run_batch(&cfg)?.into_result()?;
    assert_eq!(summary.done().count(), 1);
    let path = match &summary.partitions[0].outcome {
        PartitionOutcome::Done {
            rows,
            dropped_rows,
            path,
        } => {
            assert_eq!(*rows, 3);
            assert_eq!(*dropped_rows, 1);
            path.clone()
        }
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(path, output.path().join("YEAR=2020").join("data.parquet"));

    let batches = read_all(&path)?;
    assert_eq!(batches.len(), 1);
    let b = &batches[0];
    let names: Vec<&str> = b.schema_ref().fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec![
            "ID",
            "DATE",
            "SNOW",
            "TMAX",
            "WINTER_YEAR",
            "WINTER_SEASON_START",
            "CUMULATIVE_SNOW",
            "NORMALIZED_DATE"
        ]
    );

    let ids = column::<StringArray>(b, "ID");
    assert!((0..b.num_rows()).all(|i| ids.value(i) == "S1"));

    // first reading of the day wins; empty SNOW is zero
    let snow = column::<Float64Array>(b, "SNOW");
    assert_eq!(snow.values().to_vec(), vec![0.98, 0.0, 0.39]);
    let tmax = column::<Float64Array>(b, "TMAX");
    assert_eq!(tmax.value(0), 28.94);
    assert!(tmax.is_null(1));

    let wy = column::<Int32Array>(b, "WINTER_YEAR");
    assert_eq!(wy.values().to_vec(), vec![2020, 2020, 2021]);
    let cum = column::<Float64Array>(b, "CUMULATIVE_SNOW");
    assert_eq!(cum.values().to_vec(), vec![0.98, 0.98, 0.39]);
    let start = column::<Date32Array>(b, "WINTER_SEASON_START");
    assert_eq!(start.value_as_date(2), Some(ymd(2020, 7, 1)));
    let norm = column::<Date32Array>(b, "NORMALIZED_DATE");
    assert_eq!(norm.value_as_date(2), Some(ymd(1999, 7, 5)));

    let first = fs::read(&path)?;
    let again = run_batch(&cfg)?.into_result()?;
    assert_eq!(again.done().count(), 1);
    assert_eq!(fs::read(&path)?, first);
    Ok(())
}

#[test]
fn resume_skips_partitions_already_written() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    write_partition(input.path(), 2020, "S1,20200101,SNOW,25\n");

    let mut cfg = config(input.path(), output.path());
    cfg.resume = true;
    assert_eq!(run_batch(&cfg)?.done().count(), 1);

    let second = run_batch(&cfg)?;
    assert_eq!(second.skipped().count(), 1);
    assert_eq!(second.done().count(), 0);
    assert!(second.into_result().is_ok());
    Ok(())
}

#[test]
fn resume_reruns_when_station_prefix_changes() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    write_partition(
        input.path(),
        2020,
        "S1,20200101,SNOW,25\nX1,20200101,SNOW,50\n",
    );
    let path = output.path().join("YEAR=2020").join("data.parquet");

    let mut cfg = config(input.path(), output.path());
    cfg.resume = true;
    cfg.station_prefix = Some("S".into());
    assert_eq!(run_batch(&cfg)?.done().count(), 1);
    assert_eq!(read_all(&path)?[0].num_rows(), 1);

    cfg.station_prefix = None;
    let widened = run_batch(&cfg)?;
    assert_eq!(widened.done().count(), 1);
    assert_eq!(widened.skipped().count(), 0);
    let batches = read_all(&path)?;
    let ids = column::<StringArray>(&batches[0], "ID");
    let mut seen: Vec<&str> = (0..ids.len()).map(|i| ids.value(i)).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec!["S1", "X1"]);
    Ok(())
}
