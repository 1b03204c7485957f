use anyhow::Result;
use arrow::{
    array::{ArrayRef, Int32Array, StringArray, TimestampMicrosecondArray, UInt64Array},
    datatypes::{DataType as ArrowDataType, Field, Schema as ArrowSchema, TimeUnit},
};
use chrono::{DateTime, NaiveDate, Utc};
use std::{path::PathBuf, sync::Arc};

use crate::history::table_history::{HistoryRow, TableHistory};
use crate::read::ScanFilter;
use crate::schema::OutputLayout;

/// One successfully written year-partition.
pub struct PartitionRunRow {
    pub year: i32,
    /// Fingerprint of input, filter and output columns; any change is not a resume hit.
    pub fingerprint: String,
    pub rows: u64,
    pub output_path: String,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

/// Dedupe key for `year` written under `fingerprint`.
pub fn run_key(year: i32, fingerprint: &str) -> String {
    format!("{}|{}", year, fingerprint)
}

/// Everything that decides a partition's content: where rows are read
/// from, which stations survive the scan, and which columns are written.
pub fn run_fingerprint(source_identity: &str, filter: &ScanFilter, layout: &OutputLayout) -> String {
    format!(
        "{}|prefix={}|{}",
        source_identity,
        filter.station_prefix.as_deref().unwrap_or("*"),
        layout_fingerprint(layout)
    )
}

/// Stable string describing which columns a layout produces.
pub fn layout_fingerprint(layout: &OutputLayout) -> String {
    let elements: Vec<&str> = layout.elements.iter().map(|e| e.as_str()).collect();
    format!(
        "{}{}{}",
        elements.join(","),
        if layout.with_name { "+name" } else { "" },
        if layout.with_seasons { "+seasons" } else { "" }
    )
}

impl HistoryRow for PartitionRunRow {
    const KEY_COLUMN: usize = 0;

    fn partition_date(&self) -> NaiveDate {
        self.finished.date_naive()
    }

    fn schema() -> ArrowSchema {
        ArrowSchema::new(vec![
            Field::new("run_key", ArrowDataType::Utf8, false),
            Field::new("year", ArrowDataType::Int32, false),
            Field::new("rows", ArrowDataType::UInt64, false),
            Field::new("output_path", ArrowDataType::Utf8, false),
            Field::new(
                "started",
                ArrowDataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
            Field::new(
                "finished",
                ArrowDataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
        ])
    }

    fn to_arrays(&self) -> Vec<ArrayRef> {
        vec![
            Arc::new(StringArray::from(vec![self.unique_key()])),
            Arc::new(Int32Array::from(vec![self.year])),
            Arc::new(UInt64Array::from(vec![self.rows])),
            Arc::new(StringArray::from(vec![self.output_path.clone()])),
            Arc::new(TimestampMicrosecondArray::from(vec![self
                .started
                .timestamp_micros()])),
            Arc::new(TimestampMicrosecondArray::from(vec![self
                .finished
                .timestamp_micros()])),
        ]
    }

    fn unique_key(&self) -> String {
        run_key(self.year, &self.fingerprint)
    }
}

impl TableHistory<PartitionRunRow> {
    pub fn new_partition_runs(base: impl Into<PathBuf>) -> Result<Self> {
        TableHistory::new(base, "partition_runs")
    }
}
