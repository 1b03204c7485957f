// src/schema/write.rs

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::PartitionError;
use crate::schema::arrow::{to_record_batch, OutputLayout, OutputRows};

/// Destination for one partition's rows. Implementations must be safe to call
/// from several workers at once for *different* partitions.
pub trait PartitionSink: Send + Sync {
    /// Persist the rows of `year`, returning where they went.
    fn write_partition(
        &self,
        year: i32,
        rows: &OutputRows,
        layout: &OutputLayout,
    ) -> Result<PathBuf, PartitionError>;
}

/// Writes `<output_root>/YEAR=<year>/data.parquet`.
#[derive(Debug, Clone)]
pub struct ParquetSink {
    output_root: PathBuf,
}

impl ParquetSink {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn partition_path(&self, year: i32) -> PathBuf {
        self.output_root
            .join(format!("YEAR={}", year))
            .join("data.parquet")
    }
}

impl PartitionSink for ParquetSink {
    fn write_partition(
        &self,
        year: i32,
        rows: &OutputRows,
        layout: &OutputLayout,
    ) -> Result<PathBuf, PartitionError> {
        let path = self.partition_path(year);
        let batch = to_record_batch(rows, layout).map_err(|source| PartitionError::Write {
            path: path.clone(),
            source,
        })?;
        write_parquet_atomic(&path, &batch).map_err(|source| PartitionError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_dictionary_enabled(true)
        .build()
}

/// Write one batch to `<path>.tmp`, then rename over `path`, so readers never
/// see a half-written file and a re-run simply replaces the old output.
pub fn write_parquet_atomic(path: &Path, batch: &RecordBatch) -> Result<u64> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    }
    let tmp = path.with_extension("parquet.tmp");

    let file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(writer_properties()))
        .context("creating Arrow writer")?;
    writer.write(batch).context("writing batch")?;
    writer.close().context("closing Parquet writer")?;

    fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;

    let bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    debug!(path = %path.display(), rows = batch.num_rows(), bytes, "wrote parquet");
    Ok(bytes)
}
