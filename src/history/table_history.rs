use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{ArrayRef, StringArray},
    datatypes::Schema as ArrowSchema,
    record_batch::RecordBatch,
};
use chrono::{NaiveDate, Utc};
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::{
    collections::HashSet,
    fs::{self, File},
    io::BufWriter,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;

/// A row in a history table.
/// - Defines schema, to_arrays, unique_key for writes.
/// - `KEY_COLUMN` lets existing files be scanned back into the dedupe set.
pub trait HistoryRow: Sized {
    /// Partition date for hive partitioning
    fn partition_date(&self) -> NaiveDate;
    /// Arrow schema for this row type
    fn schema() -> ArrowSchema;
    /// Column arrays matching the schema
    fn to_arrays(&self) -> Vec<ArrayRef>;
    /// Dedupe key
    fn unique_key(&self) -> String;
    /// Column index of the key in schema; must be Utf8
    const KEY_COLUMN: usize;

    fn extract_key(batch: &RecordBatch, row: usize) -> Result<String> {
        let arr = batch
            .column(Self::KEY_COLUMN)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| anyhow!("history key column {} is not Utf8", Self::KEY_COLUMN))?;
        Ok(arr.value(row).to_string())
    }
}

/// Generic hive-partitioned (`date=YYYYMMDD`) history table.
pub struct TableHistory<R: HistoryRow> {
    base_dir: PathBuf,
    table: String,
    schema: Arc<ArrowSchema>,
    seen: Mutex<HashSet<String>>,
    _marker: PhantomData<R>,
}

impl<R: HistoryRow> TableHistory<R> {
    /// Create the table directory and scan existing keys into `seen`.
    pub fn new(base_dir: impl Into<PathBuf>, table: &str) -> Result<Self> {
        let base_dir = base_dir.into();
        let table_dir = base_dir.join(table);
        fs::create_dir_all(&table_dir)
            .with_context(|| format!("could not create `{}`", table_dir.display()))?;

        let mut seen_set = HashSet::new();
        for path in partition_files(&table_dir)? {
            let file =
                File::open(&path).with_context(|| format!("failed to open `{}`", path.display()))?;
            let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
                .with_batch_size(1024)
                .build()?;
            for batch in reader {
                let batch = batch?;
                for i in 0..batch.num_rows() {
                    seen_set.insert(R::extract_key(&batch, i)?);
                }
            }
        }
        debug!(table, keys = seen_set.len(), "loaded history");

        Ok(Self {
            base_dir,
            table: table.to_string(),
            schema: Arc::new(R::schema()),
            seen: Mutex::new(seen_set),
            _marker: PhantomData,
        })
    }

    fn seen(&self) -> MutexGuard<'_, HashSet<String>> {
        self.seen.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Append a row; a key already present is a no-op. The key is only
    /// marked seen once its file is in place.
    pub fn add(&self, row: &R) -> Result<()> {
        let key = row.unique_key();
        if self.get(&key) {
            return Ok(());
        }

        let partition = format!("date={}", row.partition_date().format("%Y%m%d"));
        let dir = self.base_dir.join(&self.table).join(partition);
        fs::create_dir_all(&dir)?;

        let ts = Utc::now().timestamp_micros();
        let fname = format!("{}---{}.parquet", sanitize(&key), ts);
        let tmp = dir.join(format!("{}.tmp", fname));
        let final_path = dir.join(&fname);

        let file = File::create(&tmp)?;
        let mut writer = ArrowWriter::try_new(BufWriter::new(file), self.schema.clone(), None)?;
        let batch = RecordBatch::try_new(self.schema.clone(), row.to_arrays())?;
        writer.write(&batch)?;
        writer.close()?;
        fs::rename(&tmp, &final_path)?;
        self.seen().insert(key);
        Ok(())
    }

    pub fn get(&self, key: &str) -> bool {
        self.seen().contains(key)
    }

    /// Rewrite each partition as one consolidated file.
    pub fn vacuum(&self) -> Result<()> {
        let table_dir = self.base_dir.join(&self.table);
        for part in fs::read_dir(&table_dir)? {
            let part = part?;
            if !part.file_type()?.is_dir() {
                continue;
            }
            let dir = part.path();

            let files = glob(&format!("{}/*.parquet", dir.display()))?
                .filter_map(Result::ok)
                .collect::<Vec<_>>();
            if files.len() < 2 {
                continue;
            }

            let tmp = dir.join("consolidated.parquet.tmp");
            let file = File::create(&tmp)?;
            let mut writer = ArrowWriter::try_new(BufWriter::new(file), self.schema.clone(), None)?;
            for p in &files {
                let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(p)?)?
                    .with_batch_size(1024)
                    .build()?;
                for batch in reader {
                    writer.write(&batch?)?;
                }
            }
            writer.close()?;
            let cons = dir.join("consolidated.parquet");
            fs::rename(&tmp, &cons)?;

            for p in files {
                if p != cons {
                    fs::remove_file(p)?;
                }
            }
        }
        Ok(())
    }
}

fn partition_files(table_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for part in fs::read_dir(table_dir)? {
        let part = part?;
        if !part.file_type()?.is_dir() {
            continue;
        }
        for entry in glob(&format!("{}/*.parquet", part.path().display()))? {
            out.push(entry?);
        }
    }
    Ok(out)
}

/// Keys go into file names; the full key lives in the key column.
fn sanitize(key: &str) -> String {
    key.chars()
        .take(MAX_NAME_CHARS)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

const MAX_NAME_CHARS: usize = 96;
