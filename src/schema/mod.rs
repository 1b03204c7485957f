pub mod arrow;
pub mod write;

pub use arrow::{build_arrow_schema, monthly_record_batch, to_record_batch, OutputLayout, OutputRows};
pub use write::{write_parquet_atomic, ParquetSink, PartitionSink};
