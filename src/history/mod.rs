// src/history/mod.rs
pub mod partition_run;
pub mod table_history;

pub use partition_run::{layout_fingerprint, run_fingerprint, run_key, PartitionRunRow};
pub use table_history::{HistoryRow, TableHistory};

/// Directory under the output root holding run history tables.
pub const HISTORY_DIR: &str = "_history";
