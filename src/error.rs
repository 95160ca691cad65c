use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("the file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("row count mismatch: (CSV: {csv_rows}, DB: {db_rows})")]
    RowCountMismatch { csv_rows: u64, db_rows: u64 },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Database(#[from] duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
