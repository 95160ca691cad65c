use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use duckdb::Connection;
use std::{fs, path::Path};
use tracing::debug;

/// Open a DuckDB database on disk at `path`, creating the file (and its
/// parent directory) if it doesn't exist.
pub fn open_disk_db<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("opening DuckDB database {}", path.display()))?;
    Ok(conn)
}

/// Open a DuckDB in‐memory database
pub fn open_mem_db() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory DuckDB")?;
    Ok(conn)
}

/// `SELECT COUNT(*)` over `table`.
pub fn count_rows(conn: &Connection, table: &str) -> duckdb::Result<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |r| r.get(0))
}

/// Run `sql` and collect the whole result into a single Arrow batch.
///
/// The schema is taken from the statement, so an empty result still carries
/// its column names and types.
pub fn query_batch(conn: &Connection, sql: &str) -> Result<RecordBatch> {
    debug!(sql = sql.trim(), "running query");
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("preparing query: {}", sql.trim()))?;
    let arrow = stmt
        .query_arrow([])
        .with_context(|| format!("executing query: {}", sql.trim()))?;
    let schema: SchemaRef = arrow.get_schema();
    let batches: Vec<RecordBatch> = arrow.collect();

    concat_batches(&schema, &batches).context("concatenating query result batches")
}
