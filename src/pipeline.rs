// src/pipeline.rs

use crate::duck;
use crate::error::LoadError;
use crate::load::{LoadMode, VehicleLoader, DEFAULT_BATCH_SIZE};
use crate::report::{ReportSummary, Reporter};
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::info;

/// Everything one load-and-report run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub output_dir: PathBuf,
    pub batch_size: usize,
    pub load_mode: LoadMode,
    /// Delete an existing database file first, so the row-count check runs
    /// against this extract only.
    pub fresh: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("data/Electric_Vehicle_Population_Data.csv"),
            db_path: PathBuf::from("db/electric_vehicles.duckdb"),
            output_dir: PathBuf::from("analytics_output"),
            batch_size: DEFAULT_BATCH_SIZE,
            load_mode: LoadMode::Batched,
            fresh: false,
        }
    }
}

/// Load the CSV into the database, then write every report.
///
/// One connection is held for the whole run and closed on return.
pub fn run(config: &PipelineConfig) -> Result<ReportSummary> {
    let start = Instant::now();

    if !config.csv_path.is_file() {
        return Err(LoadError::FileNotFound(config.csv_path.clone()).into());
    }

    if config.fresh {
        remove_database(&config.db_path)?;
    }

    let mut conn = duck::open_disk_db(&config.db_path)?;
    info!(db = %config.db_path.display(), "database open");

    let rows = VehicleLoader::new(&mut conn, &config.csv_path, config.batch_size)?
        .run(config.load_mode)
        .with_context(|| format!("loading {}", config.csv_path.display()))?;
    info!(rows, "load complete");

    let summary = Reporter::new(&conn, &config.output_dir)?.run()?;

    conn.close()
        .map_err(|(_, e)| e)
        .context("closing database")?;
    info!(elapsed = ?start.elapsed(), "all done");
    Ok(summary)
}

/// Delete the database file and its write-ahead log, if present.
fn remove_database(db_path: &Path) -> Result<()> {
    let mut wal = db_path.as_os_str().to_owned();
    wal.push(".wal");
    for path in [db_path.to_path_buf(), PathBuf::from(wal)] {
        if path.exists() {
            info!(path = %path.display(), "removing existing database file");
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
    }
    Ok(())
}
