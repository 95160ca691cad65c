// src/report/mod.rs

pub mod write;

use crate::duck;
use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use duckdb::Connection;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub use write::{write_parquet, write_partitioned_by_i32};

const CARS_PER_CITY_SQL: &str = "
    SELECT City, COUNT(*) AS num_electric_cars
    FROM electric_vehicles
    GROUP BY City
    ORDER BY num_electric_cars DESC;
";

const TOP_3_VEHICLES_SQL: &str = "
    SELECT Make, Model, COUNT(*) AS popularity
    FROM electric_vehicles
    GROUP BY Make, Model
    ORDER BY popularity DESC
    LIMIT 3;
";

const POPULAR_BY_POSTAL_CODE_SQL: &str = "
    SELECT Postal_Code, Make, Model, COUNT(*) AS popularity
    FROM electric_vehicles
    GROUP BY Postal_Code, Make, Model
    QUALIFY ROW_NUMBER() OVER (PARTITION BY Postal_Code ORDER BY popularity DESC) = 1;
";

const CARS_BY_MODEL_YEAR_SQL: &str = "
    SELECT Model_Year, COUNT(*) AS num_cars
    FROM electric_vehicles
    GROUP BY Model_Year
    ORDER BY num_cars DESC;
";

/// Rows shown in the per-report log preview.
const PREVIEW_ROWS: usize = 5;

/// Files produced by [`Reporter::run`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub cars_per_city: PathBuf,
    pub top_vehicles: PathBuf,
    pub popular_by_postal_code: PathBuf,
    pub cars_by_model_year: Vec<PathBuf>,
}

impl ReportSummary {
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        [
            &self.cars_per_city,
            &self.top_vehicles,
            &self.popular_by_postal_code,
        ]
        .into_iter()
        .chain(self.cars_by_model_year.iter())
    }
}

/// Aggregate reports over the `electric_vehicles` table.
pub struct Reporter<'c> {
    conn: &'c Connection,
    output_dir: PathBuf,
}

impl<'c> Reporter<'c> {
    /// Create a reporter writing under `output_dir`, creating the directory
    /// if needed.
    pub fn new(conn: &'c Connection, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating output directory {:?}", &output_dir))?;
        Ok(Self { conn, output_dir })
    }

    /// Registrations per city, most first.
    pub fn count_cars_per_city(&self) -> Result<RecordBatch> {
        duck::query_batch(self.conn, CARS_PER_CITY_SQL)
    }

    /// The three most common (make, model) pairs.
    pub fn top_3_most_popular_vehicles(&self) -> Result<RecordBatch> {
        duck::query_batch(self.conn, TOP_3_VEHICLES_SQL)
    }

    /// One row per postal code: its most common (make, model). Ties go to
    /// whichever row the engine ranks first.
    pub fn most_popular_vehicle_by_postal_code(&self) -> Result<RecordBatch> {
        duck::query_batch(self.conn, POPULAR_BY_POSTAL_CODE_SQL)
    }

    /// Registrations per model year, most first.
    pub fn count_cars_by_model_year(&self) -> Result<RecordBatch> {
        duck::query_batch(self.conn, CARS_BY_MODEL_YEAR_SQL)
    }

    /// Run every report and write it under the output directory. The model
    /// year report is split into one `model_year=<year>` directory per year.
    pub fn run(&self) -> Result<ReportSummary> {
        info!("Counting the number of electric cars per city...");
        let city_counts = self.count_cars_per_city()?;
        log_result(&city_counts);
        let cars_per_city = self.output_dir.join("electric_cars_per_city.parquet");
        write_parquet(&city_counts, &cars_per_city)?;

        info!("Finding the top 3 most popular electric vehicles...");
        let top = self.top_3_most_popular_vehicles()?;
        log_result(&top);
        let top_vehicles = self.output_dir.join("top_3_most_popular_vehicles.parquet");
        write_parquet(&top, &top_vehicles)?;

        info!("Finding the most popular electric vehicle in each postal code...");
        let by_postal = self.most_popular_vehicle_by_postal_code()?;
        log_result(&by_postal);
        let popular_by_postal_code = self.output_dir.join("popular_vehicle_by_postal_code.parquet");
        write_parquet(&by_postal, &popular_by_postal_code)?;

        info!("Counting the number of electric cars by model year...");
        let by_year = self.count_cars_by_model_year()?;
        log_result(&by_year);
        let cars_by_model_year = write_partitioned_by_i32(
            &by_year,
            "Model_Year",
            &self.output_dir,
            "model_year",
            "electric_cars",
        )?;

        let summary = ReportSummary {
            cars_per_city,
            top_vehicles,
            popular_by_postal_code,
            cars_by_model_year,
        };
        info!(
            files = summary.files().count(),
            output = %self.output_dir.display(),
            "reports written"
        );
        Ok(summary)
    }
}

/// Log the shape and first few rows of a report.
fn log_result(batch: &RecordBatch) {
    let head = batch.slice(0, batch.num_rows().min(PREVIEW_ROWS));
    match pretty_format_batches(&[head]) {
        Ok(table) => info!(
            "Result: ({}, {})\n{}\n",
            batch.num_rows(),
            batch.num_columns(),
            table
        ),
        Err(e) => warn!("could not format result preview: {}", e),
    }
}
