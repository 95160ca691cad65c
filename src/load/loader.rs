// src/load/loader.rs

use crate::duck;
use crate::error::LoadError;
use csv::ReaderBuilder;
use duckdb::Connection;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, error, info};

use super::record::VehicleRecord;
use super::schema::{create_table_sql, TABLE_NAME};

pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// How the CSV gets into the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Parse in Rust, insert in batches inside one transaction.
    #[default]
    Batched,
    /// Hand the file to DuckDB's `COPY ... (AUTO_DETECT TRUE)`.
    BulkCopy,
}

/// Creates the `electric_vehicles` table and fills it from a CSV extract.
pub struct VehicleLoader<'c> {
    conn: &'c mut Connection,
    csv_path: PathBuf,
    batch_size: usize,
}

impl<'c> VehicleLoader<'c> {
    /// Fails before touching the database if `csv_path` is not a file or
    /// `batch_size` is zero.
    pub fn new(
        conn: &'c mut Connection,
        csv_path: impl Into<PathBuf>,
        batch_size: usize,
    ) -> Result<Self, LoadError> {
        let csv_path = csv_path.into();
        if !csv_path.is_file() {
            return Err(LoadError::FileNotFound(csv_path));
        }
        if batch_size == 0 {
            return Err(LoadError::InvalidBatchSize);
        }
        Ok(Self {
            conn,
            csv_path,
            batch_size,
        })
    }

    pub fn create_table(&self) -> Result<(), LoadError> {
        info!("Creating {} table...", TABLE_NAME);
        self.conn.execute_batch(&create_table_sql())?;
        info!("Table creation completed");
        Ok(())
    }

    /// Stream the CSV into the table in batches of `batch_size` rows, all
    /// inside a single transaction. Any failure rolls back every batch.
    ///
    /// Returns the number of rows inserted.
    #[tracing::instrument(level = "info", skip(self), fields(path = %self.csv_path.display(), batch_size = self.batch_size))]
    pub fn load_data(&mut self) -> Result<u64, LoadError> {
        info!("Starting data load process for table: {}", TABLE_NAME);
        let start = Instant::now();

        let tx = self.conn.transaction()?;
        let result = insert_batches(&tx, &self.csv_path, self.batch_size);

        match result {
            Ok(rows) => {
                tx.commit()?;
                info!(
                    elapsed = ?start.elapsed(),
                    "Data loaded, {} rows total",
                    rows
                );
                Ok(rows)
            }
            Err(e) => {
                error!("Error loading data: {}", e);
                if let Err(rb) = tx.rollback() {
                    error!("rollback failed: {}", rb);
                }
                Err(e)
            }
        }
    }

    /// Load with DuckDB's own CSV reader. Kept alongside [`Self::load_data`]
    /// for comparing throughput; columns are matched by position.
    #[tracing::instrument(level = "info", skip(self), fields(path = %self.csv_path.display()))]
    pub fn load_bulk_copy(&self) -> Result<(), LoadError> {
        info!("Starting built-in data load process...");
        let start = Instant::now();
        let path = self.csv_path.to_string_lossy().replace('\'', "''");
        let sql = format!("COPY {} FROM '{}' (AUTO_DETECT TRUE);", TABLE_NAME, path);
        debug!(sql = %sql, "bulk copy");
        self.conn.execute_batch(&sql)?;
        info!(elapsed = ?start.elapsed(), "Data loaded");
        Ok(())
    }

    /// Compare the CSV data-row count with the table row count. Runs after
    /// commit, so a mismatch is reported but nothing is undone.
    pub fn validate_load(&self) -> Result<u64, LoadError> {
        info!("Validating data load...");
        let csv_rows = count_csv_records(&self.csv_path)?;
        let db_rows = duck::count_rows(&*self.conn, TABLE_NAME)? as u64;

        if csv_rows != db_rows {
            return Err(LoadError::RowCountMismatch { csv_rows, db_rows });
        }
        info!(
            "Validation successful. Row count matches (CSV: {}, DB: {})",
            csv_rows, db_rows
        );
        Ok(db_rows)
    }

    /// `create_table`, load, then `validate_load`.
    pub fn run(&mut self, mode: LoadMode) -> Result<u64, LoadError> {
        self.create_table()?;
        match mode {
            LoadMode::Batched => {
                self.load_data()?;
            }
            LoadMode::BulkCopy => self.load_bulk_copy()?,
        }
        self.validate_load()
    }
}

fn insert_batches(conn: &Connection, csv_path: &Path, batch_size: usize) -> Result<u64, LoadError> {
    let file = File::open(csv_path)?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut appender = conn.appender(TABLE_NAME)?;
    let mut records = rdr.deserialize::<VehicleRecord>();
    let mut batch: Vec<VehicleRecord> = Vec::with_capacity(batch_size);
    let mut rows_processed: u64 = 0;

    loop {
        batch.clear();
        for rec in records.by_ref().take(batch_size) {
            batch.push(rec?);
        }
        if batch.is_empty() {
            break;
        }

        appender.append_rows(batch.iter().map(|rec| rec.params()))?;
        appender.flush()?;
        rows_processed += batch.len() as u64;
        info!("Processed {} rows", rows_processed);
    }

    Ok(rows_processed)
}

/// Data records in the CSV, header excluded.
fn count_csv_records(csv_path: &Path) -> Result<u64, LoadError> {
    let file = File::open(csv_path)?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut n = 0u64;
    let mut record = csv::ByteRecord::new();
    while rdr.read_byte_record(&mut record)? {
        n += 1;
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    const SAMPLE_CSV: &str = r#"VIN (1-10),County,City,State,Postal Code,Model Year,Make,Model,Electric Vehicle Type,Clean Alternative Fuel Vehicle (CAFV) Eligibility,Electric Range,Base MSRP,Legislative District,DOL Vehicle ID,Vehicle Location,Electric Utility,2020 Census Tract
5YJ3E1EB4L,Yakima,Yakima,WA,98908,2020,TESLA,MODEL 3,Battery Electric Vehicle (BEV),Clean Alternative Fuel Vehicle Eligible,322,0,14,127175366,POINT (-120.56916 46.58514),PACIFICORP,53077000904
5YJ3E1EA7K,San Diego,San Diego,CA,92101,2019,TESLA,MODEL 3,Battery Electric Vehicle (BEV),Clean Alternative Fuel Vehicle Eligible,220,0,,266614659,POINT (-117.16171 32.71568),,06073005102
7JRBR0FL9M,Lane,Eugene,OR,97404,2021,VOLVO,S60,Plug-in Hybrid Electric Vehicle (PHEV),Not eligible due to low battery range,22,0,,144502018,POINT (-123.12802 44.09573),,41039002401
"#;

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,evreport::load=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn write_csv(content: &str) -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        Ok(tmp)
    }

    #[test]
    fn missing_file_fails_before_any_database_work() -> Result<()> {
        let mut conn = duck::open_mem_db()?;
        let err = VehicleLoader::new(&mut conn, "does/not/exist.csv", 10)
            .err()
            .expect("missing file must be rejected");
        assert!(matches!(err, LoadError::FileNotFound(_)));

        let tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'electric_vehicles'",
            [],
            |r| r.get(0),
        )?;
        assert_eq!(tables, 0);
        Ok(())
    }

    #[test]
    fn zero_batch_size_is_rejected() -> Result<()> {
        let tmp = write_csv(SAMPLE_CSV)?;
        let mut conn = duck::open_mem_db()?;
        let err = VehicleLoader::new(&mut conn, tmp.path(), 0).err();
        assert!(matches!(err, Some(LoadError::InvalidBatchSize)));
        Ok(())
    }

    #[test]
    fn run_loads_every_row_and_validates() -> Result<()> {
        init_test_logging();
        let tmp = write_csv(SAMPLE_CSV)?;
        let mut conn = duck::open_mem_db()?;

        let rows = VehicleLoader::new(&mut conn, tmp.path(), 1)?.run(LoadMode::Batched)?;
        assert_eq!(rows, 3);
        assert_eq!(duck::count_rows(&conn, TABLE_NAME)?, 3);
        Ok(())
    }

    #[test]
    fn stored_values_keep_their_types() -> Result<()> {
        let tmp = write_csv(SAMPLE_CSV)?;
        let mut conn = duck::open_mem_db()?;
        VehicleLoader::new(&mut conn, tmp.path(), 2)?.run(LoadMode::Batched)?;

        let (year, district, msrp): (i32, String, i32) = conn.query_row(
            "SELECT Model_Year, Legislative_District, Base_MSRP FROM electric_vehicles WHERE VIN = '5YJ3E1EB4L'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;
        assert_eq!(year, 2020);
        assert_eq!(district, "14");
        assert_eq!(msrp, 0);

        let (district, utility, dol_id): (Option<String>, Option<String>, i64) = conn.query_row(
            "SELECT Legislative_District, Electric_Utility, DOL_Vehicle_ID FROM electric_vehicles WHERE VIN = '5YJ3E1EA7K'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;
        assert_eq!(district, None);
        assert_eq!(utility, None);
        assert_eq!(dol_id, 266614659);

        let tract: String = conn.query_row(
            "SELECT Census_Tract FROM electric_vehicles WHERE VIN = '5YJ3E1EA7K'",
            [],
            |r| r.get(0),
        )?;
        assert_eq!(tract, "06073005102");
        Ok(())
    }

    #[test]
    fn non_numeric_values_are_stored_as_null() -> Result<()> {
        let csv = SAMPLE_CSV.replacen(",2019,TESLA", ",unknown,TESLA", 1);
        let tmp = write_csv(&csv)?;
        let mut conn = duck::open_mem_db()?;
        VehicleLoader::new(&mut conn, tmp.path(), 5000)?.run(LoadMode::Batched)?;

        let nulls: i64 = conn.query_row(
            "SELECT COUNT(*) FROM electric_vehicles WHERE Model_Year IS NULL",
            [],
            |r| r.get(0),
        )?;
        assert_eq!(nulls, 1);
        Ok(())
    }

    #[test]
    fn failed_insert_rolls_back_every_batch() -> Result<()> {
        init_test_logging();
        // blank VIN on the third row violates the pre-existing NOT NULL column
        let csv = SAMPLE_CSV.replacen("7JRBR0FL9M", "", 1);
        let tmp = write_csv(&csv)?;
        let mut conn = duck::open_mem_db()?;
        conn.execute_batch(&create_table_sql().replacen("VIN VARCHAR", "VIN VARCHAR NOT NULL", 1))?;

        let mut loader = VehicleLoader::new(&mut conn, tmp.path(), 1)?;
        loader.create_table()?;
        let err = loader.load_data().err().expect("insert must fail");
        assert!(matches!(err, LoadError::Database(_)));

        assert_eq!(duck::count_rows(&conn, TABLE_NAME)?, 0);
        Ok(())
    }

    #[test]
    fn failure_inside_a_later_batch_rolls_back_earlier_batches() -> Result<()> {
        init_test_logging();
        // five rows in batches of three; the blank VIN is the second row of
        // the second batch, after the first batch has been flushed
        let mut csv = SAMPLE_CSV.to_string();
        csv.push_str("1N4AZ0CP5D,King,Seattle,WA,98101,2013,NISSAN,LEAF,Battery Electric Vehicle (BEV),Clean Alternative Fuel Vehicle Eligible,75,0,43,100000001,POINT (-122.3 47.6),CITY OF SEATTLE,53033008100\n");
        csv.push_str(",King,Seattle,WA,98101,2013,NISSAN,LEAF,Battery Electric Vehicle (BEV),Clean Alternative Fuel Vehicle Eligible,75,0,43,100000002,POINT (-122.3 47.6),CITY OF SEATTLE,53033008100\n");
        let tmp = write_csv(&csv)?;
        let mut conn = duck::open_mem_db()?;
        conn.execute_batch(&create_table_sql().replacen("VIN VARCHAR", "VIN VARCHAR NOT NULL", 1))?;

        let mut loader = VehicleLoader::new(&mut conn, tmp.path(), 3)?;
        loader.create_table()?;
        let err = loader.load_data().err().expect("second batch must fail");
        assert!(matches!(err, LoadError::Database(_)));

        assert_eq!(duck::count_rows(&conn, TABLE_NAME)?, 0);
        Ok(())
    }

    #[test]
    fn count_mismatch_is_reported_and_not_corrected() -> Result<()> {
        let tmp = write_csv(SAMPLE_CSV)?;
        let mut conn = duck::open_mem_db()?;
        let mut loader = VehicleLoader::new(&mut conn, tmp.path(), 5000)?;
        loader.create_table()?;
        loader.load_data()?;
        loader
            .conn
            .execute_batch("INSERT INTO electric_vehicles (VIN) VALUES ('EXTRA00000');")?;

        match loader.validate_load() {
            Err(LoadError::RowCountMismatch { csv_rows, db_rows }) => {
                assert_eq!(csv_rows, 3);
                assert_eq!(db_rows, 4);
            }
            other => panic!("expected row count mismatch, got {:?}", other),
        }
        assert_eq!(duck::count_rows(&conn, TABLE_NAME)?, 4);
        Ok(())
    }

    #[test]
    fn bulk_copy_loads_every_row() -> Result<()> {
        let tmp = write_csv(SAMPLE_CSV)?;
        let mut conn = duck::open_mem_db()?;
        let rows = VehicleLoader::new(&mut conn, tmp.path(), 5000)?.run(LoadMode::BulkCopy)?;
        assert_eq!(rows, 3);
        Ok(())
    }

    #[test]
    fn header_only_file_loads_nothing() -> Result<()> {
        let header = SAMPLE_CSV.lines().next().unwrap_or_default();
        let tmp = write_csv(&format!("{header}\n"))?;
        let mut conn = duck::open_mem_db()?;
        let rows = VehicleLoader::new(&mut conn, tmp.path(), 10)?.run(LoadMode::Batched)?;
        assert_eq!(rows, 0);
        Ok(())
    }
}
