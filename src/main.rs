use anyhow::Result;
use clap::Parser;
use evreport::{load::LoadMode, pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Load an electric vehicle registration CSV into DuckDB and write Parquet reports"
)]
struct Args {
    /// Registration extract to load
    #[arg(long, env = "EV_CSV_PATH", default_value = "data/Electric_Vehicle_Population_Data.csv")]
    csv: PathBuf,

    /// DuckDB database file
    #[arg(long, env = "EV_DB_PATH", default_value = "db/electric_vehicles.duckdb")]
    db: PathBuf,

    /// Directory for the Parquet reports
    #[arg(long, env = "EV_OUTPUT_DIR", default_value = "analytics_output")]
    output: PathBuf,

    /// Rows per insert batch
    #[arg(long, env = "EV_BATCH_SIZE", default_value_t = evreport::load::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Load with DuckDB's COPY instead of batched inserts
    #[arg(long)]
    bulk_copy: bool,

    /// Delete an existing database file before loading
    #[arg(long)]
    fresh: bool,
}

impl From<Args> for PipelineConfig {
    fn from(args: Args) -> Self {
        PipelineConfig {
            csv_path: args.csv,
            db_path: args.db,
            output_dir: args.output,
            batch_size: args.batch_size,
            load_mode: if args.bulk_copy {
                LoadMode::BulkCopy
            } else {
                LoadMode::Batched
            },
            fresh: args.fresh,
        }
    }
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) configure ────────────────────────────────────────────────
    let config = PipelineConfig::from(Args::parse());
    info!(
        csv = %config.csv_path.display(),
        db = %config.db_path.display(),
        output = %config.output_dir.display(),
        batch_size = config.batch_size,
        mode = ?config.load_mode,
        "startup"
    );

    // ─── 3) load + report ────────────────────────────────────────────
    let summary = pipeline::run(&config)?;
    for f in summary.files() {
        info!("wrote {}", f.display());
    }
    Ok(())
}
