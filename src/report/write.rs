// src/report/write.rs

use anyhow::{anyhow, Context, Result};
use arrow::array::{Array, AsArray, BooleanArray};
use arrow::compute::filter_record_batch;
use arrow::datatypes::Int32Type;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    collections::BTreeSet,
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Write `batch` to `path` as Snappy-compressed Parquet, replacing any
/// existing file. Goes through a `.tmp` sibling and a rename so readers never
/// see a half-written file.
pub fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let file = File::create(&temp_path)
        .with_context(|| format!("creating report file {}", temp_path.display()))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer for report")?;
    writer.write(batch).context("writing report batch")?;
    writer.close().context("closing report writer")?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", temp_path, path))?;
    debug!(path = %path.display(), rows = batch.num_rows(), "wrote parquet");
    Ok(())
}

/// Split `batch` on the Int32 `column` and write one file per distinct
/// non-null value to `<out_dir>/<column_dir>=<v>/<file_prefix>_<v>.parquet`.
///
/// Rows with a null key are not written.
pub fn write_partitioned_by_i32(
    batch: &RecordBatch,
    column: &str,
    out_dir: &Path,
    dir_key: &str,
    file_prefix: &str,
) -> Result<Vec<PathBuf>> {
    let keys = batch
        .column_by_name(column)
        .ok_or_else(|| anyhow!("partition column {} not in result", column))?;
    let keys = keys
        .as_primitive_opt::<Int32Type>()
        .ok_or_else(|| anyhow!("partition column {} is {:?}, expected Int32", column, keys.data_type()))?;

    let distinct: BTreeSet<i32> = keys.iter().flatten().collect();
    let mut written = Vec::with_capacity(distinct.len());

    for value in distinct {
        let mask: BooleanArray = keys.iter().map(|k| Some(k == Some(value))).collect();
        let part = filter_record_batch(batch, &mask)
            .with_context(|| format!("filtering {} = {}", column, value))?;

        let part_dir = out_dir.join(format!("{}={}", dir_key, value));
        fs::create_dir_all(&part_dir)
            .with_context(|| format!("creating partition directory {}", part_dir.display()))?;
        let path = part_dir.join(format!("{}_{}.parquet", file_prefix, value));
        write_parquet(&part, &path)?;
        written.push(path);
    }

    Ok(written)
}
