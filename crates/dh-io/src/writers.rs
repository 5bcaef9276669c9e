//! Output writers for the per-cluster artifacts of spec §6: JSON KPI/
//! contract/decision documents, per-pipe and violations CSVs, and the
//! Monte Carlo sample table (Parquet, via `polars::prelude::ParquetWriter`).
//! The Parquet writer takes a plain column map so this crate never depends
//! on the economics crate's sample type.

use dh_core::{DhError, DhResult};
use polars::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serialize `value` to pretty JSON and write it to `path`, creating parent
/// directories as needed.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> DhResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Write a slice of serializable rows to a CSV file with a header row,
/// creating parent directories as needed.
pub fn write_csv_rows<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> DhResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| DhError::Other(format!("creating CSV {}: {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| DhError::Other(format!("writing CSV row to {}: {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| DhError::Other(format!("flushing CSV {}: {e}", path.display())))?;
    Ok(())
}

/// Write a set of equal-length `f64` columns to a Parquet file, used for
/// `monte_carlo_samples.parquet` (spec §6). Column order in the output
/// matches the order given.
pub fn write_parquet_f64_columns(path: impl AsRef<Path>, columns: &[(&str, Vec<f64>)]) -> DhResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let series: Vec<Series> = columns
        .iter()
        .map(|(name, values)| Series::new(name, values.clone()))
        .collect();
    let mut df = DataFrame::new(series)
        .map_err(|e| DhError::Other(format!("building Monte Carlo sample DataFrame: {e}")))?;
    let mut file = fs::File::create(path)
        .map_err(|e| DhError::Other(format!("creating Parquet {}: {e}", path.display())))?;
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .map_err(|e| DhError::Other(format!("writing Parquet {}: {e}", path.display())))?;
    Ok(())
}
