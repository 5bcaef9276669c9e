//! `prepare-data` (spec §6): load every input table in a dataset and
//! report what was found, without running a pipeline. Each `dh_io` reader
//! already validates its own rows, so this command's job is to surface
//! counts and fail loudly on the first bad table.

use crate::dataset::Dataset;
use dh_core::DhResult;
use std::path::Path;

pub fn handle(dataset_root: &Path, scenario: &str) -> DhResult<()> {
    let dataset = Dataset::load(dataset_root, scenario)?;

    tracing::info!(
        streets = dataset.streets.len(),
        buildings = dataset.buildings.len(),
        clusters = dataset.clusters.len(),
        lv_buses = dataset.lv_buses.len(),
        lv_lines = dataset.lv_lines.len(),
        transformers = dataset.transformers.len(),
        "dataset loaded"
    );

    for cluster in &dataset.clusters {
        cluster.validate()?;
    }

    println!("dataset at {} is valid:", dataset_root.display());
    println!("  streets:      {}", dataset.streets.len());
    println!("  buildings:    {}", dataset.buildings.len());
    println!("  clusters:     {}", dataset.clusters.len());
    println!("  lv buses:     {}", dataset.lv_buses.len());
    println!("  lv lines:     {}", dataset.lv_lines.len());
    println!("  transformers: {}", dataset.transformers.len());
    Ok(())
}
