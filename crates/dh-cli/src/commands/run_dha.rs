//! `run-dha` (spec §6): run the distribution-grid hosting analysis for one
//! cluster and write a [`DhaArtifact`].

use crate::artifacts::DhaArtifact;
use crate::dataset::Dataset;
use dh_core::DhResult;
use dh_dha::DhaConfig;
use std::path::Path;

pub fn handle(cluster_id: &str, dataset_root: &Path, scenario: &str, out_dir: &Path) -> DhResult<()> {
    let dataset = Dataset::load(dataset_root, scenario)?;
    let cluster = dataset.cluster(cluster_id)?;
    let buildings = dataset.member_buildings(cluster);

    let hp_total_kw_design: f64 = buildings
        .iter()
        .map(|b| dataset.heat_profiles.get(&b.id).and_then(|s| s.get(cluster.design_hour)).copied().unwrap_or(0.0))
        .sum();

    let result = dh_dha::run_dha(
        dataset.lv_buses.clone(),
        dataset.lv_lines.clone(),
        dataset.transformers.clone(),
        &buildings,
        &dataset.heat_profiles,
        &dataset.base_load,
        cluster.design_hour,
        &DhaConfig::default(),
    )?;

    let artifact = DhaArtifact {
        cluster_id: cluster_id.to_string(),
        kpis: result.kpis.clone(),
        hp_total_kw_design,
        unmapped_building_count: result.unmapped_building_count,
    };

    let path = out_dir.join("dha").join(cluster_id).join("dha_kpis.json");
    dh_io::writers::write_json(&path, &artifact)?;
    for warning in result.diagnostics.warnings() {
        tracing::warn!(message = %warning.message, "DHA diagnostic");
    }
    println!(
        "DHA for {cluster_id}: mitigation={:?} max_feeder_loading_pct={:.1} -> {}",
        artifact.kpis.mitigation_class, artifact.kpis.max_feeder_loading_pct, path.display()
    );
    Ok(())
}
