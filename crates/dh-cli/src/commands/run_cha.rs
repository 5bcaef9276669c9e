//! `run-cha` (spec §6): run the coupled hydraulic-thermal analysis for one
//! cluster and write a [`ChaArtifact`]. Pump power and pipe capex are
//! derived from the sizing result the same way `dh_batch::pipeline` does,
//! duplicated here in CLI-local form since that crate keeps the helpers
//! private to its own pipeline.

use crate::artifacts::ChaArtifact;
use crate::dataset::Dataset;
use dh_catalogs::pipe_catalog::by_dn;
use dh_cha::{ChaConfig, ChaRunResult};
use dh_core::{Building, DhResult, HourlyProfileMatrix};
use std::collections::HashMap;
use std::path::Path;

const PUMP_EFFICIENCY: f64 = 0.7;
const WATER_DENSITY_KG_PER_M3: f64 = 970.0;

fn estimate_pump_power_kw(cha: &ChaRunResult) -> f64 {
    if !cha.converged {
        return 0.0;
    }
    let flow_kg_s = cha.stabilizer_flow_kg_s.max(0.0);
    let head_bar = cha.kpis.dp_max_bar_per_100m * (cha.kpis.total_length_m / 100.0).max(1.0);
    let head_pa = head_bar * 1e5;
    (flow_kg_s * head_pa) / (WATER_DENSITY_KG_PER_M3 * PUMP_EFFICIENCY) / 1000.0
}

fn pipe_capex_eur(cha: &ChaRunResult) -> f64 {
    cha.sized_pipes
        .iter()
        .map(|p| by_dn(&p.pipe.dn).map(|e| e.cost_eur_per_m).unwrap_or(0.0) * p.pipe.length_m)
        .sum()
}

fn building_design_heat_kw(
    buildings: &[Building],
    heat_profiles: &HourlyProfileMatrix,
    design_hour: usize,
) -> HashMap<String, f64> {
    buildings
        .iter()
        .map(|b| {
            let kw = heat_profiles.get(&b.id).and_then(|s| s.get(design_hour)).copied().unwrap_or(0.0);
            (b.id.clone(), kw)
        })
        .collect()
}

pub fn handle(cluster_id: &str, dataset_root: &Path, out_dir: &Path) -> DhResult<()> {
    let dataset = Dataset::load(dataset_root, "default")?;
    let cluster = dataset.cluster(cluster_id)?;
    let buildings = dataset.member_buildings(cluster);

    let design_heat_kw = building_design_heat_kw(&buildings, &dataset.heat_profiles, cluster.design_hour);
    let total_annual_demand_kwh: f64 =
        buildings.iter().map(|b| dataset.heat_profiles.annual_sum_kwh(&b.id).unwrap_or(0.0)).sum();
    let result = dh_cha::run_cha(
        &dataset.streets,
        &buildings,
        cluster,
        &design_heat_kw,
        total_annual_demand_kwh,
        &ChaConfig::default(),
    )?;

    let artifact = ChaArtifact {
        cluster_id: cluster_id.to_string(),
        kpis: result.kpis.clone(),
        converged: result.converged,
        pipe_capex_eur: pipe_capex_eur(&result),
        pump_power_kw: estimate_pump_power_kw(&result),
    };

    let path = out_dir.join("cha").join(cluster_id).join("cha_kpis.json");
    dh_io::writers::write_json(&path, &artifact)?;
    tracing::info!(path = %path.display(), feasible = artifact.kpis.feasible, "wrote CHA artifact");
    println!("CHA for {cluster_id}: feasible={} -> {}", artifact.kpis.feasible, path.display());
    Ok(())
}
