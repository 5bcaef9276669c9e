//! `run-economics` (spec §6): evaluate deterministic district-heating and
//! heat-pump costs for a cluster, reading back the CHA/DHA artifacts it
//! depends on, and optionally run seeded Monte Carlo economics.

use crate::artifacts::{read_json_artifact, ChaArtifact, DhaArtifact, EconomicsArtifact};
use crate::dataset::Dataset;
use dh_core::{DhError, DhResult};
use dh_economics::{evaluate_dh, evaluate_hp, run_monte_carlo, DhCostInputs, HpCostInputs, MonteCarloConfig, MonteCarloInputs};
use dh_io::artifact_discovery::find_cluster_artifact;
use std::path::Path;

pub fn handle(
    cluster_id: &str,
    dataset_root: &Path,
    n: Option<usize>,
    seed: Option<u64>,
    out_dir: &Path,
) -> DhResult<()> {
    let dataset = Dataset::load(dataset_root, "default")?;
    let cluster = dataset.cluster(cluster_id)?;
    let buildings = dataset.member_buildings(cluster);

    let cha_path = find_cluster_artifact(out_dir, "cha", cluster_id, "cha_kpis.json")?;
    let dha_path = find_cluster_artifact(out_dir, "dha", cluster_id, "dha_kpis.json")?;
    let cha: ChaArtifact = read_json_artifact(&cha_path)?;
    let dha: DhaArtifact = read_json_artifact(&dha_path)?;

    let annual_heat_mwh: f64 =
        buildings.iter().map(|b| dataset.heat_profiles.annual_sum_kwh(&b.id).unwrap_or(0.0)).sum::<f64>() / 1000.0;

    let dh_inputs = DhCostInputs {
        pipe_capex_eur: cha.pipe_capex_eur,
        pump_design_kw: cha.pump_power_kw,
        annual_heat_mwh,
    };
    let hp_inputs = HpCostInputs {
        hp_design_kw: dha.hp_total_kw_design,
        annual_heat_mwh,
        max_feeder_loading_pct: dha.kpis.max_feeder_loading_pct,
    };

    let dh_cost = evaluate_dh(&dh_inputs, &dataset.cost_defaults);
    let hp_cost = evaluate_hp(&hp_inputs, &dataset.cost_defaults);

    let monte_carlo = match n {
        Some(n_samples) => {
            let seed = seed.ok_or_else(|| {
                DhError::ConfigValidation("--seed is required when --n is given (spec §6)".to_string())
            })?;
            let config = MonteCarloConfig { n_samples, seed };
            let distributions = dh_catalogs::default_distributions();
            let inputs = MonteCarloInputs { dh: dh_inputs, hp: hp_inputs };
            let (summary, _samples) = run_monte_carlo(&dataset.cost_defaults, &inputs, &distributions, &config);
            Some(summary)
        }
        None => None,
    };

    let artifact = EconomicsArtifact {
        cluster_id: cluster_id.to_string(),
        dh: dh_cost.into(),
        hp: hp_cost.into(),
        monte_carlo,
    };

    let path = out_dir.join("economics").join(cluster_id).join("economics.json");
    dh_io::writers::write_json(&path, &artifact)?;
    println!(
        "economics for {cluster_id}: lcoh_dh={:.1} lcoh_hp={:.1} -> {}",
        artifact.dh.lcoh_eur_per_mwh, artifact.hp.lcoh_eur_per_mwh, path.display()
    );
    Ok(())
}
