//! Single-cluster pipeline (spec §5: "each worker runs an independent
//! cluster pipeline and does not share mutable state with others"). Wires
//! CHA, DHA, and economics, waits for all three, then assembles and
//! decides. A pure function from one job plus shared config to one record,
//! with every failure captured as a value rather than propagated out of
//! the batch.

use crate::job::{ClusterJob, ClusterJobRecord, JobStatus};
use dh_catalogs::pipe_catalog::by_dn;
use dh_cha::{ChaConfig, ChaRunResult};
use dh_contract::{assemble_contract, config::DecisionConfig, decide, AssemblyInputs, KpiContract};
use dh_dha::{DhaConfig, DhaRunResult};
use dh_economics::{
    evaluate_dh, evaluate_hp, run_monte_carlo, CostResult, DhCostInputs, HpCostInputs, MonteCarloConfig,
    MonteCarloInputs, MonteCarloSummary,
};
use dh_core::{Building, Cluster, DhResult};
use std::collections::HashMap;

/// Hydraulic circulation pump power from mass flow and pressure drop:
/// `P = Q * dp / (rho * eta)`, a standard centrifugal-pump sizing formula
/// (not specific to any one catalog entry).
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

/// Per-building design heat load at the cluster's design hour, sliced from
/// the shared hourly profile matrix (spec §3's `Cluster.design_hour`).
fn building_design_heat_kw(
    buildings: &[Building],
    heat_profiles: &dh_core::HourlyProfileMatrix,
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

pub struct PipelineOutcome {
    pub cha: ChaRunResult,
    pub dha: DhaRunResult,
    pub dh_cost: CostResult,
    pub hp_cost: CostResult,
    pub monte_carlo: Option<MonteCarloSummary>,
    pub contract: KpiContract,
    pub decision: dh_contract::DecisionResult,
}

/// Run CHA, DHA, and economics for one cluster, then assemble and decide.
/// CHA and DHA are independent (spec §5: "inside a cluster, CHA, DHA, and
/// Economics may run in parallel but the contract assembler waits for all
/// three"); run in parallel via `rayon::join` since neither depends on the
/// other's output, while economics depends on both.
pub fn run_cluster(job: &ClusterJob, decision_config: &DecisionConfig) -> DhResult<PipelineOutcome> {
    let shared = &job.shared;
    let member_buildings: Vec<Building> = shared
        .buildings
        .iter()
        .filter(|b| job.cluster.member_buildings.contains(&b.id))
        .cloned()
        .collect();

    let design_heat_kw = building_design_heat_kw(&member_buildings, &shared.heat_profiles, job.cluster.design_hour);
    let hp_total_kw_design: f64 = design_heat_kw.values().sum();

    let total_annual_demand_kwh: f64 =
        member_buildings.iter().map(|b| shared.heat_profiles.annual_sum_kwh(&b.id).unwrap_or(0.0)).sum();

    let cluster_for_cha = job.cluster.clone();
    let (cha_result, dha_result) = rayon::join(
        || run_cha_job(&shared.streets, &member_buildings, &cluster_for_cha, &design_heat_kw, total_annual_demand_kwh),
        || run_dha_job(job, &member_buildings),
    );
    let cha = cha_result?;
    let dha = dha_result?;

    let annual_heat_mwh = total_annual_demand_kwh / 1000.0;
    let pump_power_kw = estimate_pump_power_kw(&cha);

    let dh_inputs = DhCostInputs {
        pipe_capex_eur: pipe_capex_eur(&cha),
        pump_design_kw: pump_power_kw,
        annual_heat_mwh,
    };
    let hp_inputs = HpCostInputs {
        hp_design_kw: hp_total_kw_design,
        annual_heat_mwh,
        max_feeder_loading_pct: dha.kpis.max_feeder_loading_pct,
    };

    let dh_cost = evaluate_dh(&dh_inputs, &shared.cost_defaults);
    let hp_cost = evaluate_hp(&hp_inputs, &shared.cost_defaults);

    let monte_carlo = if job.run_monte_carlo {
        let mc_config = MonteCarloConfig { n_samples: job.monte_carlo_n_samples, seed: job.monte_carlo_seed };
        let distributions = dh_catalogs::default_distributions();
        let mc_inputs = MonteCarloInputs { dh: dh_inputs, hp: hp_inputs };
        let (summary, _samples) = run_monte_carlo(&shared.cost_defaults, &mc_inputs, &distributions, &mc_config);
        Some(summary)
    } else {
        None
    };

    let contract = assemble_contract(AssemblyInputs {
        cluster_id: &job.cluster.id,
        cha: &cha.kpis,
        dha: &dha.kpis,
        dh_deterministic: &dh_cost,
        hp_deterministic: &hp_cost,
        pump_power_kw,
        hp_total_kw_design,
        monte_carlo: monte_carlo.as_ref(),
        inputs: vec![],
        input_digest: None,
        git_commit: None,
    })?;

    let decision = decide(&contract, decision_config);

    Ok(PipelineOutcome { cha, dha, dh_cost, hp_cost, monte_carlo, contract, decision })
}

fn run_cha_job(
    streets: &[dh_core::StreetSegment],
    buildings: &[Building],
    cluster: &Cluster,
    design_heat_kw: &HashMap<String, f64>,
    total_annual_demand_kwh: f64,
) -> DhResult<ChaRunResult> {
    dh_cha::run_cha(streets, buildings, cluster, design_heat_kw, total_annual_demand_kwh, &ChaConfig::default())
}

fn run_dha_job(job: &ClusterJob, buildings: &[Building]) -> DhResult<DhaRunResult> {
    let shared = &job.shared;
    dh_dha::run_dha(
        shared.lv_buses.clone(),
        shared.lv_lines.clone(),
        shared.transformers.clone(),
        buildings,
        &shared.heat_profiles,
        &shared.base_load,
        job.cluster.design_hour,
        &DhaConfig::default(),
    )
}

/// Convert a finished or failed pipeline run into the record the batch
/// manifest stores, never letting a cluster failure propagate further.
pub fn outcome_to_record(cluster_id: &str, output_dir: &str, result: &DhResult<PipelineOutcome>) -> ClusterJobRecord {
    match result {
        Ok(outcome) => ClusterJobRecord {
            cluster_id: cluster_id.to_string(),
            started_utc: chrono::Utc::now(),
            status: JobStatus::Ok,
            error: None,
            choice: Some(format!("{:?}", outcome.decision.choice)),
            robust: Some(outcome.decision.robust),
            output_dir: output_dir.to_string(),
        },
        Err(err) => ClusterJobRecord {
            cluster_id: cluster_id.to_string(),
            started_utc: chrono::Utc::now(),
            status: JobStatus::Failed,
            error: Some(err.to_string()),
            choice: None,
            robust: None,
            output_dir: output_dir.to_string(),
        },
    }
}
