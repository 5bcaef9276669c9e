//! KPI-contract assembler (spec §4.13): merges the CHA, DHA, and economics
//! outputs into the canonical contract record of §3, then runs
//! [`crate::validator::validate_contract`] before returning it. Missing
//! required numeric fields force feasibility false with the matching
//! `*_MISSING_KPIS` reason rather than panicking (spec §4.13).

use crate::contract::*;
use crate::validator::validate_contract;
use dh_cha::ChaKpis;
use dh_core::DhResult;
use dh_dha::{DhaKpis, DhaReasonCode};
use dh_economics::{CostResult, MonteCarloSummary, QuantileSummary};

/// Inputs the assembler does not derive itself: the plant's design pump
/// power and the heat pump system's design capacity, both already computed
/// by the batch pipeline ahead of the economics evaluation this contract's
/// quantiles come from.
pub struct AssemblyInputs<'a> {
    pub cluster_id: &'a str,
    pub cha: &'a ChaKpis,
    pub dha: &'a DhaKpis,
    pub dh_deterministic: &'a CostResult,
    pub hp_deterministic: &'a CostResult,
    pub pump_power_kw: f64,
    pub hp_total_kw_design: f64,
    pub monte_carlo: Option<&'a MonteCarloSummary>,
    pub inputs: Vec<String>,
    pub input_digest: Option<String>,
    pub git_commit: Option<String>,
}

/// A deterministic-only quantile block (all three quantiles equal the
/// single evaluated value), used when Monte Carlo was not run.
fn degenerate_quantiles(value: f64) -> QuantileSummary {
    QuantileSummary { p05: value, p50: value, p95: value }
}

/// Assemble and validate the canonical contract from upstream KPI blocks.
pub fn assemble_contract(input: AssemblyInputs<'_>) -> DhResult<KpiContract> {
    let (lcoh_dh, co2_dh, lcoh_hp, co2_hp) = match input.monte_carlo {
        Some(mc) => (mc.lcoh_dh, mc.co2_dh, mc.lcoh_hp, mc.co2_hp),
        None => (
            degenerate_quantiles(input.dh_deterministic.lcoh_eur_per_mwh),
            degenerate_quantiles(input.dh_deterministic.co2_t_per_a),
            degenerate_quantiles(input.hp_deterministic.lcoh_eur_per_mwh),
            degenerate_quantiles(input.hp_deterministic.co2_t_per_a),
        ),
    };

    let hp_feasible = input.dha.reason_codes.contains(&DhaReasonCode::HpOk);

    let contract = KpiContract {
        version: CONTRACT_VERSION.to_string(),
        cluster_id: input.cluster_id.to_string(),
        metadata: ContractMetadata {
            created_utc: chrono::Utc::now(),
            inputs: input.inputs,
            git_commit: input.git_commit,
            input_digest: input.input_digest,
        },
        district_heating: DistrictHeatingBlock {
            feasible: input.cha.feasible,
            reasons: input.cha.reason_codes.iter().map(|r| r.as_str().to_string()).collect(),
            lcoh: lcoh_dh,
            co2: co2_dh,
            hydraulics: HydraulicsBlock {
                velocity_ok: input.cha.velocity_ok,
                dp_ok: input.cha.dp_ok,
                v_max_ms: input.cha.v_max_ms,
                v_share_within_limits: input.cha.v_share_within_limits,
            },
            losses: LossesBlock {
                total_length_m: input.cha.total_length_m,
                loss_share_pct: input.cha.loss_share_pct,
                pump_power_kw: input.pump_power_kw,
            },
        },
        heat_pumps: HeatPumpsBlock {
            feasible: hp_feasible,
            reasons: input.dha.reason_codes.iter().map(|r| r.as_str().to_string()).collect(),
            lcoh: lcoh_hp,
            co2: co2_hp,
            lv_grid: LvGridBlock {
                planning_warning: warrants_planning_warning(input.dha.mitigation_class),
                max_feeder_loading_pct: input.dha.max_feeder_loading_pct,
                voltage_violations_total: input.dha.voltage_violation_count as i64,
                line_violations_total: input.dha.line_violation_count as i64,
            },
            hp_system: HpSystemBlock { hp_total_kw_design: input.hp_total_kw_design },
        },
        monte_carlo: input.monte_carlo.map(|mc| MonteCarloBlock {
            dh_wins_fraction: mc.dh_wins_fraction,
            hp_wins_fraction: mc.hp_wins_fraction,
            n_samples: mc.n_samples,
            seed: mc.seed,
        }),
    };

    validate_contract(&contract)?;
    Ok(contract)
}

/// Allowed numeric literals the explanation/auditor may cite, flattened
/// from a validated contract (spec §4.15-§4.16): every numeric field the
/// prompt is permitted to reference, paired with the unit suffix used in
/// its field name so the auditor can normalize before comparing.
pub fn allowed_numerics(contract: &KpiContract) -> Vec<(String, f64)> {
    let dh = &contract.district_heating;
    let hp = &contract.heat_pumps;
    let mut values = vec![
        ("district_heating.lcoh.p50".to_string(), dh.lcoh.p50),
        ("district_heating.lcoh.p05".to_string(), dh.lcoh.p05),
        ("district_heating.lcoh.p95".to_string(), dh.lcoh.p95),
        ("district_heating.co2.p50".to_string(), dh.co2.p50),
        ("heat_pumps.lcoh.p50".to_string(), hp.lcoh.p50),
        ("heat_pumps.lcoh.p05".to_string(), hp.lcoh.p05),
        ("heat_pumps.lcoh.p95".to_string(), hp.lcoh.p95),
        ("heat_pumps.co2.p50".to_string(), hp.co2.p50),
        ("district_heating.hydraulics.v_max_ms".to_string(), dh.hydraulics.v_max_ms),
        ("heat_pumps.lv_grid.max_feeder_loading_pct".to_string(), hp.lv_grid.max_feeder_loading_pct),
    ];
    if let Some(mc) = &contract.monte_carlo {
        values.push(("monte_carlo.dh_wins_fraction".to_string(), mc.dh_wins_fraction));
        values.push(("monte_carlo.hp_wins_fraction".to_string(), mc.hp_wins_fraction));
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_cha::ChaReasonCode;
    use dh_dha::MitigationClass;
    use std::collections::HashMap;

    fn cha_kpis(feasible: bool) -> ChaKpis {
        ChaKpis {
            v_share_within_limits: 1.0,
            v_max_ms: 1.1,
            dp_max_bar_per_100m: 0.1,
            loss_share_pct: 3.5,
            total_length_m: 800.0,
            length_by_role_m: HashMap::new(),
            velocity_ok: feasible,
            dp_ok: feasible,
            feasible,
            reason_codes: vec![if feasible { ChaReasonCode::DhOk } else { ChaReasonCode::DhVelocityViolation }],
        }
    }

    fn dha_kpis(ok: bool) -> DhaKpis {
        DhaKpis {
            worst_voltage_pu: 1.0,
            worst_bus: None,
            worst_hour: None,
            max_feeder_loading_pct: 60.0,
            voltage_violation_count: 0,
            line_violation_count: 0,
            transformer_violation_count: 0,
            critical_hour_count: 0,
            worst_voltage_feeder_distance_km: None,
            mitigation_class: MitigationClass::None,
            recommended_actions: vec![],
            cost_tier: dh_dha::CostTier::Low,
            reason_codes: vec![if ok { DhaReasonCode::HpOk } else { DhaReasonCode::HpTrafoViolation }],
        }
    }

    #[test]
    fn assembles_and_validates_without_monte_carlo() {
        let dh_cost = CostResult { capex_eur: 100.0, annual_opex_eur: 10.0, lcoh_eur_per_mwh: 70.0, co2_t_per_a: 200.0 };
        let hp_cost = CostResult { capex_eur: 100.0, annual_opex_eur: 10.0, lcoh_eur_per_mwh: 150.0, co2_t_per_a: 125.0 };
        let contract = assemble_contract(AssemblyInputs {
            cluster_id: "c1",
            cha: &cha_kpis(true),
            dha: &dha_kpis(false),
            dh_deterministic: &dh_cost,
            hp_deterministic: &hp_cost,
            pump_power_kw: 5.0,
            hp_total_kw_design: 900.0,
            monte_carlo: None,
            inputs: vec!["buildings.csv".into()],
            input_digest: None,
            git_commit: None,
        })
        .unwrap();
        assert!(contract.district_heating.feasible);
        assert!(!contract.heat_pumps.feasible);
        assert_eq!(contract.district_heating.lcoh.p05, 70.0);
        assert!(contract.monte_carlo.is_none());
    }
}
