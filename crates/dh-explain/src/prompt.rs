//! Prompt assembly (spec §4.15): a contract-only prompt enumerating DH and
//! HP metrics with numeric values and units, the decision choice and reason
//! codes, and the citation rules the generator must follow (only listed
//! numerics, only the standard names `EN 13941-1` and `VDE-AR-N 4100`).

use crate::style::Style;
use dh_contract::{allowed_numerics, Choice, DecisionResult, KpiContract};

pub const EN_13941_1: &str = "EN 13941-1";
pub const VDE_AR_N_4100: &str = "VDE-AR-N 4100";

pub(crate) fn choice_label(choice: Choice) -> &'static str {
    match choice {
        Choice::Dh => "district heating (DH)",
        Choice::Hp => "decentralized heat pumps (HP)",
        Choice::Undecided => "undecided",
    }
}

/// Build the full prompt text handed to the external text generator (or
/// used as the skeleton for the deterministic template fallback).
pub fn build_prompt(contract: &KpiContract, decision: &DecisionResult, style: Style) -> String {
    let dh = &contract.district_heating;
    let hp = &contract.heat_pumps;
    let reasons: Vec<&str> = decision.reason_codes.iter().map(|r| r.as_str()).collect();

    let mut sections = Vec::new();
    sections.push(format!(
        "You are writing a municipal-stakeholder explanation for cluster '{}'. Style: {} ({}).",
        contract.cluster_id,
        style.as_str(),
        style.register_hint()
    ));
    sections.push(format!("Recommended option: {}.", choice_label(decision.choice)));
    sections.push(format!("Reason codes, in order: {}.", reasons.join(", ")));
    sections.push(format!(
        "District heating ({EN_13941_1}): feasible={}, LCOH median={:.2} EUR/MWh (p05={:.2}, p95={:.2}), \
         CO2 median={:.2} t/a, max pipe velocity={:.2} m/s, velocity_ok={}, dp_ok={}.",
        dh.feasible, dh.lcoh.p50, dh.lcoh.p05, dh.lcoh.p95, dh.co2.p50, dh.hydraulics.v_max_ms,
        dh.hydraulics.velocity_ok, dh.hydraulics.dp_ok
    ));
    sections.push(format!(
        "Heat pumps ({VDE_AR_N_4100}): feasible={}, LCOH median={:.2} EUR/MWh (p05={:.2}, p95={:.2}), \
         CO2 median={:.2} t/a, max feeder loading={:.1}%, planning_warning={}.",
        hp.feasible, hp.lcoh.p50, hp.lcoh.p05, hp.lcoh.p95, hp.co2.p50, hp.lv_grid.max_feeder_loading_pct,
        hp.lv_grid.planning_warning
    ));
    if let Some(mc) = &contract.monte_carlo {
        sections.push(format!(
            "Monte Carlo ({} samples, seed {}): DH wins {:.0}% of samples, HP wins {:.0}%.",
            mc.n_samples,
            mc.seed,
            mc.dh_wins_fraction * 100.0,
            mc.hp_wins_fraction * 100.0
        ));
    } else {
        sections.push("Monte Carlo was not run for this cluster.".to_string());
    }

    let numerics: Vec<String> = allowed_numerics(contract).iter().map(|(_, v)| format!("{v:.2}")).collect();
    sections.push(format!(
        "Rules: cite only these numeric values, each rounded to two decimals: [{}]. \
         Cite only the standard names \"{EN_13941_1}\" and \"{VDE_AR_N_4100}\"; do not invent other standards. \
         Sections expected: {}.",
        numerics.join(", "),
        style.section_headings().join(", ")
    ));

    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_contract::config::DecisionConfig;
    use dh_contract::contract::*;
    use dh_contract::decide;
    use dh_economics::QuantileSummary;

    fn contract() -> KpiContract {
        KpiContract {
            version: CONTRACT_VERSION.to_string(),
            cluster_id: "c1".into(),
            metadata: ContractMetadata { created_utc: chrono::Utc::now(), inputs: vec![], git_commit: None, input_digest: None },
            district_heating: DistrictHeatingBlock {
                feasible: true,
                reasons: vec!["DH_OK".into()],
                lcoh: QuantileSummary { p05: 70.0, p50: 75.2, p95: 80.0 },
                co2: QuantileSummary { p05: 200.0, p50: 220.0, p95: 240.0 },
                hydraulics: HydraulicsBlock { velocity_ok: true, dp_ok: true, v_max_ms: 1.2, v_share_within_limits: 1.0 },
                losses: LossesBlock { total_length_m: 500.0, loss_share_pct: 4.0, pump_power_kw: 5.0 },
            },
            heat_pumps: HeatPumpsBlock {
                feasible: true,
                reasons: vec!["HP_OK".into()],
                lcoh: QuantileSummary { p05: 78.0, p50: 82.5, p95: 90.0 },
                co2: QuantileSummary { p05: 110.0, p50: 125.0, p95: 140.0 },
                lv_grid: LvGridBlock { planning_warning: false, max_feeder_loading_pct: 60.0, voltage_violations_total: 0, line_violations_total: 0 },
                hp_system: HpSystemBlock { hp_total_kw_design: 1000.0 },
            },
            monte_carlo: Some(MonteCarloBlock { dh_wins_fraction: 0.78, hp_wins_fraction: 0.22, n_samples: 500, seed: 42 }),
        }
    }

    #[test]
    fn prompt_contains_standard_names_and_numerics() {
        let c = contract();
        let decision = decide(&c, &DecisionConfig::default());
        let prompt = build_prompt(&c, &decision, Style::Executive);
        assert!(prompt.contains(EN_13941_1));
        assert!(prompt.contains(VDE_AR_N_4100));
        assert!(prompt.contains("75.20"));
    }
}
