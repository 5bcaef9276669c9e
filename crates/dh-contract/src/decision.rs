//! Decision rule engine (spec §4.14): a deterministic feasibility / cost /
//! CO2 / robustness cascade terminating at the first branch that commits.
//! Grounded on the closed-reason-code-enum idiom of `dh_cha::ChaReasonCode`
//! / `dh_dha::DhaReasonCode`, generalized to the decision's own closed set.

use crate::config::DecisionConfig;
use crate::contract::KpiContract;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReasonCode {
    OnlyDhFeasible,
    OnlyHpFeasible,
    NoneFeasible,
    CostDominantDh,
    CostDominantHp,
    CostCloseUseCo2,
    Co2TiebreakerDh,
    Co2TiebreakerHp,
    RobustDecision,
    SensitiveDecision,
    McMissing,
}

impl DecisionReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReasonCode::OnlyDhFeasible => "ONLY_DH_FEASIBLE",
            DecisionReasonCode::OnlyHpFeasible => "ONLY_HP_FEASIBLE",
            DecisionReasonCode::NoneFeasible => "NONE_FEASIBLE",
            DecisionReasonCode::CostDominantDh => "COST_DOMINANT_DH",
            DecisionReasonCode::CostDominantHp => "COST_DOMINANT_HP",
            DecisionReasonCode::CostCloseUseCo2 => "COST_CLOSE_USE_CO2",
            DecisionReasonCode::Co2TiebreakerDh => "CO2_TIEBREAKER_DH",
            DecisionReasonCode::Co2TiebreakerHp => "CO2_TIEBREAKER_HP",
            DecisionReasonCode::RobustDecision => "ROBUST_DECISION",
            DecisionReasonCode::SensitiveDecision => "SENSITIVE_DECISION",
            DecisionReasonCode::McMissing => "MC_MISSING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    Dh,
    Hp,
    Undecided,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    pub choice: Choice,
    pub robust: bool,
    pub reason_codes: Vec<DecisionReasonCode>,
    pub metrics_used: HashMap<String, f64>,
}

/// Pure decision function: identical `(contract, config)` always yields an
/// identical [`DecisionResult`] (spec §4.14, §8's idempotence property).
pub fn decide(contract: &KpiContract, config: &DecisionConfig) -> DecisionResult {
    let dh = &contract.district_heating;
    let hp = &contract.heat_pumps;
    let mut metrics_used = HashMap::new();
    metrics_used.insert("lcoh_dh_eur_per_mwh".into(), dh.lcoh.p50);
    metrics_used.insert("lcoh_hp_eur_per_mwh".into(), hp.lcoh.p50);
    metrics_used.insert("co2_dh_t_per_a".into(), dh.co2.p50);
    metrics_used.insert("co2_hp_t_per_a".into(), hp.co2.p50);

    match (dh.feasible, hp.feasible) {
        (true, false) => {
            return DecisionResult {
                choice: Choice::Dh,
                robust: false,
                reason_codes: vec![DecisionReasonCode::OnlyDhFeasible, DecisionReasonCode::McMissing],
                metrics_used,
            };
        }
        (false, true) => {
            return DecisionResult {
                choice: Choice::Hp,
                robust: false,
                reason_codes: vec![DecisionReasonCode::OnlyHpFeasible, DecisionReasonCode::McMissing],
                metrics_used,
            };
        }
        (false, false) => {
            return DecisionResult {
                choice: Choice::Undecided,
                robust: false,
                reason_codes: vec![DecisionReasonCode::NoneFeasible],
                metrics_used,
            };
        }
        (true, true) => {}
    }

    let mut reason_codes = Vec::new();
    let (l_dh, l_hp) = (dh.lcoh.p50, hp.lcoh.p50);
    let abs = (l_dh - l_hp).abs();
    let rel = abs / l_dh.min(l_hp).max(1e-9);

    let choice = if rel > config.close_cost_rel_threshold && abs > config.close_cost_abs_threshold {
        if l_dh < l_hp {
            reason_codes.push(DecisionReasonCode::CostDominantDh);
            Choice::Dh
        } else {
            reason_codes.push(DecisionReasonCode::CostDominantHp);
            Choice::Hp
        }
    } else {
        reason_codes.push(DecisionReasonCode::CostCloseUseCo2);
        if dh.co2.p50 <= hp.co2.p50 {
            reason_codes.push(DecisionReasonCode::Co2TiebreakerDh);
            Choice::Dh
        } else {
            reason_codes.push(DecisionReasonCode::Co2TiebreakerHp);
            Choice::Hp
        }
    };

    let robust = match &contract.monte_carlo {
        None => {
            reason_codes.push(DecisionReasonCode::McMissing);
            false
        }
        Some(mc) => {
            let win_fraction = match choice {
                Choice::Dh => mc.dh_wins_fraction,
                Choice::Hp => mc.hp_wins_fraction,
                Choice::Undecided => unreachable!("choice is DH or HP at this point"),
            };
            metrics_used.insert("winner_win_fraction".into(), win_fraction);
            if win_fraction >= config.robust_win_fraction {
                reason_codes.push(DecisionReasonCode::RobustDecision);
                true
            } else if win_fraction >= config.sensitive_win_fraction {
                reason_codes.push(DecisionReasonCode::SensitiveDecision);
                false
            } else {
                false
            }
        }
    };

    DecisionResult { choice, robust, reason_codes, metrics_used }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::*;
    use dh_economics::QuantileSummary;

    fn base_contract(dh_feasible: bool, hp_feasible: bool) -> KpiContract {
        KpiContract {
            version: CONTRACT_VERSION.to_string(),
            cluster_id: "c1".into(),
            metadata: ContractMetadata { created_utc: chrono::Utc::now(), inputs: vec![], git_commit: None, input_digest: None },
            district_heating: DistrictHeatingBlock {
                feasible: dh_feasible,
                reasons: vec![if dh_feasible { "DH_OK".into() } else { "DH_VELOCITY_VIOLATION".into() }],
                lcoh: QuantileSummary { p05: 70.0, p50: 70.0, p95: 70.0 },
                co2: QuantileSummary { p05: 220.0, p50: 220.0, p95: 220.0 },
                hydraulics: HydraulicsBlock { velocity_ok: dh_feasible, dp_ok: dh_feasible, v_max_ms: 1.0, v_share_within_limits: 1.0 },
                losses: LossesBlock { total_length_m: 500.0, loss_share_pct: 4.0, pump_power_kw: 5.0 },
            },
            heat_pumps: HeatPumpsBlock {
                feasible: hp_feasible,
                reasons: vec![if hp_feasible { "HP_OK".into() } else { "HP_TRAFO_VIOLATION".into() }],
                lcoh: QuantileSummary { p05: 150.0, p50: 150.0, p95: 150.0 },
                co2: QuantileSummary { p05: 125.0, p50: 125.0, p95: 125.0 },
                lv_grid: LvGridBlock { planning_warning: false, max_feeder_loading_pct: 50.0, voltage_violations_total: 0, line_violations_total: 0 },
                hp_system: HpSystemBlock { hp_total_kw_design: 1000.0 },
            },
            monte_carlo: None,
        }
    }

    #[test]
    fn scenario_only_dh_feasible() {
        let contract = base_contract(true, false);
        let result = decide(&contract, &DecisionConfig::default());
        assert_eq!(result.choice, Choice::Dh);
        assert!(!result.robust);
        assert_eq!(
            result.reason_codes,
            vec![DecisionReasonCode::OnlyDhFeasible, DecisionReasonCode::McMissing]
        );
    }

    #[test]
    fn scenario_cost_dominant_dh_robust() {
        let mut contract = base_contract(true, true);
        contract.district_heating.lcoh = QuantileSummary { p05: 75.2, p50: 75.2, p95: 75.2 };
        contract.heat_pumps.lcoh = QuantileSummary { p05: 82.5, p50: 82.5, p95: 82.5 };
        contract.district_heating.co2.p50 = 220.0;
        contract.heat_pumps.co2.p50 = 125.0;
        contract.monte_carlo = Some(MonteCarloBlock { dh_wins_fraction: 0.78, hp_wins_fraction: 0.22, n_samples: 500, seed: 42 });
        let result = decide(&contract, &DecisionConfig::default());
        assert_eq!(result.choice, Choice::Dh);
        assert!(result.robust);
        assert!(result.reason_codes.contains(&DecisionReasonCode::CostDominantDh));
        assert!(result.reason_codes.contains(&DecisionReasonCode::RobustDecision));
    }

    #[test]
    fn scenario_cost_close_co2_picks_hp_sensitive() {
        let mut contract = base_contract(true, true);
        contract.district_heating.lcoh = QuantileSummary { p05: 100.0, p50: 100.0, p95: 100.0 };
        contract.heat_pumps.lcoh = QuantileSummary { p05: 102.0, p50: 102.0, p95: 102.0 };
        contract.district_heating.co2.p50 = 220.0;
        contract.heat_pumps.co2.p50 = 125.0;
        contract.monte_carlo = Some(MonteCarloBlock { dh_wins_fraction: 0.40, hp_wins_fraction: 0.60, n_samples: 500, seed: 42 });
        let result = decide(&contract, &DecisionConfig::default());
        assert_eq!(result.choice, Choice::Hp);
        assert!(!result.robust);
        assert!(result.reason_codes.contains(&DecisionReasonCode::CostCloseUseCo2));
        assert!(result.reason_codes.contains(&DecisionReasonCode::Co2TiebreakerHp));
        assert!(result.reason_codes.contains(&DecisionReasonCode::SensitiveDecision));
    }

    #[test]
    fn scenario_none_feasible() {
        let contract = base_contract(false, false);
        let result = decide(&contract, &DecisionConfig::default());
        assert_eq!(result.choice, Choice::Undecided);
        assert!(result.reason_codes.contains(&DecisionReasonCode::NoneFeasible));
    }

    #[test]
    fn decision_is_idempotent() {
        let contract = base_contract(true, true);
        let a = decide(&contract, &DecisionConfig::default());
        let b = decide(&contract, &DecisionConfig::default());
        assert_eq!(a.choice, b.choice);
        assert_eq!(a.reason_codes, b.reason_codes);
    }

    #[test]
    fn exact_threshold_is_inclusive_robust() {
        let mut contract = base_contract(true, true);
        contract.district_heating.lcoh = QuantileSummary { p05: 75.0, p50: 75.0, p95: 75.0 };
        contract.heat_pumps.lcoh = QuantileSummary { p05: 150.0, p50: 150.0, p95: 150.0 };
        contract.monte_carlo = Some(MonteCarloBlock { dh_wins_fraction: 0.70, hp_wins_fraction: 0.30, n_samples: 500, seed: 42 });
        let result = decide(&contract, &DecisionConfig::default());
        assert!(result.robust);
    }
}
