//! The canonical KPI-contract record (spec §3, §4.13): the single versioned
//! document the decision engine and explanation generator consume. Mirrors
//! `dh_economics::monte_carlo::QuantileSummary`'s `{p05, p50, p95}` shape for
//! every quantile block so LCOH and CO2 share one representation.

use dh_cha::ChaReasonCode;
use dh_dha::{DhaReasonCode, MitigationClass};
use dh_economics::QuantileSummary;
use serde::{Deserialize, Serialize};

pub const CONTRACT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub created_utc: chrono::DateTime<chrono::Utc>,
    pub inputs: Vec<String>,
    pub git_commit: Option<String>,
    pub input_digest: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HydraulicsBlock {
    pub velocity_ok: bool,
    pub dp_ok: bool,
    pub v_max_ms: f64,
    pub v_share_within_limits: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LossesBlock {
    pub total_length_m: f64,
    pub loss_share_pct: f64,
    pub pump_power_kw: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictHeatingBlock {
    pub feasible: bool,
    pub reasons: Vec<String>,
    pub lcoh: QuantileSummary,
    pub co2: QuantileSummary,
    pub hydraulics: HydraulicsBlock,
    pub losses: LossesBlock,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LvGridBlock {
    pub planning_warning: bool,
    pub max_feeder_loading_pct: f64,
    pub voltage_violations_total: i64,
    pub line_violations_total: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HpSystemBlock {
    pub hp_total_kw_design: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatPumpsBlock {
    pub feasible: bool,
    pub reasons: Vec<String>,
    pub lcoh: QuantileSummary,
    pub co2: QuantileSummary,
    pub lv_grid: LvGridBlock,
    pub hp_system: HpSystemBlock,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonteCarloBlock {
    pub dh_wins_fraction: f64,
    pub hp_wins_fraction: f64,
    pub n_samples: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiContract {
    pub version: String,
    pub cluster_id: String,
    pub metadata: ContractMetadata,
    pub district_heating: DistrictHeatingBlock,
    pub heat_pumps: HeatPumpsBlock,
    pub monte_carlo: Option<MonteCarloBlock>,
}

/// The closed reason-code set a contract's `reasons` lists may draw from:
/// the union of [`ChaReasonCode`] and [`DhaReasonCode`] string forms (spec
/// §8's "reason-code closure" property; emitters never write raw literals).
pub fn closed_reason_codes() -> Vec<&'static str> {
    let cha = [
        ChaReasonCode::DhOk,
        ChaReasonCode::DhVelocityViolation,
        ChaReasonCode::DhDpViolation,
        ChaReasonCode::ChaMissingKpis,
        ChaReasonCode::ChaNonConvergence,
    ];
    let dha = [
        DhaReasonCode::HpOk,
        DhaReasonCode::HpVoltageViolation,
        DhaReasonCode::HpLineViolation,
        DhaReasonCode::HpTrafoViolation,
        DhaReasonCode::DhaMissingKpis,
        DhaReasonCode::DhaNonConvergence,
    ];
    cha.iter().map(|c| c.as_str()).chain(dha.iter().map(|c| c.as_str())).collect()
}

/// Mitigation classes that warrant the heat-pump option's `planning_warning`
/// flag (spec §4.13 via §4.11's mitigation classifier: anything beyond
/// "none" is a planning-relevant grid constraint).
pub fn warrants_planning_warning(class: MitigationClass) -> bool {
    !matches!(class, MitigationClass::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_reason_codes_contains_expected_members() {
        let codes = closed_reason_codes();
        assert!(codes.contains(&"DH_OK"));
        assert!(codes.contains(&"HP_TRAFO_VIOLATION"));
        assert_eq!(codes.len(), 11);
    }

    #[test]
    fn round_trips_through_json() {
        let contract = KpiContract {
            version: CONTRACT_VERSION.to_string(),
            cluster_id: "c1".into(),
            metadata: ContractMetadata {
                created_utc: chrono::Utc::now(),
                inputs: vec!["buildings.csv".into()],
                git_commit: None,
                input_digest: Some("abc".into()),
            },
            district_heating: DistrictHeatingBlock {
                feasible: true,
                reasons: vec!["DH_OK".into()],
                lcoh: QuantileSummary { p05: 60.0, p50: 70.0, p95: 80.0 },
                co2: QuantileSummary { p05: 200.0, p50: 220.0, p95: 240.0 },
                hydraulics: HydraulicsBlock { velocity_ok: true, dp_ok: true, v_max_ms: 1.2, v_share_within_limits: 1.0 },
                losses: LossesBlock { total_length_m: 500.0, loss_share_pct: 4.0, pump_power_kw: 5.0 },
            },
            heat_pumps: HeatPumpsBlock {
                feasible: true,
                reasons: vec!["HP_OK".into()],
                lcoh: QuantileSummary { p05: 75.0, p50: 82.0, p95: 90.0 },
                co2: QuantileSummary { p05: 110.0, p50: 125.0, p95: 140.0 },
                lv_grid: LvGridBlock { planning_warning: false, max_feeder_loading_pct: 60.0, voltage_violations_total: 0, line_violations_total: 0 },
                hp_system: HpSystemBlock { hp_total_kw_design: 1200.0 },
            },
            monte_carlo: Some(MonteCarloBlock { dh_wins_fraction: 0.6, hp_wins_fraction: 0.4, n_samples: 500, seed: 42 }),
        };
        let json = serde_json::to_string(&contract).unwrap();
        let back: KpiContract = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cluster_id, contract.cluster_id);
        assert_eq!(back.district_heating.lcoh.p50, contract.district_heating.lcoh.p50);
    }
}
