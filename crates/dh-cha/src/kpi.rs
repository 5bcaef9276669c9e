//! CHA KPI extractor (spec §4.6).

use dh_core::{HydraulicNetworkResult, PipeRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const VELOCITY_LIMIT_MS: f64 = 1.5;
pub const VELOCITY_SHARE_THRESHOLD: f64 = 0.95;
pub const MAX_DP_BAR_PER_100M: f64 = 0.3;

/// Closed reason-code set for CHA feasibility (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChaReasonCode {
    DhOk,
    DhVelocityViolation,
    DhDpViolation,
    ChaMissingKpis,
    ChaNonConvergence,
}

impl ChaReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChaReasonCode::DhOk => "DH_OK",
            ChaReasonCode::DhVelocityViolation => "DH_VELOCITY_VIOLATION",
            ChaReasonCode::DhDpViolation => "DH_DP_VIOLATION",
            ChaReasonCode::ChaMissingKpis => "CHA_MISSING_KPIS",
            ChaReasonCode::ChaNonConvergence => "CHA_NON_CONVERGENCE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaKpis {
    pub v_share_within_limits: f64,
    pub v_max_ms: f64,
    pub dp_max_bar_per_100m: f64,
    pub loss_share_pct: f64,
    pub total_length_m: f64,
    pub length_by_role_m: HashMap<String, f64>,
    pub velocity_ok: bool,
    pub dp_ok: bool,
    pub feasible: bool,
    pub reason_codes: Vec<ChaReasonCode>,
}

/// Extract KPIs from a solved hydraulic network, the pipe roles keyed by
/// id (since [`HydraulicNetworkResult`] carries only ids, not roles), and
/// the total annual building heat demand used for the loss-share ratio.
pub fn extract_kpis(
    result: &HydraulicNetworkResult,
    pipe_roles: &HashMap<String, PipeRole>,
    pipe_lengths_m: &HashMap<String, f64>,
    total_annual_building_demand_kwh: f64,
) -> ChaKpis {
    if !result.converged {
        return ChaKpis {
            v_share_within_limits: 0.0,
            v_max_ms: 0.0,
            dp_max_bar_per_100m: 0.0,
            loss_share_pct: 0.0,
            total_length_m: 0.0,
            length_by_role_m: HashMap::new(),
            velocity_ok: false,
            dp_ok: false,
            feasible: false,
            reason_codes: vec![ChaReasonCode::ChaNonConvergence],
        };
    }

    if result.pipes.is_empty() {
        return ChaKpis {
            v_share_within_limits: 0.0,
            v_max_ms: 0.0,
            dp_max_bar_per_100m: 0.0,
            loss_share_pct: 0.0,
            total_length_m: 0.0,
            length_by_role_m: HashMap::new(),
            velocity_ok: false,
            dp_ok: false,
            feasible: false,
            reason_codes: vec![ChaReasonCode::ChaMissingKpis],
        };
    }

    let within_limit = result
        .pipes
        .iter()
        .filter(|p| p.velocity_ms.value() <= VELOCITY_LIMIT_MS)
        .count();
    let v_share_within_limits = within_limit as f64 / result.pipes.len() as f64;
    let v_max_ms = result
        .pipes
        .iter()
        .map(|p| p.velocity_ms.value())
        .fold(0.0_f64, f64::max);
    let dp_max_bar_per_100m = result
        .pipes
        .iter()
        .map(|p| p.pressure_drop_per_100m_bar.value())
        .fold(0.0_f64, f64::max);

    let total_heat_loss_kw: f64 = result.pipes.iter().map(|p| p.heat_loss_kw.value()).sum();
    // Loss share relates an instantaneous design-hour loss rate to the
    // annual demand; both are design-hour/annual figures so the ratio
    // is scaled by hours-per-year to stay dimensionally a percentage of
    // the annual energy balance.
    let loss_share_pct = if total_annual_building_demand_kwh > 1e-9 {
        (total_heat_loss_kw * dh_core::HOURS_PER_YEAR as f64 / total_annual_building_demand_kwh) * 100.0
    } else {
        0.0
    };

    let mut total_length_m = 0.0;
    let mut length_by_role_m: HashMap<String, f64> = HashMap::new();
    for p in &result.pipes {
        let length = pipe_lengths_m.get(&p.pipe_id).copied().unwrap_or(0.0);
        total_length_m += length;
        if let Some(role) = pipe_roles.get(&p.pipe_id) {
            *length_by_role_m.entry(role_name(*role).to_string()).or_insert(0.0) += length;
        }
    }

    let velocity_ok = v_share_within_limits >= VELOCITY_SHARE_THRESHOLD;
    let dp_ok = dp_max_bar_per_100m <= MAX_DP_BAR_PER_100M;
    let feasible = velocity_ok && dp_ok;

    let mut reason_codes = Vec::new();
    if feasible {
        reason_codes.push(ChaReasonCode::DhOk);
    } else {
        if !velocity_ok {
            reason_codes.push(ChaReasonCode::DhVelocityViolation);
        }
        if !dp_ok {
            reason_codes.push(ChaReasonCode::DhDpViolation);
        }
    }

    ChaKpis {
        v_share_within_limits,
        v_max_ms,
        dp_max_bar_per_100m,
        loss_share_pct,
        total_length_m,
        length_by_role_m,
        velocity_ok,
        dp_ok,
        feasible,
        reason_codes,
    }
}

fn role_name(role: PipeRole) -> &'static str {
    match role {
        PipeRole::TrunkSupply => "trunk_supply",
        PipeRole::TrunkReturn => "trunk_return",
        PipeRole::ServiceSupply => "service_supply",
        PipeRole::ServiceReturn => "service_return",
        PipeRole::LoopStabilizer => "loop_stabilizer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::units::{Bar, BarPer100m, Celsius, Kilowatts, MetersPerSecond};
    use dh_core::PipeHydraulicResult;

    fn pipe_result(id: &str, v: f64, dp: f64, loss_kw: f64) -> PipeHydraulicResult {
        PipeHydraulicResult {
            pipe_id: id.into(),
            velocity_ms: MetersPerSecond(v),
            pressure_drop_bar: Bar(dp * 3.0),
            pressure_drop_per_100m_bar: BarPer100m(dp),
            t_from_c: Celsius(80.0),
            t_to_c: Celsius(75.0),
            heat_loss_kw: Kilowatts(loss_kw),
        }
    }

    #[test]
    fn non_convergence_forces_reason_code() {
        let result = HydraulicNetworkResult { converged: false, pipes: vec![], junctions: vec![] };
        let kpis = extract_kpis(&result, &HashMap::new(), &HashMap::new(), 1000.0);
        assert!(!kpis.feasible);
        assert_eq!(kpis.reason_codes, vec![ChaReasonCode::ChaNonConvergence]);
    }

    #[test]
    fn velocity_violation_detected() {
        let result = HydraulicNetworkResult {
            converged: true,
            pipes: vec![
                pipe_result("p1", 1.0, 0.1, 1.0),
                pipe_result("p2", 2.0, 0.1, 1.0),
            ],
            junctions: vec![],
        };
        let kpis = extract_kpis(&result, &HashMap::new(), &HashMap::new(), 1000.0);
        assert!(!kpis.velocity_ok);
        assert!(kpis.reason_codes.contains(&ChaReasonCode::DhVelocityViolation));
    }

    #[test]
    fn all_within_limits_is_feasible() {
        let result = HydraulicNetworkResult {
            converged: true,
            pipes: vec![
                pipe_result("p1", 1.0, 0.1, 1.0),
                pipe_result("p2", 1.2, 0.2, 1.0),
            ],
            junctions: vec![],
        };
        let kpis = extract_kpis(&result, &HashMap::new(), &HashMap::new(), 1000.0);
        assert!(kpis.feasible);
        assert_eq!(kpis.reason_codes, vec![ChaReasonCode::DhOk]);
    }
}
