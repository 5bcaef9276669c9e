//! DHA KPI extractor & mitigation classifier (spec §4.11).

use crate::lv_grid::LvGrid;
use dh_core::graph_utils::shortest_paths;
use dh_core::{Id, PowerFlowSnapshot};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_V_MIN_PU: f64 = 0.90;
pub const DEFAULT_V_MAX_PU: f64 = 1.10;
pub const LINE_LOADING_WARNING_PCT: f64 = 80.0;
pub const LINE_LOADING_LIMIT_PCT: f64 = 100.0;
pub const TRAFO_LOADING_LIMIT_PCT: f64 = 100.0;
pub const TRAFO_LOADING_SEVERE_PCT: f64 = 120.0;
pub const DEFAULT_OPERATIONAL_VIOLATION_FRACTION_THRESHOLD: f64 = 0.05;
pub const DEFAULT_LONG_FEEDER_KM: f64 = 0.5;

/// Closed reason-code set for DHA feasibility (spec §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DhaReasonCode {
    HpOk,
    HpVoltageViolation,
    HpLineViolation,
    HpTrafoViolation,
    DhaMissingKpis,
    DhaNonConvergence,
}

impl DhaReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DhaReasonCode::HpOk => "HP_OK",
            DhaReasonCode::HpVoltageViolation => "HP_VOLTAGE_VIOLATION",
            DhaReasonCode::HpLineViolation => "HP_LINE_VIOLATION",
            DhaReasonCode::HpTrafoViolation => "HP_TRAFO_VIOLATION",
            DhaReasonCode::DhaMissingKpis => "DHA_MISSING_KPIS",
            DhaReasonCode::DhaNonConvergence => "DHA_NON_CONVERGENCE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationClass {
    None,
    Operational,
    Reinforcement,
    Expansion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    Low,
    Medium,
    High,
}

impl MitigationClass {
    /// Closed list of recommended actions for this class.
    pub fn recommended_actions(&self) -> &'static [&'static str] {
        match self {
            MitigationClass::None => &[],
            MitigationClass::Operational => &["tap_change", "curtailment_schedule"],
            MitigationClass::Reinforcement => &["conductor_upgrade", "new_parallel_feeder"],
            MitigationClass::Expansion => &["transformer_upgrade", "new_substation"],
        }
    }

    pub fn cost_tier(&self) -> CostTier {
        match self {
            MitigationClass::None => CostTier::Low,
            MitigationClass::Operational => CostTier::Low,
            MitigationClass::Reinforcement => CostTier::Medium,
            MitigationClass::Expansion => CostTier::High,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DhaKpiConfig {
    pub v_min_pu: f64,
    pub v_max_pu: f64,
    pub operational_violation_fraction_threshold: f64,
    pub long_feeder_km: f64,
}

impl Default for DhaKpiConfig {
    fn default() -> Self {
        Self {
            v_min_pu: DEFAULT_V_MIN_PU,
            v_max_pu: DEFAULT_V_MAX_PU,
            operational_violation_fraction_threshold: DEFAULT_OPERATIONAL_VIOLATION_FRACTION_THRESHOLD,
            long_feeder_km: DEFAULT_LONG_FEEDER_KM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhaKpis {
    pub worst_voltage_pu: f64,
    pub worst_bus: Option<Id>,
    pub worst_hour: Option<usize>,
    pub max_feeder_loading_pct: f64,
    pub voltage_violation_count: usize,
    pub line_violation_count: usize,
    pub transformer_violation_count: usize,
    pub critical_hour_count: usize,
    pub worst_voltage_feeder_distance_km: Option<f64>,
    pub mitigation_class: MitigationClass,
    pub recommended_actions: Vec<String>,
    pub cost_tier: CostTier,
    pub reason_codes: Vec<DhaReasonCode>,
}

fn missing_kpis() -> DhaKpis {
    DhaKpis {
        worst_voltage_pu: 1.0,
        worst_bus: None,
        worst_hour: None,
        max_feeder_loading_pct: 0.0,
        voltage_violation_count: 0,
        line_violation_count: 0,
        transformer_violation_count: 0,
        critical_hour_count: 0,
        worst_voltage_feeder_distance_km: None,
        mitigation_class: MitigationClass::None,
        recommended_actions: vec![],
        cost_tier: CostTier::Low,
        reason_codes: vec![DhaReasonCode::DhaMissingKpis],
    }
}

/// Shortest-path distance in km from `bus_id` to the nearest transformer's
/// LV-side bus, over the LV line graph, for the feeder-distance aggregate.
fn feeder_distance_km(grid: &LvGrid, bus_id: &Id) -> Option<f64> {
    let mut graph: Graph<Id, f64, Undirected> = Graph::new_undirected();
    let mut index_by_id: HashMap<Id, NodeIndex> = HashMap::new();
    for bus in &grid.buses {
        let idx = graph.add_node(bus.id.clone());
        index_by_id.insert(bus.id.clone(), idx);
    }
    for line in &grid.lines {
        if let (Some(&a), Some(&b)) = (index_by_id.get(&line.from_bus), index_by_id.get(&line.to_bus)) {
            graph.add_edge(a, b, line.length_km);
        }
    }
    let start = *index_by_id.get(bus_id)?;
    let (dist, _) = shortest_paths(&graph, start, |w| *w);
    grid.transformers
        .iter()
        .filter_map(|t| index_by_id.get(&t.lv_bus).and_then(|idx| dist.get(idx)))
        .cloned()
        .fold(None, |acc, d| Some(acc.map_or(d, |a: f64| a.min(d))))
}

/// Extract DHA KPIs and the mitigation classification from a set of
/// per-hour power-flow snapshots (spec §4.11).
pub fn extract_kpis(grid: &LvGrid, snapshots: &[PowerFlowSnapshot], config: &DhaKpiConfig) -> DhaKpis {
    if snapshots.is_empty() {
        return missing_kpis();
    }
    if snapshots.iter().all(|s| !s.converged) {
        let mut kpis = missing_kpis();
        kpis.reason_codes = vec![DhaReasonCode::DhaNonConvergence];
        return kpis;
    }

    let converged: Vec<&PowerFlowSnapshot> = snapshots.iter().filter(|s| s.converged).collect();

    let mut worst_voltage_pu = 1.0_f64;
    let mut worst_bus: Option<Id> = None;
    let mut worst_hour: Option<usize> = None;
    let mut max_feeder_loading_pct = 0.0_f64;
    let mut voltage_violation_count = 0usize;
    let mut line_violation_count = 0usize;
    let mut transformer_violation_count = 0usize;
    let mut critical_hours: std::collections::HashSet<usize> = std::collections::HashSet::new();
    let mut worst_deviation = 0.0_f64;
    let mut severe_transformer = false;
    let mut line_overload = false;

    for snapshot in &converged {
        let mut hour_critical = false;
        for (bus_id, v) in &snapshot.bus_voltage_pu {
            if *v < config.v_min_pu || *v > config.v_max_pu {
                voltage_violation_count += 1;
                hour_critical = true;
                let deviation = (config.v_min_pu - v).max(v - config.v_max_pu);
                if deviation > worst_deviation {
                    worst_deviation = deviation;
                    worst_voltage_pu = *v;
                    worst_bus = Some(bus_id.clone());
                    worst_hour = Some(snapshot.hour);
                }
            }
        }
        for loading in snapshot.line_loading_pct.values() {
            max_feeder_loading_pct = max_feeder_loading_pct.max(*loading);
            if *loading > LINE_LOADING_LIMIT_PCT {
                line_violation_count += 1;
                line_overload = true;
                hour_critical = true;
            }
        }
        for loading in snapshot.transformer_loading_pct.values() {
            max_feeder_loading_pct = max_feeder_loading_pct.max(*loading);
            if *loading > TRAFO_LOADING_LIMIT_PCT {
                transformer_violation_count += 1;
                hour_critical = true;
                if *loading > TRAFO_LOADING_SEVERE_PCT {
                    severe_transformer = true;
                }
            }
        }
        if hour_critical {
            critical_hours.insert(snapshot.hour);
        }
    }

    let worst_voltage_feeder_distance_km = worst_bus.as_ref().and_then(|bus| feeder_distance_km(grid, bus));
    let long_feeder = worst_voltage_feeder_distance_km.map(|d| d > config.long_feeder_km).unwrap_or(false);
    let has_voltage_violation = voltage_violation_count > 0;
    let critical_hour_count = critical_hours.len();
    let violated_fraction = critical_hour_count as f64 / converged.len() as f64;

    let mitigation_class = if transformer_violation_count > 0 {
        MitigationClass::Expansion
    } else if line_overload || (has_voltage_violation && long_feeder) {
        MitigationClass::Reinforcement
    } else if critical_hour_count == 0 {
        MitigationClass::None
    } else if violated_fraction <= config.operational_violation_fraction_threshold && !severe_transformer {
        MitigationClass::Operational
    } else {
        MitigationClass::Reinforcement
    };

    let mut reason_codes = Vec::new();
    if critical_hour_count == 0 {
        reason_codes.push(DhaReasonCode::HpOk);
    } else {
        if voltage_violation_count > 0 {
            reason_codes.push(DhaReasonCode::HpVoltageViolation);
        }
        if line_violation_count > 0 {
            reason_codes.push(DhaReasonCode::HpLineViolation);
        }
        if transformer_violation_count > 0 {
            reason_codes.push(DhaReasonCode::HpTrafoViolation);
        }
    }
    if snapshots.iter().any(|s| !s.converged) {
        reason_codes.push(DhaReasonCode::DhaNonConvergence);
    }

    DhaKpis {
        worst_voltage_pu,
        worst_bus,
        worst_hour,
        max_feeder_loading_pct,
        voltage_violation_count,
        line_violation_count,
        transformer_violation_count,
        critical_hour_count,
        worst_voltage_feeder_distance_km,
        mitigation_class,
        recommended_actions: mitigation_class.recommended_actions().iter().map(|s| s.to_string()).collect(),
        cost_tier: mitigation_class.cost_tier(),
        reason_codes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::{LvBus, LvBusKind, LvLine, Point, Transformer};
    use dh_core::units::Kilovolts;

    fn grid() -> LvGrid {
        LvGrid {
            buses: vec![
                LvBus { id: "mv1".into(), nominal_kv: Kilovolts(20.0), coords: Point::new(0.0, 0.0), kind: LvBusKind::MvSlack },
                LvBus { id: "tlv".into(), nominal_kv: Kilovolts(0.4), coords: Point::new(0.0, 1.0), kind: LvBusKind::TransformerLvSide },
                LvBus { id: "b1".into(), nominal_kv: Kilovolts(0.4), coords: Point::new(600.0, 1.0), kind: LvBusKind::LvNode },
            ],
            lines: vec![LvLine {
                id: "l1".into(),
                from_bus: "tlv".into(),
                to_bus: "b1".into(),
                length_km: 0.6,
                r_ohm_per_km: 0.284,
                x_ohm_per_km: 0.083,
                c_nf_per_km: 260.0,
                max_current_ka: 0.27,
            }],
            transformers: vec![Transformer {
                id: "t1".into(),
                hv_bus: "mv1".into(),
                lv_bus: "tlv".into(),
                rated_mva: 0.4,
                short_circuit_voltage_pct: 4.0,
                resistive_loss_pct: 1.0,
                tap_position: 0,
                tap_range: (-2, 2),
            }],
        }
    }

    fn snapshot(hour: usize, v_b1: f64, line_pct: f64, trafo_pct: f64) -> PowerFlowSnapshot {
        let mut bus_voltage_pu = HashMap::new();
        bus_voltage_pu.insert("tlv".to_string(), 1.0);
        bus_voltage_pu.insert("b1".to_string(), v_b1);
        let mut line_loading_pct = HashMap::new();
        line_loading_pct.insert("l1".to_string(), line_pct);
        let mut transformer_loading_pct = HashMap::new();
        transformer_loading_pct.insert("t1".to_string(), trafo_pct);
        PowerFlowSnapshot { hour, converged: true, bus_voltage_pu, line_loading_pct, transformer_loading_pct }
    }

    #[test]
    fn no_violations_is_none_class() {
        let kpis = extract_kpis(&grid(), &[snapshot(10, 1.0, 50.0, 50.0)], &DhaKpiConfig::default());
        assert_eq!(kpis.mitigation_class, MitigationClass::None);
        assert_eq!(kpis.reason_codes, vec![DhaReasonCode::HpOk]);
    }

    #[test]
    fn transformer_overload_is_expansion() {
        let kpis = extract_kpis(&grid(), &[snapshot(10, 1.0, 50.0, 125.0)], &DhaKpiConfig::default());
        assert_eq!(kpis.mitigation_class, MitigationClass::Expansion);
        assert!(kpis.reason_codes.contains(&DhaReasonCode::HpTrafoViolation));
    }

    #[test]
    fn line_overload_is_reinforcement() {
        let kpis = extract_kpis(&grid(), &[snapshot(10, 1.0, 110.0, 50.0)], &DhaKpiConfig::default());
        assert_eq!(kpis.mitigation_class, MitigationClass::Reinforcement);
    }

    #[test]
    fn voltage_violation_with_long_feeder_is_reinforcement() {
        let kpis = extract_kpis(&grid(), &[snapshot(10, 0.85, 50.0, 50.0)], &DhaKpiConfig::default());
        assert_eq!(kpis.mitigation_class, MitigationClass::Reinforcement);
        assert!(kpis.worst_voltage_feeder_distance_km.unwrap() > 0.5);
    }

    #[test]
    fn empty_snapshots_is_missing_kpis() {
        let kpis = extract_kpis(&grid(), &[], &DhaKpiConfig::default());
        assert_eq!(kpis.reason_codes, vec![DhaReasonCode::DhaMissingKpis]);
    }

    #[test]
    fn all_non_convergent_is_non_convergence() {
        let mut s = snapshot(10, 1.0, 50.0, 50.0);
        s.converged = false;
        let kpis = extract_kpis(&grid(), &[s], &DhaKpiConfig::default());
        assert_eq!(kpis.reason_codes, vec![DhaReasonCode::DhaNonConvergence]);
    }
}
