//! LV grid builder (spec §4.7).
//!
//! Boundary contract: exactly one slack element at a single MV bus, at least
//! one transformer from that MV bus to an LV bus, endpoints within a
//! tolerance collapse to one bus, and every LV bus must reach a transformer
//! in the undirected graph. Mirrors `dh-cha`'s `street_graph` dedup-and-graph
//! pattern, generalized to the MV/LV two-level topology.

use dh_core::graph_utils::all_reachable_from;
use dh_core::{DhError, DhResult, Id, LvBus, LvBusKind, LvLine, Transformer};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;
use std::collections::HashMap;

pub const DEFAULT_ENDPOINT_SNAP_TOLERANCE_M: f64 = 1.0;

/// The deduplicated, validated LV grid topology ready for power-flow.
#[derive(Debug, Clone)]
pub struct LvGrid {
    pub buses: Vec<LvBus>,
    pub lines: Vec<LvLine>,
    pub transformers: Vec<Transformer>,
}

impl LvGrid {
    pub fn bus(&self, id: &str) -> Option<&LvBus> {
        self.buses.iter().find(|b| b.id == id)
    }
}

/// Collapse bus endpoints within `snap_tolerance_m` of each other to a
/// single canonical bus id, keeping the lexicographically smallest id of
/// each cluster so the result is deterministic regardless of input order.
fn canonical_bus_ids(buses: &[LvBus], snap_tolerance_m: f64) -> HashMap<Id, Id> {
    let mut canonical: HashMap<Id, Id> = buses.iter().map(|b| (b.id.clone(), b.id.clone())).collect();
    for i in 0..buses.len() {
        for j in (i + 1)..buses.len() {
            if buses[i].coords.distance(&buses[j].coords) <= snap_tolerance_m {
                let a = canonical[&buses[i].id].clone();
                let b = canonical[&buses[j].id].clone();
                let keep = if a <= b { a } else { b };
                for v in canonical.values_mut() {
                    if *v == buses[i].id || *v == buses[j].id || *v == a || *v == b {
                        *v = keep.clone();
                    }
                }
            }
        }
    }
    canonical
}

/// Build the deduplicated LV grid and validate the boundary contract.
pub fn build_lv_grid(
    buses: Vec<LvBus>,
    lines: Vec<LvLine>,
    transformers: Vec<Transformer>,
    snap_tolerance_m: f64,
) -> DhResult<LvGrid> {
    let canonical = canonical_bus_ids(&buses, snap_tolerance_m);

    let mut merged: HashMap<Id, LvBus> = HashMap::new();
    for bus in &buses {
        let id = canonical[&bus.id].clone();
        merged.entry(id.clone()).or_insert_with(|| LvBus { id, ..bus.clone() });
    }
    let mut dedup_buses: Vec<LvBus> = merged.into_values().collect();
    dedup_buses.sort_by(|a, b| a.id.cmp(&b.id));

    let lines: Vec<LvLine> = lines
        .into_iter()
        .map(|mut line| {
            line.from_bus = canonical.get(&line.from_bus).cloned().unwrap_or(line.from_bus);
            line.to_bus = canonical.get(&line.to_bus).cloned().unwrap_or(line.to_bus);
            line
        })
        .collect();

    let transformers: Vec<Transformer> = transformers
        .into_iter()
        .map(|mut t| {
            t.hv_bus = canonical.get(&t.hv_bus).cloned().unwrap_or(t.hv_bus);
            t.lv_bus = canonical.get(&t.lv_bus).cloned().unwrap_or(t.lv_bus);
            t
        })
        .collect();

    let slack_count = dedup_buses.iter().filter(|b| b.kind == LvBusKind::MvSlack).count();
    if slack_count != 1 {
        return Err(DhError::BoundaryViolation(format!(
            "expected exactly one MV slack bus, found {slack_count}"
        )));
    }
    if transformers.is_empty() {
        return Err(DhError::BoundaryViolation("no transformer from MV to LV bus".into()));
    }
    let slack_id = dedup_buses
        .iter()
        .find(|b| b.kind == LvBusKind::MvSlack)
        .map(|b| b.id.clone())
        .expect("checked above");
    if !transformers.iter().any(|t| t.hv_bus == slack_id) {
        return Err(DhError::BoundaryViolation(format!(
            "no transformer connects the MV slack bus {slack_id}"
        )));
    }

    let lv_buses: Vec<&LvBus> = dedup_buses.iter().filter(|b| b.kind != LvBusKind::MvSlack).collect();

    let mut graph: Graph<Id, (), Undirected> = Graph::new_undirected();
    let mut index_by_id: HashMap<Id, NodeIndex> = HashMap::new();
    for bus in &lv_buses {
        let idx = graph.add_node(bus.id.clone());
        index_by_id.insert(bus.id.clone(), idx);
    }
    for line in &lines {
        if let (Some(&a), Some(&b)) = (index_by_id.get(&line.from_bus), index_by_id.get(&line.to_bus)) {
            graph.add_edge(a, b, ());
        }
    }

    let sources: Vec<NodeIndex> = transformers
        .iter()
        .filter_map(|t| index_by_id.get(&t.lv_bus))
        .copied()
        .collect();
    let targets: Vec<NodeIndex> = index_by_id.values().copied().collect();
    if !all_reachable_from(&graph, &sources, &targets) {
        let unreachable: Vec<&str> = lv_buses
            .iter()
            .filter(|b| {
                let idx = index_by_id[&b.id];
                !dh_core::graph_utils::reachable_set(&graph, &sources).contains(&idx)
            })
            .map(|b| b.id.as_str())
            .collect();
        return Err(DhError::UnsuppliedBuses(unreachable.join(", ")));
    }

    Ok(LvGrid { buses: dedup_buses, lines, transformers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::units::Kilovolts;
    use dh_core::Point;

    fn bus(id: &str, x: f64, y: f64, kind: LvBusKind) -> LvBus {
        LvBus { id: id.into(), nominal_kv: Kilovolts(if kind == LvBusKind::MvSlack { 20.0 } else { 0.4 }), coords: Point::new(x, y), kind }
    }

    fn line(id: &str, from: &str, to: &str) -> LvLine {
        LvLine {
            id: id.into(),
            from_bus: from.into(),
            to_bus: to.into(),
            length_km: 0.1,
            r_ohm_per_km: 0.284,
            x_ohm_per_km: 0.083,
            c_nf_per_km: 260.0,
            max_current_ka: 0.27,
        }
    }

    fn transformer(id: &str, hv: &str, lv: &str) -> Transformer {
        Transformer {
            id: id.into(),
            hv_bus: hv.into(),
            lv_bus: lv.into(),
            rated_mva: 0.4,
            short_circuit_voltage_pct: 4.0,
            resistive_loss_pct: 1.0,
            tap_position: 0,
            tap_range: (-2, 2),
        }
    }

    #[test]
    fn builds_valid_grid() {
        let buses = vec![
            bus("mv1", 0.0, 0.0, LvBusKind::MvSlack),
            bus("tlv1", 0.0, 1.0, LvBusKind::TransformerLvSide),
            bus("b1", 10.0, 1.0, LvBusKind::LvNode),
        ];
        let lines = vec![line("l1", "tlv1", "b1")];
        let transformers = vec![transformer("t1", "mv1", "tlv1")];
        let grid = build_lv_grid(buses, lines, transformers, DEFAULT_ENDPOINT_SNAP_TOLERANCE_M).unwrap();
        assert_eq!(grid.buses.len(), 3);
    }

    #[test]
    fn endpoints_within_tolerance_collapse() {
        let buses = vec![
            bus("mv1", 0.0, 0.0, LvBusKind::MvSlack),
            bus("tlv1", 0.0, 1.0, LvBusKind::TransformerLvSide),
            bus("b1", 10.0, 1.0, LvBusKind::LvNode),
            bus("b1_dup", 10.3, 1.0, LvBusKind::LvNode),
        ];
        let lines = vec![line("l1", "tlv1", "b1"), line("l2", "b1_dup", "tlv1")];
        let transformers = vec![transformer("t1", "mv1", "tlv1")];
        let grid = build_lv_grid(buses, lines, transformers, DEFAULT_ENDPOINT_SNAP_TOLERANCE_M).unwrap();
        assert_eq!(grid.buses.len(), 3);
    }

    #[test]
    fn missing_slack_is_boundary_violation() {
        let buses = vec![bus("tlv1", 0.0, 1.0, LvBusKind::TransformerLvSide)];
        let err = build_lv_grid(buses, vec![], vec![], DEFAULT_ENDPOINT_SNAP_TOLERANCE_M).unwrap_err();
        assert!(matches!(err, DhError::BoundaryViolation(_)));
    }

    #[test]
    fn unreachable_bus_is_unsupplied() {
        let buses = vec![
            bus("mv1", 0.0, 0.0, LvBusKind::MvSlack),
            bus("tlv1", 0.0, 1.0, LvBusKind::TransformerLvSide),
            bus("isolated", 500.0, 500.0, LvBusKind::LvNode),
        ];
        let transformers = vec![transformer("t1", "mv1", "tlv1")];
        let err = build_lv_grid(buses, vec![], transformers, DEFAULT_ENDPOINT_SNAP_TOLERANCE_M).unwrap_err();
        assert!(matches!(err, DhError::UnsuppliedBuses(_)));
    }
}
