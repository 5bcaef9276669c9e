//! Multi-hour power-flow driver (spec §4.10).
//!
//! Runs a backward-forward sweep radial load flow — the standard DistFlow
//! approximation for balanced radial LV feeders — once per requested hour.
//! Load elements (the bus-aggregated active/reactive power) are recomputed
//! per hour by the caller via [`crate::load_composition`]; the network
//! topology and per-unit bases are built once and reused across hours,
//! mirroring `dh-cha::solver`'s build-once, solve-per-attempt split.

use crate::lv_grid::LvGrid;
use dh_core::{BuildingLoad, Id, LvBusKind, PowerFlowSnapshot};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy)]
pub struct PowerFlowConfig {
    pub tolerance_pu: f64,
    pub max_iterations: usize,
    pub base_mva: f64,
}

impl Default for PowerFlowConfig {
    fn default() -> Self {
        Self { tolerance_pu: 1e-6, max_iterations: 30, base_mva: 1.0 }
    }
}

struct RadialBranch {
    line_id: Id,
    parent: Id,
    r_pu: f64,
    x_pu: f64,
    rated_mva: f64,
}

/// A spanning forest of the LV line graph rooted at every transformer's
/// LV-side bus, used to drive the backward/forward sweep. Buses unreachable
/// from any transformer were already rejected by [`crate::lv_grid`].
struct RadialTopology {
    roots: Vec<Id>,
    /// BFS order, root-to-leaf, across the whole forest.
    order: Vec<Id>,
    children_of: HashMap<Id, Vec<Id>>,
    branch_of_child: HashMap<Id, RadialBranch>,
}

fn build_radial_topology(grid: &LvGrid, base_mva: f64) -> RadialTopology {
    let vbase_kv_of: HashMap<&Id, f64> = grid.buses.iter().map(|b| (&b.id, b.nominal_kv.value())).collect();

    let mut adjacency: HashMap<Id, Vec<(&Id, &dh_core::LvLine)>> = HashMap::new();
    for line in &grid.lines {
        adjacency.entry(line.from_bus.clone()).or_default().push((&line.to_bus, line));
        adjacency.entry(line.to_bus.clone()).or_default().push((&line.from_bus, line));
    }

    let roots: Vec<Id> = grid.transformers.iter().map(|t| t.lv_bus.clone()).collect();
    let mut visited: HashMap<Id, ()> = HashMap::new();
    let mut order = Vec::new();
    let mut children_of: HashMap<Id, Vec<Id>> = HashMap::new();
    let mut branch_of_child = HashMap::new();
    let mut queue: VecDeque<Id> = VecDeque::new();

    for root in &roots {
        if visited.contains_key(root) {
            continue;
        }
        visited.insert(root.clone(), ());
        order.push(root.clone());
        queue.push_back(root.clone());
        while let Some(node) = queue.pop_front() {
            let Some(neighbors) = adjacency.get(&node) else { continue };
            let mut sorted_neighbors = neighbors.clone();
            sorted_neighbors.sort_by(|a, b| a.0.cmp(b.0));
            for (neighbor, line) in sorted_neighbors {
                if visited.contains_key(neighbor) {
                    continue;
                }
                visited.insert(neighbor.clone(), ());
                children_of.entry(node.clone()).or_default().push(neighbor.clone());

                let vbase = vbase_kv_of.get(&node).copied().unwrap_or(0.4);
                let zbase = vbase * vbase / base_mva;
                let r_pu = line.r_ohm_per_km * line.length_km / zbase;
                let x_pu = line.x_ohm_per_km * line.length_km / zbase;
                let rated_mva = 3f64.sqrt() * vbase * line.max_current_ka;
                branch_of_child.insert(
                    neighbor.clone(),
                    RadialBranch { line_id: line.id.clone(), parent: node.clone(), r_pu, x_pu, rated_mva },
                );

                order.push(neighbor.clone());
                queue.push_back(neighbor.clone());
            }
        }
    }

    RadialTopology { roots, order, children_of, branch_of_child }
}

/// Solve one hour's radial load flow, returning the per-bus voltage,
/// per-line loading, and per-transformer loading snapshot.
pub fn solve_hour(
    grid: &LvGrid,
    topology_grid: &LvGrid,
    hour: usize,
    bus_loads: &HashMap<Id, BuildingLoad>,
    config: &PowerFlowConfig,
) -> PowerFlowSnapshot {
    let topology = build_radial_topology(topology_grid, config.base_mva);

    let lv_bus_ids: Vec<Id> =
        grid.buses.iter().filter(|b| b.kind != LvBusKind::MvSlack).map(|b| b.id.clone()).collect();

    let mut voltage_sq: HashMap<Id, f64> = lv_bus_ids.iter().map(|id| (id.clone(), 1.0)).collect();
    let mut converged = false;
    let mut downstream_p: HashMap<Id, f64> = HashMap::new();
    let mut downstream_q: HashMap<Id, f64> = HashMap::new();

    for _ in 0..config.max_iterations.max(1) {
        // Backward sweep: accumulate downstream active/reactive power
        // (own load plus downstream branches' load and losses), leaf to
        // root, using the previous iteration's voltage for loss estimates.
        downstream_p.clear();
        downstream_q.clear();
        for bus_id in topology.order.iter().rev() {
            let own_load = bus_loads.get(bus_id).copied().unwrap_or(BuildingLoad {
                active_power: dh_core::units::Megawatts(0.0),
                reactive_power: dh_core::units::Megavars(0.0),
            });
            let mut p = own_load.active_power.value() / config.base_mva;
            let mut q = own_load.reactive_power.value() / config.base_mva;
            if let Some(children) = topology.children_of.get(bus_id) {
                for child in children {
                    p += downstream_p.get(child).copied().unwrap_or(0.0);
                    q += downstream_q.get(child).copied().unwrap_or(0.0);
                    if let Some(branch) = topology.branch_of_child.get(child) {
                        let v_child_sq = voltage_sq.get(child).copied().unwrap_or(1.0).max(1e-6);
                        let p_child = downstream_p.get(child).copied().unwrap_or(0.0);
                        let q_child = downstream_q.get(child).copied().unwrap_or(0.0);
                        let s_sq = p_child * p_child + q_child * q_child;
                        p += branch.r_pu * s_sq / v_child_sq;
                        q += branch.x_pu * s_sq / v_child_sq;
                    }
                }
            }
            downstream_p.insert(bus_id.clone(), p);
            downstream_q.insert(bus_id.clone(), q);
        }

        // Forward sweep: propagate voltage from each root (1.0 pu) to its
        // descendants via the exact DistFlow branch equation.
        let mut next_voltage_sq: HashMap<Id, f64> = HashMap::new();
        for root in &topology.roots {
            next_voltage_sq.insert(root.clone(), 1.0);
        }
        let mut max_delta = 0.0_f64;
        for bus_id in &topology.order {
            if topology.roots.contains(bus_id) {
                continue;
            }
            let branch = &topology.branch_of_child[bus_id];
            let v_parent_sq = next_voltage_sq.get(&branch.parent).copied().unwrap_or(1.0);
            let p = downstream_p[bus_id];
            let q = downstream_q[bus_id];
            let s_sq = p * p + q * q;
            let v_child_sq =
                (v_parent_sq - 2.0 * (branch.r_pu * p + branch.x_pu * q) + (branch.r_pu * branch.r_pu + branch.x_pu * branch.x_pu) * s_sq / v_parent_sq.max(1e-6)).max(1e-6);
            let prev = voltage_sq.get(bus_id).copied().unwrap_or(1.0);
            max_delta = max_delta.max((v_child_sq - prev).abs());
            next_voltage_sq.insert(bus_id.clone(), v_child_sq);
        }
        voltage_sq = next_voltage_sq;

        if max_delta < config.tolerance_pu {
            converged = true;
            break;
        }
    }

    let bus_voltage_pu: HashMap<Id, f64> = lv_bus_ids
        .iter()
        .map(|id| (id.clone(), voltage_sq.get(id).copied().unwrap_or(1.0).sqrt()))
        .collect();

    let mut line_loading_pct: HashMap<Id, f64> = HashMap::new();
    for (child, branch) in &topology.branch_of_child {
        let p = downstream_p.get(child).copied().unwrap_or(0.0);
        let q = downstream_q.get(child).copied().unwrap_or(0.0);
        let s_mva = (p * p + q * q).sqrt() * config.base_mva;
        let loading_pct = if branch.rated_mva > 1e-9 { s_mva / branch.rated_mva * 100.0 } else { 0.0 };
        line_loading_pct.insert(branch.line_id.clone(), loading_pct);
    }

    let mut transformer_loading_pct: HashMap<Id, f64> = HashMap::new();
    for transformer in &grid.transformers {
        let p = downstream_p.get(&transformer.lv_bus).copied().unwrap_or(0.0);
        let q = downstream_q.get(&transformer.lv_bus).copied().unwrap_or(0.0);
        let s_mva = (p * p + q * q).sqrt() * config.base_mva;
        let loading_pct = if transformer.rated_mva > 1e-9 { s_mva / transformer.rated_mva * 100.0 } else { 0.0 };
        transformer_loading_pct.insert(transformer.id.clone(), loading_pct);
    }

    PowerFlowSnapshot { hour, converged, bus_voltage_pu, line_loading_pct, transformer_loading_pct }
}

/// Run the design hour and the top-N demand hours (spec §4.10), recording
/// one snapshot per requested hour.
pub fn run_multi_hour(
    grid: &LvGrid,
    bus_loads_by_hour: &HashMap<usize, HashMap<Id, BuildingLoad>>,
    hours: &[usize],
    config: &PowerFlowConfig,
) -> Vec<PowerFlowSnapshot> {
    hours
        .iter()
        .map(|&hour| {
            let empty = HashMap::new();
            let loads = bus_loads_by_hour.get(&hour).unwrap_or(&empty);
            solve_hour(grid, grid, hour, loads, config)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::units::{Kilovolts, Megavars, Megawatts};
    use dh_core::{LvBus, LvLine, Point, Transformer};

    fn small_grid() -> LvGrid {
        LvGrid {
            buses: vec![
                LvBus { id: "mv1".into(), nominal_kv: Kilovolts(20.0), coords: Point::new(0.0, 0.0), kind: LvBusKind::MvSlack },
                LvBus { id: "tlv".into(), nominal_kv: Kilovolts(0.4), coords: Point::new(0.0, 1.0), kind: LvBusKind::TransformerLvSide },
                LvBus { id: "b1".into(), nominal_kv: Kilovolts(0.4), coords: Point::new(100.0, 1.0), kind: LvBusKind::LvNode },
            ],
            lines: vec![LvLine {
                id: "l1".into(),
                from_bus: "tlv".into(),
                to_bus: "b1".into(),
                length_km: 0.2,
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

    #[test]
    fn light_load_converges_near_unity_voltage() {
        let grid = small_grid();
        let mut loads = HashMap::new();
        loads.insert("b1".to_string(), BuildingLoad { active_power: Megawatts(0.01), reactive_power: Megavars(0.002) });
        let snapshot = solve_hour(&grid, &grid, 10, &loads, &PowerFlowConfig::default());
        assert!(snapshot.converged);
        assert!((snapshot.bus_voltage_pu["b1"] - 1.0).abs() < 0.05);
        assert!(snapshot.line_loading_pct["l1"] < 100.0);
    }

    #[test]
    fn multi_hour_driver_returns_one_snapshot_per_hour() {
        let grid = small_grid();
        let mut loads_0 = HashMap::new();
        loads_0.insert("b1".to_string(), BuildingLoad { active_power: Megawatts(0.01), reactive_power: Megavars(0.0) });
        let mut by_hour = HashMap::new();
        by_hour.insert(10, loads_0);
        let snapshots = run_multi_hour(&grid, &by_hour, &[10, 20], &PowerFlowConfig::default());
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].hour, 20);
    }
}
