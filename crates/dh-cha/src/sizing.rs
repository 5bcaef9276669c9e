//! Pipe sizing (spec §4.4).
//!
//! For each routed edge, the downstream design mass flow is converted to a
//! required diameter, a catalog DN is selected, and the selection is
//! validated against velocity and Swamee-Jain pressure-drop limits,
//! advancing through the catalog until both hold or it is exhausted.

use crate::routing::RoutedTopology;
use dh_catalogs::pipe_catalog::{entries_from, smallest_fitting, PipeCatalogEntry};
use dh_core::{DhError, DhResult, Pipe, PipeRole};
use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::PI;

/// Physical constants and design targets governing sizing (spec §4.4).
#[derive(Debug, Clone, Copy)]
pub struct SizingParams {
    pub water_density_kg_per_m3: f64,
    pub water_dynamic_viscosity_pa_s: f64,
    pub specific_heat_kj_per_kg_k: f64,
    pub design_delta_t_k: f64,
    pub target_velocity_ms: f64,
    pub design_margin: f64,
    pub max_pressure_drop_bar_per_100m: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            water_density_kg_per_m3: 970.0,
            water_dynamic_viscosity_pa_s: 3.55e-4,
            specific_heat_kj_per_kg_k: 4.186,
            design_delta_t_k: 30.0,
            target_velocity_ms: 1.5,
            design_margin: 1.25,
            max_pressure_drop_bar_per_100m: 0.3,
        }
    }
}

/// A sized pipe plus the flags raised if the catalog was exhausted before
/// both constraints were satisfied.
#[derive(Debug, Clone)]
pub struct SizedPipe {
    pub pipe: Pipe,
    pub mass_flow_kg_s: f64,
    pub velocity_ms: f64,
    pub pressure_drop_bar_per_100m: f64,
    pub v_abs_max_exceeded: bool,
    pub dp_per_m_exceeded: bool,
}

/// Required diameter for a target velocity (spec §4.4: d = sqrt(4*mdot / (pi*rho*v))).
pub fn required_diameter_m(mass_flow_kg_s: f64, params: &SizingParams) -> f64 {
    (4.0 * mass_flow_kg_s / (PI * params.water_density_kg_per_m3 * params.target_velocity_ms)).sqrt()
}

/// Mass flow rate to carry `design_heat_kw` at the system delta-T.
pub fn mass_flow_kg_s(design_heat_kw: f64, params: &SizingParams) -> f64 {
    if design_heat_kw <= 0.0 {
        return 0.0;
    }
    design_heat_kw / (params.specific_heat_kj_per_kg_k * params.design_delta_t_k)
}

fn velocity_ms(mass_flow_kg_s: f64, inner_diameter_m: f64, rho: f64) -> f64 {
    let area = PI * inner_diameter_m * inner_diameter_m / 4.0;
    if area <= 0.0 {
        return f64::INFINITY;
    }
    mass_flow_kg_s / (rho * area)
}

/// Darcy-Weisbach pressure drop per 100 m using the Swamee-Jain explicit
/// friction-factor approximation.
pub fn pressure_drop_bar_per_100m(
    velocity_ms: f64,
    inner_diameter_m: f64,
    roughness_mm: f64,
    params: &SizingParams,
) -> f64 {
    if velocity_ms <= 0.0 || inner_diameter_m <= 0.0 {
        return 0.0;
    }
    let rho = params.water_density_kg_per_m3;
    let mu = params.water_dynamic_viscosity_pa_s;
    let reynolds = rho * velocity_ms * inner_diameter_m / mu;
    let relative_roughness = (roughness_mm / 1000.0) / inner_diameter_m;
    let friction_factor = if reynolds < 2300.0 {
        64.0 / reynolds.max(1.0)
    } else {
        let denom = (relative_roughness / 3.7 + 5.74 / reynolds.powf(0.9)).log10();
        0.25 / (denom * denom)
    };
    let delta_p_pa = friction_factor * (100.0 / inner_diameter_m) * (rho * velocity_ms * velocity_ms / 2.0);
    delta_p_pa / 1.0e5
}

/// Pick the smallest catalog DN satisfying both velocity and pressure-drop
/// limits, starting from `smallest_fitting(d_req)` and advancing through the
/// catalog. If no entry satisfies both, the largest catalog entry is
/// returned with the appropriate flag(s) set.
fn select_dn(
    mass_flow_kg_s: f64,
    role: PipeRole,
    params: &SizingParams,
) -> (&'static PipeCatalogEntry, f64, f64, bool, bool) {
    let d_req = required_diameter_m(mass_flow_kg_s, params);
    let start = smallest_fitting(d_req);
    let limit_ms = role.velocity_limit_ms();

    let mut last: Option<(&'static PipeCatalogEntry, f64, f64)> = None;
    for entry in entries_from(start.dn) {
        let v = velocity_ms(mass_flow_kg_s, entry.inner_diameter_m, params.water_density_kg_per_m3);
        let dp = pressure_drop_bar_per_100m(v, entry.inner_diameter_m, entry.roughness_mm, params);
        let v_ok = v <= limit_ms;
        let dp_ok = dp <= params.max_pressure_drop_bar_per_100m;
        if v_ok && dp_ok {
            return (entry, v, dp, false, false);
        }
        last = Some((entry, v, dp));
    }
    let (entry, v, dp) = last.unwrap_or_else(|| {
        let v = velocity_ms(mass_flow_kg_s, start.inner_diameter_m, params.water_density_kg_per_m3);
        let dp = pressure_drop_bar_per_100m(v, start.inner_diameter_m, start.roughness_mm, params);
        (start, v, dp)
    });
    let v_abs_max_exceeded = v > limit_ms;
    let dp_per_m_exceeded = dp > params.max_pressure_drop_bar_per_100m;
    (entry, v, dp, v_abs_max_exceeded, dp_per_m_exceeded)
}

/// Orient the trunk's undirected edges into a tree rooted at `plant_node`
/// via BFS, returning `(parent, child, length_m)` triples in BFS order.
fn orient_tree(topo: &RoutedTopology, plant_node: NodeIndex) -> DhResult<Vec<(NodeIndex, NodeIndex, f64)>> {
    let mut adjacency: HashMap<NodeIndex, Vec<(NodeIndex, f64)>> = HashMap::new();
    for e in &topo.trunk_edges {
        adjacency.entry(e.from).or_default().push((e.to, e.length_m));
        adjacency.entry(e.to).or_default().push((e.from, e.length_m));
    }

    let mut visited = HashSet::new();
    visited.insert(plant_node);
    let mut queue = VecDeque::new();
    queue.push_back(plant_node);
    let mut oriented = Vec::new();

    while let Some(node) = queue.pop_front() {
        let mut neighbors = adjacency.get(&node).cloned().unwrap_or_default();
        neighbors.sort_by_key(|(n, _)| n.index());
        for (next, length_m) in neighbors {
            if visited.insert(next) {
                oriented.push((node, next, length_m));
                queue.push_back(next);
            }
        }
    }

    let trunk_node_count: HashSet<NodeIndex> = adjacency.keys().copied().collect();
    if oriented.len() + 1 < trunk_node_count.len().max(1) {
        return Err(DhError::InvalidGeometry(
            "trunk topology is not connected to the plant".into(),
        ));
    }
    Ok(oriented)
}

/// Size the trunk and service pipes of a routed topology, applying the
/// design margin to every building's design load before sizing.
pub fn size_network(
    topo: &RoutedTopology,
    plant_node: NodeIndex,
    building_design_heat_kw: &HashMap<String, f64>,
    params: &SizingParams,
) -> DhResult<Vec<SizedPipe>> {
    let oriented = orient_tree(topo, plant_node)?;

    let margined: HashMap<&str, f64> = building_design_heat_kw
        .iter()
        .map(|(id, kw)| (id.as_str(), kw * params.design_margin))
        .collect();

    let mut node_direct_load: HashMap<NodeIndex, f64> = HashMap::new();
    for spur in &topo.service_spurs {
        let load = margined.get(spur.building_id.as_str()).copied().unwrap_or(0.0);
        *node_direct_load.entry(spur.attachment_node).or_insert(0.0) += load;
    }

    let mut subtree_load: HashMap<NodeIndex, f64> = HashMap::new();
    for (_, child, _) in &oriented {
        subtree_load.entry(*child).or_insert(0.0);
    }
    subtree_load.entry(plant_node).or_insert(0.0);
    for (node, load) in &node_direct_load {
        *subtree_load.entry(*node).or_insert(0.0) += load;
    }
    for (parent, child, _) in oriented.iter().rev() {
        let child_total = *subtree_load.get(child).unwrap_or(&0.0);
        *subtree_load.entry(*parent).or_insert(0.0) += child_total;
    }

    let mut sized = Vec::new();

    for (i, (from, to, length_m)) in oriented.iter().enumerate() {
        let downstream_kw = subtree_load.get(to).copied().unwrap_or(0.0);
        let mdot = mass_flow_kg_s(downstream_kw, params);
        for (role, suffix) in [(PipeRole::TrunkSupply, "supply"), (PipeRole::TrunkReturn, "return")] {
            let (entry, v, dp, v_exceeded, dp_exceeded) = select_dn(mdot, role, params);
            sized.push(SizedPipe {
                pipe: Pipe {
                    id: format!("trunk-{i}-{suffix}"),
                    from_node: format!("{}", from.index()),
                    to_node: format!("{}", to.index()),
                    role,
                    length_m: *length_m,
                    dn: entry.dn.to_string(),
                    inner_diameter_m: entry.inner_diameter_m,
                    roughness_mm: entry.roughness_mm,
                    u_w_per_m_k: entry.u_w_per_m_k,
                },
                mass_flow_kg_s: mdot,
                velocity_ms: v,
                pressure_drop_bar_per_100m: dp,
                v_abs_max_exceeded: v_exceeded,
                dp_per_m_exceeded: dp_exceeded,
            });
        }
    }

    for spur in &topo.service_spurs {
        let load_kw = margined.get(spur.building_id.as_str()).copied().unwrap_or(0.0);
        let mdot = mass_flow_kg_s(load_kw, params);
        for (role, suffix) in [(PipeRole::ServiceSupply, "supply"), (PipeRole::ServiceReturn, "return")] {
            let (entry, v, dp, v_exceeded, dp_exceeded) = select_dn(mdot, role, params);
            sized.push(SizedPipe {
                pipe: Pipe {
                    id: format!("service-{}-{suffix}", spur.building_id),
                    from_node: format!("{}", spur.attachment_node.index()),
                    to_node: format!("building:{}", spur.building_id),
                    role,
                    length_m: spur.length_m,
                    dn: entry.dn.to_string(),
                    inner_diameter_m: entry.inner_diameter_m,
                    roughness_mm: entry.roughness_mm,
                    u_w_per_m_k: entry.u_w_per_m_k,
                },
                mass_flow_kg_s: mdot,
                velocity_ms: v,
                pressure_drop_bar_per_100m: dp,
                v_abs_max_exceeded: v_exceeded,
                dp_per_m_exceeded: dp_exceeded,
            });
        }
    }

    Ok(sized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{ServiceSpur, TrunkEdge};
    use dh_core::Point;

    #[test]
    fn required_diameter_matches_formula() {
        let params = SizingParams::default();
        let d = required_diameter_m(10.0, &params);
        let expected = (4.0 * 10.0 / (PI * 970.0 * 1.5)).sqrt();
        assert!((d - expected).abs() < 1e-9);
    }

    #[test]
    fn higher_flow_selects_larger_or_equal_dn() {
        let params = SizingParams::default();
        let (small, ..) = select_dn(0.5, PipeRole::TrunkSupply, &params);
        let (big, ..) = select_dn(50.0, PipeRole::TrunkSupply, &params);
        let small_idx = dh_catalogs::pipe_catalog::PIPE_CATALOG
            .iter()
            .position(|e| e.dn == small.dn)
            .unwrap();
        let big_idx = dh_catalogs::pipe_catalog::PIPE_CATALOG
            .iter()
            .position(|e| e.dn == big.dn)
            .unwrap();
        assert!(big_idx >= small_idx);
    }

    #[test]
    fn sizes_a_two_hop_tree_with_one_building() {
        let topo = RoutedTopology {
            trunk_edges: vec![TrunkEdge { from: NodeIndex::new(0), to: NodeIndex::new(1), length_m: 100.0 }],
            service_spurs: vec![ServiceSpur {
                building_id: "b1".into(),
                attachment_node: NodeIndex::new(1),
                building_junction: Point::new(0.0, 0.0),
                length_m: 5.0,
            }],
        };
        let mut loads = HashMap::new();
        loads.insert("b1".to_string(), 20.0);
        let params = SizingParams::default();
        let sized = size_network(&topo, NodeIndex::new(0), &loads, &params).unwrap();
        // 2 trunk pipes (supply+return) + 2 service pipes (supply+return)
        assert_eq!(sized.len(), 4);
        assert!(sized.iter().all(|p| p.mass_flow_kg_s > 0.0));
    }
}
