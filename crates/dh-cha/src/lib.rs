//! # dh-cha: district-heating network constructor, sizer, stabilizer, and
//! hydraulic-thermal KPI extractor (spec §4.1-§4.6).
//!
//! Pipeline: [`street_graph`] -> [`attachment`] -> [`routing`] ->
//! [`sizing`] -> [`stabilizer`] -> [`solver`] -> [`kpi`].

pub mod attachment;
pub mod kpi;
pub mod routing;
pub mod sizing;
pub mod solver;
pub mod stabilizer;
pub mod street_graph;

use dh_core::graph_utils::shortest_paths;
use dh_core::{Building, Cluster, DhError, DhResult, PipeRole, StreetSegment};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

pub use attachment::{attach_buildings, Attachment, AttachmentMode, DEFAULT_MAX_ATTACHMENT_DISTANCE_M};
pub use kpi::{extract_kpis, ChaKpis, ChaReasonCode};
pub use routing::{route_network, RoutedTopology, ServiceSpur, TrunkEdge};
pub use sizing::{size_network, SizedPipe, SizingParams};
pub use solver::{HydraulicSolverConfig, NewtonRaphsonHydraulicSolver, SolveOutcome};
pub use stabilizer::{
    build_stabilizer_pipe, farthest_attachment_pair, perturb_roughness, StabilizerBridge,
    DEFAULT_EPSILON, DEFAULT_EPSILON_CEILING,
};
pub use street_graph::{build_street_graph, StreetEdge, StreetGraph};

/// Configuration for one end-to-end CHA run, tying together the defaults
/// scattered across the component modules.
#[derive(Debug, Clone)]
pub struct ChaConfig {
    pub snap_tolerance_m: f64,
    pub attachment_mode: AttachmentMode,
    pub max_attachment_distance_m: f64,
    pub sizing: SizingParams,
    pub solver: HydraulicSolverConfig,
    pub stabilizer_epsilon: f64,
    pub stabilizer_epsilon_ceiling: f64,
    pub stabilizer_seed: u64,
    pub max_stabilizer_retries: usize,
}

impl Default for ChaConfig {
    fn default() -> Self {
        Self {
            snap_tolerance_m: street_graph::DEFAULT_SNAP_TOLERANCE_M,
            attachment_mode: AttachmentMode::SplitEdgePerBuilding,
            max_attachment_distance_m: DEFAULT_MAX_ATTACHMENT_DISTANCE_M,
            sizing: SizingParams::default(),
            solver: HydraulicSolverConfig::default(),
            stabilizer_epsilon: DEFAULT_EPSILON,
            stabilizer_epsilon_ceiling: DEFAULT_EPSILON_CEILING,
            stabilizer_seed: 0,
            max_stabilizer_retries: 4,
        }
    }
}

/// Full output of one CHA run: the KPIs plus enough of the intermediate
/// state (sized pipes, solver convergence) for the contract assembler and
/// report writer to consume.
#[derive(Debug, Clone)]
pub struct ChaRunResult {
    pub kpis: ChaKpis,
    pub sized_pipes: Vec<SizedPipe>,
    pub converged: bool,
    pub stabilizer_flow_kg_s: f64,
    pub stabilizer_flow_fraction: f64,
}

/// Run the full CHA pipeline for one cluster: build the street graph,
/// attach buildings, route the trunk, size every pipe, stabilize
/// convergence, solve, and extract KPIs.
///
/// `total_annual_demand_kwh` is the real integrated annual heat demand for
/// `buildings` (the caller's `HourlyProfileMatrix::annual_sum_kwh` summed
/// across the cluster's members), used as the denominator for the
/// loss-share KPI (spec §4.6) — not derived from the design-hour slice,
/// since one hour's load cannot stand in for a year's.
pub fn run_cha(
    streets: &[StreetSegment],
    buildings: &[Building],
    cluster: &Cluster,
    building_design_heat_kw: &HashMap<String, f64>,
    total_annual_demand_kwh: f64,
    config: &ChaConfig,
) -> DhResult<ChaRunResult> {
    cluster
        .validate()
        .map_err(DhError::InvalidGeometry)?;

    tracing::info!(cluster_id = %cluster.id, buildings = buildings.len(), "starting CHA run");

    let (mut graph, _index_by_key) = build_street_graph(streets, config.snap_tolerance_m)?;
    let plant_node = nearest_node(&graph, cluster.plant_location);

    let attachments = attach_buildings(
        &mut graph,
        buildings,
        config.attachment_mode,
        config.max_attachment_distance_m,
    )?;

    let centroids: Vec<(String, dh_core::Point)> =
        buildings.iter().map(|b| (b.id.clone(), b.centroid)).collect();
    let topo = route_network(&graph, plant_node, &attachments, &centroids)?;

    let mut sized = size_network(&topo, plant_node, building_design_heat_kw, &config.sizing)?;

    let attachment_nodes: Vec<NodeIndex> = attachments.iter().map(|a| a.attachment_node).collect();
    let (node_a, node_b) =
        farthest_attachment_pair(&graph, plant_node, &attachment_nodes, |e| e.length_m)?;
    let bridge = build_stabilizer_pipe((node_a, node_b));
    let stabilizer_pipe_id = bridge.pipe.id.clone();
    sized.push(bridge);

    let (path_dist, path_prev) = shortest_paths(&graph, node_a, |e| e.length_m);
    let _ = path_dist;
    let tree_path = dh_core::graph_utils::reconstruct_path(&path_prev, node_a, node_b)
        .ok_or_else(|| DhError::InvalidGeometry("no tree path between stabilizer nodes".into()))?;
    let loop_path_pipe_ids: Vec<String> = tree_path
        .windows(2)
        .filter_map(|w| {
            let (a, b) = (w[0].index(), w[1].index());
            sized.iter().find(|p| {
                p.pipe.role == PipeRole::TrunkSupply
                    && ((p.pipe.from_node == a.to_string() && p.pipe.to_node == b.to_string())
                        || (p.pipe.from_node == b.to_string() && p.pipe.to_node == a.to_string()))
            })
        })
        .map(|p| p.pipe.id.clone())
        .collect();

    let mut eps = config.stabilizer_epsilon;
    let mut attempt = 0;
    let outcome = loop {
        let mut attempt_pipes = sized.clone();
        perturb_roughness(&mut attempt_pipes, config.stabilizer_seed, eps, &stabilizer_pipe_id);
        let solver = NewtonRaphsonHydraulicSolver::new()
            .with_tolerance(config.solver.tolerance_bar)
            .with_max_iterations(config.solver.max_iterations)
            .with_supply_temp(config.solver.supply_temp_c)
            .with_ambient_temp(config.solver.ambient_temp_c);
        match solver.solve(&attempt_pipes, &stabilizer_pipe_id, &loop_path_pipe_ids, &config.sizing) {
            Ok(outcome) => break Some(outcome),
            Err(_) if attempt < config.max_stabilizer_retries => {
                attempt += 1;
                eps = (eps * 2.0).min(config.stabilizer_epsilon_ceiling * 16.0);
                continue;
            }
            Err(_) => break None,
        }
    };

    let Some(outcome) = outcome else {
        tracing::warn!(cluster_id = %cluster.id, attempts = attempt, "hydraulic solver did not converge");
        let result = dh_core::HydraulicNetworkResult { converged: false, pipes: vec![], junctions: vec![] };
        let pipe_roles: HashMap<String, PipeRole> =
            sized.iter().map(|p| (p.pipe.id.clone(), p.pipe.role)).collect();
        let pipe_lengths: HashMap<String, f64> =
            sized.iter().map(|p| (p.pipe.id.clone(), p.pipe.length_m)).collect();
        let kpis = extract_kpis(&result, &pipe_roles, &pipe_lengths, total_annual_demand_kwh);
        return Ok(ChaRunResult {
            kpis,
            sized_pipes: sized,
            converged: false,
            stabilizer_flow_kg_s: 0.0,
            stabilizer_flow_fraction: 0.0,
        });
    };

    let pipe_roles: HashMap<String, PipeRole> =
        sized.iter().map(|p| (p.pipe.id.clone(), p.pipe.role)).collect();
    let pipe_lengths: HashMap<String, f64> =
        sized.iter().map(|p| (p.pipe.id.clone(), p.pipe.length_m)).collect();
    let kpis = extract_kpis(&outcome.result, &pipe_roles, &pipe_lengths, total_annual_demand_kwh);
    let stabilizer_flow_fraction = if outcome.total_flow_kg_s > 1e-9 {
        outcome.stabilizer_flow_kg_s / outcome.total_flow_kg_s
    } else {
        0.0
    };

    Ok(ChaRunResult {
        kpis,
        sized_pipes: sized,
        converged: outcome.result.converged,
        stabilizer_flow_kg_s: outcome.stabilizer_flow_kg_s,
        stabilizer_flow_fraction,
    })
}

fn nearest_node(graph: &StreetGraph, point: dh_core::Point) -> NodeIndex {
    graph
        .node_indices()
        .min_by(|a, b| {
            graph[*a]
                .distance(&point)
                .partial_cmp(&graph[*b].distance(&point))
                .unwrap()
        })
        .expect("street graph must have at least one node")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::{
        Building, Cluster, ConstructionBand, Crs, Point, Polygon, Polyline, RenovationState,
        StreetSegment, UseType,
    };

    fn building(id: &str, x: f64, y: f64) -> Building {
        Building {
            id: id.into(),
            centroid: Point::new(x, y),
            crs: Crs("EPSG:25833".into()),
            footprint: Polygon {
                points: vec![Point::new(x, y), Point::new(x + 1.0, y), Point::new(x, y + 1.0)],
            },
            use_type: UseType::ResidentialSfh,
            construction_band: ConstructionBand::Post2010,
            renovation_state: RenovationState::Full,
            floor_area_m2: None,
            volume_m3: None,
            heat_transmission_coefficient_w_per_k: None,
            annual_heat_demand_kwh: Some(40_000.0),
        }
    }

    fn street(id: &str, pts: Vec<(f64, f64)>) -> StreetSegment {
        StreetSegment {
            id: id.into(),
            geometry: Polyline { points: pts.into_iter().map(|(x, y)| Point::new(x, y)).collect() },
            name: None,
            crs: Crs("EPSG:25833".into()),
        }
    }

    #[test]
    fn end_to_end_run_produces_kpis() {
        let streets = vec![
            street("main", vec![(0.0, 0.0), (100.0, 0.0), (200.0, 0.0)]),
            street("branch", vec![(100.0, 0.0), (100.0, 100.0)]),
        ];
        let buildings = vec![building("b1", 50.0, 5.0), building("b2", 195.0, 5.0), building("b3", 100.0, 95.0)];
        let cluster = Cluster {
            id: "c1".into(),
            member_buildings: vec!["b1".into(), "b2".into(), "b3".into()],
            plant_location: Point::new(0.0, 0.0),
            plant_crs: Crs("EPSG:25833".into()),
            design_hour: 100,
            design_load_kw: 60.0,
        };
        let mut loads = HashMap::new();
        loads.insert("b1".to_string(), 20.0);
        loads.insert("b2".to_string(), 20.0);
        loads.insert("b3".to_string(), 20.0);

        let config = ChaConfig::default();
        let total_annual_demand_kwh = 3 * 40_000.0;
        let result = run_cha(&streets, &buildings, &cluster, &loads, total_annual_demand_kwh, &config).unwrap();
        assert!(result.converged);
        assert!(!result.sized_pipes.is_empty());
        assert!(result.kpis.v_max_ms >= 0.0);
        assert!(result.stabilizer_flow_fraction < 0.2);
    }
}
