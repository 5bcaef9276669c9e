//! Convergence stabilizer (spec §4.5).
//!
//! A Newton-Raphson pipe-flow solver is singular on a strict tree (no
//! cycle to balance). This module closes exactly one cycle by bridging the
//! two attachment nodes farthest from the plant with a short, deliberately
//! oversized-resistance pipe, then perturbs every other pipe's roughness by
//! a small seeded random factor to break any remaining numerical symmetry.

use crate::sizing::SizedPipe;
use dh_core::graph_utils::shortest_paths;
use dh_core::{DhError, DhResult, Pipe, PipeRole};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed geometry of the stabilizer bridge pipe (spec §4.5 step 2).
pub const STABILIZER_LENGTH_M: f64 = 10.0;
pub const STABILIZER_DN: &str = "DN50";
pub const STABILIZER_ROUGHNESS_MM: f64 = 100.0;
pub const STABILIZER_INNER_DIAMETER_M: f64 = 0.0545;

/// Starting perturbation half-width; doubled on each non-convergence retry
/// up to `eps_ceiling` (spec §4.5 step 4).
pub const DEFAULT_EPSILON: f64 = 1e-5;
pub const DEFAULT_EPSILON_CEILING: f64 = 1e-4;

/// The two attachment nodes bridged by the stabilizer pipe and its
/// resulting pipe id, kept so later stages can exclude/identify it.
#[derive(Debug, Clone)]
pub struct StabilizerBridge {
    pub node_a: NodeIndex,
    pub node_b: NodeIndex,
    pub pipe_id: String,
}

/// Identify the two attachment nodes at maximum graph distance from the
/// plant (spec §4.5 step 1): the shortest-path distance from `plant_node`
/// is computed once, and the two attachment nodes with the largest such
/// distance are selected. Ties broken by ascending node index.
pub fn farthest_attachment_pair<N, E>(
    graph: &Graph<N, E, Undirected>,
    plant_node: NodeIndex,
    attachment_nodes: &[NodeIndex],
    weight: impl Fn(&E) -> f64,
) -> DhResult<(NodeIndex, NodeIndex)> {
    if attachment_nodes.len() < 2 {
        return Err(DhError::InvalidGeometry(
            "at least two attachment nodes are required to stabilize the network".into(),
        ));
    }
    let (dist, _) = shortest_paths(graph, plant_node, weight);
    let mut ranked: Vec<(NodeIndex, f64)> = attachment_nodes
        .iter()
        .map(|n| (*n, *dist.get(n).unwrap_or(&f64::NEG_INFINITY)))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.index().cmp(&b.0.index()))
    });
    Ok((ranked[0].0, ranked[1].0))
}

/// Build the stabilizer bridge pipe (spec §4.5 step 2). The pipe carries a
/// design-time mass flow of zero; its actual flow is resolved by the
/// hydraulic solver's loop-correction pass.
pub fn build_stabilizer_pipe(bridge_nodes: (NodeIndex, NodeIndex)) -> SizedPipe {
    let (a, b) = bridge_nodes;
    SizedPipe {
        pipe: Pipe {
            id: "stabilizer-bridge".to_string(),
            from_node: format!("{}", a.index()),
            to_node: format!("{}", b.index()),
            role: PipeRole::LoopStabilizer,
            length_m: STABILIZER_LENGTH_M,
            dn: STABILIZER_DN.to_string(),
            inner_diameter_m: STABILIZER_INNER_DIAMETER_M,
            roughness_mm: STABILIZER_ROUGHNESS_MM,
            u_w_per_m_k: 0.21,
        },
        mass_flow_kg_s: 0.0,
        velocity_ms: 0.0,
        pressure_drop_bar_per_100m: 0.0,
        v_abs_max_exceeded: false,
        dp_per_m_exceeded: false,
    }
}

/// Perturb every pipe's roughness by a uniform random factor in
/// `[1-eps, 1+eps]`, drawn from a stream seeded deterministically by
/// `seed` (spec §4.5 step 3). The stabilizer bridge pipe itself (matched
/// by id) is left untouched -- its roughness is fixed by construction.
pub fn perturb_roughness(pipes: &mut [SizedPipe], seed: u64, eps: f64, stabilizer_pipe_id: &str) {
    let mut rng = StdRng::seed_from_u64(seed);
    for p in pipes.iter_mut() {
        if p.pipe.id == stabilizer_pipe_id {
            continue;
        }
        let factor = rng.gen_range((1.0 - eps)..=(1.0 + eps));
        p.pipe.roughness_mm *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::Point;

    #[test]
    fn farthest_pair_picks_largest_distances() {
        let mut g: Graph<Point, f64, Undirected> = Graph::new_undirected();
        let plant = g.add_node(Point::new(0.0, 0.0));
        let near = g.add_node(Point::new(10.0, 0.0));
        let far1 = g.add_node(Point::new(200.0, 0.0));
        let far2 = g.add_node(Point::new(0.0, 200.0));
        g.add_edge(plant, near, 10.0);
        g.add_edge(plant, far1, 200.0);
        g.add_edge(plant, far2, 200.0);
        let (a, b) = farthest_attachment_pair(&g, plant, &[near, far1, far2], |w| *w).unwrap();
        assert!((a == far1 && b == far2) || (a == far2 && b == far1));
    }

    #[test]
    fn requires_two_attachment_nodes() {
        let mut g: Graph<Point, f64, Undirected> = Graph::new_undirected();
        let plant = g.add_node(Point::new(0.0, 0.0));
        let only = g.add_node(Point::new(1.0, 0.0));
        g.add_edge(plant, only, 1.0);
        assert!(farthest_attachment_pair(&g, plant, &[only], |w| *w).is_err());
    }

    #[test]
    fn perturbation_stays_within_bounds() {
        let bridge = build_stabilizer_pipe((NodeIndex::new(0), NodeIndex::new(1)));
        let mut pipes = vec![bridge.clone()];
        pipes[0].pipe.id = "p1".into();
        pipes[0].pipe.roughness_mm = 0.1;
        perturb_roughness(&mut pipes, 42, 1e-4, "stabilizer-bridge");
        assert!(pipes[0].pipe.roughness_mm >= 0.1 * (1.0 - 1e-4));
        assert!(pipes[0].pipe.roughness_mm <= 0.1 * (1.0 + 1e-4));
    }
}
