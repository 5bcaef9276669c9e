//! Trunk routing and service-spur construction (spec §4.3).
//!
//! The trunk is the union of length-weighted shortest paths from the plant
//! node to every building attachment node -- i.e. a minimum-weight Steiner
//! tree approximation rooted at the plant. Ties are broken lexicographically
//! on node identifiers (here, the `NodeIndex` index value, which is a
//! deterministic function of insertion order) so the result is
//! reproducible.

use crate::attachment::Attachment;
use crate::street_graph::StreetEdge;
use dh_core::graph_utils::{reconstruct_path, shortest_paths};
use dh_core::{DhError, DhResult, Point};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;
use std::collections::BTreeSet;

pub type StreetGraph = Graph<Point, StreetEdge, Undirected>;

/// One segment of the trunk topology: an undirected edge between two graph
/// nodes carrying the route's physical length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrunkEdge {
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub length_m: f64,
}

/// A dedicated spur connecting a building's attachment node to its own
/// service junction.
#[derive(Debug, Clone)]
pub struct ServiceSpur {
    pub building_id: String,
    pub attachment_node: NodeIndex,
    pub building_junction: Point,
    pub length_m: f64,
}

/// The full routed topology prior to pipe sizing.
#[derive(Debug, Clone)]
pub struct RoutedTopology {
    pub trunk_edges: Vec<TrunkEdge>,
    pub service_spurs: Vec<ServiceSpur>,
}

/// Route the trunk as the union of shortest paths from `plant_node` to every
/// attachment node, and add one service spur per building from its
/// attachment node to a dedicated building junction located at the
/// building's own centroid.
pub fn route_network(
    graph: &StreetGraph,
    plant_node: NodeIndex,
    attachments: &[Attachment],
    building_centroids: &[(String, Point)],
) -> DhResult<RoutedTopology> {
    let (dist, prev) = shortest_paths(graph, plant_node, |e| e.length_m);

    let mut trunk_nodes: BTreeSet<(usize, usize)> = BTreeSet::new();
    for att in attachments {
        if !dist.contains_key(&att.attachment_node) {
            return Err(DhError::InvalidGeometry(format!(
                "building {} attachment node is not reachable from the plant",
                att.building_id
            )));
        }
        let path = reconstruct_path(&prev, plant_node, att.attachment_node).ok_or_else(|| {
            DhError::InvalidGeometry(format!(
                "no path from plant to building {} attachment node",
                att.building_id
            ))
        })?;
        for w in path.windows(2) {
            let (mut a, mut b) = (w[0].index(), w[1].index());
            if a > b {
                std::mem::swap(&mut a, &mut b);
            }
            trunk_nodes.insert((a, b));
        }
    }

    let mut trunk_edges = Vec::with_capacity(trunk_nodes.len());
    for (a, b) in trunk_nodes {
        let (from, to) = (NodeIndex::new(a), NodeIndex::new(b));
        let edge = graph
            .find_edge(from, to)
            .ok_or_else(|| DhError::InvalidGeometry("trunk edge vanished from graph".into()))?;
        trunk_edges.push(TrunkEdge {
            from,
            to,
            length_m: graph[edge].length_m,
        });
    }
    // Deterministic ordering regardless of BTreeSet iteration already being
    // sorted; kept explicit for clarity at call sites that rely on order.
    trunk_edges.sort_by_key(|e| (e.from.index(), e.to.index()));

    let mut service_spurs = Vec::with_capacity(attachments.len());
    for att in attachments {
        let centroid = building_centroids
            .iter()
            .find(|(id, _)| id == &att.building_id)
            .map(|(_, p)| *p)
            .ok_or_else(|| {
                DhError::InvalidGeometry(format!(
                    "no centroid recorded for building {}",
                    att.building_id
                ))
            })?;
        let attach_point = graph[att.attachment_node];
        service_spurs.push(ServiceSpur {
            building_id: att.building_id.clone(),
            attachment_node: att.attachment_node,
            building_junction: centroid,
            length_m: attach_point.distance(&centroid).max(1.0),
        });
    }

    Ok(RoutedTopology { trunk_edges, service_spurs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::Attachment;

    fn small_graph() -> (StreetGraph, NodeIndex, NodeIndex, NodeIndex) {
        let mut g: StreetGraph = Graph::new_undirected();
        let plant = g.add_node(Point::new(0.0, 0.0));
        let mid = g.add_node(Point::new(50.0, 0.0));
        let b1 = g.add_node(Point::new(100.0, 0.0));
        g.add_edge(plant, mid, StreetEdge { street_id: "s1".into(), length_m: 50.0 });
        g.add_edge(mid, b1, StreetEdge { street_id: "s2".into(), length_m: 50.0 });
        (g, plant, mid, b1)
    }

    #[test]
    fn routes_shortest_path_tree() {
        let (g, plant, _mid, b1) = small_graph();
        let attachments = vec![Attachment { building_id: "b1".into(), attachment_node: b1, distance_m: 0.0 }];
        let centroids = vec![("b1".into(), Point::new(100.0, 5.0))];
        let topo = route_network(&g, plant, &attachments, &centroids).unwrap();
        assert_eq!(topo.trunk_edges.len(), 2);
        assert_eq!(topo.service_spurs.len(), 1);
        assert!((topo.service_spurs[0].length_m - 5.0).abs() < 1e-9);
    }

    #[test]
    fn unreachable_attachment_errors() {
        let (g, plant, _mid, _b1) = small_graph();
        let mut g2 = g;
        let isolated = g2.add_node(Point::new(500.0, 500.0));
        let attachments = vec![Attachment { building_id: "b2".into(), attachment_node: isolated, distance_m: 0.0 }];
        let centroids = vec![("b2".into(), Point::new(500.0, 500.0))];
        assert!(route_network(&g2, plant, &attachments, &centroids).is_err());
    }
}
