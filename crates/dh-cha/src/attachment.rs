//! Building attachment (spec §4.2): for each building, find the nearest
//! street edge, project the centroid onto it, and split the edge there.

use crate::street_graph::StreetEdge;
use dh_core::{Building, DhError, DhResult, Point};
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Undirected;

pub type StreetGraph = Graph<Point, StreetEdge, Undirected>;

/// How a building is attached to the street graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentMode {
    /// Split the nearest edge at the centroid's projection (default).
    SplitEdgePerBuilding,
    /// Snap to whichever existing node is closest, without splitting.
    NearestExistingNode,
}

/// Default limit on centroid-to-edge distance before a building is
/// considered unattachable (spec §4.2).
pub const DEFAULT_MAX_ATTACHMENT_DISTANCE_M: f64 = 150.0;

/// Result of attaching one building to the street graph.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub building_id: String,
    pub attachment_node: NodeIndex,
    pub distance_m: f64,
}

/// Attach every building to the nearest street edge (or node), mutating
/// `graph` in place by inserting split nodes/edges as needed.
///
/// Fails with [`DhError::BuildingTooFar`] if any building's nearest
/// edge/node is farther than `max_distance_m`.
pub fn attach_buildings(
    graph: &mut StreetGraph,
    buildings: &[Building],
    mode: AttachmentMode,
    max_distance_m: f64,
) -> DhResult<Vec<Attachment>> {
    let mut attachments = Vec::with_capacity(buildings.len());
    for building in buildings {
        let centroid = building.centroid;
        let attachment = match mode {
            AttachmentMode::SplitEdgePerBuilding => attach_split(graph, &building.id, centroid)?,
            AttachmentMode::NearestExistingNode => attach_nearest_node(graph, &building.id, centroid)?,
        };
        if attachment.distance_m > max_distance_m {
            return Err(DhError::BuildingTooFar(format!(
                "building {} is {:.1} m from the nearest street element (limit {:.1} m)",
                building.id, attachment.distance_m, max_distance_m
            )));
        }
        attachments.push(attachment);
    }
    Ok(attachments)
}

fn nearest_edge(graph: &StreetGraph, p: Point) -> Option<(EdgeIndex, Point, f64)> {
    let mut best: Option<(EdgeIndex, Point, f64)> = None;
    for edge in graph.edge_references() {
        let a = graph[edge.source()];
        let b = graph[edge.target()];
        let (proj, dist) = closest_point_on_segment(a, b, p);
        if best.as_ref().map(|(_, _, d)| dist < *d).unwrap_or(true) {
            best = Some((edge.id(), proj, dist));
        }
    }
    best
}

fn closest_point_on_segment(a: Point, b: Point, p: Point) -> (Point, f64) {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq < 1e-12 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let proj = Point::new(a.x + t * dx, a.y + t * dy);
    (proj, proj.distance(&p))
}

fn attach_split(graph: &mut StreetGraph, building_id: &str, centroid: Point) -> DhResult<Attachment> {
    let Some((edge_idx, proj, dist)) = nearest_edge(graph, centroid) else {
        return Err(DhError::InvalidGeometry(format!(
            "no street edges available to attach building {building_id}"
        )));
    };
    let (a_idx, b_idx) = graph
        .edge_endpoints(edge_idx)
        .expect("edge_idx came from edge_references");
    let edge_weight = graph.remove_edge(edge_idx).expect("edge exists");

    let a = graph[a_idx];
    let b = graph[b_idx];
    // If the projection coincides with an existing endpoint, reuse it rather
    // than inserting a zero-length stub edge.
    let eps = 1e-6;
    if proj.distance(&a) < eps {
        graph.add_edge(a_idx, b_idx, edge_weight);
        return Ok(Attachment { building_id: building_id.to_string(), attachment_node: a_idx, distance_m: dist });
    }
    if proj.distance(&b) < eps {
        graph.add_edge(a_idx, b_idx, edge_weight);
        return Ok(Attachment { building_id: building_id.to_string(), attachment_node: b_idx, distance_m: dist });
    }

    let new_node = graph.add_node(proj);
    let len_a = a.distance(&proj);
    let len_b = proj.distance(&b);
    graph.add_edge(
        a_idx,
        new_node,
        StreetEdge { street_id: edge_weight.street_id.clone(), length_m: len_a },
    );
    graph.add_edge(
        new_node,
        b_idx,
        StreetEdge { street_id: edge_weight.street_id, length_m: len_b },
    );

    Ok(Attachment { building_id: building_id.to_string(), attachment_node: new_node, distance_m: dist })
}

fn attach_nearest_node(graph: &StreetGraph, building_id: &str, centroid: Point) -> DhResult<Attachment> {
    let mut best: Option<(NodeIndex, f64)> = None;
    for idx in graph.node_indices() {
        let d = graph[idx].distance(&centroid);
        if best.map(|(_, bd)| d < bd).unwrap_or(true) {
            best = Some((idx, d));
        }
    }
    let Some((idx, dist)) = best else {
        return Err(DhError::InvalidGeometry(format!(
            "no street nodes available to attach building {building_id}"
        )));
    };
    Ok(Attachment { building_id: building_id.to_string(), attachment_node: idx, distance_m: dist })
}
