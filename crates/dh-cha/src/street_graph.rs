//! Street->graph builder (spec §4.1).
//!
//! Normalizes a set of street polylines into an undirected weighted graph
//! whose nodes are coordinate pairs snapped to a configurable tolerance and
//! whose edges carry `length_m` and a reference back to the source street.

use dh_core::{Crs, DhError, DhResult, Point, StreetSegment};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;
use std::collections::HashMap;

/// An edge in the street graph: physical length and the street it came from.
#[derive(Debug, Clone)]
pub struct StreetEdge {
    pub street_id: String,
    pub length_m: f64,
}

/// The normalized street graph. Node weights are the snapped coordinate.
pub type StreetGraph = Graph<Point, StreetEdge, Undirected>;

/// Default endpoint-snapping tolerance, per spec §4.1.
pub const DEFAULT_SNAP_TOLERANCE_M: f64 = 1.0;

/// Build the street graph from a set of segments, snapping endpoints within
/// `tolerance_m` of each other into a single node.
///
/// Fails with [`DhError::InvalidGeometry`] if any polyline is empty, and
/// [`DhError::MissingCRS`] if any segment's CRS is geographic rather than
/// projected.
pub fn build_street_graph(
    segments: &[StreetSegment],
    tolerance_m: f64,
) -> DhResult<(StreetGraph, HashMap<String, NodeIndex>)> {
    let mut graph: StreetGraph = Graph::new_undirected();
    let mut snapped_nodes: HashMap<(i64, i64), NodeIndex> = HashMap::new();

    for seg in segments {
        if seg.geometry.is_empty() {
            return Err(DhError::InvalidGeometry(format!(
                "street segment {} has an empty polyline",
                seg.id
            )));
        }
        if !seg.crs.is_projected() {
            return Err(DhError::MissingCRS(format!(
                "street segment {} is not in a projected CRS: {:?}",
                seg.id, seg.crs
            )));
        }

        for window in seg.geometry.points.windows(2) {
            let (a, b) = (window[0], window[1]);
            let a_idx = snap_or_insert(&mut graph, &mut snapped_nodes, a, tolerance_m);
            let b_idx = snap_or_insert(&mut graph, &mut snapped_nodes, b, tolerance_m);
            if a_idx == b_idx {
                continue; // degenerate zero-length sub-segment after snapping
            }
            let length_m = a.distance(&b);
            graph.add_edge(
                a_idx,
                b_idx,
                StreetEdge {
                    street_id: seg.id.clone(),
                    length_m,
                },
            );
        }
    }

    // Build a lookup from "node key" string (x,y rounded) to index, useful
    // for callers that need to find the graph node nearest an external id.
    let mut index_by_key = HashMap::new();
    for (key, idx) in &snapped_nodes {
        index_by_key.insert(format!("{}:{}", key.0, key.1), *idx);
    }

    Ok((graph, index_by_key))
}

fn snap_or_insert(
    graph: &mut StreetGraph,
    snapped_nodes: &mut HashMap<(i64, i64), NodeIndex>,
    p: Point,
    tolerance_m: f64,
) -> NodeIndex {
    let key = p.snapped(tolerance_m);
    *snapped_nodes
        .entry(key)
        .or_insert_with(|| graph.add_node(p))
}

/// Validate that a projected CRS tag is present and not geographic,
/// surfacing [`DhError::MissingCRS`] consistently across call sites.
pub fn require_projected(crs: &Crs, context: &str) -> DhResult<()> {
    if !crs.is_projected() {
        return Err(DhError::MissingCRS(format!(
            "{context} CRS {:?} is not projected",
            crs
        )));
    }
    Ok(())
}
