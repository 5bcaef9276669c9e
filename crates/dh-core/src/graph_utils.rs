//! Generic undirected-graph helpers shared by the street-graph builder (CHA)
//! and the LV-grid boundary check (DHA): shortest paths and connectivity /
//! island analysis, generalized over node/edge weight types.

use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Undirected;
use std::collections::{HashMap, HashSet, VecDeque};

/// Connected-component id assigned to every node.
pub fn connected_components<N, E>(graph: &Graph<N, E, Undirected>) -> HashMap<NodeIndex, usize> {
    let mut assignment = HashMap::new();
    let mut next_component = 0usize;
    for start in graph.node_indices() {
        if assignment.contains_key(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        assignment.insert(start, next_component);
        while let Some(node) = queue.pop_front() {
            for neighbor in graph.neighbors(node) {
                if !assignment.contains_key(&neighbor) {
                    assignment.insert(neighbor, next_component);
                    queue.push_back(neighbor);
                }
            }
        }
        next_component += 1;
    }
    assignment
}

/// True if every node in `targets` is reachable from some node in `sources`
/// within the undirected graph (used by the LV boundary check: every bus
/// must reach a transformer).
pub fn all_reachable_from<N, E>(
    graph: &Graph<N, E, Undirected>,
    sources: &[NodeIndex],
    targets: &[NodeIndex],
) -> bool {
    let reachable = reachable_set(graph, sources);
    targets.iter().all(|t| reachable.contains(t))
}

/// BFS reachable set from a collection of source nodes.
pub fn reachable_set<N, E>(
    graph: &Graph<N, E, Undirected>,
    sources: &[NodeIndex],
) -> HashSet<NodeIndex> {
    let mut visited: HashSet<NodeIndex> = sources.iter().copied().collect();
    let mut queue: VecDeque<NodeIndex> = sources.iter().copied().collect();
    while let Some(node) = queue.pop_front() {
        for neighbor in graph.neighbors(node) {
            if visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    visited
}

/// Dijkstra shortest-path distances and predecessor map from a single
/// source, over edges weighted by `weight`. Ties in distance are not broken
/// here; callers needing deterministic tie-breaking (trunk routing) sort
/// candidate predecessors lexicographically themselves.
pub fn shortest_paths<N, E>(
    graph: &Graph<N, E, Undirected>,
    source: NodeIndex,
    weight: impl Fn(&E) -> f64,
) -> (HashMap<NodeIndex, f64>, HashMap<NodeIndex, NodeIndex>) {
    let mut dist: HashMap<NodeIndex, f64> = HashMap::new();
    let mut prev: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    dist.insert(source, 0.0);

    loop {
        let Some((&node, &d)) = dist
            .iter()
            .filter(|(n, _)| !visited.contains(n))
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        else {
            break;
        };
        visited.insert(node);
        for edge in graph.edges(node) {
            let next = if edge.source() == node { edge.target() } else { edge.source() };
            if visited.contains(&next) {
                continue;
            }
            let cand = d + weight(edge.weight());
            if cand < *dist.get(&next).unwrap_or(&f64::INFINITY) {
                dist.insert(next, cand);
                prev.insert(next, node);
            }
        }
        if visited.len() == graph.node_count() {
            break;
        }
    }
    (dist, prev)
}

/// Reconstruct the path from `source` to `target` given the predecessor map
/// produced by [`shortest_paths`]. Returns `None` if `target` is
/// unreachable.
pub fn reconstruct_path(
    prev: &HashMap<NodeIndex, NodeIndex>,
    source: NodeIndex,
    target: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    if source == target {
        return Some(vec![source]);
    }
    let mut path = vec![target];
    let mut cur = target;
    loop {
        let &p = prev.get(&cur)?;
        path.push(p);
        if p == source {
            break;
        }
        cur = p;
    }
    path.reverse();
    Some(path)
}
