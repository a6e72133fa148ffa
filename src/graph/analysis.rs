//! Read-only analyses over the enabled part of a graph.
//!
//! Most of these functions project the key-indexed [`Graph`] onto a `petgraph`
//! directed graph that contains every node but only the *enabled* edges, then
//! run the standard algorithms on it: hop distance from the root (mediation),
//! reachability (pending work and effective dependencies), strongly connected
//! components and topological order.
//!
//! [`ancestors`] runs once per expanded node, so it walks the edge list
//! directly instead of building a projection.

use petgraph::algo::{dijkstra, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::coordinate::ArtifactCoordinate;
use crate::core::GraphError;

use super::Graph;

/// `petgraph` projection of a graph over its enabled edges.
struct EnabledView {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl EnabledView {
    fn build(source: &Graph) -> Self {
        let mut graph = DiGraph::with_capacity(source.node_count(), source.edge_count());
        let mut index = HashMap::with_capacity(source.node_count());

        for key in source.node_keys() {
            index.insert(key.clone(), graph.add_node(key.clone()));
        }

        for edge in source.edges().iter().filter(|e| !e.is_disabled()) {
            let from = index.get(&edge.from.full_key());
            let to = index.get(&edge.to.full_key());
            // Dangling edges are tolerated mid-mutation; they just don't connect anything.
            if let (Some(&from), Some(&to)) = (from, to) {
                if !graph.contains_edge(from, to) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self {
            graph,
            index,
        }
    }

    fn key(&self, index: NodeIndex) -> &str {
        &self.graph[index]
    }
}

/// Hop distance from the root to every node reachable through enabled edges.
pub fn depths_from_root(graph: &Graph) -> HashMap<String, usize> {
    let view = EnabledView::build(graph);
    let Some(&root) = view.index.get(graph.root_key()) else {
        return HashMap::new();
    };

    dijkstra(&view.graph, root, None, |_| 1usize)
        .into_iter()
        .map(|(index, depth)| (view.key(index).to_string(), depth))
        .collect()
}

/// Keys of nodes reachable from the root through enabled edges, root included,
/// in breadth-first order.
pub fn reachable_from_root(graph: &Graph) -> Vec<String> {
    let view = EnabledView::build(graph);
    let Some(&root) = view.index.get(graph.root_key()) else {
        return Vec::new();
    };

    let mut order = Vec::new();
    let mut bfs = Bfs::new(&view.graph, root);
    while let Some(index) = bfs.next(&view.graph) {
        order.push(view.key(index).to_string());
    }
    order
}

/// Every coordinate that can reach `start` through enabled edges, `start` included.
pub fn ancestors<'a>(
    graph: &'a Graph,
    start: &'a ArtifactCoordinate,
) -> HashSet<&'a ArtifactCoordinate> {
    let mut parents: HashMap<&ArtifactCoordinate, Vec<&ArtifactCoordinate>> = HashMap::new();
    for edge in graph.edges().iter().filter(|e| !e.is_disabled()) {
        parents.entry(&edge.to).or_default().push(&edge.from);
    }

    let mut found = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for &parent in parents.get(current).into_iter().flatten() {
            if found.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    found
}

/// The effective dependency set: nodes reachable from the root through enabled
/// edges, excluding the root, in graph insertion order.
pub fn effective_dependencies(graph: &Graph) -> Vec<ArtifactCoordinate> {
    let reachable: HashSet<String> = reachable_from_root(graph).into_iter().collect();
    graph
        .nodes()
        .filter(|node| {
            let key = node.key();
            !graph.is_root(&key) && !node.conflicted && reachable.contains(&key)
        })
        .map(|node| node.coordinate.clone())
        .collect()
}

/// Strongly connected components that form a cycle over enabled edges.
///
/// A correctly resolved graph has none; this is a diagnostic for graphs that
/// were edited by hand or rewired by relocation.
pub fn find_cycles(graph: &Graph) -> Vec<Vec<ArtifactCoordinate>> {
    let view = EnabledView::build(graph);
    tarjan_scc(&view.graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || view.graph.contains_edge(component[0], component[0])
        })
        .map(|component| {
            component
                .into_iter()
                .filter_map(|index| graph.node(view.key(index)))
                .map(|node| node.coordinate.clone())
                .collect()
        })
        .collect()
}

/// Effective dependencies ordered so that every dependency comes before its
/// dependents.
pub fn install_order(graph: &Graph) -> Result<Vec<ArtifactCoordinate>, GraphError> {
    let view = EnabledView::build(graph);
    let reachable: HashSet<String> = reachable_from_root(graph).into_iter().collect();

    let sorted = toposort(&view.graph, None).map_err(|cycle| {
        let node = view.key(cycle.node_id()).to_string();
        GraphError::invariant(format!("enabled edges form a cycle through {node}"))
    })?;

    Ok(sorted
        .into_iter()
        .rev()
        .map(|index| view.key(index))
        .filter(|key| !graph.is_root(key) && reachable.contains(*key))
        .filter_map(|key| graph.node(key))
        .map(|node| node.coordinate.clone())
        .collect())
}
