//! Node collapsing: replace one node by another and rewire its incoming edges.

use crate::coordinate::ArtifactCoordinate;
use crate::core::GraphError;
use crate::graph::Graph;

/// Merge `from` into `to`.
///
/// Every edge pointing into `from` is re-pointed at `to` with its scope and
/// disabled state intact. Edges leaving `from` are dropped, since `to` will
/// produce its own when it is resolved, and `from` is removed from the graph.
/// If `from` was the root, `to` becomes the root.
///
/// A missing `from` is a no-op. A missing `to` is a `GraphInvariant` error.
/// Returns the number of edges that were re-pointed.
pub fn collapse_nodes(
    graph: &mut Graph,
    from: &ArtifactCoordinate,
    to: &ArtifactCoordinate,
) -> Result<usize, GraphError> {
    let from_key = from.full_key();
    let to_key = to.full_key();

    if !graph.contains_node(&from_key) {
        tracing::debug!("Nothing to collapse, {} is not in the graph", from);
        return Ok(0);
    }
    if !graph.contains_node(&to_key) {
        return Err(GraphError::invariant(format!("cannot collapse {from} into missing node {to}")));
    }
    if from_key == to_key {
        return Ok(0);
    }

    let incoming = graph.remove_edges_where(|e| &e.to == from && &e.from != from);
    let mut rewired = 0;
    for edge in incoming {
        if &edge.from == to {
            tracing::debug!("Dropping self edge on {} left by collapsing {}", to, from);
            continue;
        }
        if graph.add_edge(edge.retarget(to.clone())) {
            rewired += 1;
        }
    }

    let stale = graph.remove_edges_where(|e| &e.from == from);
    graph.remove_node(&from_key);
    if graph.is_root(&from_key) {
        graph.set_root(to_key);
    }

    tracing::debug!(
        "Collapsed {} into {} ({} edges rewired, {} dropped)",
        from,
        to,
        rewired,
        stale.len()
    );
    Ok(rewired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DisabledType, Edge};

    fn coord(a: &str) -> ArtifactCoordinate {
        ArtifactCoordinate::new("g", a, "1")
    }

    fn link(graph: &mut Graph, from: &str, to: &str) {
        graph.ensure_node(&coord(from));
        graph.ensure_node(&coord(to));
        graph.add_edge(Edge::new(coord(from), coord(to)));
    }

    #[test]
    fn test_collapse_rewires_incoming_and_drops_outgoing() {
        let mut graph = Graph::new(coord("root"));
        link(&mut graph, "root", "old");
        link(&mut graph, "x", "old");
        link(&mut graph, "old", "child");
        graph.disable_edge(&coord("x"), &coord("old"), DisabledType::Optional).unwrap();
        graph.ensure_node(&coord("new"));

        assert_eq!(collapse_nodes(&mut graph, &coord("old"), &coord("new")).unwrap(), 2);

        assert!(graph.node_for(&coord("old")).is_none());
        assert!(graph.edge(&coord("root"), &coord("new")).is_some());
        let rewired = graph.edge(&coord("x"), &coord("new")).unwrap();
        assert_eq!(rewired.disabled, DisabledType::Optional);
        assert!(graph.edges().iter().all(|e| e.from != coord("old") && e.to != coord("old")));
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_collapse_skips_duplicate_edges() {
        let mut graph = Graph::new(coord("root"));
        link(&mut graph, "root", "old");
        link(&mut graph, "root", "new");

        assert_eq!(collapse_nodes(&mut graph, &coord("old"), &coord("new")).unwrap(), 0);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_collapse_missing_from_is_noop() {
        let mut graph = Graph::new(coord("root"));
        graph.ensure_node(&coord("new"));
        assert_eq!(collapse_nodes(&mut graph, &coord("gone"), &coord("new")).unwrap(), 0);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_collapse_into_missing_node_fails() {
        let mut graph = Graph::new(coord("root"));
        link(&mut graph, "root", "old");
        let err = collapse_nodes(&mut graph, &coord("old"), &coord("ghost")).unwrap_err();
        assert!(matches!(err, GraphError::GraphInvariant { .. }));
        assert!(graph.node_for(&coord("old")).is_some());
    }

    #[test]
    fn test_collapsing_root_moves_root() {
        let mut graph = Graph::new(coord("root"));
        graph.ensure_node(&coord("moved"));
        collapse_nodes(&mut graph, &coord("root"), &coord("moved")).unwrap();
        assert_eq!(graph.root().coordinate, coord("moved"));
        assert_eq!(graph.node_count(), 1);
    }
}
