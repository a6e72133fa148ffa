//! Orphan removal.
//!
//! After conflict mediation marks nodes and relocation rewires edges, nodes may
//! be left with no incoming edge. [`cleanup_orphaned_nodes`] sweeps them (and
//! every node marked `conflicted`) until a fixed point is reached. The root is
//! never removed.

use std::collections::HashSet;

use crate::coordinate::ArtifactCoordinate;

use super::Graph;

/// Remove orphaned and conflicted nodes until none remain.
///
/// A node is an orphan when no edge from another node points at it; a self edge
/// does not keep a node alive. Every edge touching a removed node goes with it,
/// so the graph never holds dangling edges afterwards.
///
/// Returns the removed coordinates in removal order.
pub fn cleanup_orphaned_nodes(graph: &mut Graph) -> Vec<ArtifactCoordinate> {
    let mut removed = Vec::new();
    // Each round removes at least one node, so this bound is never reached in practice.
    let max_rounds = graph.node_count() + 1;

    for _ in 0..max_rounds {
        let targets: Vec<String> = {
            let fed: HashSet<String> = graph
                .edges()
                .iter()
                .filter(|e| e.from != e.to)
                .map(|e| e.to.full_key())
                .collect();

            graph
                .nodes()
                .filter(|node| {
                    let key = node.key();
                    !graph.is_root(&key) && (node.conflicted || !fed.contains(&key))
                })
                .map(super::Node::key)
                .collect()
        };

        if targets.is_empty() {
            break;
        }

        for key in targets {
            let Some(node) = graph.remove_node(&key) else {
                continue;
            };
            let coordinate = node.coordinate;
            let dropped =
                graph.remove_edges_where(|e| e.from == coordinate || e.to == coordinate);
            tracing::debug!(
                "Removed {} node {} ({} edges)",
                if node.conflicted { "conflicted" } else { "orphaned" },
                coordinate,
                dropped.len()
            );
            removed.push(coordinate);
        }
    }

    removed
}
