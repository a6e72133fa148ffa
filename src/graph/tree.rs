//! Human-readable dependency tree rendering.

use std::collections::HashSet;

use crate::coordinate::ArtifactCoordinate;

use super::{Edge, Graph};

/// Render the graph as an indented tree starting at the root.
///
/// Every edge is shown, including disabled ones, which are annotated with their
/// disabled type. A node that was already expanded elsewhere in the tree is
/// printed once more with `(already listed)` instead of its children.
pub fn render_tree(graph: &Graph) -> String {
    let mut result = String::new();
    let root = &graph.root().coordinate;
    result.push_str(&format!("{root}\n"));

    let mut visited = HashSet::new();
    visited.insert(root.full_key());
    render_children(graph, root, "", &mut result, &mut visited);
    result
}

fn render_children(
    graph: &Graph,
    node: &ArtifactCoordinate,
    prefix: &str,
    result: &mut String,
    visited: &mut HashSet<String>,
) {
    let edges: Vec<&Edge> = graph.edges_from(node).collect();

    for (i, edge) in edges.iter().enumerate() {
        let is_last = i == edges.len() - 1;
        let connector = if is_last {
            "└── "
        } else {
            "├── "
        };

        let mut line = format!("{prefix}{connector}{}", edge.to);
        if edge.scope != crate::model::DEFAULT_SCOPE {
            line.push_str(&format!(" [{}]", edge.scope));
        }
        let expand = if edge.is_disabled() {
            line.push_str(&format!(" ({})", edge.disabled.label()));
            false
        } else if visited.insert(edge.to.full_key()) {
            true
        } else {
            line.push_str(" (already listed)");
            false
        };
        result.push_str(&line);
        result.push('\n');

        if expand {
            let child_prefix = if is_last {
                format!("{prefix}    ")
            } else {
                format!("{prefix}│   ")
            };
            render_children(graph, &edge.to, &child_prefix, result, visited);
        }
    }
}
