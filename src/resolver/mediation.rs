//! Nearest-wins conflict mediation.
//!
//! Nodes that share a management key compete; the one with the smallest hop
//! distance from the root over enabled edges wins. Equal distances are settled
//! by graph insertion order: the node seen first wins. Only nodes whose
//! version differs from the winner's lose, so classifier or type variants of
//! the winning version stay.
//!
//! This is the mark half of a two-phase removal. Losers are flagged
//! `conflicted` and their incoming edges disabled, but they stay in the graph
//! until [`cleanup_orphaned_nodes`](crate::graph::cleanup_orphaned_nodes)
//! sweeps them.

use indexmap::IndexMap;

use crate::coordinate::ArtifactCoordinate;
use crate::events::{EventBus, ResolutionEventType};
use crate::graph::{DisabledType, Graph, depths_from_root};

/// A node omitted in favour of a nearer version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictOmission {
    pub omitted: ArtifactCoordinate,
    pub nearer: ArtifactCoordinate,
}

/// Flag every losing node and return the omissions in graph order.
///
/// Only nodes reachable from the root through enabled edges take part;
/// already conflicted nodes are ignored.
pub fn mark_conflicts(graph: &mut Graph) -> Vec<ConflictOmission> {
    let depths = depths_from_root(graph);

    let mut groups: IndexMap<String, Vec<(ArtifactCoordinate, usize)>> = IndexMap::new();
    for node in graph.nodes().filter(|n| !n.conflicted) {
        let Some(&depth) = depths.get(&node.key()) else {
            continue;
        };
        groups
            .entry(node.management_key())
            .or_default()
            .push((node.coordinate.clone(), depth));
    }

    let mut omissions = Vec::new();
    for candidates in groups.into_values().filter(|c| c.len() > 1) {
        let Some((nearer, _)) = candidates.iter().min_by_key(|(_, depth)| *depth).cloned() else {
            continue;
        };
        let losers = candidates.into_iter().filter(|(c, _)| c.version != nearer.version);
        for (omitted, _) in losers {
            omissions.push(ConflictOmission {
                omitted,
                nearer: nearer.clone(),
            });
        }
    }

    for omission in &omissions {
        if let Some(node) = graph.node_mut(&omission.omitted.full_key()) {
            node.conflicted = true;
        }
        let incoming: Vec<ArtifactCoordinate> = graph
            .edges_to(&omission.omitted)
            .filter(|e| !e.is_disabled())
            .map(|e| e.from.clone())
            .collect();
        for from in incoming {
            // The edge was just found, so disabling cannot miss.
            let _ = graph.disable_edge(
                &from,
                &omission.omitted,
                DisabledType::Conflict {
                    nearer_key: omission.nearer.full_key(),
                },
            );
        }
        tracing::debug!("{} loses to nearer {}", omission.omitted, omission.nearer);
    }

    omissions
}

/// Run [`mark_conflicts`] and emit one `ConflictOmitForNearer` event per loser.
pub fn mediate_conflicts(graph: &mut Graph, bus: &EventBus) -> Vec<ConflictOmission> {
    let omissions = mark_conflicts(graph);
    for omission in &omissions {
        bus.resolution(
            ResolutionEventType::ConflictOmitForNearer,
            &omission.omitted,
            Some(omission.nearer.to_string()),
            graph,
        );
    }
    omissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, cleanup_orphaned_nodes};

    fn coord(a: &str, v: &str) -> ArtifactCoordinate {
        ArtifactCoordinate::new("g", a, v)
    }

    fn link(graph: &mut Graph, from: &ArtifactCoordinate, to: &ArtifactCoordinate) {
        graph.ensure_node(from);
        graph.ensure_node(to);
        graph.add_edge(Edge::new(from.clone(), to.clone()));
    }

    #[test]
    fn test_nearer_version_wins() {
        let root = coord("app", "1");
        let mut graph = Graph::new(root.clone());
        link(&mut graph, &root, &coord("other", "1"));
        link(&mut graph, &coord("other", "1"), &coord("lib", "2.0"));
        link(&mut graph, &root, &coord("lib", "1.0"));

        let omissions = mark_conflicts(&mut graph);
        assert_eq!(
            omissions,
            vec![ConflictOmission {
                omitted: coord("lib", "2.0"),
                nearer: coord("lib", "1.0"),
            }]
        );
        assert!(graph.node_for(&coord("lib", "2.0")).unwrap().conflicted);
        assert!(matches!(
            graph.edge(&coord("other", "1"), &coord("lib", "2.0")).unwrap().disabled,
            DisabledType::Conflict { .. }
        ));

        cleanup_orphaned_nodes(&mut graph);
        assert!(graph.node_for(&coord("lib", "2.0")).is_none());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_equal_depth_keeps_first_inserted() {
        let root = coord("app", "1");
        let mut graph = Graph::new(root.clone());
        link(&mut graph, &root, &coord("lib", "2.0"));
        link(&mut graph, &root, &coord("lib", "1.0"));

        let omissions = mark_conflicts(&mut graph);
        assert_eq!(omissions.len(), 1);
        assert_eq!(omissions[0].nearer, coord("lib", "2.0"));
        assert_eq!(omissions[0].omitted, coord("lib", "1.0"));
    }

    #[test]
    fn test_farther_classifier_variant_of_other_version_loses() {
        // app -> lib:1.0, app -> x -> lib:2.0:tests
        let root = coord("app", "1");
        let tests = coord("lib", "2.0").with_classifier(Some("tests"));
        let mut graph = Graph::new(root.clone());
        link(&mut graph, &root, &coord("lib", "1.0"));
        link(&mut graph, &root, &coord("x", "1"));
        link(&mut graph, &coord("x", "1"), &tests);

        let omissions = mark_conflicts(&mut graph);
        assert_eq!(
            omissions,
            vec![ConflictOmission {
                omitted: tests.clone(),
                nearer: coord("lib", "1.0"),
            }]
        );
        assert!(graph.node_for(&tests).unwrap().conflicted);
    }

    #[test]
    fn test_classifier_variant_of_winning_version_is_kept() {
        let root = coord("app", "1");
        let sources = coord("lib", "1.0").with_classifier(Some("sources"));
        let mut graph = Graph::new(root.clone());
        link(&mut graph, &root, &coord("lib", "1.0"));
        link(&mut graph, &root, &coord("x", "1"));
        link(&mut graph, &coord("x", "1"), &sources);
        link(&mut graph, &coord("x", "1"), &coord("lib", "0.9"));

        let omissions = mark_conflicts(&mut graph);
        assert_eq!(omissions.len(), 1);
        assert_eq!(omissions[0].omitted, coord("lib", "0.9"));
        assert!(!graph.node_for(&sources).unwrap().conflicted);
    }

    #[test]
    fn test_unreachable_nodes_are_ignored() {
        let root = coord("app", "1");
        let mut graph = Graph::new(root.clone());
        link(&mut graph, &root, &coord("lib", "1.0"));
        link(&mut graph, &root, &coord("opt", "1"));
        link(&mut graph, &coord("opt", "1"), &coord("lib", "2.0"));
        graph.disable_edge(&root, &coord("opt", "1"), DisabledType::Optional).unwrap();

        assert!(mark_conflicts(&mut graph).is_empty());
        assert!(!graph.node_for(&coord("lib", "2.0")).unwrap().conflicted);
    }

    #[test]
    fn test_second_pass_finds_nothing_new() {
        let root = coord("app", "1");
        let mut graph = Graph::new(root.clone());
        link(&mut graph, &root, &coord("lib", "1.0"));
        link(&mut graph, &coord("lib", "1.0"), &coord("lib2", "1"));
        link(&mut graph, &coord("lib2", "1"), &coord("lib", "3.0"));

        assert_eq!(mark_conflicts(&mut graph).len(), 1);
        assert!(mark_conflicts(&mut graph).is_empty());
    }
}
