//! Expanding a loaded project model into the graph.
//!
//! [`add_node_from_model`] runs the per-node expansion in a fixed order:
//!
//! 1. relocation: a model that moved somewhere else is collapsed into its new
//!    coordinate and expansion stops
//! 2. the model's dependency-management entries are captured on the node
//! 3. every direct dependency is filtered, managed and turned into a child
//!    node plus an edge (disabled when optional or when it closes a cycle)
//! 4. the node is marked resolved
//!
//! Expansion is synchronous. Callers hold `&mut Graph` for the whole call, so
//! a node is never expanded twice at once.

use std::collections::HashSet;

use crate::config::ResolverConfig;
use crate::coordinate::ArtifactCoordinate;
use crate::core::GraphError;
use crate::events::{EventBus, ResolutionEventType};
use crate::graph::{DisabledType, Edge, Graph, ancestors, matches_exclusion};
use crate::model::{Dependency, ProjectModel};

use super::collapse::collapse_nodes;

/// What [`add_node_from_model`] did with a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// Children were attached and the node is now resolved.
    Expanded {
        /// Edges added by this expansion.
        edges: usize,
    },
    /// The node was resolved before; nothing changed.
    AlreadyResolved,
    /// The node was replaced by its relocation target.
    Relocated {
        to: ArtifactCoordinate,
    },
}

/// Expand `model` into the node stored under `key`.
///
/// A relocation onto a coordinate that was itself relocated earlier follows
/// the recorded chain to its end. Fails with `GraphInvariant` when `key` is
/// not in the graph and with `RelocationLoop` when following the chain leads
/// back to this node. In both cases the graph is left unchanged.
pub fn add_node_from_model(
    graph: &mut Graph,
    key: &str,
    model: &ProjectModel,
    config: &ResolverConfig,
    bus: &EventBus,
) -> Result<Expansion, GraphError> {
    let node = graph
        .node(key)
        .ok_or_else(|| GraphError::invariant(format!("cannot expand missing node {key}")))?;
    if node.resolved {
        tracing::debug!("{} is already resolved", node.coordinate);
        return Ok(Expansion::AlreadyResolved);
    }
    let coordinate = node.coordinate.clone();
    let parent_excludes = node.excludes.clone();
    let is_root = graph.is_root(key);

    bus.resolution(ResolutionEventType::AddingModel, &coordinate, None, graph);

    if let Some(relocation) = model.effective_relocation() {
        let target = relocation.apply(&coordinate);
        if target == coordinate {
            tracing::debug!("Ignoring relocation of {} onto itself", coordinate);
        } else {
            return relocate(graph, &coordinate, target);
        }
    }

    let own_management = model.dependency_management.clone();
    let root_management = if is_root {
        Vec::new()
    } else {
        graph.root().dependency_management.clone()
    };
    if let Some(node) = graph.node_mut(key) {
        node.dependency_management.extend(own_management.iter().cloned());
    }

    // Management keys on the path from the root down to this node, itself included.
    let lineage: HashSet<String> =
        ancestors(graph, &coordinate).into_iter().map(ArtifactCoordinate::management_key).collect();

    let mut added = 0;
    for declared in &model.dependencies {
        if !is_root && config.is_non_transitive(declared.effective_scope()) {
            tracing::debug!(
                "Skipping {}:{} ({} scope) below {}",
                declared.group_id,
                declared.artifact_id,
                declared.effective_scope(),
                coordinate
            );
            continue;
        }
        if matches_exclusion(&parent_excludes, &declared.group_id, &declared.artifact_id) {
            tracing::debug!(
                "Excluded {}:{} below {}",
                declared.group_id,
                declared.artifact_id,
                coordinate
            );
            continue;
        }

        let managed = apply_management(declared, &root_management, &own_management, is_root);
        let dependency = match managed {
            Some((managed, detail)) => {
                bus.resolution(
                    ResolutionEventType::ApplyingDependencyManagement,
                    &managed.coordinate(&config.default_type),
                    Some(detail),
                    graph,
                );
                managed
            }
            None => declared.clone(),
        };

        if !is_root && config.is_non_transitive(dependency.effective_scope()) {
            tracing::debug!("Managed scope of {} is not transitive", dependency.management_key());
            continue;
        }
        if dependency.version.trim().is_empty() {
            tracing::warn!(
                "Dependency {} of {} has no version and no managed version; skipping",
                dependency.management_key(),
                coordinate
            );
            continue;
        }

        let child = dependency.coordinate(&config.default_type);
        let closes_cycle = lineage.contains(&child.management_key());

        {
            let child_node = graph.ensure_node(&child);
            if !closes_cycle {
                for exclude in &parent_excludes {
                    child_node.add_exclude(exclude.clone());
                }
                for exclusion in &dependency.exclusions {
                    child_node.add_exclude(exclusion.management_key());
                }
                if dependency.from_parent {
                    child_node.from_parent = true;
                }
            }
        }

        let mut edge =
            Edge::new(coordinate.clone(), child.clone()).with_scope(dependency.effective_scope());
        if dependency.optional {
            edge.disable(DisabledType::Optional);
        } else if closes_cycle {
            edge.disable(DisabledType::Cycle);
        }
        let cycle_edge = edge.disabled == DisabledType::Cycle;

        if graph.add_edge(edge) {
            added += 1;
            if cycle_edge {
                tracing::debug!("Dependency {} of {} closes a cycle", child, coordinate);
                bus.resolution(
                    ResolutionEventType::CycleBroken,
                    &child,
                    Some(format!("{coordinate} -> {child}")),
                    graph,
                );
            }
        }
    }

    if let Some(node) = graph.node_mut(key) {
        node.resolved = true;
    }
    tracing::debug!("Expanded {} with {} edges", coordinate, added);

    Ok(Expansion::Expanded {
        edges: added,
    })
}

fn relocate(
    graph: &mut Graph,
    from: &ArtifactCoordinate,
    to: ArtifactCoordinate,
) -> Result<Expansion, GraphError> {
    let target = follow_relocations(graph, from, &to)?;
    if target != to {
        tracing::debug!("{} was relocated earlier; following on to {}", to, target);
    }

    let (excludes, from_parent) = graph
        .node_for(from)
        .map(|n| (n.excludes.clone(), n.from_parent))
        .unwrap_or_default();
    let node = graph.ensure_node(&target);
    for exclude in excludes {
        node.add_exclude(exclude);
    }
    node.from_parent |= from_parent;

    let rewired = collapse_nodes(graph, from, &target)?;
    graph.record_relocation(from.clone(), to);
    tracing::info!("Relocated {} to {} ({} edges rewired)", from, target, rewired);

    Ok(Expansion::Relocated {
        to: target,
    })
}

/// Walk earlier relocations forward from `to` and return where the chain ends.
///
/// Fails with `RelocationLoop` when the walk comes back to `from` or visits a
/// coordinate twice.
fn follow_relocations(
    graph: &Graph,
    from: &ArtifactCoordinate,
    to: &ArtifactCoordinate,
) -> Result<ArtifactCoordinate, GraphError> {
    let history = graph.relocations();
    let mut chain = vec![from.clone(), to.clone()];
    let mut current = to.clone();

    while let Some((_, next)) = history.iter().find(|(source, _)| *source == current) {
        let repeats = chain.contains(next);
        chain.push(next.clone());
        if repeats {
            let chain: Vec<String> = chain.iter().map(ToString::to_string).collect();
            return Err(GraphError::RelocationLoop {
                chain: chain.join(" -> "),
            });
        }
        current = next.clone();
    }
    Ok(current)
}

/// Apply the first matching management entry to `dependency`.
///
/// Root entries are consulted before the expanding node's own. Direct
/// dependencies of the root only get blanks filled in; transitive ones are
/// overridden. Returns `None` when nothing changed.
fn apply_management(
    dependency: &Dependency,
    root_entries: &[Dependency],
    own_entries: &[Dependency],
    is_root: bool,
) -> Option<(Dependency, String)> {
    let key = dependency.management_key();
    let entry = root_entries.iter().chain(own_entries).find(|m| m.management_key() == key)?;

    let mut managed = dependency.clone();
    let mut changes = Vec::new();

    let managed_version = entry.version.trim();
    let declared_version = dependency.version.trim();
    if !managed_version.is_empty()
        && managed_version != declared_version
        && (!is_root || declared_version.is_empty())
    {
        changes.push(format!(
            "version {} -> {}",
            display_or_blank(declared_version),
            managed_version
        ));
        managed.version = managed_version.to_string();
    }

    if let Some(scope) = entry.scope.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if dependency.scope.is_none() || (!is_root && dependency.effective_scope() != scope) {
            if dependency.effective_scope() != scope {
                changes.push(format!("scope {} -> {}", dependency.effective_scope(), scope));
            }
            managed.scope = Some(scope.to_string());
        }
    }

    for exclusion in &entry.exclusions {
        if !managed.exclusions.contains(exclusion) {
            changes.push(format!("exclude {}", exclusion.management_key()));
            managed.exclusions.push(exclusion.clone());
        }
    }

    if changes.is_empty() {
        None
    } else {
        Some((managed, changes.join(", ")))
    }
}

fn display_or_blank(value: &str) -> &str {
    if value.is_empty() { "<none>" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{GraphListener, RecordingListener};
    use crate::model::Relocation;
    use std::sync::Arc;

    fn coord(a: &str, v: &str) -> ArtifactCoordinate {
        ArtifactCoordinate::new("com.example", a, v)
    }

    fn dep(a: &str, v: &str) -> Dependency {
        Dependency::new("com.example", a, v)
    }

    fn model(a: &str, v: &str) -> ProjectModel {
        ProjectModel::new("com.example", a, v)
    }

    fn expand(graph: &mut Graph, c: &ArtifactCoordinate, m: &ProjectModel) -> Expansion {
        let config = ResolverConfig::default();
        add_node_from_model(graph, &c.full_key(), m, &config, &EventBus::default()).unwrap()
    }

    fn edge_targets(graph: &Graph, from: &ArtifactCoordinate) -> Vec<ArtifactCoordinate> {
        graph.edges_from(from).map(|e| e.to.clone()).collect()
    }

    #[test]
    fn test_expansion_creates_children_and_edges() {
        let app = coord("app", "1.0");
        let mut graph = Graph::new(app.clone());
        let m = model("app", "1.0")
            .with_dependency(dep("lib", "1.0"))
            .with_dependency(dep("api", "2.0").with_scope("runtime").with_classifier("sources"));

        assert_eq!(
            expand(&mut graph, &app, &m),
            Expansion::Expanded {
                edges: 2
            }
        );
        assert!(graph.root().resolved);
        assert_eq!(graph.node_count(), 3);

        let api = coord("api", "2.0").with_classifier(Some("sources"));
        assert_eq!(graph.edge(&app, &api).unwrap().scope, "runtime");
        assert_eq!(graph.edge(&app, &coord("lib", "1.0")).unwrap().scope, "compile");
        assert!(!graph.node_for(&api).unwrap().resolved);
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let app = coord("app", "1.0");
        let mut graph = Graph::new(app.clone());
        let m = model("app", "1.0")
            .with_managed(dep("lib", "1.0"))
            .with_dependency(dep("lib", "1.0"));

        expand(&mut graph, &app, &m);
        let edges = graph.edge_count();
        assert_eq!(expand(&mut graph, &app, &m), Expansion::AlreadyResolved);

        assert_eq!(graph.edge_count(), edges);
        assert_eq!(graph.root().dependency_management.len(), 1);
    }

    #[test]
    fn test_test_scope_only_propagates_from_root() {
        let app = coord("app", "1.0");
        let mut graph = Graph::new(app.clone());
        expand(
            &mut graph,
            &app,
            &model("app", "1.0")
                .with_dependency(dep("junit", "4.13").with_scope("test"))
                .with_dependency(dep("p", "1.0")),
        );
        assert!(graph.edge(&app, &coord("junit", "4.13")).is_some());

        let p = coord("p", "1.0");
        let mut other = Graph::new(app.clone());
        other.ensure_node(&p);
        other.add_edge(Edge::new(app.clone(), p.clone()));
        let p_model = model("p", "1.0").with_dependency(dep("junit", "4.13").with_scope("test"));
        expand(&mut other, &p, &p_model);
        assert!(edge_targets(&other, &p).is_empty());
        assert!(other.node_for(&coord("junit", "4.13")).is_none());
    }

    #[test]
    fn test_optional_dependency_edge_is_disabled() {
        let app = coord("app", "1.0");
        let mut graph = Graph::new(app.clone());
        let m = model("app", "1.0").with_dependency(dep("opt", "1.0").optional());
        expand(&mut graph, &app, &m);

        let edge = graph.edge(&app, &coord("opt", "1.0")).unwrap();
        assert_eq!(edge.disabled, DisabledType::Optional);
        assert_eq!(edge.disabled_reason().as_deref(), Some("Optional Dependency"));
    }

    #[test]
    fn test_exclusions_are_recorded_on_child_and_inherited() {
        let app = coord("app", "1.0");
        let lib = coord("lib", "1.0");
        let mut graph = Graph::new(app.clone());
        expand(
            &mut graph,
            &app,
            &model("app", "1.0").with_dependency(dep("lib", "1.0").exclude("org.log", "*")),
        );
        assert!(graph.node_for(&lib).unwrap().excludes_artifact("org.log", "api"));

        expand(
            &mut graph,
            &lib,
            &model("lib", "1.0")
                .with_dependency(Dependency::new("org.log", "api", "1"))
                .with_dependency(dep("util", "1.0")),
        );
        assert_eq!(edge_targets(&graph, &lib), vec![coord("util", "1.0")]);
        let util = graph.node_for(&coord("util", "1.0")).unwrap();
        assert!(util.excludes_artifact("org.log", "impl"));
    }

    #[test]
    fn test_exclusion_on_shared_child_applies_to_every_path() {
        // app -> a -> shared (excluding x), app -> b -> shared.
        // The exclusion is stored on `shared` itself, so x stays out even though
        // the b -> shared path never asked for it.
        let app = coord("app", "1.0");
        let (a, b, shared) = (coord("a", "1"), coord("b", "1"), coord("shared", "1"));
        let mut graph = Graph::new(app.clone());
        expand(
            &mut graph,
            &app,
            &model("app", "1.0").with_dependency(dep("a", "1")).with_dependency(dep("b", "1")),
        );
        expand(
            &mut graph,
            &a,
            &model("a", "1").with_dependency(dep("shared", "1").exclude("com.example", "x")),
        );
        expand(&mut graph, &b, &model("b", "1").with_dependency(dep("shared", "1")));
        expand(&mut graph, &shared, &model("shared", "1").with_dependency(dep("x", "1")));

        assert!(edge_targets(&graph, &shared).is_empty());
        assert!(graph.node_for(&coord("x", "1")).is_none());
    }

    #[test]
    fn test_from_parent_flag_is_carried() {
        let app = coord("app", "1.0");
        let mut graph = Graph::new(app.clone());
        let m = model("app", "1.0").with_dependency(dep("base", "1").inherited());
        expand(&mut graph, &app, &m);
        assert!(graph.node_for(&coord("base", "1")).unwrap().from_parent);
    }

    #[test]
    fn test_root_management_fills_blanks_only() {
        let app = coord("app", "1.0");
        let mut graph = Graph::new(app.clone());
        let recorder = Arc::new(RecordingListener::new());
        let bus = EventBus::new(vec![recorder.clone() as Arc<dyn GraphListener>], 16);
        let m = model("app", "1.0")
            .with_managed(dep("lib", "2.0"))
            .with_managed(dep("api", "3.0").with_scope("runtime"))
            .with_dependency(dep("lib", "1.0"))
            .with_dependency(dep("api", ""));

        let config = ResolverConfig::default();
        add_node_from_model(&mut graph, &app.full_key(), &m, &config, &bus).unwrap();

        assert!(graph.edge(&app, &coord("lib", "1.0")).is_some());
        let api = graph.edge(&app, &coord("api", "3.0")).unwrap();
        assert_eq!(api.scope, "runtime");
        assert_eq!(
            recorder.subjects_of(ResolutionEventType::ApplyingDependencyManagement),
            vec![coord("api", "3.0")]
        );
    }

    #[test]
    fn test_root_management_overrides_transitive() {
        let app = coord("app", "1.0");
        let lib = coord("lib", "1.0");
        let mut graph = Graph::new(app.clone());
        expand(
            &mut graph,
            &app,
            &model("app", "1.0")
                .with_managed(dep("util", "2.0").exclude("org.bad", "bad"))
                .with_dependency(dep("lib", "1.0")),
        );
        expand(
            &mut graph,
            &lib,
            &model("lib", "1.0")
                .with_managed(dep("util", "1.5"))
                .with_dependency(dep("util", "1.0")),
        );

        let util = coord("util", "2.0");
        assert!(graph.edge(&lib, &util).is_some(), "root entry wins over the node's own");
        assert!(graph.node_for(&util).unwrap().excludes_artifact("org.bad", "bad"));
        assert_eq!(graph.node_for(&lib).unwrap().dependency_management.len(), 1);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let app = coord("app", "1.0");
        let mut graph = Graph::new(app.clone());
        expand(&mut graph, &app, &model("app", "1.0").with_dependency(dep("app", "0.9")));

        let edge = graph.edge(&app, &coord("app", "0.9")).unwrap();
        assert_eq!(edge.disabled, DisabledType::Cycle);
    }

    #[test]
    fn test_relocation_collapses_node() {
        let app = coord("app", "1.0");
        let old = coord("old", "1.0");
        let mut graph = Graph::new(app.clone());
        let m = model("app", "1.0").with_dependency(dep("old", "1.0").with_scope("runtime"));
        expand(&mut graph, &app, &m);

        let relocated = model("old", "1.0")
            .relocated_to(Relocation {
                group_id: Some("org.new".into()),
                artifact_id: None,
                version: Some("2.0".into()),
            })
            .with_dependency(dep("ignored", "1"));
        let target = ArtifactCoordinate::new("org.new", "old", "2.0");

        assert_eq!(
            expand(&mut graph, &old, &relocated),
            Expansion::Relocated {
                to: target.clone()
            }
        );
        assert!(graph.node_for(&old).is_none());
        assert!(!graph.node_for(&target).unwrap().resolved);
        assert_eq!(graph.edge(&app, &target).unwrap().scope, "runtime");
        assert!(graph.node_for(&coord("ignored", "1")).is_none());
        assert_eq!(graph.relocations(), &[(old, target)]);
    }

    #[test]
    fn test_relocation_loop_is_an_error() {
        let app = coord("app", "1.0");
        let (a, b) = (coord("a", "1"), coord("b", "1"));
        let mut graph = Graph::new(app.clone());
        expand(&mut graph, &app, &model("app", "1.0").with_dependency(dep("a", "1")));

        let to = |artifact: &str| Relocation {
            group_id: None,
            artifact_id: Some(artifact.into()),
            version: None,
        };
        expand(&mut graph, &a, &model("a", "1").relocated_to(to("b")));

        let err = add_node_from_model(
            &mut graph,
            &b.full_key(),
            &model("b", "1").relocated_to(to("a")),
            &ResolverConfig::default(),
            &EventBus::default(),
        )
        .unwrap_err();
        match err {
            GraphError::RelocationLoop {
                chain,
            } => assert_eq!(chain, "com.example:b:1 -> com.example:a:1 -> com.example:b:1"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(graph.node_for(&b).is_some());
    }

    #[test]
    fn test_relocation_onto_relocated_coordinate_follows_chain() {
        // a -> b is recorded first; z -> a arrives later and has to end up on b.
        let app = coord("app", "1.0");
        let (a, b, x, z) = (coord("a", "1"), coord("b", "1"), coord("x", "1"), coord("z", "1"));
        let mut graph = Graph::new(app.clone());
        expand(
            &mut graph,
            &app,
            &model("app", "1.0").with_dependency(dep("a", "1")).with_dependency(dep("x", "1")),
        );

        let to = |artifact: &str| Relocation {
            group_id: None,
            artifact_id: Some(artifact.into()),
            version: None,
        };
        expand(&mut graph, &a, &model("a", "1").relocated_to(to("b")));
        expand(&mut graph, &x, &model("x", "1").with_dependency(dep("z", "1")));

        assert_eq!(
            expand(&mut graph, &z, &model("z", "1").relocated_to(to("a"))),
            Expansion::Relocated {
                to: b.clone()
            }
        );
        assert!(graph.node_for(&z).is_none());
        assert!(graph.node_for(&a).is_none());
        assert_eq!(edge_targets(&graph, &x), vec![b.clone()]);
        assert_eq!(edge_targets(&graph, &app), vec![x, b.clone()]);
        assert_eq!(graph.relocations(), &[(a.clone(), b), (z, a)]);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_missing_node_is_invariant_error() {
        let mut graph = Graph::new(coord("app", "1.0"));
        let err = add_node_from_model(
            &mut graph,
            "nope",
            &model("x", "1"),
            &ResolverConfig::default(),
            &EventBus::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::GraphInvariant { .. }));
    }
}
