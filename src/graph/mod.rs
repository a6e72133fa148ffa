//! The dependency graph: artifact nodes connected by dependency edges.
//!
//! A [`Graph`] stores its nodes in a map keyed by full key
//! (`groupId:artifactId:version:classifier:type`) and its edges in a flat list.
//! Edges reference their endpoints by [`ArtifactCoordinate`] value, never by
//! pointer, so dependency cycles and relocation chains need no shared ownership
//! and every traversal is a key lookup.
//!
//! Nodes are kept in insertion order. Graph operations that have to pick between
//! otherwise equal candidates (conflict mediation ties, pending resolution order)
//! rely on that order being stable.
//!
//! Removing things happens in two phases: conflict mediation only *marks* a node
//! as [`Node::conflicted`]; [`cleanup_orphaned_nodes`] later deletes it, so
//! listeners can observe the decision before the node disappears.

pub mod analysis;
pub mod cleanup;
pub mod report;
pub mod tree;

pub use analysis::{
    ancestors, depths_from_root, effective_dependencies, find_cycles, install_order,
    reachable_from_root,
};
pub use cleanup::cleanup_orphaned_nodes;
pub use report::GraphReport;
pub use tree::render_tree;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::coordinate::{ArtifactCoordinate, management_key_of};
use crate::core::GraphError;
use crate::model::{DEFAULT_SCOPE, Dependency};

/// One artifact coordinate in the graph, resolved or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub coordinate: ArtifactCoordinate,
    /// Dependency-management entries from every model that declared them for this
    /// node, in the order they were captured.
    pub dependency_management: Vec<Dependency>,
    /// Management keys (`*` wildcards allowed) blocked from this node's children.
    pub excludes: IndexSet<String>,
    /// The model has been loaded and expanded.
    pub resolved: bool,
    /// The node exists only because a parent POM declared it.
    pub from_parent: bool,
    /// Marked for removal by conflict mediation.
    pub conflicted: bool,
}

impl Node {
    pub fn new(coordinate: ArtifactCoordinate) -> Self {
        Self {
            coordinate,
            dependency_management: Vec::new(),
            excludes: IndexSet::new(),
            resolved: false,
            from_parent: false,
            conflicted: false,
        }
    }

    pub fn key(&self) -> String {
        self.coordinate.full_key()
    }

    pub fn management_key(&self) -> String {
        self.coordinate.management_key()
    }

    /// Record an exclusion pattern for this node's children.
    pub fn add_exclude(&mut self, management_key: impl Into<String>) -> bool {
        self.excludes.insert(management_key.into())
    }

    /// True if a child `group_id:artifact_id` is blocked by one of the excludes.
    pub fn excludes_artifact(&self, group_id: &str, artifact_id: &str) -> bool {
        matches_exclusion(&self.excludes, group_id, artifact_id)
    }
}

/// True if `group_id:artifact_id` matches an exclude pattern, `*` wildcards included.
pub fn matches_exclusion(excludes: &IndexSet<String>, group_id: &str, artifact_id: &str) -> bool {
    if excludes.is_empty() {
        return false;
    }
    [
        management_key_of(group_id, artifact_id),
        management_key_of("*", artifact_id),
        management_key_of(group_id, "*"),
        management_key_of("*", "*"),
    ]
    .iter()
    .any(|key| excludes.contains(key))
}

/// Why an edge is inert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisabledType {
    /// The edge is active.
    #[default]
    None,
    /// The dependency was declared optional.
    Optional,
    /// The target lost conflict mediation to the node with `nearer_key`.
    Conflict { nearer_key: String },
    /// The edge would close a dependency cycle.
    Cycle,
    /// Disabled by a caller.
    Manual { reason: String },
}

impl DisabledType {
    /// Human readable reason, `None` for active edges.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Optional => Some("Optional Dependency".to_string()),
            Self::Conflict {
                nearer_key,
            } => Some(format!("Conflict: omitted for nearer {nearer_key}")),
            Self::Cycle => Some("Cycle Detected".to_string()),
            Self::Manual {
                reason,
            } => Some(reason.clone()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "enabled",
            Self::Optional => "optional",
            Self::Conflict { .. } => "conflict",
            Self::Cycle => "cycle",
            Self::Manual { .. } => "manual",
        }
    }
}

/// A dependency relation between two coordinates.
///
/// Identity is `(from, to)` only: scope and disabled state do not take part in
/// equality or hashing.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: ArtifactCoordinate,
    pub to: ArtifactCoordinate,
    pub scope: String,
    pub disabled: DisabledType,
}

impl Edge {
    pub fn new(from: ArtifactCoordinate, to: ArtifactCoordinate) -> Self {
        Self {
            from,
            to,
            scope: DEFAULT_SCOPE.to_string(),
            disabled: DisabledType::None,
        }
    }

    /// Builder-style scope; blank falls back to `compile`.
    #[must_use]
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = if scope.trim().is_empty() {
            DEFAULT_SCOPE.to_string()
        } else {
            scope.to_string()
        };
        self
    }

    pub fn disable(&mut self, disabled: DisabledType) {
        self.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled != DisabledType::None
    }

    pub fn disabled_reason(&self) -> Option<String> {
        self.disabled.reason()
    }

    /// Same edge state with the `to` endpoint replaced.
    pub fn retarget(&self, to: ArtifactCoordinate) -> Self {
        Self {
            from: self.from.clone(),
            to,
            scope: self.scope.clone(),
            disabled: self.disabled.clone(),
        }
    }

    pub fn connects(&self, from: &ArtifactCoordinate, to: &ArtifactCoordinate) -> bool {
        &self.from == from && &self.to == to
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.from.hash(state);
        self.to.hash(state);
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}]", self.from, self.to, self.scope)?;
        if let Some(reason) = self.disabled_reason() {
            write!(f, " (disabled: {reason})")?;
        }
        Ok(())
    }
}

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one state of one graph instance.
///
/// Every mutating call moves the revision on, and a clone starts out with an
/// identity of its own, so equal revisions mean "same instance, untouched".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    graph: u64,
    edits: u64,
}

/// Nodes keyed by full key, a flat edge list and one root.
#[derive(Debug)]
pub struct Graph {
    nodes: IndexMap<String, Node>,
    edges: Vec<Edge>,
    root_key: String,
    relocations: Vec<(ArtifactCoordinate, ArtifactCoordinate)>,
    revision: Revision,
}

impl Clone for Graph {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            root_key: self.root_key.clone(),
            relocations: self.relocations.clone(),
            revision: Revision {
                graph: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
                edits: self.revision.edits,
            },
        }
    }
}

impl Graph {
    /// Create a graph holding only an unresolved root node.
    pub fn new(root: ArtifactCoordinate) -> Self {
        let root_node = Node::new(root);
        let root_key = root_node.key();
        let mut nodes = IndexMap::new();
        nodes.insert(root_key.clone(), root_node);
        Self {
            nodes,
            edges: Vec::new(),
            root_key,
            relocations: Vec::new(),
            revision: Revision {
                graph: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
                edits: 0,
            },
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    fn touch(&mut self) {
        self.revision.edits += 1;
    }

    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    /// The root node. Present for the whole life of a graph.
    pub fn root(&self) -> &Node {
        &self.nodes[&self.root_key]
    }

    pub fn is_root(&self, key: &str) -> bool {
        self.root_key == key
    }

    pub(crate) fn set_root(&mut self, key: String) {
        self.touch();
        self.root_key = key;
    }

    pub fn node(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.touch();
        self.nodes.get_mut(key)
    }

    pub fn node_for(&self, coordinate: &ArtifactCoordinate) -> Option<&Node> {
        self.nodes.get(&coordinate.full_key())
    }

    pub fn contains_node(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_keys(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Insert `node` unless a node with the same key exists. Returns the stored node.
    pub fn add_node(&mut self, node: Node) -> &mut Node {
        self.touch();
        self.nodes.entry(node.key()).or_insert(node)
    }

    /// Find or create the node for `coordinate`.
    pub fn ensure_node(&mut self, coordinate: &ArtifactCoordinate) -> &mut Node {
        self.touch();
        self.nodes
            .entry(coordinate.full_key())
            .or_insert_with(|| Node::new(coordinate.clone()))
    }

    /// Remove a node from the key map. Edges are left alone.
    ///
    /// Keeps insertion order of the remaining nodes.
    pub(crate) fn remove_node(&mut self, key: &str) -> Option<Node> {
        self.touch();
        self.nodes.shift_remove(key)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Add `edge` unless an edge with the same `(from, to)` exists.
    ///
    /// Returns `false` when the edge was already present; the stored edge keeps
    /// its original scope and disabled state.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.edges.contains(&edge) {
            return false;
        }
        self.touch();
        self.edges.push(edge);
        true
    }

    pub fn edge(&self, from: &ArtifactCoordinate, to: &ArtifactCoordinate) -> Option<&Edge> {
        self.edges.iter().find(|e| e.connects(from, to))
    }

    /// Remove every edge matching `predicate`, returning them in list order.
    pub(crate) fn remove_edges_where(
        &mut self,
        mut predicate: impl FnMut(&Edge) -> bool,
    ) -> Vec<Edge> {
        self.touch();
        let mut removed = Vec::new();
        self.edges.retain(|edge| {
            if predicate(edge) {
                removed.push(edge.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn edges_from<'a>(
        &'a self,
        from: &'a ArtifactCoordinate,
    ) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.from == from)
    }

    pub fn edges_to<'a>(&'a self, to: &'a ArtifactCoordinate) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.to == to)
    }

    /// Disable the edge `from -> to`.
    pub fn disable_edge(
        &mut self,
        from: &ArtifactCoordinate,
        to: &ArtifactCoordinate,
        disabled: DisabledType,
    ) -> Result<(), GraphError> {
        self.touch();
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.connects(from, to))
            .ok_or_else(|| GraphError::invariant(format!("no edge {from} -> {to} to disable")))?;
        edge.disable(disabled);
        Ok(())
    }

    /// Relocations applied to this graph, oldest first.
    pub fn relocations(&self) -> &[(ArtifactCoordinate, ArtifactCoordinate)] {
        &self.relocations
    }

    pub(crate) fn record_relocation(&mut self, from: ArtifactCoordinate, to: ArtifactCoordinate) {
        self.touch();
        self.relocations.push((from, to));
    }

    /// Nodes that are not resolved yet, in insertion order.
    pub fn unresolved_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| !n.resolved)
    }

    /// Check the structural invariants: the root is present and every edge
    /// endpoint names a node in the graph.
    pub fn validate(&self) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&self.root_key) {
            return Err(GraphError::invariant(format!("root {} is missing", self.root_key)));
        }
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !self.nodes.contains_key(&endpoint.full_key()) {
                    return Err(GraphError::invariant(format!(
                        "edge {} -> {} references missing node {}",
                        edge.from, edge.to, endpoint
                    )));
                }
            }
        }
        Ok(())
    }
}
