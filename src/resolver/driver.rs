//! The resolve loop.
//!
//! [`GraphResolver`] repeatedly resolves every pending node until none are
//! left. A pass has three tasks, each bracketed by `TaskPre`/`TaskPost` phase
//! events:
//!
//! 1. `resolve-nodes`: load the models of all pending nodes concurrently (at
//!    most `max_parallel` in flight, results kept in order) and expand them
//!    one by one
//! 2. `mediate-conflicts`: flag the farther of two versions
//! 3. `cleanup-orphans`: sweep flagged and unreachable nodes
//!
//! Pending nodes are unresolved, not conflicted, not failed, and reachable
//! from the root through enabled edges. Disabled edges (optional, cycle,
//! conflict) never lead to more loading.

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::config::ModelErrorPolicy;
use crate::coordinate::{ArtifactCoordinate, VersionedReference};
use crate::core::{GraphError, ResolutionError};
use crate::events::{GraphPhase, GraphTask};
use crate::graph::{Graph, cleanup_orphaned_nodes, reachable_from_root};
use crate::model::ModelLoader;

use super::builder::GraphBuilder;
use super::expansion::Expansion;
use super::mediation::mediate_conflicts;

/// Cooperative cancellation for a resolution: an explicit flag plus an
/// optional deadline. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel automatically once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            ..Self::default()
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Completes once cancelled, by flag or by deadline.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            match self.deadline {
                Some(deadline) => {
                    tokio::select! {
                        () = &mut notified => {}
                        () = tokio::time::sleep_until(deadline) => return,
                    }
                }
                None => notified.await,
            }
        }
    }
}

/// A node whose model could not be loaded or expanded.
#[derive(Debug, Clone)]
pub struct FailedNode {
    pub coordinate: ArtifactCoordinate,
    pub error: GraphError,
}

/// Counters from one resolve loop.
#[derive(Debug, Clone, Default)]
pub struct ResolutionSummary {
    pub passes: usize,
    pub resolved: usize,
    pub relocated: usize,
    pub conflicts: usize,
    pub removed: usize,
    pub failed: Vec<FailedNode>,
}

/// A fully resolved graph and how it got there.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub graph: Graph,
    pub summary: ResolutionSummary,
}

/// Drives a [`GraphBuilder`] until the graph is complete.
pub struct GraphResolver<L> {
    builder: GraphBuilder<L>,
}

impl<L: ModelLoader> GraphResolver<L> {
    pub fn new(builder: GraphBuilder<L>) -> Self {
        Self {
            builder,
        }
    }

    pub fn builder(&self) -> &GraphBuilder<L> {
        &self.builder
    }

    /// Resolve the full graph for `root`.
    ///
    /// Fails with `Resolution` when the root cannot be resolved or `cancel`
    /// fires, and with the load error itself under [`ModelErrorPolicy::Abort`].
    pub async fn resolve(
        &self,
        root: &VersionedReference,
        cancel: &Cancellation,
    ) -> Result<Resolved, GraphError> {
        let mut graph = self.builder.new_graph(root);
        let summary = self.resolve_graph(&mut graph, cancel).await?;
        Ok(Resolved {
            graph,
            summary,
        })
    }

    /// Run the resolve loop on an existing graph.
    ///
    /// The graph is left structurally valid on every exit path, including
    /// errors and cancellation. `Done` is always the last phase event.
    pub async fn resolve_graph(
        &self,
        graph: &mut Graph,
        cancel: &Cancellation,
    ) -> Result<ResolutionSummary, GraphError> {
        let mut summary = ResolutionSummary::default();
        let outcome = self.run(graph, cancel, &mut summary).await;

        let bus = self.builder.bus();
        if let Err(e) = &outcome {
            if e.is_cancelled() {
                tracing::info!("Resolution cancelled after {} passes", summary.passes);
            }
            self.cleanup(graph, &mut summary);
        }
        bus.phase(GraphPhase::Done, None, graph);
        bus.flush().await;

        outcome.map(|()| summary)
    }

    async fn run(
        &self,
        graph: &mut Graph,
        cancel: &Cancellation,
        summary: &mut ResolutionSummary,
    ) -> Result<(), GraphError> {
        let config = self.builder.config();
        let bus = self.builder.bus();
        let mut failed: IndexMap<String, GraphError> = IndexMap::new();

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(graph));
            }

            let pending = pending_nodes(graph, &failed);
            if pending.is_empty() {
                break;
            }
            if summary.passes >= config.max_passes {
                let error = GraphError::invariant(format!(
                    "resolution did not settle after {} passes",
                    config.max_passes
                ));
                bus.error(None, &error, graph);
                return Err(error);
            }
            summary.passes += 1;
            tracing::debug!("Pass {}: {} pending nodes", summary.passes, pending.len());

            bus.phase(GraphPhase::TaskPre, Some(GraphTask::ResolveNodes), graph);
            let builder = &self.builder;
            let loads = stream::iter(pending)
                .map(|(key, reference)| async move {
                    let result = builder.load(&reference).await;
                    (key, reference, result)
                })
                .buffered(config.max_parallel.max(1))
                .collect::<Vec<_>>();

            let results = tokio::select! {
                results = loads => results,
                () = cancel.cancelled() => {
                    bus.phase(GraphPhase::TaskPost, Some(GraphTask::ResolveNodes), graph);
                    return Err(self.cancelled(graph));
                }
            };

            for (key, reference, result) in results {
                if !graph.contains_node(&key) {
                    continue;
                }
                let expansion = match result {
                    Ok(model) => self.builder.expand(graph, &key, &model),
                    Err(e) => Err(e.into()),
                };
                match expansion {
                    Ok(Expansion::Expanded { .. }) => summary.resolved += 1,
                    Ok(Expansion::Relocated { .. }) => summary.relocated += 1,
                    Ok(Expansion::AlreadyResolved) => {}
                    Err(error) => {
                        bus.error(Some(GraphTask::ResolveNodes), &error, graph);
                        if graph.is_root(&key) {
                            return Err(ResolutionError::root_failed(&reference, error).into());
                        }
                        if config.model_error_policy == ModelErrorPolicy::Abort {
                            return Err(error);
                        }
                        tracing::warn!("Skipping {}: {}", reference, error);
                        failed.insert(key, error);
                    }
                }
            }
            bus.phase(GraphPhase::TaskPost, Some(GraphTask::ResolveNodes), graph);

            bus.phase(GraphPhase::TaskPre, Some(GraphTask::MediateConflicts), graph);
            summary.conflicts += mediate_conflicts(graph, bus).len();
            bus.phase(GraphPhase::TaskPost, Some(GraphTask::MediateConflicts), graph);

            self.cleanup(graph, summary);
        }

        summary.failed = failed
            .into_iter()
            .filter_map(|(key, error)| {
                graph.node(&key).map(|node| FailedNode {
                    coordinate: node.coordinate.clone(),
                    error,
                })
            })
            .collect();
        tracing::debug!(
            "Resolution settled after {} passes: {} nodes, {} edges",
            summary.passes,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(())
    }

    fn cleanup(&self, graph: &mut Graph, summary: &mut ResolutionSummary) {
        let bus = self.builder.bus();
        bus.phase(GraphPhase::TaskPre, Some(GraphTask::CleanupOrphans), graph);
        summary.removed += cleanup_orphaned_nodes(graph).len();
        bus.phase(GraphPhase::TaskPost, Some(GraphTask::CleanupOrphans), graph);
    }

    fn cancelled(&self, graph: &Graph) -> GraphError {
        let root = graph.root().coordinate.to_reference();
        let error: GraphError = ResolutionError::cancelled(&root).into();
        self.builder.bus().error(None, &error, graph);
        error
    }
}

/// Pending nodes with the reference to load, in graph insertion order.
fn pending_nodes(
    graph: &Graph,
    failed: &IndexMap<String, GraphError>,
) -> Vec<(String, VersionedReference)> {
    let reachable: HashSet<String> = reachable_from_root(graph).into_iter().collect();
    graph
        .nodes()
        .filter(|node| !node.resolved && !node.conflicted)
        .map(|node| (node.key(), node))
        .filter(|(key, _)| reachable.contains(key) && !failed.contains_key(key))
        .map(|(key, node)| (key, node.coordinate.to_reference()))
        .collect()
}
