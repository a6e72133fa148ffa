//! Graph creation and single-node resolution.

use std::sync::Arc;

use crate::config::ResolverConfig;
use crate::coordinate::{ArtifactCoordinate, VersionedReference};
use crate::core::{GraphError, ModelLoadError, ResolutionError};
use crate::events::{EventBus, GraphListener, GraphPhase, GraphTask};
use crate::graph::Graph;
use crate::model::{ModelLoader, ProjectModel, load_with_retry};

use super::expansion::{Expansion, add_node_from_model};

/// Creates graphs and resolves their nodes against a [`ModelLoader`].
///
/// Listeners are fixed at construction and receive events from every graph
/// this builder touches.
pub struct GraphBuilder<L> {
    loader: L,
    config: ResolverConfig,
    bus: EventBus,
}

impl<L: ModelLoader> GraphBuilder<L> {
    pub fn new(loader: L, config: ResolverConfig) -> Self {
        Self::with_listeners(loader, config, Vec::new())
    }

    /// Build with listeners. Must be called inside a Tokio runtime for
    /// listeners to run on their own workers; otherwise they are called inline.
    pub fn with_listeners(
        loader: L,
        config: ResolverConfig,
        listeners: Vec<Arc<dyn GraphListener>>,
    ) -> Self {
        let bus = EventBus::new(listeners, config.event_queue_capacity);
        Self {
            loader,
            config,
            bus,
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Root coordinate for a reference, typed with the configured default type.
    pub fn root_coordinate(&self, reference: &VersionedReference) -> ArtifactCoordinate {
        ArtifactCoordinate::from_reference(reference, &self.config.default_type)
    }

    /// A graph holding only the unresolved root. Emits `New`.
    pub fn new_graph(&self, root: &VersionedReference) -> Graph {
        let graph = Graph::new(self.root_coordinate(root));
        self.bus.phase(GraphPhase::New, None, &graph);
        graph
    }

    /// Create a graph for `root` and resolve the root node.
    ///
    /// Root relocations are followed until a non-relocated root is expanded, so
    /// the returned graph always carries the root's direct dependencies.
    pub async fn create_graph(&self, root: &VersionedReference) -> Result<Graph, ResolutionError> {
        let mut graph = self.new_graph(root);

        loop {
            let node = graph.root();
            if node.resolved {
                break;
            }
            let key = node.key();
            let reference = node.coordinate.to_reference();
            if let Err(e) = self.resolve_node(&mut graph, &key, &reference).await {
                self.bus.error(Some(GraphTask::ResolveNodes), &e, &graph);
                return Err(ResolutionError::root_failed(root, e));
            }
        }

        Ok(graph)
    }

    /// Load a model, retrying transient failures per the configuration.
    pub async fn load(
        &self,
        reference: &VersionedReference,
    ) -> Result<ProjectModel, ModelLoadError> {
        load_with_retry(&self.loader, reference, self.config.model_load_retries).await
    }

    /// Expand an already loaded model into the node stored under `key`.
    pub fn expand(
        &self,
        graph: &mut Graph,
        key: &str,
        model: &ProjectModel,
    ) -> Result<Expansion, GraphError> {
        add_node_from_model(graph, key, model, &self.config, &self.bus)
    }

    /// Load the model for `reference` and expand it into the node under `key`.
    ///
    /// A resolved node is left alone without loading anything. On a load
    /// failure the node stays in the graph, unresolved.
    pub async fn resolve_node(
        &self,
        graph: &mut Graph,
        key: &str,
        reference: &VersionedReference,
    ) -> Result<Expansion, GraphError> {
        if graph.node(key).is_some_and(|n| n.resolved) {
            return Ok(Expansion::AlreadyResolved);
        }
        let model = self.load(reference).await?;
        self.expand(graph, key, &model)
    }
}
