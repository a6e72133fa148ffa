//! Phase and resolution events emitted while a graph is built.
//!
//! Listeners implement [`GraphListener`] and are registered on the
//! [`GraphBuilder`](crate::resolver::GraphBuilder) at construction. Events are
//! immutable value objects carrying an `Arc` snapshot of the graph as it was when
//! the event fired, so a listener can never mutate the graph being resolved.
//!
//! Delivery goes through the [`EventBus`]: each listener gets its own bounded
//! queue and worker task, which keeps per-listener ordering (`New` first, `Done`
//! last) while a slow listener never stalls resolution. Under back-pressure only
//! resolution events are shed; phase events and errors always arrive.

mod bus;
mod listeners;

pub use bus::EventBus;
pub use listeners::{LoggingListener, RecordingListener, RecordedEvent};

use std::fmt;
use std::sync::Arc;

use crate::coordinate::ArtifactCoordinate;
use crate::core::GraphError;
use crate::graph::Graph;

/// Milestones inside dependency resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionEventType {
    /// A loaded model is being expanded into the graph.
    AddingModel,
    /// A node lost conflict mediation to a nearer version.
    ConflictOmitForNearer,
    /// An edge was disabled because it closed a cycle.
    CycleBroken,
    /// A dependency-management entry changed a dependency.
    ApplyingDependencyManagement,
}

#[derive(Debug, Clone)]
pub struct DependencyResolutionEvent {
    event_type: ResolutionEventType,
    subject: ArtifactCoordinate,
    detail: Option<String>,
    graph: Arc<Graph>,
}

impl DependencyResolutionEvent {
    pub fn new(
        event_type: ResolutionEventType,
        subject: ArtifactCoordinate,
        detail: Option<String>,
        graph: Arc<Graph>,
    ) -> Self {
        Self {
            event_type,
            subject,
            detail,
            graph,
        }
    }

    pub fn event_type(&self) -> ResolutionEventType {
        self.event_type
    }

    /// The node the event is about.
    pub fn subject(&self) -> &ArtifactCoordinate {
        &self.subject
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

/// Lifecycle phase of a graph build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphPhase {
    New,
    TaskPre,
    TaskPost,
    Done,
}

/// Unit of work the resolve loop runs on a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphTask {
    ResolveNodes,
    MediateConflicts,
    CleanupOrphans,
}

impl GraphTask {
    pub fn name(self) -> &'static str {
        match self {
            Self::ResolveNodes => "resolve-nodes",
            Self::MediateConflicts => "mediate-conflicts",
            Self::CleanupOrphans => "cleanup-orphans",
        }
    }
}

impl fmt::Display for GraphTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct GraphPhaseEvent {
    phase: GraphPhase,
    task: Option<GraphTask>,
    graph: Arc<Graph>,
}

impl GraphPhaseEvent {
    pub fn new(phase: GraphPhase, task: Option<GraphTask>, graph: Arc<Graph>) -> Self {
        Self {
            phase,
            task,
            graph,
        }
    }

    pub fn phase(&self) -> GraphPhase {
        self.phase
    }

    pub fn task(&self) -> Option<GraphTask> {
        self.task
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

/// An error raised by a task, with the graph state at the time of failure.
#[derive(Debug, Clone)]
pub struct GraphTaskError {
    task: Option<GraphTask>,
    error: GraphError,
    graph: Arc<Graph>,
}

impl GraphTaskError {
    pub fn new(task: Option<GraphTask>, error: GraphError, graph: Arc<Graph>) -> Self {
        Self {
            task,
            error,
            graph,
        }
    }

    pub fn task(&self) -> Option<GraphTask> {
        self.task
    }

    pub fn error(&self) -> &GraphError {
        &self.error
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

impl fmt::Display for GraphTaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.task {
            Some(task) => write!(f, "{task} failed: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for GraphTaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Observer of graph construction.
///
/// All methods default to doing nothing. Returned errors (and panics) are caught
/// and logged by the [`EventBus`]; they never reach the resolution algorithm.
pub trait GraphListener: Send + Sync {
    fn on_graph_error(&self, _error: &GraphTaskError) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_phase_event(&self, _event: &GraphPhaseEvent) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_resolution_event(&self, _event: &DependencyResolutionEvent) -> anyhow::Result<()> {
        Ok(())
    }
}
