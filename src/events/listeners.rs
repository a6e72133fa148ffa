//! Built-in listeners.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::coordinate::ArtifactCoordinate;

use super::{
    DependencyResolutionEvent, GraphListener, GraphPhase, GraphPhaseEvent, GraphTask,
    GraphTaskError, ResolutionEventType,
};

/// Writes every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl GraphListener for LoggingListener {
    fn on_graph_error(&self, error: &GraphTaskError) -> anyhow::Result<()> {
        tracing::warn!(
            "Resolution error ({} nodes in graph): {}",
            error.graph().node_count(),
            error
        );
        Ok(())
    }

    fn on_phase_event(&self, event: &GraphPhaseEvent) -> anyhow::Result<()> {
        let graph = event.graph();
        match (event.phase(), event.task()) {
            (GraphPhase::New, _) => {
                tracing::info!("Resolving dependency graph for {}", graph.root().coordinate);
            }
            (GraphPhase::Done, _) => tracing::info!(
                "Dependency graph complete: {} nodes, {} edges",
                graph.node_count(),
                graph.edge_count()
            ),
            (phase, Some(task)) => tracing::debug!(
                "{:?} {} ({} nodes, {} edges)",
                phase,
                task,
                graph.node_count(),
                graph.edge_count()
            ),
            (phase, None) => tracing::debug!("{:?}", phase),
        }
        Ok(())
    }

    fn on_resolution_event(&self, event: &DependencyResolutionEvent) -> anyhow::Result<()> {
        let detail = event.detail().unwrap_or_default();
        match event.event_type() {
            ResolutionEventType::AddingModel => {
                tracing::debug!("Adding model for {}", event.subject());
            }
            ResolutionEventType::ApplyingDependencyManagement => {
                tracing::debug!("Managed {}: {}", event.subject(), detail);
            }
            ResolutionEventType::ConflictOmitForNearer => {
                tracing::info!("Omitting {} for nearer {}", event.subject(), detail);
            }
            ResolutionEventType::CycleBroken => {
                tracing::info!("Broke dependency cycle at {}: {}", event.subject(), detail);
            }
        }
        Ok(())
    }
}

/// One captured event, without the graph snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    Phase {
        phase: GraphPhase,
        task: Option<GraphTask>,
    },
    Resolution {
        event_type: ResolutionEventType,
        subject: ArtifactCoordinate,
        detail: Option<String>,
    },
    Error {
        task: Option<GraphTask>,
        message: String,
    },
}

/// Captures every event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    pub fn phases(&self) -> Vec<(GraphPhase, Option<GraphTask>)> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Phase {
                    phase,
                    task,
                } => Some((*phase, *task)),
                _ => None,
            })
            .collect()
    }

    /// Subjects of resolution events of one type, in order.
    pub fn subjects_of(&self, event_type: ResolutionEventType) -> Vec<ArtifactCoordinate> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Resolution {
                    event_type: recorded,
                    subject,
                    ..
                } if *recorded == event_type => Some(subject.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count_of(&self, event_type: ResolutionEventType) -> usize {
        self.subjects_of(event_type).len()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Error {
                    message, ..
                } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn push(&self, event: RecordedEvent) {
        self.lock().push(event);
    }
}

impl GraphListener for RecordingListener {
    fn on_graph_error(&self, error: &GraphTaskError) -> anyhow::Result<()> {
        self.push(RecordedEvent::Error {
            task: error.task(),
            message: error.error().to_string(),
        });
        Ok(())
    }

    fn on_phase_event(&self, event: &GraphPhaseEvent) -> anyhow::Result<()> {
        self.push(RecordedEvent::Phase {
            phase: event.phase(),
            task: event.task(),
        });
        Ok(())
    }

    fn on_resolution_event(&self, event: &DependencyResolutionEvent) -> anyhow::Result<()> {
        self.push(RecordedEvent::Resolution {
            event_type: event.event_type(),
            subject: event.subject().clone(),
            detail: event.detail().map(str::to_string),
        });
        Ok(())
    }
}
