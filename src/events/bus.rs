//! Per-listener event dispatch.
//!
//! Every registered listener owns a bounded queue drained by its own worker
//! task. Emitting never awaits. When a queue is full, resolution events give
//! way: an incoming one is dropped for that listener, counted and logged.
//! Phase events and errors are never dropped. If the queue is full when one
//! arrives, the oldest queued resolution event is evicted to make room, and
//! if there is none the queue grows past its capacity. A slow listener
//! therefore always sees `New` first and `Done` last. Within one listener
//! events arrive in emission order.
//!
//! Consecutive events emitted while the graph is unchanged share one
//! snapshot.
//!
//! A bus created outside a Tokio runtime has no workers and calls listeners
//! inline instead; ordering is trivially preserved in that mode.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;

use crate::coordinate::ArtifactCoordinate;
use crate::core::GraphError;
use crate::graph::{Graph, Revision};

use super::{
    DependencyResolutionEvent, GraphListener, GraphPhase, GraphPhaseEvent, GraphTask,
    GraphTaskError, ResolutionEventType,
};

enum Dispatch {
    Phase(GraphPhaseEvent),
    Resolution(DependencyResolutionEvent),
    Error(GraphTaskError),
    Flush(oneshot::Sender<()>),
}

impl Dispatch {
    fn describe(&self) -> String {
        match self {
            Self::Phase(event) => match event.task() {
                Some(task) => format!("{:?}({task})", event.phase()),
                None => format!("{:?}", event.phase()),
            },
            Self::Resolution(event) => format!("{:?} {}", event.event_type(), event.subject()),
            Self::Error(error) => format!("error: {error}"),
            Self::Flush(_) => "flush".to_string(),
        }
    }

    /// Resolution events may be shed under back-pressure; nothing else is.
    fn is_droppable(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }
}

/// One listener's pending events.
struct Queue {
    pending: Mutex<VecDeque<Dispatch>>,
    ready: Notify,
    closed: AtomicBool,
    capacity: usize,
}

impl Queue {
    fn new(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::with_capacity(capacity)),
            ready: Notify::new(),
            closed: AtomicBool::new(false),
            capacity,
        }
    }

    /// Enqueue `dispatch`, returning whatever had to be discarded for it.
    fn push(&self, dispatch: Dispatch) -> Option<Dispatch> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let mut discarded = None;
        if pending.len() >= self.capacity {
            if dispatch.is_droppable() {
                return Some(dispatch);
            }
            // Flush markers only wait their turn.
            if !matches!(dispatch, Dispatch::Flush(_)) {
                let position = pending.iter().position(Dispatch::is_droppable);
                discarded = position.and_then(|p| pending.remove(p));
            }
        }
        pending.push_back(dispatch);
        drop(pending);
        self.ready.notify_one();
        discarded
    }

    fn pop(&self) -> Option<Dispatch> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.ready.notify_one();
    }
}

struct Route {
    listener: Arc<dyn GraphListener>,
    queue: Option<Arc<Queue>>,
    worker: Option<JoinHandle<()>>,
}

/// Fan-out of graph events to the registered listeners.
pub struct EventBus {
    routes: Vec<Route>,
    dropped: Arc<AtomicUsize>,
    snapshot: Mutex<Option<(Revision, Arc<Graph>)>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.routes.len())
            .field("dropped", &self.dropped_events())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Vec::new(), 1)
    }
}

impl EventBus {
    /// Register `listeners`, each with a queue holding up to `capacity` events.
    pub fn new(listeners: Vec<Arc<dyn GraphListener>>, capacity: usize) -> Self {
        let runtime = tokio::runtime::Handle::try_current().ok();
        if runtime.is_none() && !listeners.is_empty() {
            tracing::debug!("No Tokio runtime; delivering graph events inline");
        }

        let routes = listeners
            .into_iter()
            .map(|listener| match &runtime {
                Some(handle) => {
                    let queue = Arc::new(Queue::new(capacity.max(1)));
                    let worker =
                        handle.spawn(run_worker(Arc::clone(&listener), Arc::clone(&queue)));
                    Route {
                        listener,
                        queue: Some(queue),
                        worker: Some(worker),
                    }
                }
                None => Route {
                    listener,
                    queue: None,
                    worker: None,
                },
            })
            .collect();

        Self {
            routes,
            dropped: Arc::new(AtomicUsize::new(0)),
            snapshot: Mutex::new(None),
        }
    }

    pub fn has_listeners(&self) -> bool {
        !self.routes.is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.routes.len()
    }

    /// Resolution events discarded because a listener queue was full.
    pub fn dropped_events(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn phase(&self, phase: GraphPhase, task: Option<GraphTask>, graph: &Graph) {
        if self.has_listeners() {
            let event = GraphPhaseEvent::new(phase, task, self.snapshot(graph));
            self.emit(|| Dispatch::Phase(event.clone()));
        }
    }

    pub fn resolution(
        &self,
        event_type: ResolutionEventType,
        subject: &ArtifactCoordinate,
        detail: Option<String>,
        graph: &Graph,
    ) {
        if self.has_listeners() {
            let event = DependencyResolutionEvent::new(
                event_type,
                subject.clone(),
                detail,
                self.snapshot(graph),
            );
            self.emit(|| Dispatch::Resolution(event.clone()));
        }
    }

    pub fn error(&self, task: Option<GraphTask>, error: &GraphError, graph: &Graph) {
        if self.has_listeners() {
            let event = GraphTaskError::new(task, error.clone(), self.snapshot(graph));
            self.emit(|| Dispatch::Error(event.clone()));
        }
    }

    /// Copy of `graph`, reused while its revision stays the same.
    fn snapshot(&self, graph: &Graph) -> Arc<Graph> {
        let mut cached = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((revision, snapshot)) = cached.as_ref() {
            if *revision == graph.revision() {
                return Arc::clone(snapshot);
            }
        }
        let snapshot = Arc::new(graph.clone());
        *cached = Some((graph.revision(), Arc::clone(&snapshot)));
        snapshot
    }

    fn emit(&self, make: impl Fn() -> Dispatch) {
        for route in &self.routes {
            let dispatch = make();
            match &route.queue {
                Some(queue) => {
                    if let Some(discarded) = queue.push(dispatch) {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            "Listener queue full, dropping event {}",
                            discarded.describe()
                        );
                    }
                }
                None => deliver(route.listener.as_ref(), dispatch),
            }
        }
    }

    /// Wait until every listener has handled all events emitted so far.
    pub async fn flush(&self) {
        for route in &self.routes {
            let Some(queue) = &route.queue else {
                continue;
            };
            let (ack, done) = oneshot::channel();
            queue.push(Dispatch::Flush(ack));
            let _ = done.await;
        }
    }

    /// Flush, close every queue and join the workers.
    pub async fn shutdown(mut self) {
        self.flush().await;
        for route in &mut self.routes {
            if let Some(queue) = route.queue.take() {
                queue.close();
            }
            if let Some(worker) = route.worker.take() {
                if let Err(e) = worker.await {
                    tracing::warn!("Listener worker ended abnormally: {}", e);
                }
            }
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        // Workers drain what is queued, then exit.
        for queue in self.routes.iter().filter_map(|r| r.queue.as_ref()) {
            queue.close();
        }
    }
}

async fn run_worker(listener: Arc<dyn GraphListener>, queue: Arc<Queue>) {
    loop {
        let next = queue.pop();
        match next {
            Some(dispatch) => deliver(listener.as_ref(), dispatch),
            None if queue.closed.load(Ordering::Acquire) => break,
            None => queue.ready.notified().await,
        }
    }
}

/// Call the listener, swallowing both errors and panics.
fn deliver(listener: &dyn GraphListener, dispatch: Dispatch) {
    let description = dispatch.describe();
    let outcome = catch_unwind(AssertUnwindSafe(|| match dispatch {
        Dispatch::Phase(event) => listener.on_phase_event(&event),
        Dispatch::Resolution(event) => listener.on_resolution_event(&event),
        Dispatch::Error(error) => listener.on_graph_error(&error),
        Dispatch::Flush(ack) => {
            let _ = ack.send(());
            Ok(())
        }
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Graph listener failed on {}: {:#}", description, e),
        Err(_) => tracing::warn!("Graph listener panicked on {}", description),
    }
}
