//! Terminal progress for graph resolution.
//!
//! [`ProgressListener`] is a [`GraphListener`] that drives an `indicatif`
//! spinner: it shows the current task and a running count of expanded models,
//! conflicts and broken cycles, then clears itself when the graph is done.
//!
//! Progress is hidden when `REPOGRAPH_NO_PROGRESS` is set or when the caller
//! asks for a hidden spinner (`--no-progress`, `--quiet`).

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::events::{
    DependencyResolutionEvent, GraphListener, GraphPhase, GraphPhaseEvent, GraphTaskError,
    ResolutionEventType,
};

fn is_progress_disabled() -> bool {
    std::env::var("REPOGRAPH_NO_PROGRESS").is_ok()
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

/// Spinner-backed resolution progress.
pub struct ProgressListener {
    bar: ProgressBar,
    models: AtomicUsize,
    conflicts: AtomicUsize,
    cycles: AtomicUsize,
}

impl ProgressListener {
    /// A visible spinner, unless progress is disabled through the environment.
    pub fn new() -> Self {
        if is_progress_disabled() {
            return Self::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_prefix("Resolving");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(bar)
    }

    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            models: AtomicUsize::new(0),
            conflicts: AtomicUsize::new(0),
            cycles: AtomicUsize::new(0),
        }
    }

    pub fn models_seen(&self) -> usize {
        self.models.load(Ordering::Relaxed)
    }

    fn status(&self) -> String {
        format!(
            "{} models, {} conflicts, {} cycles",
            self.models.load(Ordering::Relaxed),
            self.conflicts.load(Ordering::Relaxed),
            self.cycles.load(Ordering::Relaxed)
        )
    }
}

impl Default for ProgressListener {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphListener for ProgressListener {
    fn on_graph_error(&self, error: &GraphTaskError) -> anyhow::Result<()> {
        self.bar.println(format!("warning: {error}"));
        Ok(())
    }

    fn on_phase_event(&self, event: &GraphPhaseEvent) -> anyhow::Result<()> {
        match (event.phase(), event.task()) {
            (GraphPhase::New, _) => {
                self.bar.set_message(format!("{}", event.graph().root().coordinate));
            }
            (GraphPhase::TaskPre, Some(task)) => {
                self.bar.set_message(format!("{task} ({})", self.status()));
            }
            (GraphPhase::Done, _) => self.bar.finish_and_clear(),
            _ => {}
        }
        Ok(())
    }

    fn on_resolution_event(&self, event: &DependencyResolutionEvent) -> anyhow::Result<()> {
        let counter = match event.event_type() {
            ResolutionEventType::AddingModel => &self.models,
            ResolutionEventType::ConflictOmitForNearer => &self.conflicts,
            ResolutionEventType::CycleBroken => &self.cycles,
            ResolutionEventType::ApplyingDependencyManagement => return Ok(()),
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.bar.set_message(format!("{} ({})", event.subject(), self.status()));
        Ok(())
    }
}
