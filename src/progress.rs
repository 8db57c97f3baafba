use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Adapter progress callback; receives a completion ratio in `[0, 1]`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepId {
    Audio,
    Subtitles,
    Processing,
    Finalizing,
}

impl StepId {
    pub const ALL: [StepId; 4] = [StepId::Audio, StepId::Subtitles, StepId::Processing, StepId::Finalizing];

    pub fn name(&self) -> &'static str {
        match self {
            StepId::Audio => "Generating voice",
            StepId::Subtitles => "Generating subtitles",
            StepId::Processing => "Compositing video",
            StepId::Finalizing => "Finalizing",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            StepId::Audio => "audio",
            StepId::Subtitles => "subtitles",
            StepId::Processing => "processing",
            StepId::Finalizing => "finalizing",
        };
        f.write_str(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl StepStatus {
    fn rank(&self) -> u8 {
        match self {
            StepStatus::Pending => 0,
            StepStatus::Processing => 1,
            StepStatus::Completed | StepStatus::Error => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }

    /// Statuses only move forward; a terminal status is final.
    pub fn can_become(&self, next: StepStatus) -> bool {
        next.rank() > self.rank()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationStep {
    pub id: StepId,
    pub name: &'static str,
    pub status: StepStatus,
    /// Percentage in `[0, 100]`
    pub progress: f64,
}

impl GenerationStep {
    fn pending(id: StepId) -> Self {
        Self {
            id,
            name: id.name(),
            status: StepStatus::Pending,
            progress: 0.0,
        }
    }
}

/// Per-run step table, published to observers through a watch channel.
///
/// Status changes that would regress a step and progress reports that would
/// lower it are dropped, so observers only ever see forward movement.
#[derive(Clone)]
pub struct StepTracker {
    tx: Arc<watch::Sender<Vec<GenerationStep>>>,
}

impl Default for StepTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StepTracker {
    pub fn new() -> Self {
        let steps = StepId::ALL.iter().copied().map(GenerationStep::pending).collect();
        let (tx, _rx) = watch::channel(steps);
        Self { tx: Arc::new(tx) }
    }

    /// Put every step back to pending for a new run.
    pub fn reset(&self) {
        self.tx.send_replace(StepId::ALL.iter().copied().map(GenerationStep::pending).collect());
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<GenerationStep>> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Vec<GenerationStep> {
        self.tx.borrow().clone()
    }

    pub fn status(&self, id: StepId) -> StepStatus {
        self.tx
            .borrow()
            .iter()
            .find(|step| step.id == id)
            .map(|step| step.status)
            .unwrap_or(StepStatus::Pending)
    }

    pub fn start(&self, id: StepId) {
        self.transition(id, StepStatus::Processing);
    }

    pub fn complete(&self, id: StepId) {
        self.transition(id, StepStatus::Completed);
    }

    pub fn fail(&self, id: StepId) {
        self.transition(id, StepStatus::Error);
    }

    /// Record progress for a running step; values are clamped to `[0, 100]` and decreases ignored.
    pub fn report(&self, id: StepId, percent: f64) {
        if percent.is_nan() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0);
        self.tx.send_if_modified(|steps| match steps.iter_mut().find(|step| step.id == id) {
            Some(step) if step.status == StepStatus::Processing && percent > step.progress => {
                step.progress = percent;
                true
            }
            _ => false,
        });
    }

    /// Callback for an adapter, rescaling its `[0, 1]` ratio to the step's `[0, 100]` range.
    pub fn reporter(&self, id: StepId) -> ProgressFn {
        let tracker = self.clone();
        Arc::new(move |ratio: f64| tracker.report(id, ratio * 100.0))
    }

    fn transition(&self, id: StepId, next: StepStatus) {
        self.tx.send_if_modified(|steps| match steps.iter_mut().find(|step| step.id == id) {
            Some(step) if step.status.can_become(next) => {
                debug!("Step {} {:?} -> {:?}", id, step.status, next);
                step.status = next;
                if next == StepStatus::Completed {
                    step.progress = 100.0;
                }
                true
            }
            _ => false,
        });
    }
}
