//! Lock-free completion tracking shared by every task kind.
//!
//! # Invariants
//! - Results and failures are published before the state that announces
//!   them (`Release` store, `Acquire` load).
//! - A `Running` task is never reset.
//! - A task sits in at most one queue slot at a time: `queued` is claimed
//!   before the push and released only once the task is `Running` or
//!   abandoned.

use crate::error::EngineError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Lifecycle of one task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Completed => 2,
            Self::Failed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug)]
pub struct TaskProgress {
    state: AtomicU8,
    queued: AtomicBool,
    processed: AtomicUsize,
    failure: Mutex<Option<EngineError>>,
}

impl Default for TaskProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskProgress {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(TaskState::Pending.as_u8()),
            queued: AtomicBool::new(false),
            processed: AtomicUsize::new(0),
            failure: Mutex::new(None),
        }
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the task waits in a pool queue.
    pub fn is_queued(&self) -> bool {
        self.queued.load(Ordering::Acquire)
    }

    /// Nodes handled so far by the current or last run.
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    /// First failure of the last run, if it failed.
    pub fn failure(&self) -> Option<EngineError> {
        if self.state() != TaskState::Failed {
            return None;
        }
        self.failure.lock().clone()
    }

    /// Puts the task back to `Pending` and clears counters and failure.
    ///
    /// Returns `false` when the task is currently running.
    pub(crate) fn reset(&self) -> bool {
        let running = TaskState::Running.as_u8();
        let swapped = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != running).then_some(TaskState::Pending.as_u8())
            });
        if swapped.is_err() {
            return false;
        }
        self.processed.store(0, Ordering::Release);
        *self.failure.lock() = None;
        true
    }

    /// Claims the single queue slot. Returns `false` when already queued.
    pub(crate) fn try_mark_queued(&self) -> bool {
        self.queued
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn clear_queued(&self) {
        self.queued.store(false, Ordering::Release);
    }

    pub(crate) fn begin(&self) {
        self.processed.store(0, Ordering::Release);
        *self.failure.lock() = None;
        self.state
            .store(TaskState::Running.as_u8(), Ordering::Release);
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn complete(&self) {
        self.state
            .store(TaskState::Completed.as_u8(), Ordering::Release);
    }

    pub(crate) fn fail(&self, err: EngineError) {
        *self.failure.lock() = Some(err);
        self.state.store(TaskState::Failed.as_u8(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::{TaskProgress, TaskState};
    use crate::error::EngineError;
    use uuid::Uuid;

    #[test]
    fn lifecycle_publishes_failure_only_when_failed() {
        let progress = TaskProgress::new();
        assert_eq!(progress.state(), TaskState::Pending);

        progress.begin();
        progress.record_processed();
        assert_eq!(progress.state(), TaskState::Running);
        assert_eq!(progress.failure(), None);

        let id = Uuid::now_v7();
        progress.fail(EngineError::NotFound(id));
        assert_eq!(progress.state(), TaskState::Failed);
        assert_eq!(progress.failure(), Some(EngineError::NotFound(id)));
        assert_eq!(progress.processed(), 1);
    }

    #[test]
    fn reset_refuses_running_task() {
        let progress = TaskProgress::new();
        progress.begin();
        assert!(!progress.reset());
        progress.complete();
        assert!(progress.state().is_finished());
        assert!(progress.reset());
        assert_eq!(progress.state(), TaskState::Pending);
        assert_eq!(progress.processed(), 0);
    }

    #[test]
    fn queue_slot_is_claimed_once() {
        let progress = TaskProgress::new();
        assert!(!progress.is_queued());
        assert!(progress.try_mark_queued());
        assert!(!progress.try_mark_queued());
        assert!(progress.is_queued());

        progress.begin();
        progress.clear_queued();
        assert!(!progress.is_queued());
        assert!(!progress.reset());
    }
}
