//! Units of work executed by the worker pool.
//!
//! # Responsibility
//! - Define the contract the pool uses to run, track and reset a task.
//! - Provide the save, load and remove tasks.
//!
//! # Invariants
//! - A task is mutated only by the worker running it; callers observe it
//!   through lock-free polls.
//! - Failures are recorded on the task, never returned to the enqueuing
//!   thread.

mod load;
pub mod progress;
mod remove;
mod save;

pub use load::LoadTask;
pub use progress::{TaskProgress, TaskState};
pub use remove::RemoveTask;
pub use save::{SaveMode, SaveScope, SaveTask};

use crate::error::{EngineError, EngineResult};
use crate::model::node::NodeId;

/// Work item accepted by [`crate::pool::WorkerPool::enqueue`].
pub trait Task: Send + Sync {
    /// Short stable name used in logs and failures (`save`, `load`, `remove`).
    fn name(&self) -> &'static str;

    /// Identity of the node the task starts from.
    fn target(&self) -> NodeId;

    fn progress(&self) -> &TaskProgress;

    /// Runs the task body on the calling thread.
    ///
    /// Errors are already wrapped as `EngineError::TaskFailed`.
    fn execute(&self) -> EngineResult<()>;

    /// Drops results of a previous run. Called when the task is re-enqueued.
    fn clear_results(&self) {}

    fn state(&self) -> TaskState {
        self.progress().state()
    }

    fn failure(&self) -> Option<EngineError> {
        self.progress().failure()
    }
}

pub(crate) fn task_failure(task: &'static str, node: NodeId, source: EngineError) -> EngineError {
    EngineError::TaskFailed {
        task,
        node,
        source: Box::new(source),
    }
}
