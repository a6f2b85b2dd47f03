//! Caller-owned worker pool executing tasks from one FIFO queue.
//!
//! # Responsibility
//! - Own a fixed set of named worker threads.
//! - Hand queued tasks to idle workers in submission order.
//! - Record every task outcome, panics included, on the task itself.
//!
//! # Invariants
//! - A worker holds the queue lock only to take a task, never while running
//!   one.
//! - `busy` and worker states change under the queue lock, so
//!   `is_quiescent` never reports a gap between dequeue and execution.
//! - After `shutdown` no queued task starts; after `drain` every task queued
//!   before the call runs.
//! - A task is queued at most once and runs on at most one worker at a time.
//!   A worker marks it `Running` before releasing its queue slot.

use crate::error::EngineError;
use crate::task::{task_failure, Task};
use log::{debug, error, info, warn};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

const THREAD_NAME_PREFIX: &str = "reqgraph-worker";
const MAX_PANIC_MESSAGE_CHARS: usize = 160;

pub type PoolResult<T> = Result<T, PoolError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Pool is draining or shut down and accepts no more work.
    ShutDown,
    /// Task is being executed right now and cannot be queued again.
    TaskRunning,
    /// Task already waits in a queue.
    AlreadyQueued,
    /// OS refused to spawn a worker thread.
    Spawn(String),
}

impl Display for PoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShutDown => write!(f, "worker pool no longer accepts work"),
            Self::TaskRunning => write!(f, "task is already running"),
            Self::AlreadyQueued => write!(f, "task is already queued"),
            Self::Spawn(message) => write!(f, "failed to spawn worker thread: {message}"),
        }
    }
}

impl Error for PoolError {}

/// Observable state of one worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    /// Waiting for work.
    Idle,
    /// Executing a task.
    Busy,
    Stopped,
}

impl WorkerState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Starting => 0,
            Self::Idle => 1,
            Self::Busy => 2,
            Self::Stopped => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Idle,
            2 => Self::Busy,
            3 => Self::Stopped,
            _ => Self::Starting,
        }
    }
}

/// Admission state of the whole pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Ready,
    /// Finishing queued work; no new work accepted.
    Draining,
    ShutDown,
}

struct WorkerSlot {
    state: AtomicU8,
}

impl WorkerSlot {
    fn set(&self, state: WorkerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }
}

struct Queue {
    tasks: VecDeque<Arc<dyn Task>>,
    mode: PoolState,
    busy: usize,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

/// Worker pool shared by reference (`Arc<WorkerPool>`) between producers.
///
/// Dropping the pool shuts it down and joins every worker.
pub struct WorkerPool {
    shared: Arc<Shared>,
    slots: Mutex<Vec<Arc<WorkerSlot>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPool {
    /// Creates a pool without workers. Queued tasks wait until
    /// [`WorkerPool::start_threads`] is called.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue {
                    tasks: VecDeque::new(),
                    mode: PoolState::Ready,
                    busy: 0,
                }),
                available: Condvar::new(),
            }),
            slots: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Creates a pool and starts `count` workers.
    pub fn with_threads(count: usize) -> PoolResult<Self> {
        let pool = Self::new();
        pool.start_threads(count)?;
        Ok(pool)
    }

    /// Spawns `count` additional workers.
    ///
    /// Returns the total number of workers.
    ///
    /// # Errors
    /// - `ShutDown` when the pool is draining or shut down.
    /// - `Spawn` when a thread cannot be created; workers spawned before the
    ///   failure keep running.
    pub fn start_threads(&self, count: usize) -> PoolResult<usize> {
        if self.status() != PoolState::Ready {
            return Err(PoolError::ShutDown);
        }

        let mut slots = self.slots.lock();
        let mut handles = self.handles.lock();
        for _ in 0..count {
            let index = slots.len();
            let slot = Arc::new(WorkerSlot {
                state: AtomicU8::new(WorkerState::Starting.as_u8()),
            });
            let shared = Arc::clone(&self.shared);
            let worker_slot = Arc::clone(&slot);
            let handle = thread::Builder::new()
                .name(format!("{THREAD_NAME_PREFIX}-{index}"))
                .spawn(move || worker_loop(shared, worker_slot, index))
                .map_err(|err| {
                    error!(
                        "event=worker_spawn module=pool status=error worker={index} error={err}"
                    );
                    PoolError::Spawn(err.to_string())
                })?;
            slots.push(slot);
            handles.push(handle);
        }

        info!(
            "event=pool_start module=pool status=ok added={} workers={}",
            count,
            slots.len()
        );
        Ok(slots.len())
    }

    /// Queues `task` for execution. Never blocks on task execution.
    ///
    /// A finished task is reset to `Pending` and runs again.
    ///
    /// # Errors
    /// - `ShutDown` when the pool no longer accepts work.
    /// - `TaskRunning` when `task` is executing right now.
    /// - `AlreadyQueued` when `task` waits in this or another pool's queue.
    pub fn enqueue(&self, task: Arc<dyn Task>) -> PoolResult<()> {
        let mut queue = self.shared.queue.lock();
        if queue.mode != PoolState::Ready {
            return Err(PoolError::ShutDown);
        }
        let progress = task.progress();
        if !progress.try_mark_queued() {
            return Err(PoolError::AlreadyQueued);
        }
        if !progress.reset() {
            progress.clear_queued();
            return Err(PoolError::TaskRunning);
        }
        task.clear_results();
        debug!(
            "event=task_enqueue module=pool status=ok task={} target={} queued={}",
            task.name(),
            task.target(),
            queue.tasks.len() + 1
        );
        queue.tasks.push_back(task);
        drop(queue);
        self.shared.available.notify_one();
        Ok(())
    }

    /// Per-worker state, in spawn order.
    pub fn worker_status(&self) -> Vec<WorkerState> {
        self.slots.lock().iter().map(|slot| slot.get()).collect()
    }

    pub fn worker_count(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn status(&self) -> PoolState {
        self.shared.queue.lock().mode
    }

    /// Number of tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().tasks.len()
    }

    pub fn has_work(&self) -> bool {
        !self.shared.queue.lock().tasks.is_empty()
    }

    /// True when nothing is queued and no worker is executing a task.
    pub fn is_quiescent(&self) -> bool {
        let queue = self.shared.queue.lock();
        queue.tasks.is_empty() && queue.busy == 0
    }

    /// Stops accepting work and abandons queued tasks.
    ///
    /// Running tasks finish; abandoned tasks stay `Pending`.
    pub fn shutdown(&self) {
        let abandoned = {
            let mut queue = self.shared.queue.lock();
            if queue.mode == PoolState::ShutDown {
                return;
            }
            queue.mode = PoolState::ShutDown;
            let abandoned = queue.tasks.len();
            for task in queue.tasks.drain(..) {
                task.progress().clear_queued();
            }
            abandoned
        };
        self.shared.available.notify_all();
        info!("event=pool_shutdown module=pool status=ok abandoned={abandoned}");
    }

    /// Stops accepting work; workers exit once the queue is empty.
    pub fn drain(&self) {
        {
            let mut queue = self.shared.queue.lock();
            if queue.mode != PoolState::Ready {
                return;
            }
            queue.mode = PoolState::Draining;
        }
        self.shared.available.notify_all();
        info!("event=pool_drain module=pool status=start");
    }

    /// Waits for every worker to exit.
    ///
    /// Blocks until [`WorkerPool::shutdown`] or [`WorkerPool::drain`] lets the
    /// workers finish; on a `Ready` pool with workers it waits indefinitely.
    pub fn join(&self) {
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        let joined = handles.len();
        for handle in handles {
            if handle.join().is_err() {
                error!("event=worker_join module=pool status=error error=worker_panicked");
            }
        }

        let mut queue = self.shared.queue.lock();
        if queue.mode == PoolState::Draining {
            queue.mode = PoolState::ShutDown;
        }
        drop(queue);
        if joined > 0 {
            info!("event=pool_join module=pool status=ok workers={joined}");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}

fn worker_loop(shared: Arc<Shared>, slot: Arc<WorkerSlot>, index: usize) {
    debug!("event=worker_start module=pool status=ok worker={index}");
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if queue.mode == PoolState::ShutDown
                    || (queue.mode == PoolState::Draining && queue.tasks.is_empty())
                {
                    break None;
                }
                if let Some(task) = queue.tasks.pop_front() {
                    let progress = task.progress();
                    progress.begin();
                    progress.clear_queued();
                    queue.busy += 1;
                    slot.set(WorkerState::Busy);
                    break Some(task);
                }
                slot.set(WorkerState::Idle);
                shared.available.wait(&mut queue);
            }
        };
        let Some(task) = task else {
            break;
        };

        run_task(task.as_ref(), index);

        let mut queue = shared.queue.lock();
        queue.busy -= 1;
        slot.set(WorkerState::Idle);
    }

    slot.set(WorkerState::Stopped);
    // Draining workers may exit while peers still wait on an empty queue.
    shared.available.notify_all();
    debug!("event=worker_stop module=pool status=ok worker={index}");
}

fn run_task(task: &dyn Task, worker: usize) {
    let started_at = Instant::now();
    let progress = task.progress();

    match panic::catch_unwind(AssertUnwindSafe(|| task.execute())) {
        Ok(Ok(())) => {
            progress.complete();
            info!(
                "event=task_run module=pool status=ok task={} target={} worker={} duration_ms={}",
                task.name(),
                task.target(),
                worker,
                started_at.elapsed().as_millis()
            );
        }
        Ok(Err(err)) => {
            warn!(
                "event=task_run module=pool status=error task={} target={} worker={} duration_ms={} error={}",
                task.name(),
                task.target(),
                worker,
                started_at.elapsed().as_millis(),
                err
            );
            progress.fail(err);
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                "event=task_run module=pool status=error task={} target={} worker={} error_code=task_panicked payload={}",
                task.name(),
                task.target(),
                worker,
                message
            );
            progress.fail(task_failure(
                task.name(),
                task.target(),
                EngineError::Panicked(message),
            ));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    let single_line = message.replace(['\n', '\r'], " ");
    single_line.chars().take(MAX_PANIC_MESSAGE_CHARS).collect()
}
