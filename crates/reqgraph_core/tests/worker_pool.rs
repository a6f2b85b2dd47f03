use reqgraph_core::task::TaskProgress;
use reqgraph_core::{
    EngineError, EngineResult, NodeId, PoolError, PoolState, Task, TaskState, WorkerPool,
    WorkerState,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

/// Task that blocks until released and records which thread ran it.
struct GateTask {
    id: NodeId,
    progress: TaskProgress,
    open: AtomicBool,
    runs: AtomicUsize,
    thread_name: parking_lot::Mutex<Option<String>>,
}

impl GateTask {
    fn new(open: bool) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::now_v7(),
            progress: TaskProgress::new(),
            open: AtomicBool::new(open),
            runs: AtomicUsize::new(0),
            thread_name: parking_lot::Mutex::new(None),
        })
    }

    fn release(&self) {
        self.open.store(true, Ordering::Release);
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::Acquire)
    }
}

impl Task for GateTask {
    fn name(&self) -> &'static str {
        "gate"
    }

    fn target(&self) -> NodeId {
        self.id
    }

    fn progress(&self) -> &TaskProgress {
        &self.progress
    }

    fn execute(&self) -> EngineResult<()> {
        *self.thread_name.lock() = thread::current().name().map(str::to_string);
        wait_until("gate release", || self.open.load(Ordering::Acquire));
        self.runs.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

struct PanicTask {
    id: NodeId,
    progress: TaskProgress,
}

impl Task for PanicTask {
    fn name(&self) -> &'static str {
        "panic"
    }

    fn target(&self) -> NodeId {
        self.id
    }

    fn progress(&self) -> &TaskProgress {
        &self.progress
    }

    fn execute(&self) -> EngineResult<()> {
        panic!("record store exploded");
    }
}

#[test]
fn start_threads_spawns_named_workers() {
    let pool = WorkerPool::new();
    assert_eq!(pool.start_threads(2).unwrap(), 2);
    assert_eq!(pool.start_threads(1).unwrap(), 3);
    wait_until("idle workers", || {
        pool.worker_status()
            .iter()
            .all(|state| *state == WorkerState::Idle)
    });

    let task = GateTask::new(true);
    pool.enqueue(task.clone()).unwrap();
    wait_until("gate task", || task.state().is_finished());
    let name = task.thread_name.lock().clone().unwrap();
    assert!(name.starts_with("reqgraph-worker-"), "{name}");
}

#[test]
fn busy_worker_is_reported_until_task_finishes() {
    let pool = WorkerPool::with_threads(1).unwrap();
    let task = GateTask::new(false);
    pool.enqueue(task.clone()).unwrap();

    wait_until("running", || task.state() == TaskState::Running);
    assert_eq!(pool.worker_status(), vec![WorkerState::Busy]);
    assert!(!pool.is_quiescent());
    assert_eq!(pool.enqueue(task.clone()), Err(PoolError::TaskRunning));

    task.release();
    wait_until("quiescent", || pool.is_quiescent());
    assert_eq!(task.state(), TaskState::Completed);
    assert_eq!(task.runs(), 1);
}

#[test]
fn tasks_start_in_fifo_order() {
    let pool = WorkerPool::new();
    let tasks: Vec<Arc<GateTask>> = (0..5).map(|_| GateTask::new(true)).collect();
    for task in &tasks {
        pool.enqueue(task.clone()).unwrap();
    }
    assert_eq!(pool.queued(), 5);

    let blocker = GateTask::new(false);
    pool.enqueue(blocker.clone()).unwrap();
    pool.start_threads(1).unwrap();
    wait_until("blocker running", || blocker.state() == TaskState::Running);
    assert!(tasks.iter().all(|task| task.state() == TaskState::Completed));
    blocker.release();
}

#[test]
fn queued_task_runs_once_even_when_enqueued_twice() {
    let pool = WorkerPool::new();
    let task = GateTask::new(true);
    pool.enqueue(task.clone()).unwrap();
    assert_eq!(pool.enqueue(task.clone()), Err(PoolError::AlreadyQueued));
    assert_eq!(pool.queued(), 1);
    assert!(task.progress().is_queued());

    pool.start_threads(2).unwrap();
    wait_until("gate task", || task.state().is_finished());
    wait_until("quiescent", || pool.is_quiescent());
    assert_eq!(task.runs(), 1);
    assert!(!task.progress().is_queued());

    pool.enqueue(task.clone()).unwrap();
    wait_until("second run", || task.runs() == 2);
    wait_until("quiescent", || pool.is_quiescent());
    assert_eq!(task.state(), TaskState::Completed);
}

#[test]
fn drain_runs_every_queued_task_then_stops() {
    let pool = WorkerPool::with_threads(2).unwrap();
    let tasks: Vec<Arc<GateTask>> = (0..8).map(|_| GateTask::new(true)).collect();
    for task in &tasks {
        pool.enqueue(task.clone()).unwrap();
    }

    pool.drain();
    assert_eq!(pool.status(), PoolState::Draining);
    assert_eq!(
        pool.enqueue(GateTask::new(true)),
        Err(PoolError::ShutDown)
    );
    pool.join();

    assert!(tasks.iter().all(|task| task.runs() == 1));
    assert_eq!(pool.status(), PoolState::ShutDown);
    assert!(pool
        .worker_status()
        .iter()
        .all(|state| *state == WorkerState::Stopped));
}

#[test]
fn shutdown_abandons_queued_tasks() {
    let pool = WorkerPool::with_threads(1).unwrap();
    let running = GateTask::new(false);
    pool.enqueue(running.clone()).unwrap();
    wait_until("running", || running.state() == TaskState::Running);

    let queued = GateTask::new(true);
    pool.enqueue(queued.clone()).unwrap();
    pool.shutdown();
    assert_eq!(pool.queued(), 0);

    running.release();
    pool.join();
    assert_eq!(running.state(), TaskState::Completed);
    assert_eq!(queued.state(), TaskState::Pending);
    assert!(!queued.progress().is_queued());
    assert_eq!(queued.runs(), 0);
    assert_eq!(pool.worker_status(), vec![WorkerState::Stopped]);
}

#[test]
fn panicking_task_fails_and_worker_survives() {
    let pool = WorkerPool::with_threads(1).unwrap();
    let panicking = Arc::new(PanicTask {
        id: Uuid::now_v7(),
        progress: TaskProgress::new(),
    });
    pool.enqueue(panicking.clone()).unwrap();
    wait_until("panic task", || panicking.state().is_finished());

    assert_eq!(panicking.state(), TaskState::Failed);
    match panicking.failure().unwrap() {
        EngineError::TaskFailed { task, node, source } => {
            assert_eq!(task, "panic");
            assert_eq!(node, panicking.id);
            assert_eq!(
                *source,
                EngineError::Panicked("record store exploded".to_string())
            );
        }
        other => panic!("unexpected failure: {other}"),
    }

    let next = GateTask::new(true);
    pool.enqueue(next.clone()).unwrap();
    wait_until("next task", || next.state().is_finished());
    assert_eq!(next.state(), TaskState::Completed);
}

#[test]
fn dropping_pool_stops_workers() {
    let pool = Arc::new(WorkerPool::with_threads(2).unwrap());
    let task = GateTask::new(true);
    pool.enqueue(task.clone()).unwrap();
    wait_until("task", || task.state().is_finished());
    drop(pool);
    assert_eq!(task.runs(), 1);
}
