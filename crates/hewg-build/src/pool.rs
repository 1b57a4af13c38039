//! Bounded worker pool.
//!
//! A fixed set of worker threads services a FIFO queue of heterogeneous
//! tasks. Each submission returns a [`JobHandle`] that resolves once the
//! task body returns; draining the pool discards every queued-but-unstarted
//! task, whose handles then resolve to `None`. In-flight tasks are never
//! cancelled.
//!
//! Workers carry a stable id in `[0, N)` which is injected into every task
//! body, so job output can be attributed without thread-local state.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

trait QueuedTask: Send {
    fn run(self: Box<Self>, worker: usize);
    fn discard(self: Box<Self>);
}

enum SlotState<T> {
    Pending,
    Finished(T),
    Discarded,
}

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    done: Condvar,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            done: Condvar::new(),
        }
    }

    fn resolve(&self, state: SlotState<T>) {
        *self.state.lock() = state;
        self.done.notify_all();
    }
}

/// Single-consumer completion handle for one submitted task.
pub struct JobHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> JobHandle<T> {
    /// Block until the task resolves. Returns `None` when the task was
    /// discarded before it started (drain or pool teardown).
    pub fn wait(self) -> Option<T> {
        let mut state = self.slot.state.lock();
        while matches!(*state, SlotState::Pending) {
            self.slot.done.wait(&mut state);
        }

        match std::mem::replace(&mut *state, SlotState::Discarded) {
            SlotState::Finished(value) => Some(value),
            _ => None,
        }
    }
}

struct TaskCell<T, F> {
    body: F,
    slot: Arc<Slot<T>>,
}

impl<T, F> QueuedTask for TaskCell<T, F>
where
    T: Send + 'static,
    F: FnOnce(usize) -> T + Send + 'static,
{
    fn run(self: Box<Self>, worker: usize) {
        let slot = self.slot;
        let body = self.body;
        match catch_unwind(AssertUnwindSafe(move || (body)(worker))) {
            Ok(value) => slot.resolve(SlotState::Finished(value)),
            // a panicking task resolves like a discarded one; the panic
            // must not take the worker thread down with it
            Err(_) => slot.resolve(SlotState::Discarded),
        }
    }

    fn discard(self: Box<Self>) {
        self.slot.resolve(SlotState::Discarded);
    }
}

struct Shared {
    queue: Mutex<VecDeque<Box<dyn QueuedTask>>>,
    available: Condvar,
    closing: AtomicBool,
}

impl Shared {
    fn drain(&self) {
        let drained: Vec<_> = self.queue.lock().drain(..).collect();
        for task in drained {
            task.discard();
        }
    }
}

/// A clonable handle that can drain the pool from inside a running task.
#[derive(Clone)]
pub struct PoolController {
    shared: Arc<Shared>,
}

impl PoolController {
    /// Discard all queued-but-unstarted tasks. In-flight tasks finish
    /// normally and their handles still resolve.
    pub fn drain(&self) {
        self.shared.drain();
    }
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            closing: AtomicBool::new(false),
        });

        let handles = (0..workers)
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("hewg-worker-{worker_id}"))
                    .spawn(move || worker_loop(shared, worker_id))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            shared,
            workers: handles,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue a task; the worker id is injected when it is dispatched.
    pub fn submit<T, F>(&self, body: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(usize) -> T + Send + 'static,
    {
        let slot = Arc::new(Slot::new());
        let cell = Box::new(TaskCell {
            body,
            slot: Arc::clone(&slot),
        });

        self.shared.queue.lock().push_back(cell);
        self.shared.available.notify_one();

        JobHandle { slot }
    }

    /// See [`PoolController::drain`].
    pub fn drain(&self) {
        self.shared.drain();
    }

    pub fn controller(&self) -> PoolController {
        PoolController {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.closing.store(true, Ordering::Release);
        self.shared.available.notify_all();

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }

        // workers exit without finishing the queue; pending handles resolve
        self.shared.drain();
    }
}

fn worker_loop(shared: Arc<Shared>, worker_id: usize) {
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if shared.closing.load(Ordering::Acquire) {
                    return;
                }
                if let Some(task) = queue.pop_front() {
                    break task;
                }
                shared.available.wait(&mut queue);
            }
        };

        task.run(worker_id);
    }
}
