//! Deferred task execution.
//!
//! The engine never sleeps itself. Every deferred commit is handed to a
//! [`Scheduler`], which decides how "later" is measured:
//!
//! - [`TokioScheduler`] spawns a task that sleeps on the tokio clock. Under
//!   `tokio::time::pause` the delay is virtual.
//! - [`ManualScheduler`] keeps its own virtual clock and only fires tasks
//!   from [`ManualScheduler::advance`].

use crate::error::{Result, SimError};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks after a delay.
///
/// Tasks are independent: no ordering is promised between two tasks unless
/// their delays differ. A zero delay runs the task inline, before
/// `schedule` returns.
pub trait Scheduler: Send + Sync {
    /// Schedules `task` to run once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: Task);
}

/// Scheduler backed by the tokio timer.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Creates a scheduler on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside of a tokio runtime.
    pub fn new() -> Result<Self> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|e| SimError::Runtime(format!("no tokio runtime: {e}")))
    }

    /// Creates a scheduler on an explicit runtime handle.
    #[must_use]
    pub const fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        if delay.is_zero() {
            task();
            return;
        }
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

#[derive(Default)]
struct ManualInner {
    now: Duration,
    next_seq: u64,
    queue: BinaryHeap<Reverse<(Duration, u64)>>,
    tasks: HashMap<u64, Task>,
}

/// Scheduler driven by an explicit virtual clock.
#[derive(Default)]
pub struct ManualScheduler {
    inner: Mutex<ManualInner>,
}

impl ManualScheduler {
    /// Creates a scheduler with its clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Time elapsed on the virtual clock.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of tasks waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Moves the clock forward by `by`, running every task that falls due.
    ///
    /// Tasks run in due-time order, ties in scheduling order. Tasks scheduled
    /// by a running task are eligible in the same call if they fall due
    /// before the target time. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.lock().now + by;
        let mut ran = 0;
        loop {
            let task = {
                let mut inner = self.lock();
                match inner.queue.peek() {
                    Some(Reverse((due, _))) if *due <= target => {
                        let due = *due;
                        let Some(Reverse((_, seq))) = inner.queue.pop() else {
                            break;
                        };
                        inner.now = due;
                        inner.tasks.remove(&seq)
                    }
                    _ => {
                        inner.now = target;
                        break;
                    }
                }
            };
            if let Some(task) = task {
                task();
                ran += 1;
            }
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        if delay.is_zero() {
            task();
            return;
        }
        let mut inner = self.lock();
        let due = inner.now + delay;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.queue.push(Reverse((due, seq)));
        inner.tasks.insert(seq, task);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &inner.now)
            .field("pending", &inner.tasks.len())
            .finish()
    }
}
