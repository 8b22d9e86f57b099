//! Deferred tasks and wall-clock access, both injectable so production
//! completion can be driven without real waits in tests.

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::sleep;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs a task once, no earlier than `at`. There is no cancellation.
pub trait Scheduler: Send + Sync {
    fn schedule_at(&self, at: DateTime<Utc>, task: BoxFuture<'static, ()>);
}

/// Sleeps on the tokio timer, then runs the task on the runtime. Delays are
/// measured against the same clock that stamps `end_time`.
#[derive(Clone)]
pub struct TokioScheduler {
    clock: Arc<dyn Clock>,
}

impl TokioScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        TokioScheduler { clock }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_at(&self, at: DateTime<Utc>, task: BoxFuture<'static, ()>) {
        // Past deadlines fire immediately.
        let delay = (at - self.clock.now()).to_std().unwrap_or_default();
        tokio::spawn(async move {
            sleep(delay).await;
            task.await;
        });
    }
}

/// Holds tasks until [`ManualScheduler::run_due`] is called.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<(DateTime<Utc>, BoxFuture<'static, ()>)>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Deadlines of every queued task, in scheduling order.
    pub fn deadlines(&self) -> Vec<DateTime<Utc>> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(at, _)| *at)
            .collect()
    }

    /// Run every task due at or before `now`; returns how many ran.
    pub async fn run_due(&self, now: DateTime<Utc>) -> usize {
        let due: Vec<BoxFuture<'static, ()>> = {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            let (due, later): (Vec<_>, Vec<_>) = queue.drain(..).partition(|(at, _)| *at <= now);
            *queue = later;
            due.into_iter().map(|(_, task)| task).collect()
        };
        let ran = due.len();
        for task in due {
            task.await;
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_at(&self, at: DateTime<Utc>, task: BoxFuture<'static, ()>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((at, task));
    }
}
