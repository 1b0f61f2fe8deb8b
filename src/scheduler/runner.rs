//! Interval scheduler.
//!
//! Each registered task gets its own tokio task driving a
//! [`tokio::time::Interval`]. The first tick fires immediately, so a task runs
//! once on registration and then once per interval until it is stopped.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Error returned by a scheduled job.
pub type JobError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("no tokio runtime available to run task '{0}'")]
    NoRuntime(String),

    #[error("task '{0}' must have a non-zero interval")]
    ZeroInterval(String),
}

/// Public view of one registered task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleInfo {
    pub id: String,
    pub interval_secs: u64,
    pub runs: u64,
    pub failures: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct RunStats {
    runs: u64,
    failures: u64,
    last_run: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

struct Entry {
    interval: Duration,
    handle: JoinHandle<()>,
    stats: Arc<Mutex<RunStats>>,
}

/// Runs named jobs on independent fixed intervals.
#[derive(Default)]
pub struct Scheduler {
    entries: Mutex<HashMap<String, Entry>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` under `id` and start it.
    ///
    /// The job runs immediately, then every `interval`. Errors and panics
    /// inside the job are logged and do not cancel the recurrence. An
    /// existing task with the same id is stopped and replaced.
    ///
    /// # Errors
    ///
    /// Fails if `interval` is zero or if called outside a tokio runtime.
    pub fn add_task<F, Fut>(&self, id: impl Into<String>, interval: Duration, job: F) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let id = id.into();
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval(id));
        }
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime(id.clone()))?;

        let stats = Arc::new(Mutex::new(RunStats::default()));
        let handle = runtime.spawn(run_loop(id.clone(), interval, job, Arc::clone(&stats)));

        let previous = self.entries.lock().insert(
            id.clone(),
            Entry {
                interval,
                handle,
                stats,
            },
        );
        if let Some(previous) = previous {
            previous.handle.abort();
            debug!(task = %id, "replaced existing task");
        }

        info!(task = %id, interval_secs = interval.as_secs(), "scheduled task");
        Ok(())
    }

    /// Minute-based form of [`Scheduler::add_task`].
    pub fn add_task_minutes<F, Fut>(&self, id: impl Into<String>, minutes: u64, job: F) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.add_task(id, Duration::from_secs(minutes.saturating_mul(60)), job)
    }

    /// Cancel one task. Returns `false` if no task with that id is scheduled.
    pub fn stop_task(&self, id: &str) -> bool {
        match self.entries.lock().remove(id) {
            Some(entry) => {
                entry.handle.abort();
                info!(task = %id, "stopped task");
                true
            }
            None => false,
        }
    }

    /// Cancel every task.
    pub fn stop_all(&self) {
        let drained: Vec<(String, Entry)> = self.entries.lock().drain().collect();
        for (id, entry) in drained {
            entry.handle.abort();
            info!(task = %id, "stopped task");
        }
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Ids of all scheduled tasks, sorted.
    pub fn task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run statistics for every scheduled task, sorted by id.
    pub fn snapshot(&self) -> Vec<ScheduleInfo> {
        let entries = self.entries.lock();
        let mut out: Vec<ScheduleInfo> = entries
            .iter()
            .map(|(id, entry)| {
                let stats = entry.stats.lock();
                ScheduleInfo {
                    id: id.clone(),
                    interval_secs: entry.interval.as_secs(),
                    runs: stats.runs,
                    failures: stats.failures,
                    last_run: stats.last_run,
                    last_error: stats.last_error.clone(),
                }
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for entry in self.entries.get_mut().values() {
            entry.handle.abort();
        }
    }
}

async fn run_loop<F, Fut>(id: String, interval: Duration, job: F, stats: Arc<Mutex<RunStats>>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    // An overrunning job pushes the schedule back instead of bursting.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        run_once(&id, &job, &stats).await;
    }
}

async fn run_once<F, Fut>(id: &str, job: &F, stats: &Mutex<RunStats>)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<(), JobError>>,
{
    let outcome = AssertUnwindSafe(async { job().await }).catch_unwind().await;

    let mut stats = stats.lock();
    stats.runs += 1;
    stats.last_run = Some(Utc::now());

    match outcome {
        Ok(Ok(())) => {
            stats.last_error = None;
            debug!(task = %id, run = stats.runs, "task finished");
        }
        Ok(Err(err)) => {
            stats.failures += 1;
            stats.last_error = Some(err.to_string());
            error!(task = %id, "Error running task {id}: {err}");
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            stats.failures += 1;
            stats.last_error = Some(message.clone());
            error!(task = %id, "Task {id} panicked: {message}");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
