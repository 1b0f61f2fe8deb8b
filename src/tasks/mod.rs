//! Pull tasks: fake data-pull jobs that feed the review queue.
//!
//! Starting a task walks through its symbols one step at a time, generating a
//! review row per step. When the walk finishes, the rows are submitted as a
//! pending review batch and the task is marked completed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::{AlertContact, DataType, PullTask, TaskConfig, TaskProgress, TaskStatus};
use crate::review::ReviewBook;

mod pull;

/// Default pause between pull steps.
pub const DEFAULT_STEP: Duration = Duration::from_secs(2);

/// Steps in an index pull.
const INDUSTRY_STEPS: usize = 10;
/// Steps in an ETF pull.
const ETF_STEPS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task '{0}' not found")]
    NotFound(String),

    #[error("task '{0}' is already running")]
    AlreadyRunning(String),

    #[error("invalid task: {0}")]
    Invalid(String),

    #[error("no tokio runtime available to run task '{0}'")]
    NoRuntime(String),
}

/// Request to create a task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DataType,
    /// Update interval in minutes.
    pub interval: u64,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub alert_contacts: Vec<AlertContact>,
}

/// Criteria for [`TaskBoard::list`]; `None` matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    #[serde(rename = "type")]
    pub kind: Option<DataType>,
    pub status: Option<TaskStatus>,
    /// Case-insensitive substring of the task name.
    #[serde(rename = "q")]
    pub query: Option<String>,
}

impl TaskFilter {
    fn matches(&self, task: &PullTask) -> bool {
        if self.kind.is_some_and(|k| k != task.kind) {
            return false;
        }
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => task.name.to_lowercase().contains(&q.to_lowercase()),
            _ => true,
        }
    }
}

/// Number of pull steps for `task`.
pub fn total_steps(task: &PullTask) -> usize {
    match task.kind {
        DataType::Industry => INDUSTRY_STEPS,
        DataType::Etf => ETF_STEPS,
        DataType::Stock => task.config.symbols.as_ref().map_or(0, Vec::len),
    }
}

/// The six tasks a fresh desk starts with.
pub fn default_tasks() -> Vec<PullTask> {
    fn task(id: &str, name: &str, kind: DataType, symbols: &[&str]) -> PullTask {
        PullTask {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            status: TaskStatus::Stopped,
            last_run: None,
            next_run: None,
            progress: None,
            config: TaskConfig {
                interval: 60,
                symbols: (kind == DataType::Stock).then(|| symbols.iter().map(|s| s.to_string()).collect()),
                alert_contacts: vec![AlertContact::default()],
            },
        }
    }

    vec![
        task("industry-task", "Industry Index Data", DataType::Industry, &[]),
        task("etf-task", "ETF Data", DataType::Etf, &[]),
        task(
            "stock-task-tech",
            "Tech Stock Data",
            DataType::Stock,
            &["AAPL", "MSFT", "GOOGL", "META", "NVDA", "INTC", "ADBE"],
        ),
        task(
            "stock-task-finance",
            "Finance Stock Data",
            DataType::Stock,
            &["JPM", "BAC", "MA"],
        ),
        task(
            "stock-task-retail",
            "Retail Consumer Data",
            DataType::Stock,
            &["AMZN", "WMT", "HD", "DIS", "NFLX"],
        ),
        task(
            "stock-task-healthcare",
            "Healthcare Data",
            DataType::Stock,
            &["JNJ", "UNH", "PG"],
        ),
    ]
}

/// A pull in flight. `run` tells a restarted task's pulls apart.
struct Job {
    run: u64,
    handle: JoinHandle<()>,
}

/// In-memory task list plus the pulls currently in flight.
///
/// Lock order is `jobs` then `tasks`.
pub struct TaskBoard {
    tasks: Mutex<Vec<PullTask>>,
    jobs: Mutex<HashMap<String, Job>>,
    next_run: AtomicU64,
    reviews: Arc<ReviewBook>,
    step: Duration,
}

impl TaskBoard {
    pub fn new(reviews: Arc<ReviewBook>, step: Duration) -> Self {
        Self::with_tasks(reviews, step, default_tasks())
    }

    pub fn with_tasks(reviews: Arc<ReviewBook>, step: Duration, tasks: Vec<PullTask>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            jobs: Mutex::new(HashMap::new()),
            next_run: AtomicU64::new(1),
            reviews,
            step,
        }
    }

    pub fn list(&self, filter: &TaskFilter) -> Vec<PullTask> {
        self.tasks
            .lock()
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<PullTask> {
        self.tasks.lock().iter().find(|t| t.id == id).cloned()
    }

    pub fn create(&self, spec: NewTask) -> Result<PullTask, TaskError> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(TaskError::Invalid("name must not be empty".to_string()));
        }
        if spec.interval == 0 {
            return Err(TaskError::Invalid("interval must be at least 1 minute".to_string()));
        }

        let mut tasks = self.tasks.lock();
        let base = format!("{}-{}", spec.kind, Utc::now().timestamp_millis());
        let mut id = base.clone();
        let mut n = 1;
        while tasks.iter().any(|t| t.id == id) {
            id = format!("{base}-{n}");
            n += 1;
        }

        let task = PullTask {
            id,
            name: name.to_string(),
            kind: spec.kind,
            status: TaskStatus::Stopped,
            last_run: None,
            next_run: None,
            progress: None,
            config: TaskConfig {
                interval: spec.interval,
                symbols: (spec.kind == DataType::Stock).then_some(spec.symbols),
                alert_contacts: if spec.alert_contacts.is_empty() {
                    vec![AlertContact::default()]
                } else {
                    spec.alert_contacts
                },
            },
        };
        tasks.push(task.clone());
        info!(task = %task.id, kind = %task.kind, "created pull task");
        Ok(task)
    }

    /// Start a pull for task `id`.
    pub fn start(self: &Arc<Self>, id: &str) -> Result<PullTask, TaskError> {
        let runtime = Handle::try_current().map_err(|_| TaskError::NoRuntime(id.to_string()))?;

        let mut jobs = self.jobs.lock();
        let started = {
            let mut tasks = self.tasks.lock();
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
            if task.status == TaskStatus::Running {
                return Err(TaskError::AlreadyRunning(id.to_string()));
            }

            let now = Utc::now();
            let total = total_steps(task);
            task.status = TaskStatus::Running;
            task.last_run = Some(now);
            task.next_run = chrono::Duration::try_minutes(task.config.interval as i64).map(|d| now + d);
            task.progress = Some(TaskProgress {
                current: 0,
                total,
                current_symbol: symbol_at(task, 0),
            });
            task.clone()
        };

        // The job map stays held while spawning so a pull that finishes
        // instantly cannot try to deregister itself before it is registered.
        let run = self.next_run.fetch_add(1, Ordering::Relaxed);
        let handle = runtime.spawn(pull::run(Arc::clone(self), started.clone(), run));
        if let Some(previous) = jobs.insert(id.to_string(), Job { run, handle }) {
            previous.handle.abort();
        }

        info!(task = %id, steps = started.progress.as_ref().map_or(0, |p| p.total), "started pull task");
        Ok(started)
    }

    /// Cancel an in-flight pull (if any) and mark the task stopped.
    pub fn stop(&self, id: &str) -> Result<PullTask, TaskError> {
        let mut jobs = self.jobs.lock();
        if let Some(job) = jobs.remove(id) {
            job.handle.abort();
        }
        let stopped = self.modify(id, |task| {
            task.status = TaskStatus::Stopped;
            task.progress = None;
        })?;
        drop(jobs);
        info!(task = %id, "stopped pull task");
        Ok(stopped)
    }

    /// Abort every in-flight pull.
    pub fn shutdown(&self) {
        for (id, job) in self.jobs.lock().drain() {
            job.handle.abort();
            warn!(task = %id, "aborted pull task on shutdown");
        }
    }

    pub(crate) fn step(&self) -> Duration {
        self.step
    }

    pub(crate) fn reviews(&self) -> &ReviewBook {
        &self.reviews
    }

    pub(crate) fn modify(&self, id: &str, f: impl FnOnce(&mut PullTask)) -> Result<PullTask, TaskError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        f(task);
        Ok(task.clone())
    }

    /// Apply `f` to task `id` while `run` is still its registered pull.
    ///
    /// Returns `None` once the run has been stopped or replaced.
    pub(crate) fn modify_run(
        &self,
        id: &str,
        run: u64,
        f: impl FnOnce(&mut PullTask),
    ) -> Option<Result<PullTask, TaskError>> {
        let jobs = self.jobs.lock();
        if jobs.get(id).is_none_or(|job| job.run != run) {
            return None;
        }
        Some(self.modify(id, f))
    }

    /// Deregister `run` and call `f` with the job map still held, so a
    /// concurrent `stop` or `start` waits until `f` returns.
    ///
    /// Returns `None` without calling `f` once the run has been stopped or
    /// replaced.
    pub(crate) fn finish_run<R>(&self, id: &str, run: u64, f: impl FnOnce() -> R) -> Option<R> {
        let mut jobs = self.jobs.lock();
        if jobs.get(id).is_none_or(|job| job.run != run) {
            return None;
        }
        jobs.remove(id);
        Some(f())
    }

    #[cfg(test)]
    fn current_run(&self, id: &str) -> Option<u64> {
        self.jobs.lock().get(id).map(|job| job.run)
    }
}

/// Symbol handled by step `i` of a stock pull.
fn symbol_at(task: &PullTask, i: usize) -> Option<String> {
    if task.kind != DataType::Stock {
        return None;
    }
    task.config.symbols.as_ref().and_then(|s| s.get(i)).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReviewStatus;
    use crate::io::store::LocalStore;

    fn board(dir: &tempfile::TempDir) -> Arc<TaskBoard> {
        board_with_step(dir, DEFAULT_STEP)
    }

    fn board_with_step(dir: &tempfile::TempDir, step: Duration) -> Arc<TaskBoard> {
        let store = Arc::new(LocalStore::open(dir.path().join("store.json")));
        Arc::new(TaskBoard::new(Arc::new(ReviewBook::new(store)), step))
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn default_tasks_are_stopped_with_expected_step_counts() {
        let tasks = default_tasks();
        assert_eq!(tasks.len(), 6);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Stopped));
        let steps: Vec<usize> = tasks.iter().map(total_steps).collect();
        assert_eq!(steps, vec![10, 20, 7, 3, 5, 3]);
    }

    #[test]
    fn filter_by_type_status_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let board = board(&dir);

        let stocks = board.list(&TaskFilter {
            kind: Some(DataType::Stock),
            ..TaskFilter::default()
        });
        assert_eq!(stocks.len(), 4);

        let by_name = board.list(&TaskFilter {
            query: Some("  STOCK data ".to_string()),
            ..TaskFilter::default()
        });
        let ids: Vec<_> = by_name.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["stock-task-tech", "stock-task-finance"]);

        let running = board.list(&TaskFilter {
            status: Some(TaskStatus::Running),
            ..TaskFilter::default()
        });
        assert!(running.is_empty());
    }

    #[test]
    fn create_validates_and_assigns_type_prefixed_id() {
        let dir = tempfile::tempdir().unwrap();
        let board = board(&dir);

        let err = board
            .create(NewTask {
                name: "   ".to_string(),
                kind: DataType::Etf,
                interval: 5,
                symbols: Vec::new(),
                alert_contacts: Vec::new(),
            })
            .unwrap_err();
        assert!(matches!(err, TaskError::Invalid(_)));

        let etf = board
            .create(NewTask {
                name: "Nightly ETF".to_string(),
                kind: DataType::Etf,
                interval: 5,
                symbols: vec!["ignored".to_string()],
                alert_contacts: Vec::new(),
            })
            .unwrap();
        assert!(etf.id.starts_with("etf-"));
        assert_eq!(etf.status, TaskStatus::Stopped);
        assert_eq!(etf.config.symbols, None);
        assert_eq!(etf.config.alert_contacts, vec![AlertContact::default()]);

        let twin = board
            .create(NewTask {
                name: "Nightly ETF 2".to_string(),
                kind: DataType::Etf,
                interval: 5,
                symbols: Vec::new(),
                alert_contacts: Vec::new(),
            })
            .unwrap();
        assert_ne!(etf.id, twin.id);
        assert_eq!(board.list(&TaskFilter::default()).len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn stock_pull_walks_symbols_and_submits_review() {
        let dir = tempfile::tempdir().unwrap();
        let board = board(&dir);

        let started = board.start("stock-task-finance").unwrap();
        assert_eq!(started.status, TaskStatus::Running);
        let progress = started.progress.unwrap();
        assert_eq!((progress.current, progress.total), (0, 3));
        assert_eq!(progress.current_symbol.as_deref(), Some("JPM"));
        assert!(matches!(
            board.start("stock-task-finance"),
            Err(TaskError::AlreadyRunning(_))
        ));

        settle().await;
        tokio::time::advance(DEFAULT_STEP).await;
        settle().await;
        let progress = board.get("stock-task-finance").unwrap().progress.unwrap();
        assert_eq!(progress.current, 1);
        assert_eq!(progress.current_symbol.as_deref(), Some("BAC"));

        for _ in 0..2 {
            tokio::time::advance(DEFAULT_STEP).await;
            settle().await;
        }

        let task = board.get("stock-task-finance").unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.progress.is_none());

        let reviews = board.reviews().list().unwrap();
        assert_eq!(reviews.len(), 1);
        let review = &reviews[0];
        assert_eq!(review.task_id, "stock-task-finance");
        assert_eq!(review.status, ReviewStatus::Pending);
        let symbols: Vec<_> = review.data.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["JPM", "BAC", "MA"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_a_pull_discards_its_output() {
        let dir = tempfile::tempdir().unwrap();
        let board = board(&dir);

        board.start("industry-task").unwrap();
        settle().await;
        tokio::time::advance(DEFAULT_STEP * 3).await;
        settle().await;

        let stopped = board.stop("industry-task").unwrap();
        assert_eq!(stopped.status, TaskStatus::Stopped);
        assert!(stopped.progress.is_none());

        tokio::time::advance(DEFAULT_STEP * 20).await;
        settle().await;
        assert_eq!(board.get("industry-task").unwrap().status, TaskStatus::Stopped);
        assert!(board.reviews().list().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_leaves_the_replaced_run_powerless() {
        let dir = tempfile::tempdir().unwrap();
        let board = board(&dir);

        board.start("industry-task").unwrap();
        let first = board.current_run("industry-task").unwrap();
        board.stop("industry-task").unwrap();
        assert_eq!(board.current_run("industry-task"), None);

        board.start("industry-task").unwrap();
        let second = board.current_run("industry-task").unwrap();
        assert_ne!(first, second);

        assert!(board.modify_run("industry-task", first, |t| t.status = TaskStatus::Error).is_none());
        assert!(board.finish_run("industry-task", first, || ()).is_none());
        assert_eq!(board.current_run("industry-task"), Some(second));
        assert_eq!(board.get("industry-task").unwrap().status, TaskStatus::Running);

        settle().await;
        for _ in 0..INDUSTRY_STEPS {
            tokio::time::advance(DEFAULT_STEP).await;
            settle().await;
        }
        assert_eq!(board.get("industry-task").unwrap().status, TaskStatus::Completed);
        assert_eq!(board.current_run("industry-task"), None);
        assert_eq!(board.reviews().list().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stop_racing_completion_always_wins() {
        let dir = tempfile::tempdir().unwrap();
        let board = board_with_step(&dir, Duration::from_millis(1));

        for i in 0..40u64 {
            board.start("stock-task-finance").unwrap();
            tokio::time::sleep(Duration::from_micros(i * 100)).await;
            let stopped = board.stop("stock-task-finance").unwrap();
            assert_eq!(stopped.status, TaskStatus::Stopped);

            tokio::time::sleep(Duration::from_millis(10)).await;
            let task = board.get("stock-task-finance").unwrap();
            assert_eq!(task.status, TaskStatus::Stopped, "iteration {i}");
            assert!(task.progress.is_none());
            assert_eq!(board.current_run("stock-task-finance"), None);
        }

        // Pulls that beat the stop each left one complete batch behind.
        for review in board.reviews().list().unwrap() {
            assert_eq!(review.data.len(), 3);
        }
    }

    #[tokio::test]
    async fn empty_stock_pull_completes_with_empty_review() {
        let dir = tempfile::tempdir().unwrap();
        let board = board(&dir);
        let task = board
            .create(NewTask {
                name: "Empty basket".to_string(),
                kind: DataType::Stock,
                interval: 1,
                symbols: Vec::new(),
                alert_contacts: Vec::new(),
            })
            .unwrap();

        board.start(&task.id).unwrap();
        settle().await;

        assert_eq!(board.get(&task.id).unwrap().status, TaskStatus::Completed);
        let reviews = board.reviews().list().unwrap();
        assert_eq!(reviews.len(), 1);
        assert!(reviews[0].data.is_empty());
    }

    #[test]
    fn unknown_task_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let board = board(&dir);
        assert!(matches!(board.stop("ghost"), Err(TaskError::NotFound(_))));
    }
}
