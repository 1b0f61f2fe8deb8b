//! Live dataset store.
//!
//! Keeps the latest generated dataset per [`DataType`] and owns the scheduler
//! that regenerates them. Built from an explicit [`ManagerConfig`] and shared
//! through `Arc` by whoever needs it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Local, NaiveDate};
use parking_lot::RwLock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::mock;
use crate::domain::{DataPoint, DataStatus, DataType};
use crate::scheduler::{JobError, ScheduleInfo, Scheduler, SchedulerError};

/// Refresh cadence and dataset shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    pub industry_minutes: u64,
    pub etf_minutes: u64,
    pub stock_minutes: u64,
    /// Days of history per symbol.
    pub history_days: usize,
    /// Fixed RNG seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            industry_minutes: 30,
            etf_minutes: 15,
            stock_minutes: 5,
            history_days: 30,
            seed: None,
        }
    }
}

impl ManagerConfig {
    pub fn interval_minutes(&self, kind: DataType) -> u64 {
        match kind {
            DataType::Industry => self.industry_minutes,
            DataType::Etf => self.etf_minutes,
            DataType::Stock => self.stock_minutes,
        }
    }
}

type DataSets = HashMap<DataType, Vec<DataPoint>>;

/// Dataset store plus the scheduler that keeps it fresh.
pub struct DataManager {
    config: ManagerConfig,
    scheduler: Scheduler,
    data: Arc<RwLock<DataSets>>,
    generation: Arc<AtomicU64>,
}

impl DataManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            scheduler: Scheduler::new(),
            data: Arc::new(RwLock::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register one refresh job per data type.
    ///
    /// Each job runs immediately, so every dataset is populated as soon as the
    /// runtime gets to the spawned tasks.
    pub fn start(&self) -> Result<(), SchedulerError> {
        for kind in DataType::ALL {
            let refresher = Refresher {
                kind,
                days: self.config.history_days,
                seed: self.config.seed,
                data: Arc::clone(&self.data),
                generation: Arc::clone(&self.generation),
            };
            self.scheduler
                .add_task_minutes(kind.as_str(), self.config.interval_minutes(kind), move || {
                    let refresher = refresher.clone();
                    async move {
                        refresher.run();
                        Ok::<(), JobError>(())
                    }
                })?;
        }
        Ok(())
    }

    /// Latest dataset for `kind`; empty if it has never been generated.
    pub fn get_data(&self, kind: DataType) -> Vec<DataPoint> {
        self.data.read().get(&kind).cloned().unwrap_or_default()
    }

    /// Set the status of the data point with `id`.
    ///
    /// Returns `false` if no dataset contains that id.
    pub fn update_data_status(&self, id: &str, status: DataStatus) -> bool {
        let mut data = self.data.write();
        for points in data.values_mut() {
            if let Some(point) = points.iter_mut().find(|p| p.id == id) {
                point.status = status;
                info!(id, status = status.as_str(), "updated data point status");
                return true;
            }
        }
        false
    }

    /// Regenerate one dataset right away, outside the schedule.
    pub fn refresh(&self, kind: DataType) {
        Refresher {
            kind,
            days: self.config.history_days,
            seed: self.config.seed,
            data: Arc::clone(&self.data),
            generation: Arc::clone(&self.generation),
        }
        .run();
    }

    pub fn schedule(&self) -> Vec<ScheduleInfo> {
        self.scheduler.snapshot()
    }

    pub fn stop_scheduler(&self) {
        self.scheduler.stop_all();
    }
}

/// Everything a refresh job needs, detached from the manager so the
/// scheduler does not keep the manager alive.
#[derive(Clone)]
struct Refresher {
    kind: DataType,
    days: usize,
    seed: Option<u64>,
    data: Arc<RwLock<DataSets>>,
    generation: Arc<AtomicU64>,
}

impl Refresher {
    fn run(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(generation)),
            None => StdRng::from_entropy(),
        };
        let points = mock::generate(self.kind, &mut rng, today(), self.days);
        let n = points.len();
        self.data.write().insert(self.kind, points);
        info!(kind = self.kind.as_str(), points = n, generation, "regenerated dataset");
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn seeded() -> DataManager {
        DataManager::new(ManagerConfig {
            history_days: 3,
            seed: Some(1),
            ..ManagerConfig::default()
        })
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn unknown_type_data_is_empty_before_generation() {
        let manager = seeded();
        assert!(manager.get_data(DataType::Etf).is_empty());
    }

    #[test]
    fn update_status_mutates_known_ids_only() {
        let manager = seeded();
        manager.refresh(DataType::Etf);
        let points = manager.get_data(DataType::Etf);
        let target = points[3].id.clone();

        assert!(!manager.update_data_status("missing", DataStatus::Fixed));
        assert!(manager.update_data_status(&target, DataStatus::Fixed));

        let after = manager.get_data(DataType::Etf);
        let updated = after.iter().find(|p| p.id == target).unwrap();
        assert_eq!(updated.status, DataStatus::Fixed);
        assert_eq!(after.len(), points.len());
    }

    #[test]
    fn update_status_searches_every_dataset() {
        let manager = seeded();
        manager.refresh(DataType::Industry);
        manager.refresh(DataType::Stock);
        let id = manager.get_data(DataType::Stock)[0].id.clone();
        assert!(manager.update_data_status(&id, DataStatus::Anomaly));
        assert_eq!(manager.get_data(DataType::Stock)[0].status, DataStatus::Anomaly);
    }

    #[test]
    fn refresh_replaces_dataset_with_new_ids() {
        let manager = seeded();
        manager.refresh(DataType::Stock);
        let first = manager.get_data(DataType::Stock);
        manager.refresh(DataType::Stock);
        let second = manager.get_data(DataType::Stock);
        assert_eq!(first.len(), second.len());
        assert_ne!(first[0].id, second[0].id);
    }

    #[tokio::test(start_paused = true)]
    async fn start_populates_all_datasets_and_refreshes_on_schedule() {
        let manager = seeded();
        manager.start().unwrap();
        settle().await;

        for kind in DataType::ALL {
            assert!(!manager.get_data(kind).is_empty(), "{kind} not populated");
        }
        let stock_before = manager.get_data(DataType::Stock)[0].id.clone();
        let etf_before = manager.get_data(DataType::Etf)[0].id.clone();

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        settle().await;
        assert_ne!(manager.get_data(DataType::Stock)[0].id, stock_before);
        assert_eq!(manager.get_data(DataType::Etf)[0].id, etf_before);

        let schedule = manager.schedule();
        assert_eq!(schedule.len(), 3);
        let stock = schedule.iter().find(|s| s.id == "stock").unwrap();
        assert_eq!(stock.interval_secs, 300);
        assert_eq!(stock.runs, 2);

        manager.stop_scheduler();
        assert!(manager.schedule().is_empty());
    }
}
