//! Worker directory: worker records, lookups, and load counters.

pub mod model;

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::Store;
use model::{Weekday, Worker, WorkerSpec};

/// Name of the worker seeded on first run.
const DEFAULT_WORKER_NAME: &str = "Principal";
const DEFAULT_WORKER_CONTACT: &str = "principal@local";

/// Holds the worker set and its query/mutation operations.
///
/// In-memory state is the source of truth; every mutation persists through
/// the injected store as best-effort durability (failures are logged, never
/// propagated out of the mutation).
pub struct WorkerDirectory {
    workers: RwLock<Vec<Worker>>,
    store: Arc<dyn Store>,
}

impl WorkerDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            workers: RwLock::new(Vec::new()),
            store,
        }
    }

    /// Load the persisted worker set, seeding a default single-worker
    /// configuration when nothing has been persisted yet.
    pub async fn load(&self) -> Result<(), StoreError> {
        let mut loaded = self.store.load_workers().await?;
        if loaded.is_empty() {
            let seed = Worker::new(WorkerSpec {
                name: DEFAULT_WORKER_NAME.into(),
                contact_id: DEFAULT_WORKER_CONTACT.into(),
                ..WorkerSpec::default()
            });
            info!(worker = %seed.name, "No persisted workers, seeding default");
            loaded.push(seed);
            if let Err(e) = self.store.save_workers(&loaded).await {
                warn!(error = %e, "Failed to persist seeded worker set");
            }
        }
        *self.workers.write().await = loaded;
        Ok(())
    }

    /// Persist the current worker set. Best-effort: failures are logged.
    async fn persist(&self) {
        let snapshot = self.workers.read().await.clone();
        if let Err(e) = self.store.save_workers(&snapshot).await {
            warn!(error = %e, "Failed to persist worker set");
        }
    }

    /// Snapshot of all workers, in directory order.
    pub async fn snapshot(&self) -> Vec<Worker> {
        self.workers.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.workers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workers.read().await.is_empty()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Option<Worker> {
        self.workers.read().await.iter().find(|w| w.id == id).cloned()
    }

    /// Case-insensitive exact match against display name or any alias.
    pub async fn find_by_name(&self, name_or_alias: &str) -> Option<Worker> {
        self.workers
            .read()
            .await
            .iter()
            .find(|w| w.matches_name(name_or_alias))
            .cloned()
    }

    pub async fn find_by_contact(&self, contact_id: &str) -> Option<Worker> {
        self.workers
            .read()
            .await
            .iter()
            .find(|w| w.contact_id == contact_id)
            .cloned()
    }

    /// Add a new worker and persist immediately.
    pub async fn add(&self, spec: WorkerSpec) -> Worker {
        let worker = Worker::new(spec);
        info!(worker_id = %worker.id, name = %worker.name, "Worker added");
        self.workers.write().await.push(worker.clone());
        self.persist().await;
        worker
    }

    /// Flip a worker's master availability switch. Returns the new value, or
    /// `None` when the id is unknown.
    pub async fn toggle_availability(&self, id: Uuid) -> Option<bool> {
        let new_value = {
            let mut workers = self.workers.write().await;
            let worker = workers.iter_mut().find(|w| w.id == id)?;
            worker.available = !worker.available;
            info!(worker_id = %id, available = worker.available, "Availability toggled");
            worker.available
        };
        self.persist().await;
        Some(new_value)
    }

    /// Bump the same-day load counter and the cumulative booking total.
    /// No-op for an unknown id.
    pub async fn increment_booking_count(&self, id: Uuid) {
        {
            let mut workers = self.workers.write().await;
            let Some(worker) = workers.iter_mut().find(|w| w.id == id) else {
                debug!(worker_id = %id, "Booking count increment for unknown worker");
                return;
            };
            worker.bookings_today += 1;
            worker.stats.total_bookings += 1;
        }
        self.persist().await;
    }

    /// Zero every worker's same-day counter. Runs once per calendar day at
    /// local business midnight; the trigger is an external scheduler.
    pub async fn reset_daily_counters(&self) {
        {
            let mut workers = self.workers.write().await;
            for worker in workers.iter_mut() {
                worker.bookings_today = 0;
            }
        }
        info!("Daily booking counters reset");
        self.persist().await;
    }

    /// Weekday bucket for an ISO `YYYY-MM-DD` date.
    ///
    /// The weekday of a calendar date is zone-independent, so no offset math
    /// is needed here; the business offset only drives the midnight reset.
    /// Malformed dates fail closed to Monday with a logged anomaly.
    pub fn day_of_week(&self, date: &str) -> Weekday {
        match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(d) => d.weekday().into(),
            Err(e) => {
                warn!(date = %date, error = %e, "Malformed date, defaulting to Monday");
                Weekday::Monday
            }
        }
    }
}
