//! Confirmation ledger: the one collection every confirmation mutation goes
//! through.
//!
//! Sweeper ticks and worker replies can race on the same record; `transition`
//! re-checks `Pending` while holding the write lock, so at most one terminal
//! transition wins and the loser observes `None`.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{Confirmation, ConfirmationStatus};

/// In-memory confirmation set. The persisted copy is written by the workflow
/// after mutations; this struct owns only the in-memory truth.
#[derive(Default)]
pub struct ConfirmationLedger {
    confirmations: RwLock<Vec<Confirmation>>,
}

impl ConfirmationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the in-memory set, e.g. from persisted state at startup.
    pub async fn replace_all(&self, confirmations: Vec<Confirmation>) {
        *self.confirmations.write().await = confirmations;
    }

    /// Snapshot of every record, for persistence.
    pub async fn snapshot(&self) -> Vec<Confirmation> {
        self.confirmations.read().await.clone()
    }

    pub async fn insert(&self, confirmation: Confirmation) {
        info!(
            confirmation_id = %confirmation.id,
            worker = %confirmation.worker_name,
            date = %confirmation.booking.date,
            time = %confirmation.booking.start_time,
            "Confirmation created"
        );
        self.confirmations.write().await.push(confirmation);
    }

    pub async fn get(&self, id: Uuid) -> Option<Confirmation> {
        self.confirmations
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// The single pending confirmation a worker is expected to answer.
    pub async fn pending_for_worker(&self, worker_id: Uuid) -> Option<Confirmation> {
        self.confirmations
            .read()
            .await
            .iter()
            .find(|c| c.worker_id == worker_id && c.status == ConfirmationStatus::Pending)
            .cloned()
    }

    /// Ids of all workers with an outstanding pending confirmation.
    pub async fn workers_with_pending(&self) -> std::collections::HashSet<Uuid> {
        self.confirmations
            .read()
            .await
            .iter()
            .filter(|c| c.status == ConfirmationStatus::Pending)
            .map(|c| c.worker_id)
            .collect()
    }

    /// Move a pending confirmation to a terminal state.
    ///
    /// Returns the updated record, or `None` when the record is unknown or a
    /// concurrent actor already terminated it; the caller must then no-op.
    pub async fn transition(
        &self,
        id: Uuid,
        to: ConfirmationStatus,
        responded_at: Option<DateTime<Utc>>,
        note: Option<String>,
    ) -> Option<Confirmation> {
        debug_assert!(to.is_terminal());
        let mut confirmations = self.confirmations.write().await;
        let record = confirmations.iter_mut().find(|c| c.id == id)?;

        // Re-check under the write lock: only one terminal transition wins
        if record.status != ConfirmationStatus::Pending {
            debug!(confirmation_id = %id, status = %record.status, "Transition lost race, already terminal");
            return None;
        }

        record.status = to;
        record.responded_at = responded_at;
        if note.is_some() {
            record.note = note;
        }
        info!(confirmation_id = %id, status = %to, "Confirmation transitioned");
        Some(record.clone())
    }

    /// Expire every pending confirmation whose window has passed.
    /// Idempotent per tick: already-terminal records are untouched.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Vec<Confirmation> {
        let mut confirmations = self.confirmations.write().await;
        let mut expired = Vec::new();
        for record in confirmations.iter_mut() {
            if record.status == ConfirmationStatus::Pending && record.is_expired_at(now) {
                record.status = ConfirmationStatus::Expired;
                expired.push(record.clone());
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Expired overdue confirmations");
        }
        expired
    }

    /// Drop records created before `cutoff`. Runs at startup, not during
    /// normal operation. Returns the number purged.
    pub async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut confirmations = self.confirmations.write().await;
        let before = confirmations.len();
        confirmations.retain(|c| c.created_at >= cutoff);
        let purged = before - confirmations.len();
        if purged > 0 {
            info!(count = purged, "Purged old confirmations");
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::model::{Worker, WorkerSpec};
    use crate::workflow::model::Booking;
    use std::time::Duration;

    fn make_confirmation() -> Confirmation {
        let worker = Worker::new(WorkerSpec {
            name: "Marco".into(),
            contact_id: "marco@chat".into(),
            ..WorkerSpec::default()
        });
        Confirmation::new(
            Booking {
                date: "2026-08-24".into(),
                start_time: "15:30".into(),
                service_name: "fade".into(),
                client_display_name: "Ana".into(),
            },
            &worker,
            "client@chat",
            Duration::from_secs(120),
        )
    }

    #[tokio::test]
    async fn pending_lookup_by_worker() {
        let ledger = ConfirmationLedger::new();
        let conf = make_confirmation();
        let worker_id = conf.worker_id;
        ledger.insert(conf.clone()).await;

        let found = ledger.pending_for_worker(worker_id).await.unwrap();
        assert_eq!(found.id, conf.id);
        assert!(ledger.pending_for_worker(Uuid::new_v4()).await.is_none());
        assert!(ledger.workers_with_pending().await.contains(&worker_id));
    }

    #[tokio::test]
    async fn transition_wins_once() {
        let ledger = ConfirmationLedger::new();
        let conf = make_confirmation();
        ledger.insert(conf.clone()).await;

        let now = Utc::now();
        let confirmed = ledger
            .transition(conf.id, ConfirmationStatus::Confirmed, Some(now), None)
            .await
            .unwrap();
        assert_eq!(confirmed.status, ConfirmationStatus::Confirmed);
        assert_eq!(confirmed.responded_at, Some(now));

        // Second actor loses the race and must no-op
        assert!(
            ledger
                .transition(conf.id, ConfirmationStatus::Expired, None, None)
                .await
                .is_none()
        );
        let stored = ledger.get(conf.id).await.unwrap();
        assert_eq!(stored.status, ConfirmationStatus::Confirmed);
    }

    #[tokio::test]
    async fn transition_unknown_id_is_none() {
        let ledger = ConfirmationLedger::new();
        assert!(
            ledger
                .transition(Uuid::new_v4(), ConfirmationStatus::Rejected, None, None)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn expire_due_is_idempotent() {
        let ledger = ConfirmationLedger::new();
        let mut overdue = make_confirmation();
        overdue.expires_at = Utc::now() - chrono::Duration::seconds(1);
        let fresh = make_confirmation();
        ledger.insert(overdue.clone()).await;
        ledger.insert(fresh.clone()).await;

        let expired = ledger.expire_due(Utc::now()).await;
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, overdue.id);

        // Second sweep finds nothing new
        assert!(ledger.expire_due(Utc::now()).await.is_empty());
        assert_eq!(
            ledger.get(fresh.id).await.unwrap().status,
            ConfirmationStatus::Pending
        );
    }

    #[tokio::test]
    async fn expire_due_never_touches_terminal_records() {
        let ledger = ConfirmationLedger::new();
        let mut conf = make_confirmation();
        conf.expires_at = Utc::now() - chrono::Duration::seconds(1);
        ledger.insert(conf.clone()).await;

        ledger
            .transition(conf.id, ConfirmationStatus::Rejected, Some(Utc::now()), None)
            .await
            .unwrap();
        assert!(ledger.expire_due(Utc::now()).await.is_empty());
        assert_eq!(
            ledger.get(conf.id).await.unwrap().status,
            ConfirmationStatus::Rejected
        );
    }

    #[tokio::test]
    async fn purge_drops_only_old_records() {
        let ledger = ConfirmationLedger::new();
        let mut old = make_confirmation();
        old.created_at = Utc::now() - chrono::Duration::hours(2);
        let fresh = make_confirmation();
        ledger.insert(old).await;
        ledger.insert(fresh.clone()).await;

        let purged = ledger
            .purge_created_before(Utc::now() - chrono::Duration::hours(1))
            .await;
        assert_eq!(purged, 1);
        let remaining = ledger.snapshot().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, fresh.id);
    }
}
