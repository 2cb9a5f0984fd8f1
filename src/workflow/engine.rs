//! Confirmation workflow: drives each assignment through the accept/decline
//! protocol and cascades to substitutes on failure.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channels::Messenger;
use crate::directory::WorkerDirectory;
use crate::directory::model::Worker;
use crate::error::{Result, WorkflowError};
use crate::resolver::Resolver;
use crate::store::Store;

use super::ledger::ConfirmationLedger;
use super::model::{Booking, Confirmation, ConfirmationStatus, ReplyIntent, classify_reply};

/// Everything the workflow needs, injected by the owner of the event loop.
pub struct WorkflowDeps {
    pub directory: Arc<WorkerDirectory>,
    pub resolver: Arc<Resolver>,
    pub ledger: Arc<ConfirmationLedger>,
    pub store: Arc<dyn Store>,
    pub messenger: Arc<dyn Messenger>,
}

/// Result of processing a recognized worker reply.
#[derive(Debug, Clone)]
pub struct ReplyOutcome {
    pub confirmation: Confirmation,
    pub confirmed: bool,
    pub worker: Worker,
}

/// Creates pending confirmations, applies worker replies, and runs the
/// reassignment cascade on rejection, expiry, or delivery failure.
pub struct ConfirmationWorkflow {
    directory: Arc<WorkerDirectory>,
    resolver: Arc<Resolver>,
    ledger: Arc<ConfirmationLedger>,
    store: Arc<dyn Store>,
    messenger: Arc<dyn Messenger>,
    confirmation_timeout: Duration,
}

impl ConfirmationWorkflow {
    pub fn new(deps: WorkflowDeps, confirmation_timeout: Duration) -> Self {
        Self {
            directory: deps.directory,
            resolver: deps.resolver,
            ledger: deps.ledger,
            store: deps.store,
            messenger: deps.messenger,
            confirmation_timeout,
        }
    }

    /// Persist the confirmation set. Best-effort: failures are logged and the
    /// in-memory state stays authoritative.
    async fn persist(&self) {
        let snapshot = self.ledger.snapshot().await;
        if let Err(e) = self.store.save_confirmations(&snapshot).await {
            warn!(error = %e, "Failed to persist confirmation set");
        }
    }

    /// Create a pending confirmation for `worker` and deliver the request.
    ///
    /// Rejects when the worker already has a pending confirmation. On
    /// delivery failure the record is expired immediately (annotated) and the
    /// cascade runs synchronously instead of waiting for the sweep.
    pub async fn create_confirmation(
        &self,
        booking: &Booking,
        worker: &Worker,
        requester_contact: &str,
    ) -> Result<Confirmation> {
        let (confirmation, delivered) = self.attempt(booking, worker, requester_contact).await?;
        if !delivered {
            let mut excluded = HashSet::new();
            excluded.insert(worker.id);
            self.cascade(booking, requester_contact, excluded).await;
        }
        Ok(confirmation)
    }

    /// One assignment attempt: insert pending, persist, deliver. Returns the
    /// record and whether delivery succeeded; a failed delivery leaves the
    /// record expired with a delivery-failure note.
    async fn attempt(
        &self,
        booking: &Booking,
        worker: &Worker,
        requester_contact: &str,
    ) -> Result<(Confirmation, bool)> {
        if self.ledger.pending_for_worker(worker.id).await.is_some() {
            return Err(WorkflowError::AlreadyPending { worker_id: worker.id }.into());
        }

        let confirmation = Confirmation::new(
            booking.clone(),
            worker,
            requester_contact,
            self.confirmation_timeout,
        );
        self.ledger.insert(confirmation.clone()).await;
        self.persist().await;

        let request = request_text(booking, &worker.name);
        match self
            .messenger
            .send_message(&worker.contact_id, &request)
            .await
        {
            Ok(()) => Ok((confirmation, true)),
            Err(e) => {
                warn!(
                    confirmation_id = %confirmation.id,
                    worker = %worker.name,
                    error = %e,
                    "Request delivery failed, expiring immediately"
                );
                let expired = self
                    .ledger
                    .transition(
                        confirmation.id,
                        ConfirmationStatus::Expired,
                        None,
                        Some(format!("delivery failed: {e}")),
                    )
                    .await
                    .unwrap_or(confirmation);
                self.persist().await;
                Ok((expired, false))
            }
        }
    }

    /// Apply a worker's raw reply to their pending confirmation.
    ///
    /// Returns `None` when the contact is unknown, the worker has nothing
    /// pending, or the text is unrecognized; none of those are errors, the
    /// message is simply not confirmation-related. A recognized reply moves
    /// the record to its terminal state and is returned for the caller to
    /// notify the requester and, on confirmation, bump the booking counter.
    pub async fn process_worker_response(
        &self,
        worker_contact_id: &str,
        raw_text: &str,
    ) -> Option<ReplyOutcome> {
        let worker = self.directory.find_by_contact(worker_contact_id).await?;
        let pending = self.ledger.pending_for_worker(worker.id).await?;

        let status = match classify_reply(raw_text) {
            ReplyIntent::Affirmative => ConfirmationStatus::Confirmed,
            ReplyIntent::Negative => ConfirmationStatus::Rejected,
            ReplyIntent::Unrecognized => {
                debug!(worker = %worker.name, text = %raw_text, "Unrecognized reply, confirmation stays pending");
                return None;
            }
        };

        // A concurrent sweep may have expired the record since the lookup;
        // the transition re-checks and yields None if so.
        let confirmation = self
            .ledger
            .transition(pending.id, status, Some(Utc::now()), None)
            .await?;
        self.persist().await;

        Some(ReplyOutcome {
            confirmed: status == ConfirmationStatus::Confirmed,
            confirmation,
            worker,
        })
    }

    /// Full reply handling as used by the event loop: process the response,
    /// update counters, notify the requester, and cascade on rejection.
    pub async fn handle_worker_reply(
        &self,
        worker_contact_id: &str,
        raw_text: &str,
    ) -> Option<ReplyOutcome> {
        let outcome = self
            .process_worker_response(worker_contact_id, raw_text)
            .await?;

        if outcome.confirmed {
            self.directory
                .increment_booking_count(outcome.worker.id)
                .await;
            self.notify_outcome(&outcome.confirmation, true).await;
        } else {
            self.notify_outcome(&outcome.confirmation, false).await;
            self.reassign(&outcome.confirmation).await;
        }
        Some(outcome)
    }

    /// Tell the requester how the assignment ended. Delivery failures are
    /// logged, never retried, and do not touch confirmation state.
    pub async fn notify_outcome(&self, confirmation: &Confirmation, confirmed: bool) {
        let text = if confirmed {
            confirmed_text(confirmation)
        } else {
            need_alternative_text(confirmation)
        };
        if let Err(e) = self
            .messenger
            .send_message(&confirmation.requester_contact, &text)
            .await
        {
            warn!(
                confirmation_id = %confirmation.id,
                error = %e,
                "Failed to notify requester of outcome"
            );
        }
    }

    /// Restart the assignment for a failed confirmation, excluding the worker
    /// who just failed to confirm.
    pub async fn reassign(&self, failed: &Confirmation) {
        let mut excluded = HashSet::new();
        excluded.insert(failed.worker_id);
        self.cascade(&failed.booking, &failed.requester_contact, excluded)
            .await;
    }

    /// The cascade: keep trying substitutes until one accepts delivery or no
    /// candidate remains. Workers with an outstanding pending confirmation
    /// are skipped, preserving the one-pending-per-worker invariant. When the
    /// pool is exhausted the requester gets exactly one final notice.
    async fn cascade(&self, booking: &Booking, requester_contact: &str, mut excluded: HashSet<Uuid>) {
        loop {
            excluded.extend(self.ledger.workers_with_pending().await);

            let Some(substitute) = self
                .resolver
                .resolve_substitute(&booking.date, &booking.start_time, &excluded)
                .await
            else {
                info!(
                    date = %booking.date,
                    time = %booking.start_time,
                    "No substitute available, booking unresolvable"
                );
                if let Err(e) = self
                    .messenger
                    .send_message(requester_contact, &unresolvable_text(booking))
                    .await
                {
                    warn!(error = %e, "Failed to deliver final unresolvable notice");
                }
                return;
            };

            match self.attempt(booking, &substitute, requester_contact).await {
                Ok((confirmation, true)) => {
                    info!(
                        confirmation_id = %confirmation.id,
                        substitute = %substitute.name,
                        "Reassigned to substitute"
                    );
                    return;
                }
                Ok((_, false)) => {
                    excluded.insert(substitute.id);
                }
                Err(e) => {
                    // Lost a race for this substitute; try the next one
                    debug!(substitute = %substitute.name, error = %e, "Substitute attempt failed");
                    excluded.insert(substitute.id);
                }
            }
        }
    }

    /// One sweeper tick: expire overdue pendings, persist once if anything
    /// changed, then run the cascade for each. Returns the number expired.
    pub async fn sweep_once(&self) -> usize {
        let expired = self.ledger.expire_due(Utc::now()).await;
        if expired.is_empty() {
            return 0;
        }
        self.persist().await;
        for confirmation in &expired {
            info!(
                confirmation_id = %confirmation.id,
                worker = %confirmation.worker_name,
                "Confirmation window elapsed, reassigning"
            );
            self.reassign(confirmation).await;
        }
        expired.len()
    }
}

fn request_text(booking: &Booking, worker_name: &str) -> String {
    format!(
        "{worker_name}: new booking. {service} for {client} on {date} at {time}. \
         Reply \"yes\" to accept or \"no\" to decline (2 minute window).",
        service = booking.service_name,
        client = booking.client_display_name,
        date = booking.date,
        time = booking.start_time,
    )
}

fn confirmed_text(confirmation: &Confirmation) -> String {
    format!(
        "{client}, your {service} on {date} at {time} is confirmed with {worker}. See you then!",
        client = confirmation.booking.client_display_name,
        service = confirmation.booking.service_name,
        date = confirmation.booking.date,
        time = confirmation.booking.start_time,
        worker = confirmation.worker_name,
    )
}

fn need_alternative_text(confirmation: &Confirmation) -> String {
    format!(
        "{worker} can't take your {service} on {date} at {time}. Looking for another barber…",
        worker = confirmation.worker_name,
        service = confirmation.booking.service_name,
        date = confirmation.booking.date,
        time = confirmation.booking.start_time,
    )
}

fn unresolvable_text(booking: &Booking) -> String {
    format!(
        "Sorry, your {service} on {date} at {time} could not be confirmed. \
         Please pick a different time, day, or barber.",
        service = booking.service_name,
        date = booking.date,
        time = booking.start_time,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Messenger;
    use crate::directory::model::WorkerSpec;
    use crate::error::{ChannelError, Error};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every delivery; contacts in `fail_for` reject delivery.
    #[derive(Default)]
    struct MockMessenger {
        sent: Mutex<Vec<(String, String)>>,
        fail_for: Mutex<HashSet<String>>,
    }

    impl MockMessenger {
        fn fail_contact(&self, contact: &str) {
            self.fail_for.lock().unwrap().insert(contact.into());
        }

        fn sent_to(&self, contact: &str) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| c == contact)
                .map(|(_, t)| t.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Messenger for MockMessenger {
        fn name(&self) -> &str {
            "mock"
        }

        async fn send_message(
            &self,
            contact_id: &str,
            text: &str,
        ) -> std::result::Result<(), ChannelError> {
            if self.fail_for.lock().unwrap().contains(contact_id) {
                return Err(ChannelError::Unreachable {
                    contact_id: contact_id.into(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((contact_id.into(), text.into()));
            Ok(())
        }
    }

    struct Harness {
        directory: Arc<WorkerDirectory>,
        ledger: Arc<ConfirmationLedger>,
        messenger: Arc<MockMessenger>,
        workflow: ConfirmationWorkflow,
    }

    async fn make_harness() -> Harness {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let directory = Arc::new(WorkerDirectory::new(store.clone()));
        let resolver = Arc::new(Resolver::new(directory.clone()));
        let ledger = Arc::new(ConfirmationLedger::new());
        let messenger = Arc::new(MockMessenger::default());
        let workflow = ConfirmationWorkflow::new(
            WorkflowDeps {
                directory: directory.clone(),
                resolver,
                ledger: ledger.clone(),
                store,
                messenger: messenger.clone(),
            },
            Duration::from_secs(120),
        );
        Harness {
            directory,
            ledger,
            messenger,
            workflow,
        }
    }

    fn spec(name: &str) -> WorkerSpec {
        WorkerSpec {
            name: name.into(),
            contact_id: format!("{name}@chat"),
            ..WorkerSpec::default()
        }
    }

    fn booking() -> Booking {
        Booking {
            date: "2026-08-24".into(), // a Monday
            start_time: "15:30".into(),
            service_name: "fade".into(),
            client_display_name: "Ana".into(),
        }
    }

    #[tokio::test]
    async fn create_delivers_request_and_stays_pending() {
        let h = make_harness().await;
        let worker = h.directory.add(spec("Marco")).await;

        let conf = h
            .workflow
            .create_confirmation(&booking(), &worker, "client@chat")
            .await
            .unwrap();
        assert_eq!(conf.status, ConfirmationStatus::Pending);

        let requests = h.messenger.sent_to("Marco@chat");
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains("fade"));
        assert!(requests[0].contains("Ana"));
        // Requester hears nothing until there is an outcome
        assert!(h.messenger.sent_to("client@chat").is_empty());
    }

    #[tokio::test]
    async fn second_pending_for_same_worker_is_rejected() {
        let h = make_harness().await;
        let worker = h.directory.add(spec("Marco")).await;

        h.workflow
            .create_confirmation(&booking(), &worker, "client@chat")
            .await
            .unwrap();
        let err = h
            .workflow
            .create_confirmation(&booking(), &worker, "other@chat")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Workflow(WorkflowError::AlreadyPending { .. })
        ));
    }

    #[tokio::test]
    async fn affirmative_reply_confirms_and_is_idempotent() {
        let h = make_harness().await;
        let worker = h.directory.add(spec("Marco")).await;
        h.workflow
            .create_confirmation(&booking(), &worker, "client@chat")
            .await
            .unwrap();

        let outcome = h
            .workflow
            .handle_worker_reply("Marco@chat", "dale, confirmo")
            .await
            .unwrap();
        assert!(outcome.confirmed);
        assert_eq!(outcome.confirmation.status, ConfirmationStatus::Confirmed);
        assert!(outcome.confirmation.responded_at.is_some());

        // Booking counter bumped
        let w = h.directory.find_by_id(worker.id).await.unwrap();
        assert_eq!(w.bookings_today, 1);
        assert_eq!(w.stats.total_bookings, 1);

        // Requester got exactly one success notice
        let notices = h.messenger.sent_to("client@chat");
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("confirmed"));

        // A second reply is ignored, status unchanged
        assert!(h.workflow.handle_worker_reply("Marco@chat", "si").await.is_none());
        assert_eq!(
            h.ledger.get(outcome.confirmation.id).await.unwrap().status,
            ConfirmationStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn negative_reply_rejects_and_reassigns_once() {
        let h = make_harness().await;
        let first = h.directory.add(spec("Marco")).await;
        let second = h.directory.add(spec("Luca")).await;

        h.workflow
            .create_confirmation(&booking(), &first, "client@chat")
            .await
            .unwrap();
        let outcome = h
            .workflow
            .handle_worker_reply("Marco@chat", "no")
            .await
            .unwrap();
        assert!(!outcome.confirmed);
        assert_eq!(outcome.confirmation.status, ConfirmationStatus::Rejected);

        // Exactly one substitute confirmation, assigned to the other worker
        let pending = h.ledger.pending_for_worker(second.id).await.unwrap();
        assert_eq!(pending.booking, booking());
        assert_eq!(h.messenger.sent_to("Luca@chat").len(), 1);
        // The decliner keeps no booking credit
        assert_eq!(
            h.directory.find_by_id(first.id).await.unwrap().bookings_today,
            0
        );
    }

    #[tokio::test]
    async fn unknown_contact_and_unrecognized_text_are_ignored() {
        let h = make_harness().await;
        let worker = h.directory.add(spec("Marco")).await;
        h.workflow
            .create_confirmation(&booking(), &worker, "client@chat")
            .await
            .unwrap();

        assert!(
            h.workflow
                .process_worker_response("stranger@chat", "yes")
                .await
                .is_none()
        );
        assert!(
            h.workflow
                .process_worker_response("Marco@chat", "nos vemos mañana")
                .await
                .is_none()
        );
        // Still pending
        assert!(h.ledger.pending_for_worker(worker.id).await.is_some());
    }

    #[tokio::test]
    async fn delivery_failure_expires_immediately_and_cascades() {
        let h = make_harness().await;
        let first = h.directory.add(spec("Marco")).await;
        let second = h.directory.add(spec("Luca")).await;
        h.messenger.fail_contact("Marco@chat");

        let conf = h
            .workflow
            .create_confirmation(&booking(), &first, "client@chat")
            .await
            .unwrap();
        assert_eq!(conf.status, ConfirmationStatus::Expired);
        assert!(conf.note.as_deref().unwrap_or("").contains("delivery failed"));

        // Substitute was engaged within the same operation
        assert!(h.ledger.pending_for_worker(second.id).await.is_some());
        assert_eq!(h.messenger.sent_to("Luca@chat").len(), 1);
    }

    #[tokio::test]
    async fn exhausted_cascade_sends_exactly_one_final_notice() {
        let h = make_harness().await;
        let only = h.directory.add(spec("Marco")).await;
        h.messenger.fail_contact("Marco@chat");

        let conf = h
            .workflow
            .create_confirmation(&booking(), &only, "client@chat")
            .await
            .unwrap();
        assert_eq!(conf.status, ConfirmationStatus::Expired);

        let notices = h.messenger.sent_to("client@chat");
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("could not be confirmed"));
        // No further confirmations exist beyond the expired one
        assert_eq!(h.ledger.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn cascade_skips_every_previously_failed_worker() {
        let h = make_harness().await;
        let a = h.directory.add(spec("Marco")).await;
        let _b = h.directory.add(spec("Luca")).await;
        let c = h.directory.add(spec("Gino")).await;
        h.messenger.fail_contact("Marco@chat");
        h.messenger.fail_contact("Luca@chat");

        h.workflow
            .create_confirmation(&booking(), &a, "client@chat")
            .await
            .unwrap();

        // Two delivery failures later, the third worker holds the pending
        let pending = h.ledger.pending_for_worker(c.id).await.unwrap();
        assert_eq!(pending.status, ConfirmationStatus::Pending);
        assert_eq!(h.messenger.sent_to("Gino@chat").len(), 1);
        // Requester has not been told anything yet
        assert!(h.messenger.sent_to("client@chat").is_empty());
    }

    #[tokio::test]
    async fn sweep_expires_overdue_and_reassigns() {
        let h = make_harness().await;
        let first = h.directory.add(spec("Marco")).await;
        let second = h.directory.add(spec("Luca")).await;

        // Insert an already-overdue pending directly
        let mut overdue = Confirmation::new(
            booking(),
            &h.directory.find_by_id(first.id).await.unwrap(),
            "client@chat",
            Duration::from_secs(120),
        );
        overdue.expires_at = Utc::now() - chrono::Duration::seconds(5);
        h.ledger.insert(overdue.clone()).await;

        assert_eq!(h.workflow.sweep_once().await, 1);
        assert_eq!(
            h.ledger.get(overdue.id).await.unwrap().status,
            ConfirmationStatus::Expired
        );
        assert!(h.ledger.pending_for_worker(second.id).await.is_some());

        // Nothing left to expire on the next tick
        assert_eq!(h.workflow.sweep_once().await, 0);
    }

    #[tokio::test]
    async fn sweep_with_no_substitute_notifies_requester_once() {
        let h = make_harness().await;
        let only = h.directory.add(spec("Marco")).await;

        let mut overdue = Confirmation::new(
            booking(),
            &h.directory.find_by_id(only.id).await.unwrap(),
            "client@chat",
            Duration::from_secs(120),
        );
        overdue.expires_at = Utc::now() - chrono::Duration::seconds(5);
        h.ledger.insert(overdue.clone()).await;

        assert_eq!(h.workflow.sweep_once().await, 1);
        let notices = h.messenger.sent_to("client@chat");
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("could not be confirmed"));
        // No new confirmations were created
        assert_eq!(h.ledger.snapshot().await.len(), 1);
    }
}
