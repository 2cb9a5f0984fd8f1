//! Confirmation data model: booking payloads, confirmation records, and the
//! worker-reply classifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::model::Worker;

/// A requested service at a specific date/time for a client.
///
/// Created upstream; this core only reads it and threads it through
/// confirmation records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    /// 24 h start time, `HH:MM`.
    pub start_time: String,
    pub service_name: String,
    pub client_display_name: String,
}

/// Status of a confirmation record.
///
/// `Confirmed` and `Rejected` are reached via explicit worker reply;
/// `Expired` via the sweeper or an immediate delivery failure. No transition
/// leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
    Rejected,
    Expired,
}

impl ConfirmationStatus {
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }
}

impl std::fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// The transient record tracking one worker's accept/reject decision for one
/// booking assignment attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confirmation {
    /// Unique confirmation ID.
    pub id: Uuid,
    pub booking: Booking,
    pub worker_id: Uuid,
    pub worker_name: String,
    /// Chat identity the confirmation request was delivered to.
    pub worker_contact: String,
    /// Chat identity of the requester to notify about the outcome.
    pub requester_contact: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ConfirmationStatus,
    /// Set only when a worker reply drives the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    /// Bookkeeping annotation, e.g. the delivery-failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Confirmation {
    /// Create a new pending confirmation for a (booking, worker) pair.
    pub fn new(
        booking: Booking,
        worker: &Worker,
        requester_contact: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Self {
        let now = Utc::now();
        let window = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::minutes(2));
        Self {
            id: Uuid::new_v4(),
            booking,
            worker_id: worker.id,
            worker_name: worker.name.clone(),
            worker_contact: worker.contact_id.clone(),
            requester_contact: requester_contact.into(),
            created_at: now,
            expires_at: now + window,
            status: ConfirmationStatus::Pending,
            responded_at: None,
            note: None,
        }
    }

    /// Whether the confirmation window has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Classification of a worker's reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyIntent {
    Affirmative,
    Negative,
    Unrecognized,
}

/// Exact-match affirmative tokens.
const AFFIRMATIVE_EXACT: [&str; 5] = ["si", "sí", "yes", "ok", "✅"];
/// Substring-match affirmative tokens.
const AFFIRMATIVE_PART: [&str; 3] = ["confirm", "dale", "listo"];
/// Exact-match negative tokens.
const NEGATIVE_EXACT: [&str; 4] = ["no", "nop", "nope", "❌"];
/// Substring-match negative tokens.
const NEGATIVE_PART: [&str; 2] = ["cancel", "rechaz"];

/// Classify a raw worker reply against the fixed confirmation vocabulary.
///
/// Case-insensitive and trimmed. Anything that matches neither list is
/// `Unrecognized` and leaves the confirmation pending.
pub fn classify_reply(text: &str) -> ReplyIntent {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return ReplyIntent::Unrecognized;
    }

    if AFFIRMATIVE_EXACT.contains(&normalized.as_str())
        || AFFIRMATIVE_PART.iter().any(|t| normalized.contains(t))
    {
        return ReplyIntent::Affirmative;
    }

    if NEGATIVE_EXACT.contains(&normalized.as_str())
        || NEGATIVE_PART.iter().any(|t| normalized.contains(t))
    {
        return ReplyIntent::Negative;
    }

    ReplyIntent::Unrecognized
}
