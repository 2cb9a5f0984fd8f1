//! Confirmation workflow: pending confirmations, worker replies, expiry, and
//! the reassignment cascade.

pub mod engine;
pub mod ledger;
pub mod model;
pub mod sweeper;

pub use engine::{ConfirmationWorkflow, ReplyOutcome, WorkflowDeps};
pub use ledger::ConfirmationLedger;
pub use model::{Booking, Confirmation, ConfirmationStatus, ReplyIntent, classify_reply};
pub use sweeper::spawn_sweep_task;
