//! `Store` trait: single async interface for durable state.
//!
//! The core treats the persisted copy as best-effort durability: in-memory
//! state is the source of truth during a run, and every backend must treat
//! "nothing persisted yet" as a valid empty state, not an error.

use async_trait::async_trait;

use crate::directory::model::Worker;
use crate::error::StoreError;
use crate::workflow::model::Confirmation;

/// Backend-agnostic document store for the worker and confirmation sets.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load the full worker set. An empty backend yields an empty vec.
    async fn load_workers(&self) -> Result<Vec<Worker>, StoreError>;

    /// Replace the persisted worker set.
    async fn save_workers(&self, workers: &[Worker]) -> Result<(), StoreError>;

    /// Load the full confirmation set. An empty backend yields an empty vec.
    async fn load_confirmations(&self) -> Result<Vec<Confirmation>, StoreError>;

    /// Replace the persisted confirmation set.
    async fn save_confirmations(&self, confirmations: &[Confirmation]) -> Result<(), StoreError>;
}
