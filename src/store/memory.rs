//! In-memory store backend, used by tests and as a no-disk fallback.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::directory::model::Worker;
use crate::error::StoreError;
use crate::store::traits::Store;
use crate::workflow::model::Confirmation;

/// Volatile `Store` implementation.
#[derive(Default)]
pub struct MemoryStore {
    workers: RwLock<Vec<Worker>>,
    confirmations: RwLock<Vec<Confirmation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_workers(&self) -> Result<Vec<Worker>, StoreError> {
        Ok(self.workers.read().await.clone())
    }

    async fn save_workers(&self, workers: &[Worker]) -> Result<(), StoreError> {
        *self.workers.write().await = workers.to_vec();
        Ok(())
    }

    async fn load_confirmations(&self) -> Result<Vec<Confirmation>, StoreError> {
        Ok(self.confirmations.read().await.clone())
    }

    async fn save_confirmations(&self, confirmations: &[Confirmation]) -> Result<(), StoreError> {
        *self.confirmations.write().await = confirmations.to_vec();
        Ok(())
    }
}
