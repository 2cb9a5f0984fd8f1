//! JSON file backend: two documents under a data directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::directory::model::Worker;
use crate::error::StoreError;
use crate::store::traits::Store;
use crate::workflow::model::Confirmation;

const WORKERS_FILE: &str = "workers.json";
const CONFIRMATIONS_FILE: &str = "confirmations.json";

/// File-based store: one JSON document per set.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read_set<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            // Not persisted yet, valid empty state
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No persisted state, starting empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_set<T: Serialize>(&self, file: &str, items: &[T]) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(self.dir.join(file), bytes).await?;
        Ok(())
    }

    /// Path of the data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn load_workers(&self) -> Result<Vec<Worker>, StoreError> {
        self.read_set(WORKERS_FILE).await
    }

    async fn save_workers(&self, workers: &[Worker]) -> Result<(), StoreError> {
        self.write_set(WORKERS_FILE, workers).await
    }

    async fn load_confirmations(&self) -> Result<Vec<Confirmation>, StoreError> {
        self.read_set(CONFIRMATIONS_FILE).await
    }

    async fn save_confirmations(&self, confirmations: &[Confirmation]) -> Result<(), StoreError> {
        self.write_set(CONFIRMATIONS_FILE, confirmations).await
    }
}
