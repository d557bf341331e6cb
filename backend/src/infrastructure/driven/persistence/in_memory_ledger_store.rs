use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::{LedgerSnapshot, LedgerStore};
use crate::domain::errors::StorageError;

/// In-memory ledger store for tests and ephemeral runs
pub struct InMemoryLedgerStore {
    snapshot: RwLock<Option<LedgerSnapshot>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(None),
        }
    }

    pub async fn last_persisted(&self) -> Option<LedgerSnapshot> {
        self.snapshot.read().await.clone()
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn load(&self) -> Result<Option<LedgerSnapshot>, StorageError> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn persist(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(())
    }
}
