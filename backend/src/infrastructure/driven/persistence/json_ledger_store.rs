use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::application::ports::{LedgerSnapshot, LedgerStore};
use crate::domain::errors::StorageError;
use crate::infrastructure::driven::atomic_file::write_atomic;

/// Whole-ledger JSON document on local disk
pub struct JsonFileLedgerStore {
    path: PathBuf,
}

impl JsonFileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Move an unreadable ledger aside so the next persist cannot overwrite it
fn quarantine(path: &Path) -> Option<PathBuf> {
    let mut name = path.file_name()?.to_os_string();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S")));
    let target = path.with_file_name(name);
    match std::fs::rename(path, &target) {
        Ok(()) => Some(target),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to move corrupt ledger aside");
            None
        }
    }
}

fn load_blocking(path: &Path) -> Result<Option<LedgerSnapshot>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }

    // Raw bytes: invalid UTF-8 is corruption too, and must be moved aside
    let content = std::fs::read(path)?;
    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    match serde_json::from_slice::<LedgerSnapshot>(&content) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(e) => {
            let moved_to = quarantine(path);
            error!(
                path = %path.display(),
                moved_to = ?moved_to,
                error = %e,
                "ledger file is corrupt"
            );
            Err(StorageError::Serialization(e))
        }
    }
}

#[async_trait]
impl LedgerStore for JsonFileLedgerStore {
    async fn load(&self) -> Result<Option<LedgerSnapshot>, StorageError> {
        let path = self.path.clone();
        let snapshot = tokio::task::spawn_blocking(move || load_blocking(&path))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        if let Some(snapshot) = &snapshot {
            info!(
                path = %self.path.display(),
                sessions = snapshot.sessions.len(),
                saved_at = %snapshot.saved_at,
                "ledger loaded"
            );
        }
        Ok(snapshot)
    }

    async fn persist(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;
        Ok(())
    }
}
