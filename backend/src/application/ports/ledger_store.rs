use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::aggregates::Session;
use crate::domain::errors::StorageError;
use crate::domain::value_objects::SessionId;

pub const LEDGER_FORMAT_VERSION: u32 = 1;

/// Durable layout of the whole ledger: every session keyed by id, each
/// embedding its messages and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub sessions: BTreeMap<SessionId, Session>,
}

impl LedgerSnapshot {
    pub fn new(sessions: BTreeMap<SessionId, Session>) -> Self {
        Self {
            version: LEDGER_FORMAT_VERSION,
            saved_at: Utc::now(),
            sessions,
        }
    }
}

/// Port for durable ledger storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// `Ok(None)` when nothing was ever persisted
    async fn load(&self) -> Result<Option<LedgerSnapshot>, StorageError>;

    /// Must never leave previously durable state half-written
    async fn persist(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError>;
}
