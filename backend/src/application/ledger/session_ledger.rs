use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::application::ports::{LedgerSnapshot, LedgerStore};
use crate::domain::aggregates::{Session, SessionSummary, SessionView};
use crate::domain::entities::{Label, Message};
use crate::domain::errors::{LedgerError, StorageError};
use crate::domain::value_objects::{FrameId, MessageId, Sender, SessionId};

/// Authoritative, append-only record of every recording session.
///
/// Each session sits behind its own mutex, so appends to one session form a
/// single-writer critical section while sessions stay independent. Every
/// mutation is followed by a full persist; memory stays the source of truth
/// when a persist fails.
pub struct SessionLedger {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
    store: Arc<dyn LedgerStore>,
    persist_lock: Mutex<()>,
}

impl SessionLedger {
    /// Empty ledger that persists through `store`
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            persist_lock: Mutex::new(()),
        }
    }

    /// Rebuild the ledger from the last durable snapshot. A missing or
    /// unreadable store yields an empty ledger.
    pub async fn open(store: Arc<dyn LedgerStore>) -> Self {
        let ledger = Self::new(Arc::clone(&store));

        match store.load().await {
            Ok(Some(snapshot)) => {
                let count = snapshot.sessions.len();
                let mut sessions = ledger.sessions.write().await;
                for (id, session) in snapshot.sessions {
                    sessions.insert(id, Arc::new(Mutex::new(session)));
                }
                drop(sessions);
                info!(sessions = count, "ledger restored");
            }
            Ok(None) => info!("no persisted ledger, starting empty"),
            Err(e) => error!(error = %e, "failed to load ledger, starting empty; previous data is not available"),
        }

        ledger
    }

    async fn session(&self, id: &SessionId) -> Result<Arc<Mutex<Session>>, LedgerError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::SessionNotFound(id.clone()))
    }

    pub async fn create_session(
        &self,
        objective: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Result<Session, LedgerError> {
        let session = Session::new(objective, metadata);
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), Arc::new(Mutex::new(session.clone())));
        info!(session = %session.id, objective = %session.objective, "session created");

        self.persist().await?;
        Ok(session)
    }

    pub async fn append_message(
        &self,
        session_id: &SessionId,
        sender: Sender,
        content: impl Into<String>,
        frame_id: Option<FrameId>,
    ) -> Result<Message, LedgerError> {
        let session = self.session(session_id).await?;
        let message = session
            .lock()
            .await
            .append_message(sender, content, frame_id)?;
        debug!(
            session = %session_id,
            message = %message.id,
            sender = %sender,
            frame = ?message.frame_id,
            "message appended"
        );

        self.persist().await?;
        Ok(message)
    }

    pub async fn append_label(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        kind: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<Label, LedgerError> {
        let session = self.session(session_id).await?;
        let label = session
            .lock()
            .await
            .append_label(message_id, kind, payload)?;
        debug!(session = %session_id, message = %message_id, kind = %label.kind, "label appended");

        self.persist().await?;
        Ok(label)
    }

    /// `active -> completed`. A second call returns the session unchanged.
    pub async fn end_session(&self, session_id: &SessionId) -> Result<Session, LedgerError> {
        let session = self.session(session_id).await?;
        let (ended, transitioned) = {
            let mut guard = session.lock().await;
            let transitioned = guard.end();
            (guard.clone(), transitioned)
        };

        if !transitioned {
            debug!(session = %session_id, "session already completed");
            return Ok(ended);
        }
        info!(
            session = %session_id,
            messages = ended.messages().len(),
            labels = ended.labels().len(),
            "session completed"
        );

        self.persist().await?;
        Ok(ended)
    }

    pub async fn snapshot(&self, session_id: &SessionId) -> Result<SessionView, LedgerError> {
        let session = self.session(session_id).await?;
        let view = session.lock().await.view();
        Ok(view)
    }

    /// Views of every session, oldest first
    pub async fn snapshot_all(&self) -> Vec<SessionView> {
        let mut views = Vec::new();
        for session in self.all_sessions().await {
            views.push(session.lock().await.view());
        }
        views.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        views
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries = Vec::new();
        for session in self.all_sessions().await {
            summaries.push(session.lock().await.summary());
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    pub async fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Retry durability after an earlier persist failure
    pub async fn flush(&self) -> Result<(), LedgerError> {
        self.persist().await?;
        Ok(())
    }

    async fn all_sessions(&self) -> Vec<Arc<Mutex<Session>>> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// The snapshot is taken after the persist lock is held, so whichever
    /// write lands last carries the newest state.
    async fn persist(&self) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;

        let mut sessions = BTreeMap::new();
        for session in self.all_sessions().await {
            let session = session.lock().await.clone();
            sessions.insert(session.id.clone(), session);
        }

        self.store
            .persist(&LedgerSnapshot::new(sessions))
            .await
            .map_err(|e| {
                warn!(error = %e, "ledger persist failed, in-memory state kept");
                e
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockLedgerStore;
    use crate::domain::aggregates::SessionDuration;
    use crate::domain::value_objects::SessionStatus;
    use proptest::prelude::*;
    use serde_json::json;

    fn accepting_store() -> Arc<dyn LedgerStore> {
        let mut store = MockLedgerStore::new();
        store.expect_load().returning(|| Ok(None));
        store.expect_persist().returning(|_| Ok(()));
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_pick_up_the_cube_scenario() {
        let ledger = SessionLedger::new(accepting_store());
        let session = ledger
            .create_session("Pick up the cube", json!({}))
            .await
            .unwrap();

        ledger
            .append_message(&session.id, Sender::Scientist, "pick up cube", Some(FrameId::new(1)))
            .await
            .unwrap();
        ledger
            .append_message(&session.id, Sender::Robot, "ok", Some(FrameId::new(2)))
            .await
            .unwrap();
        ledger.end_session(&session.id).await.unwrap();

        let view = ledger.snapshot(&session.id).await.unwrap();
        assert_eq!(view.stats.message_count, 2);
        assert_eq!(view.stats.label_count, 0);
        assert_eq!(view.status, SessionStatus::Completed);
        match view.stats.duration {
            SessionDuration::Seconds(secs) => assert!(secs >= 0.0),
            SessionDuration::Ongoing => panic!("completed session reported as ongoing"),
        }
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let ledger = SessionLedger::new(accepting_store());
        let ghost = SessionId::from_string("ghost");

        let err = ledger
            .append_message(&ghost, Sender::Scientist, "hello", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SessionNotFound(_)));
        assert!(ledger.snapshot(&ghost).await.unwrap_err().is_not_found());
        assert!(ledger.end_session(&ghost).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_label_for_missing_message_never_appends() {
        let ledger = SessionLedger::new(accepting_store());
        let session = ledger.create_session("sort", json!({})).await.unwrap();
        ledger
            .append_message(&session.id, Sender::Scientist, "go", None)
            .await
            .unwrap();

        let err = ledger
            .append_label(&session.id, &MessageId::from_string("missing"), "success", json!(true))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::MessageNotFound { .. }));
        assert_eq!(ledger.snapshot(&session.id).await.unwrap().stats.label_count, 0);
    }

    #[tokio::test]
    async fn test_label_from_other_session_is_rejected() {
        let ledger = SessionLedger::new(accepting_store());
        let first = ledger.create_session("a", json!({})).await.unwrap();
        let second = ledger.create_session("b", json!({})).await.unwrap();
        let message = ledger
            .append_message(&first.id, Sender::Robot, "done", None)
            .await
            .unwrap();

        let err = ledger
            .append_label(&second.id, &message.id, "success", json!(true))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MessageNotFound { .. }));
    }

    #[tokio::test]
    async fn test_end_session_twice_keeps_end_timestamp() {
        let ledger = SessionLedger::new(accepting_store());
        let session = ledger.create_session("sort", json!({})).await.unwrap();

        let first = ledger.end_session(&session.id).await.unwrap();
        let second = ledger.end_session(&session.id).await.unwrap();

        assert!(first.ended_at.is_some());
        assert_eq!(first.ended_at, second.ended_at);
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported_but_memory_kept() {
        let mut store = MockLedgerStore::new();
        let mut calls = 0;
        store.expect_persist().returning(move |_| {
            calls += 1;
            if calls == 2 {
                Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )))
            } else {
                Ok(())
            }
        });
        let ledger = SessionLedger::new(Arc::new(store));
        let session = ledger.create_session("sort", json!({})).await.unwrap();

        let err = ledger
            .append_message(&session.id, Sender::Scientist, "go", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
        assert_eq!(ledger.snapshot(&session.id).await.unwrap().stats.message_count, 1);

        ledger.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_falls_back_to_empty_on_load_failure() {
        let mut store = MockLedgerStore::new();
        store.expect_load().returning(|| {
            Err(StorageError::Task("corrupt ledger".to_string()))
        });
        store.expect_persist().returning(|_| Ok(()));

        let ledger = SessionLedger::open(Arc::new(store)).await;
        assert!(ledger.list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_restores_persisted_sessions() {
        let mut session = Session::new("restored", json!({"rig": 2}));
        session
            .append_message(Sender::Scientist, "wave", Some(FrameId::new(5)))
            .unwrap();
        let expected = session.view();
        let mut sessions = BTreeMap::new();
        sessions.insert(session.id.clone(), session);
        let snapshot = LedgerSnapshot::new(sessions);

        let mut store = MockLedgerStore::new();
        store
            .expect_load()
            .returning(move || Ok(Some(snapshot.clone())));

        let ledger = SessionLedger::open(Arc::new(store)).await;
        assert_eq!(ledger.snapshot_all().await, vec![expected]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_to_one_session_are_serialized() {
        let ledger = Arc::new(SessionLedger::new(accepting_store()));
        let session = ledger.create_session("race", json!({})).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let ledger = Arc::clone(&ledger);
            let id = session.id.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .append_message(&id, Sender::Scientist, format!("cmd {i}"), None)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let view = ledger.snapshot(&session.id).await.unwrap();
        assert_eq!(view.stats.message_count, 20);
        let mut seen: Vec<_> = view.messages.iter().map(|m| m.message.content.clone()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 20);
    }

    proptest! {
        #[test]
        fn prop_snapshot_preserves_append_order(
            contents in proptest::collection::vec(("[a-z ]{1,12}", any::<bool>()), 1..25)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let ledger = SessionLedger::new(accepting_store());
                let session = ledger.create_session("prop", json!({})).await.unwrap();

                let mut appended = Vec::new();
                for (content, robot) in &contents {
                    let sender = if *robot { Sender::Robot } else { Sender::Scientist };
                    let message = ledger
                        .append_message(&session.id, sender, content.clone(), None)
                        .await
                        .unwrap();
                    appended.push(message.id);
                }

                let view = ledger.snapshot(&session.id).await.unwrap();
                let read_back: Vec<_> = view.messages.iter().map(|m| m.message.id.clone()).collect();
                prop_assert_eq!(read_back, appended);
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
