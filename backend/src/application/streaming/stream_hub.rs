use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::entities::Frame;
use crate::domain::value_objects::{FrameId, ObserverId, SessionId};

/// Receiving end handed to a connection on register
pub type FrameReceiver = mpsc::Receiver<Arc<Frame>>;

struct ObserverEntry {
    outbound: mpsc::Sender<Arc<Frame>>,
    recording: Option<SessionId>,
    last_frame: Option<FrameId>,
    last_delivery: Option<Instant>,
    dropped_frames: u64,
}

/// Point-in-time view of one observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverStatus {
    pub id: ObserverId,
    pub recording: Option<SessionId>,
    pub last_frame: Option<FrameId>,
    pub dropped_frames: u64,
}

/// Fan-out of frames to connected observers, plus each observer's
/// recording association and last delivered frame.
///
/// Every observer gets its own bounded queue; delivery to one observer is in
/// production order. The table lock is held for the whole fan-out so a
/// broadcast never sees a half-updated observer. Queuing a frame does not
/// count as delivery: the consumer reports what reached the observer through
/// [`StreamHub::mark_delivered`].
pub struct StreamHub {
    observers: RwLock<HashMap<ObserverId, ObserverEntry>>,
    queue_capacity: usize,
    stale_after: Duration,
}

impl StreamHub {
    pub fn new(queue_capacity: usize, stale_after: Duration) -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
            stale_after,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ObserverId, ObserverEntry>> {
        self.observers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ObserverId, ObserverEntry>> {
        self.observers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a fresh observer: not recording, no frame seen yet
    pub fn register(&self, id: ObserverId) -> FrameReceiver {
        let (outbound, inbound) = mpsc::channel(self.queue_capacity);
        let previous = self.write().insert(
            id,
            ObserverEntry {
                outbound,
                recording: None,
                last_frame: None,
                last_delivery: None,
                dropped_frames: 0,
            },
        );
        if previous.is_some() {
            warn!(observer = %id, "observer re-registered, previous state discarded");
        }
        info!(observer = %id, "observer registered");
        inbound
    }

    pub fn unregister(&self, id: &ObserverId) -> bool {
        let removed = self.write().remove(id);
        match removed {
            Some(entry) => {
                info!(
                    observer = %id,
                    dropped_frames = entry.dropped_frames,
                    "observer unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Queue a frame for every registered observer. Returns how many
    /// observers accepted it.
    pub fn broadcast(&self, frame: Arc<Frame>) -> usize {
        let mut observers = self.write();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, entry) in observers.iter_mut() {
            match entry.outbound.try_send(Arc::clone(&frame)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    entry.dropped_frames += 1;
                    warn!(observer = %id, frame = %frame.id, "observer queue full, frame dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            observers.remove(&id);
            debug!(observer = %id, "observer channel closed, removed");
        }

        delivered
    }

    /// Record that `frame_id` was handed to the observer's transport. This is
    /// the frame later events are stamped with. False for unknown observers.
    pub fn mark_delivered(&self, id: &ObserverId, frame_id: FrameId) -> bool {
        match self.write().get_mut(id) {
            Some(entry) => {
                entry.last_frame = Some(frame_id);
                entry.last_delivery = Some(Instant::now());
                true
            }
            None => false,
        }
    }

    /// Attribute the observer's events to `session_id`. False for unknown
    /// observers.
    pub fn start_recording(&self, id: &ObserverId, session_id: SessionId) -> bool {
        match self.write().get_mut(id) {
            Some(entry) => {
                info!(observer = %id, session = %session_id, "recording started");
                entry.recording = Some(session_id);
                true
            }
            None => false,
        }
    }

    /// Clear the session association, returning the previous one
    pub fn stop_recording(&self, id: &ObserverId) -> Option<SessionId> {
        let previous = self.write().get_mut(id).and_then(|entry| entry.recording.take());
        if let Some(session_id) = &previous {
            info!(observer = %id, session = %session_id, "recording stopped");
        }
        previous
    }

    pub fn session_for(&self, id: &ObserverId) -> Option<SessionId> {
        self.read().get(id).and_then(|entry| entry.recording.clone())
    }

    /// Frame to stamp an event with. `None` when the observer is unknown,
    /// has not seen a frame yet, or its last delivery is stale.
    pub fn last_frame_for(&self, id: &ObserverId) -> Option<FrameId> {
        let observers = self.read();
        let entry = observers.get(id)?;
        let last_delivery = entry.last_delivery?;
        if last_delivery.elapsed() > self.stale_after {
            warn!(
                observer = %id,
                frame = ?entry.last_frame,
                "last delivered frame is stale, not stamping"
            );
            return None;
        }
        entry.last_frame
    }

    pub fn status(&self, id: &ObserverId) -> Option<ObserverStatus> {
        self.read().get(id).map(|entry| ObserverStatus {
            id: *id,
            recording: entry.recording.clone(),
            last_frame: entry.last_frame,
            dropped_frames: entry.dropped_frames,
        })
    }

    pub fn observer_count(&self) -> usize {
        self.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u64) -> Arc<Frame> {
        Arc::new(Frame::new(FrameId::new(id), vec![0; 4], 2, 2))
    }

    fn hub() -> StreamHub {
        StreamHub::new(8, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_register_starts_without_association() {
        let hub = hub();
        let id = ObserverId::new();
        let _rx = hub.register(id);

        let status = hub.status(&id).unwrap();
        assert_eq!(status.recording, None);
        assert_eq!(status.last_frame, None);
        assert_eq!(hub.last_frame_for(&id), None);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_observer_in_order() {
        let hub = hub();
        let a = ObserverId::new();
        let b = ObserverId::new();
        let mut rx_a = hub.register(a);
        let mut rx_b = hub.register(b);

        assert_eq!(hub.broadcast(frame(1)), 2);
        assert_eq!(hub.broadcast(frame(2)), 2);

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.recv().await.unwrap().id, FrameId::new(1));
            assert_eq!(rx.recv().await.unwrap().id, FrameId::new(2));
        }
    }

    #[tokio::test]
    async fn test_recording_observer_stamps_with_last_frame() {
        let hub = hub();
        let a = ObserverId::new();
        let b = ObserverId::new();
        let _rx_a = hub.register(a);
        let _rx_b = hub.register(b);
        let session = SessionId::generate();

        assert!(hub.start_recording(&a, session.clone()));
        hub.broadcast(frame(42));
        assert_eq!(hub.last_frame_for(&a), None);
        assert!(hub.mark_delivered(&a, FrameId::new(42)));

        assert_eq!(hub.session_for(&a), Some(session));
        assert_eq!(hub.last_frame_for(&a), Some(FrameId::new(42)));
        assert_eq!(hub.session_for(&b), None);
    }

    #[tokio::test]
    async fn test_unknown_observer_has_no_association() {
        let hub = hub();
        let ghost = ObserverId::new();

        assert!(!hub.start_recording(&ghost, SessionId::generate()));
        assert_eq!(hub.stop_recording(&ghost), None);
        assert_eq!(hub.last_frame_for(&ghost), None);
        assert!(!hub.unregister(&ghost));
        assert!(!hub.mark_delivered(&ghost, FrameId::new(1)));
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let hub = hub();
        let id = ObserverId::new();
        let _rx = hub.register(id);
        hub.start_recording(&id, SessionId::generate());

        assert!(hub.unregister(&id));
        assert_eq!(hub.broadcast(frame(1)), 0);
        assert_eq!(hub.session_for(&id), None);
        assert_eq!(hub.last_frame_for(&id), None);
    }

    #[tokio::test]
    async fn test_full_queue_drops_for_that_observer_only() {
        let hub = StreamHub::new(1, Duration::from_secs(5));
        let slow = ObserverId::new();
        let fast = ObserverId::new();
        let _slow_rx = hub.register(slow);
        let mut fast_rx = hub.register(fast);

        hub.broadcast(frame(1));
        fast_rx.recv().await.unwrap();
        assert_eq!(hub.broadcast(frame(2)), 1);

        assert_eq!(hub.status(&slow).unwrap().dropped_frames, 1);
        assert_eq!(hub.status(&slow).unwrap().last_frame, None);
        assert_eq!(hub.status(&fast).unwrap().dropped_frames, 0);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_removed() {
        let hub = hub();
        let id = ObserverId::new();
        drop(hub.register(id));

        assert_eq!(hub.broadcast(frame(1)), 0);
        assert_eq!(hub.observer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_frame_is_not_used_for_stamping() {
        let hub = StreamHub::new(8, Duration::from_millis(500));
        let id = ObserverId::new();
        let _rx = hub.register(id);
        hub.broadcast(frame(9));
        hub.mark_delivered(&id, FrameId::new(9));
        assert_eq!(hub.last_frame_for(&id), Some(FrameId::new(9)));

        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(hub.last_frame_for(&id), None);
        assert_eq!(hub.status(&id).unwrap().last_frame, Some(FrameId::new(9)));
    }

    #[tokio::test]
    async fn test_backlogged_observer_stamps_what_it_received() {
        let hub = StreamHub::new(64, Duration::from_secs(5));
        let id = ObserverId::new();
        let mut rx = hub.register(id);

        for n in 1..=40 {
            hub.broadcast(frame(n));
        }
        assert_eq!(hub.last_frame_for(&id), None);

        let first = rx.recv().await.unwrap();
        hub.mark_delivered(&id, first.id);

        assert_eq!(hub.last_frame_for(&id), Some(FrameId::new(1)));
    }
}
