use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use crate::application::ports::FrameRenderer;
use crate::application::streaming::{frame_period, StreamHub, TimerSlot};
use crate::domain::entities::Frame;
use crate::domain::value_objects::FrameId;

/// Server-side frame producer for the live stream.
///
/// Each tick renders one frame with a fresh id and broadcasts it through the
/// hub before returning, so ticks never overlap.
pub struct FrameClock {
    inner: Arc<ClockInner>,
}

struct ClockInner {
    state: Mutex<ClockState>,
    period: Duration,
    renderer: Arc<dyn FrameRenderer>,
    hub: Arc<StreamHub>,
}

struct ClockState {
    running: bool,
    next_id: FrameId,
    current: Option<FrameId>,
    timer: TimerSlot,
}

impl ClockInner {
    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn step(&self, state: &mut ClockState) -> Option<FrameId> {
        if !state.running {
            return None;
        }

        let id = state.next_id;
        state.next_id = id.next();

        let (width, height) = self.renderer.dimensions();
        let frame = Frame::new(id, self.renderer.render(id.value()), width, height);
        let delivered = self.hub.broadcast(Arc::new(frame));
        state.current = Some(id);

        debug!(frame = %id, observers = delivered, "frame broadcast");
        Some(id)
    }

    fn timer_tick(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if !state.timer.is_current(generation) {
            return false;
        }
        self.step(&mut state);
        true
    }
}

impl FrameClock {
    pub fn new(frame_rate: u32, renderer: Arc<dyn FrameRenderer>, hub: Arc<StreamHub>) -> Self {
        let period = frame_period(frame_rate);
        Self {
            inner: Arc::new(ClockInner {
                state: Mutex::new(ClockState {
                    running: false,
                    next_id: FrameId::new(1),
                    current: None,
                    timer: TimerSlot::new(),
                }),
                period,
                renderer,
                hub,
            }),
        }
    }

    pub fn period(&self) -> Duration {
        self.inner.period
    }

    /// Produce and broadcast the next frame. No-op while paused.
    pub fn tick(&self) -> Option<FrameId> {
        let mut state = self.inner.lock();
        self.inner.step(&mut state)
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Start ticking. Idempotent; never arms a second timer.
    ///
    /// Must be called within a Tokio runtime.
    pub fn resume(&self) {
        let mut state = self.inner.lock();
        if state.running {
            return;
        }
        state.running = true;

        let weak = Arc::downgrade(&self.inner);
        state.timer.arm(self.inner.period, move |generation| {
            weak.upgrade()
                .is_some_and(|inner| inner.timer_tick(generation))
        });
        info!(period_ms = self.inner.period.as_millis() as u64, "frame clock running");
    }

    /// Idempotent
    pub fn pause(&self) {
        let mut state = self.inner.lock();
        if !state.running {
            return;
        }
        state.running = false;
        state.timer.disarm();
        info!(current = ?state.current, "frame clock paused");
    }

    /// Safe from any state, any number of times
    pub fn stop(&self) {
        self.pause();
    }

    /// Most recently produced frame
    pub fn current_frame(&self) -> Option<FrameId> {
        self.inner.lock().current
    }
}

impl Drop for FrameClock {
    fn drop(&mut self) {
        self.stop();
    }
}
