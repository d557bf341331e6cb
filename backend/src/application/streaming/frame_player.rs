use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::application::ports::FrameRenderer;
use crate::application::streaming::{frame_period, TimerSlot};
use crate::domain::entities::Frame;
use crate::domain::errors::StreamError;
use crate::domain::value_objects::FrameId;

/// Where the cursor is right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackPosition {
    pub index: usize,
    pub frame_id: FrameId,
    pub playing: bool,
    pub frame_count: usize,
}

/// Deterministic, bounded frame sequence advanced by a single timer.
///
/// The cursor never wraps: reaching the last index and ticking once more
/// pauses the player. Seeks clamp to the valid range and leave the player
/// paused. Every cursor change emits the frame under the cursor to the
/// optional output channel.
pub struct FramePlayer {
    inner: Arc<PlayerInner>,
}

struct PlayerInner {
    state: Mutex<PlayerState>,
    frame_count: usize,
    period: Duration,
    renderer: Arc<dyn FrameRenderer>,
    output: Option<mpsc::Sender<Arc<Frame>>>,
}

struct PlayerState {
    index: usize,
    playing: bool,
    timer: TimerSlot,
}

impl PlayerInner {
    fn lock(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn last_index(&self) -> usize {
        self.frame_count - 1
    }

    fn position(&self, state: &PlayerState) -> PlaybackPosition {
        PlaybackPosition {
            index: state.index,
            frame_id: frame_id_at(state.index),
            playing: state.playing,
            frame_count: self.frame_count,
        }
    }

    /// Advance one step. Returns false once the player stopped playing.
    fn step(&self, state: &mut PlayerState) -> bool {
        if !state.playing {
            return false;
        }
        if state.index >= self.last_index() {
            state.playing = false;
            state.timer.disarm();
            info!(index = state.index, "playback reached the end, pausing");
            return false;
        }
        state.index += 1;
        self.emit(state.index);
        true
    }

    fn timer_tick(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if !state.timer.is_current(generation) {
            return false;
        }
        self.step(&mut state)
    }

    fn emit(&self, index: usize) {
        let Some(output) = &self.output else {
            return;
        };
        let (width, height) = self.renderer.dimensions();
        let frame = Frame::new(
            frame_id_at(index),
            self.renderer.render(index as u64),
            width,
            height,
        );
        match output.try_send(Arc::new(frame)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!(index, "playback output full, frame dropped"),
            Err(TrySendError::Closed(_)) => debug!(index, "playback output closed"),
        }
    }
}

fn frame_id_at(index: usize) -> FrameId {
    FrameId::new(index as u64)
}

impl FramePlayer {
    pub fn new(
        frame_count: usize,
        frame_rate: u32,
        renderer: Arc<dyn FrameRenderer>,
        output: Option<mpsc::Sender<Arc<Frame>>>,
    ) -> Result<Self, StreamError> {
        if frame_count == 0 {
            return Err(StreamError::EmptySequence);
        }
        let period = frame_period(frame_rate);
        Ok(Self {
            inner: Arc::new(PlayerInner {
                state: Mutex::new(PlayerState {
                    index: 0,
                    playing: false,
                    timer: TimerSlot::new(),
                }),
                frame_count,
                period,
                renderer,
                output,
            }),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.inner.frame_count
    }

    pub fn last_index(&self) -> usize {
        self.inner.last_index()
    }

    /// The authoritative position, used for rendering and for stamping
    pub fn current_frame(&self) -> PlaybackPosition {
        let state = self.inner.lock();
        self.inner.position(&state)
    }

    /// Advance by exactly one frame. No-op while paused; at the last index
    /// the player pauses instead of advancing.
    pub fn tick(&self) -> PlaybackPosition {
        let mut state = self.inner.lock();
        self.inner.step(&mut state);
        self.inner.position(&state)
    }

    /// Idempotent; never arms a second timer. Does nothing at the end of
    /// the sequence.
    ///
    /// Must be called within a Tokio runtime.
    pub fn resume(&self) -> PlaybackPosition {
        let mut state = self.inner.lock();
        if state.playing || state.index >= self.inner.last_index() {
            return self.inner.position(&state);
        }
        state.playing = true;

        let weak = Arc::downgrade(&self.inner);
        state.timer.arm(self.inner.period, move |generation| {
            weak.upgrade()
                .is_some_and(|inner| inner.timer_tick(generation))
        });
        debug!(index = state.index, "playback resumed");
        self.inner.position(&state)
    }

    /// Idempotent
    pub fn pause(&self) -> PlaybackPosition {
        let mut state = self.inner.lock();
        state.playing = false;
        state.timer.disarm();
        self.inner.position(&state)
    }

    /// Jump to `index`, clamped into the sequence. Leaves the player paused.
    pub fn seek(&self, index: usize) -> PlaybackPosition {
        let mut state = self.inner.lock();
        state.playing = false;
        state.timer.disarm();

        let clamped = index.min(self.inner.last_index());
        if clamped != index {
            debug!(requested = index, clamped, "seek clamped to the last frame");
        }
        state.index = clamped;
        self.inner.emit(clamped);
        self.inner.position(&state)
    }

    pub fn replay_from_start(&self) -> PlaybackPosition {
        self.seek(0);
        self.resume()
    }

    pub fn skip_to_end(&self) -> PlaybackPosition {
        self.seek(self.inner.last_index())
    }

    /// Safe from any state, any number of times
    pub fn stop(&self) {
        self.pause();
    }
}

impl Drop for FramePlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
