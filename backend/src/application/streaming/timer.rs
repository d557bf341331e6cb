use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tick period for a frame rate, whole milliseconds, never below 1 ms.
/// A zero rate is treated as 1 fps.
pub fn frame_period(frame_rate: u32) -> Duration {
    Duration::from_millis((1000 / u64::from(frame_rate.max(1))).max(1))
}

/// Holder for the single periodic task driving a clock or player.
///
/// Each arming gets a new generation. A tick carrying a stale generation
/// must be ignored by the owner, so a cancelled timer can never deliver a
/// late tick after a new one was armed.
#[derive(Debug, Default)]
pub struct TimerSlot {
    active: Option<ActiveTimer>,
    generation: u64,
}

#[derive(Debug)]
struct ActiveTimer {
    generation: u64,
    token: CancellationToken,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }

    /// Spawn the periodic task unless one is already armed. The first tick
    /// fires one full period after arming. `on_tick` returning false ends
    /// the task.
    ///
    /// Must be called within a Tokio runtime.
    pub fn arm<F>(&mut self, period: Duration, on_tick: F) -> Option<u64>
    where
        F: Fn(u64) -> bool + Send + 'static,
    {
        if self.active.is_some() {
            return None;
        }

        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if !on_tick(generation) {
                    break;
                }
            }
            debug!(generation, "frame timer stopped");
        });

        self.active = Some(ActiveTimer { generation, token });
        Some(generation)
    }

    /// Cancel the running task. Safe to call in any state.
    pub fn disarm(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                active.token.cancel();
                true
            }
            None => false,
        }
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.disarm();
    }
}
