use std::time::{Duration, Instant};

/// Pause between two capture cycles.
pub(super) const CYCLE_INTERVAL: Duration = Duration::from_millis(10);

/// Paces cycles off the render loop: a cycle is due once the interval has
/// passed since the previous one ran.
#[derive(Debug, Default)]
pub(super) struct CycleClock {
    last_run: Option<Instant>,
}

impl CycleClock {
    /// Returns `true` and records the run when a cycle is due at `now`.
    pub fn tick(&mut self, now: Instant) -> bool {
        let due = self
            .last_run
            .is_none_or(|last| now.saturating_duration_since(last) >= CYCLE_INTERVAL);
        if due {
            self.last_run = Some(now);
        }
        due
    }

    /// The next tick runs immediately.
    pub fn reset(&mut self) {
        self.last_run = None;
    }
}
