use std::time::{Duration, Instant};

/// Minimum-interval gate: a call is due only once `min_interval` has passed since the last
/// recorded run.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    min_interval: Duration,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Throttle { min_interval }
    }

    /// Checks whether `min_interval` elapsed between `last` and `now`.
    pub fn is_due_at(&self, last: Option<Instant>, now: Instant) -> bool {
        match last {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            /* Nothing recorded yet, always run */
            None => true,
        }
    }

    pub fn is_due(&self, last: Option<Instant>) -> bool {
        self.is_due_at(last, Instant::now())
    }
}
