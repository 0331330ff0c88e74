use std::time::{Duration, Instant};

/// Fires at most once per interval, used for reconnect backoff and
/// periodic housekeeping in the socket reactor loop.
#[derive(Debug, Clone, Copy)]
pub struct Repeater {
    interval: Duration,
    last_fired: Instant,
}

impl Repeater {
    #[must_use]
    pub fn every(interval: Duration) -> Self {
        // Start already-due so the first `fired()` poll after construction
        // fires immediately, matching how a freshly-armed reconnect timer
        // should behave.
        Self { interval, last_fired: Instant::now() - interval }
    }

    #[must_use]
    pub fn fired(&mut self) -> bool {
        if self.last_fired.elapsed() >= self.interval {
            self.last_fired = Instant::now();
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn reset(&mut self) {
        self.last_fired = Instant::now();
    }

    pub fn force_fire(&mut self) {
        self.last_fired = Instant::now() - self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_immediately_after_construction() {
        let mut r = Repeater::every(Duration::from_secs(3600));
        assert!(r.fired());
    }

    #[test]
    fn does_not_fire_again_until_interval_elapses() {
        let mut r = Repeater::every(Duration::from_secs(3600));
        assert!(r.fired());
        assert!(!r.fired());
    }

    #[test]
    fn force_fire_makes_next_poll_fire() {
        let mut r = Repeater::every(Duration::from_secs(3600));
        assert!(r.fired());
        assert!(!r.fired());
        r.force_fire();
        assert!(r.fired());
    }
}
