use std::time::{Duration, Instant};

/// A one-shot point in time, used by the engine to bound how long a
/// handshake may take before the connection is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self { at: Instant::now() + timeout }
    }

    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.at
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_immediately_elapsed() {
        let d = Deadline::after(Duration::ZERO);
        assert!(d.is_elapsed());
    }

    #[test]
    fn future_deadline_has_remaining_time() {
        let d = Deadline::after(Duration::from_secs(60));
        assert!(!d.is_elapsed());
        assert!(d.remaining() > Duration::from_secs(1));
    }
}
