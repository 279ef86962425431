// src/platforms/firehose/backoff.rs

use std::time::Duration;

/// Exponential reconnect delay: starts at `base`, doubles per consecutive
/// transient failure, saturates at `max`. Reset whenever the session reaches
/// Streaming again.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    consecutive_failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
            consecutive_failures: 0,
        }
    }

    /// Delay to wait before the next attempt; doubles for the call after.
    /// Also counts the failure that brought us here.
    pub fn next_delay(&mut self) -> Duration {
        self.consecutive_failures += 1;
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.base;
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
