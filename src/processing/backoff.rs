//! Bounded exponential backoff for poll loops.

use std::time::Duration;

/// Delay schedule: `initial`, then multiplied by `multiplier` per step, never
/// above `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl BackoffPolicy {
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial,
            max,
            multiplier,
        }
    }

    /// Never waits; used by tests that want a tight loop
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 1.0)
    }
}

/// Backoff policies for the two reasons a loop waits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopBackoff {
    /// After a poll that found nothing
    pub idle: BackoffPolicy,
    /// After a failed iteration
    pub failure: BackoffPolicy,
}

impl LoopBackoff {
    pub fn immediate() -> Self {
        Self {
            idle: BackoffPolicy::immediate(),
            failure: BackoffPolicy::immediate(),
        }
    }
}

impl Default for LoopBackoff {
    fn default() -> Self {
        Self {
            idle: BackoffPolicy::new(Duration::from_millis(10), Duration::from_secs(1), 2.0),
            failure: BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(30), 2.0),
        }
    }
}

/// Running state of one backoff streak.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    next: Option<Duration>,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, next: None }
    }

    /// Delay for this step of the streak, advancing it
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next.unwrap_or(self.policy.initial).min(self.policy.max);
        let grown = delay.mul_f64(self.policy.multiplier.max(1.0));
        self.next = Some(grown.min(self.policy.max));
        delay
    }

    pub fn reset(&mut self) {
        self.next = None;
    }

    pub fn is_backing_off(&self) -> bool {
        self.next.is_some()
    }
}
