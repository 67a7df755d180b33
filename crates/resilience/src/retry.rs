// crates/resilience/src/retry.rs
//! Retry policies with exponential backoff

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for a sync run.
///
/// `max_retries` is the total attempt budget per entry (including the
/// first attempt) and is always at least 1. The delay before re-running
/// attempt `n+1` is `min(base_delay_ms * backoff_multiplier^(n-1),
/// max_delay_ms)`.
///
/// The policy is serialized into the sync journal so a resumed run backs
/// off exactly the way the original run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per entry, minimum 1
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Cap applied to every computed delay
    pub max_delay_ms: u64,
    /// Per-attempt timeout; 0 means unbounded
    pub timeout_ms: u64,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            timeout_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Sets the attempt budget (clamped to at least 1)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Sets the base delay
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Sets the delay cap
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Sets the per-attempt timeout (0 disables it)
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the backoff multiplier
    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    /// Backoff delay before retrying after failed attempt `attempt`
    /// (1-based). Attempt 0 never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let raw = self.base_delay_ms as f64
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = raw.min(self.max_delay_ms as f64);

        Duration::from_millis(capped as u64)
    }

    /// Per-attempt timeout as a `Duration`, `None` when unbounded
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    /// Attempt budget, never below 1 even for hand-built policies
    pub fn attempt_budget(&self) -> u32 {
        self.max_retries.max(1)
    }
}
