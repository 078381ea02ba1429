//! Backoff policy for bounded retry loops.
//!
//! The policy only computes delays; the caller sleeps through its injected
//! clock so tests can drive retries deterministically.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// `base * attempt`.
    Linear,
    /// `base * 2^(attempt - 1)`.
    Exponential,
}

/// Retry bound plus delay function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    strategy: BackoffStrategy,
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Option<Duration>,
}

impl RetryPolicy {
    #[must_use]
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self::new(BackoffStrategy::Fixed, max_attempts, delay)
    }

    #[must_use]
    pub fn linear(max_attempts: usize, base_delay: Duration) -> Self {
        Self::new(BackoffStrategy::Linear, max_attempts, base_delay)
    }

    #[must_use]
    pub fn exponential(max_attempts: usize, base_delay: Duration) -> Self {
        Self::new(BackoffStrategy::Exponential, max_attempts, base_delay)
    }

    /// A single attempt with no waiting.
    #[must_use]
    pub fn once() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Build a policy; `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(strategy: BackoffStrategy, max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            strategy,
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: None,
        }
    }

    /// Cap individual delays. A zero cap means no cap.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = if max_delay.is_zero() {
            None
        } else {
            Some(max_delay)
        };
        self
    }

    #[must_use]
    pub const fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    #[must_use]
    pub const fn strategy(&self) -> BackoffStrategy {
        self.strategy
    }

    /// Start tracking a fresh run of attempts.
    #[must_use]
    pub fn handle(&self) -> RetryHandle {
        RetryHandle {
            policy: self.clone(),
            retries: 0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let factor = u32::try_from(retry.max(1)).unwrap_or(u32::MAX);
        let raw = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(factor),
            BackoffStrategy::Exponential => {
                let shift = (factor - 1).min(31);
                self.base_delay.saturating_mul(1u32 << shift)
            }
        };
        match self.max_delay {
            Some(max) => raw.min(max),
            None => raw,
        }
    }
}

/// Per-run retry state.
#[derive(Debug, Clone)]
pub struct RetryHandle {
    policy: RetryPolicy,
    retries: usize,
}

impl RetryHandle {
    /// Delay to wait before the next attempt, or `None` once the attempt
    /// bound is reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries + 1 >= self.policy.max_attempts {
            return None;
        }
        self.retries += 1;
        Some(self.policy.delay_for_retry(self.retries))
    }

    /// Retries granted so far.
    #[must_use]
    pub const fn retries(&self) -> usize {
        self.retries
    }
}
