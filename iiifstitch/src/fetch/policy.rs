//! Retry policy for tile requests.
//!
//! # Example
//!
//! ```
//! use iiifstitch::fetch::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::exponential(3);
//! assert_eq!(policy.max_attempts(), 3);
//! assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(500)));
//! assert_eq!(policy.delay_for_attempt(3), None);
//! ```

use std::time::Duration;

use rand::Rng;

use crate::config::{DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_SECS};

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default jitter as a fraction of the computed delay.
pub const DEFAULT_JITTER: f64 = 0.5;

/// How a tile request handles transient failures.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// No retries - fail immediately on error.
    None,

    /// Fixed number of attempts with constant delay between them.
    Fixed {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Delay between attempts.
        delay: Duration,
    },

    /// Exponential backoff with random jitter.
    ///
    /// The delay is multiplied after each failed attempt, up to a cap, and
    /// stretched by a random fraction (`0..=jitter`) so that workers hitting
    /// the same failure do not retry in lockstep.
    ExponentialBackoff {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Delay after the first failure.
        initial_delay: Duration,
        /// Cap on the delay, before jitter.
        max_delay: Duration,
        /// Multiplier applied after each failure (typically 2.0).
        multiplier: f64,
        /// Maximum extra delay as a fraction of the computed delay.
        jitter: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(crate::config::DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Creates an exponential backoff policy with the default timings.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Maximum number of attempts (including initial)
    pub fn exponential(max_attempts: u32) -> Self {
        Self::ExponentialBackoff {
            max_attempts,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: DEFAULT_JITTER,
        }
    }

    /// Creates a fixed retry policy.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::Fixed {
            max_attempts,
            delay,
        }
    }

    /// Returns a copy with a different attempt limit.
    pub fn with_max_attempts(self, attempts: u32) -> Self {
        match self {
            Self::None => Self::None,
            Self::Fixed { delay, .. } => Self::fixed(attempts, delay),
            Self::ExponentialBackoff {
                initial_delay,
                max_delay,
                multiplier,
                jitter,
                ..
            } => Self::ExponentialBackoff {
                max_attempts: attempts,
                initial_delay,
                max_delay,
                multiplier,
                jitter,
            },
        }
    }

    /// Calculates the base delay (without jitter) after a failed attempt.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt that just failed (1-based)
    ///
    /// # Returns
    ///
    /// The delay before the next attempt, or `None` if no attempts remain.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed {
                max_attempts,
                delay,
            } => (attempt < *max_attempts).then_some(*delay),
            Self::ExponentialBackoff {
                max_attempts,
                initial_delay,
                max_delay,
                multiplier,
                ..
            } => {
                if attempt >= *max_attempts {
                    return None;
                }
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                let delay_ms = initial_delay.as_millis() as f64 * factor;
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                Some(Duration::from_millis(capped as u64))
            }
        }
    }

    /// Like [`delay_for_attempt`](Self::delay_for_attempt), with jitter applied.
    pub fn jittered_delay(&self, attempt: u32) -> Option<Duration> {
        let base = self.delay_for_attempt(attempt)?;
        match self {
            Self::ExponentialBackoff { jitter, .. } if *jitter > 0.0 && !base.is_zero() => {
                let extra = rand::rng().random_range(0.0..=*jitter);
                Some(base.mul_f64(1.0 + extra))
            }
            _ => Some(base),
        }
    }

    /// Maximum number of attempts for this policy.
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Fixed { max_attempts, .. } => *max_attempts,
            Self::ExponentialBackoff { max_attempts, .. } => *max_attempts,
        }
    }
}
