//! Retry policy for chapter conversions
//!
//! A pure decision function over (attempts made, error class), so the policy
//! is testable without waiting. The worker owns the actual sleeping.
//!
//! Rate-limit failures back off exponentially with a high cap, to respect
//! external throttling. Generic transient failures back off linearly with a
//! short cap. Permanent failures never consume retry budget.

use std::time::Duration;

use tts_client::ErrorKind;

/// Constants for retry logic
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const RATE_LIMIT_BACKOFF_CAP: Duration = Duration::from_secs(60);
const TRANSIENT_BACKOFF_CAP: Duration = Duration::from_secs(10);

/// What a worker should do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then try again
    Retry(Duration),
    /// Give up, mark the chapter FailedPermanent
    Fail,
}

/// Per-run retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    /// Override the base delay (tests use millisecond delays)
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Decide the next action after attempt number `attempts_made` failed
    /// with `error`. Total attempts for a job never exceed max_retries + 1.
    pub fn next_action(&self, attempts_made: u32, error: ErrorKind) -> RetryDecision {
        if error == ErrorKind::Permanent {
            return RetryDecision::Fail;
        }
        if attempts_made > self.max_retries {
            return RetryDecision::Fail;
        }
        RetryDecision::Retry(self.backoff(attempts_made, error))
    }

    fn backoff(&self, attempts_made: u32, error: ErrorKind) -> Duration {
        match error {
            ErrorKind::RateLimited => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempts_made.saturating_sub(1)))
                .min(RATE_LIMIT_BACKOFF_CAP),
            _ => self
                .base_delay
                .saturating_mul(attempts_made)
                .min(TRANSIENT_BACKOFF_CAP),
        }
    }
}

/// Bookkeeping for one job's processing. Not persisted.
#[derive(Debug, Default)]
pub struct RetryState {
    pub attempts_made: u32,
    pub last_error: Option<(ErrorKind, String)>,
}
