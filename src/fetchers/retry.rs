use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// How long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry
    Fixed { delay_ms: u64 },
    /// `base_ms * factor^(retry - 1)`
    Exponential { base_ms: u64, factor: u32 },
}

/// Bounded retry policy applied around a fetch primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff")]
    pub backoff: Backoff,
}

/// Returned when every attempt failed
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: FetchError,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff() -> Backoff {
    Backoff::Fixed { delay_ms: 1000 }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: default_backoff(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// A policy that never sleeps, used where the caller owns pacing
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::Fixed { delay_ms: 0 })
    }

    /// Delay to wait before retry number `retry` (1-based)
    pub fn delay_before(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential { base_ms, factor } => {
                let exp = retry.saturating_sub(1);
                let multiplier = (factor as u64).saturating_pow(exp);
                Duration::from_millis(base_ms.saturating_mul(multiplier))
            }
        }
    }

    /// Run `op` until it succeeds or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. A zero `max_attempts` is
    /// treated as one attempt.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        ::log::debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.delay_before(attempt);
                    ::log::warn!(
                        "{} failed on attempt {}/{}: {} (retrying in {:?})",
                        label,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
            }
        }
    }
}
