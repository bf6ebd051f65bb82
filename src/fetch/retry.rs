// src/fetch/retry.rs

use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{error, warn};

use crate::config::Config;
use crate::error::{FetchError, FetchResult};

/// Backoff schedule shared by the async and blocking clients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_base: Duration,
    pub rate_limit_cap: Duration,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_base: Duration::from_secs(5),
            rate_limit_cap: Duration::from_secs(60),
            backoff_base: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_attempts: cfg.max_retries.max(1),
            ..Self::default()
        }
    }

    /// How long to wait after `err` on zero-based `attempt`, or `None` to give up.
    pub fn delay_for(&self, err: &FetchError, attempt: u32) -> Option<Duration> {
        if !err.is_retryable() || attempt + 1 >= self.max_attempts {
            return None;
        }
        let factor = 2u32.saturating_pow(attempt);
        let delay = match err {
            FetchError::RateLimited { .. } => self
                .rate_limit_base
                .saturating_mul(factor)
                .min(self.rate_limit_cap),
            _ => self.backoff_base.saturating_mul(factor),
        };
        Some(delay)
    }
}

/// Drive `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget runs out. `op` receives the zero-based attempt number.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, url: &str, mut op: F) -> FetchResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => match policy.delay_for(&e, attempt) {
                Some(delay) => {
                    warn!(%url, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %e, "Retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    if e.is_retryable() {
                        error!(%url, attempts = attempt + 1, error = %e, "Exhausted retries");
                    }
                    return Err(e);
                }
            },
        }
    }
}

/// Thread-blocking twin of [`with_retry`].
pub fn with_retry_blocking<T, F>(policy: &RetryPolicy, url: &str, mut op: F) -> FetchResult<T>
where
    F: FnMut(u32) -> FetchResult<T>,
{
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => match policy.delay_for(&e, attempt) {
                Some(delay) => {
                    warn!(%url, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %e, "Retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                None => {
                    if e.is_retryable() {
                        error!(%url, attempts = attempt + 1, error = %e, "Exhausted retries");
                    }
                    return Err(e);
                }
            },
        }
    }
}
