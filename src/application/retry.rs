//! Deadline and bounded retry around provider calls.

use crate::ports::provider::ProviderError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_retries: u32,
    /// Deadline for a single attempt.
    pub attempt_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Spread each delay by up to 30% either way.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            attempt_timeout: Duration::from_secs(120),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A single attempt with the given deadline.
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            attempt_timeout,
            ..Self::default()
        }
    }
}

/// Run `f` until it succeeds, fails permanently, or the retries run out.
///
/// Each attempt is bounded by `attempt_timeout`; an elapsed deadline counts
/// as a transient failure. The error of the last attempt is returned.
pub async fn call_with_retry<F, Fut, T>(policy: &RetryPolicy, mut f: F) -> Result<T, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt: u32 = 0;
    let mut backoff = policy.initial_backoff;

    loop {
        attempt += 1;
        let err = match tokio::time::timeout(policy.attempt_timeout, f(attempt)).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => err,
            Err(_) => ProviderError::Timeout(policy.attempt_timeout),
        };

        if !err.is_transient() || attempt > policy.max_retries {
            return Err(err);
        }

        let delay = jittered(backoff, policy.jitter);
        warn!(
            attempt,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "provider call failed, retrying"
        );
        tokio::time::sleep(delay).await;

        backoff = Duration::from_millis(
            (backoff.as_millis() as f64 * policy.backoff_multiplier)
                .min(policy.max_backoff.as_millis() as f64) as u64,
        );
    }
}

fn jittered(base: Duration, jitter: bool) -> Duration {
    if !jitter {
        return base;
    }
    let factor = rand::thread_rng().gen_range(0.7..=1.3);
    Duration::from_millis((base.as_millis() as f64 * factor) as u64)
}
