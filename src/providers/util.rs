use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How often and how patiently a fetch is retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retries: 2,
            delay: Duration::from_millis(500),
        }
    }
}

/// Runs `operation` until it succeeds or the policy's retries are used up,
/// sleeping a fixed delay in between. Returns the last error on exhaustion.
pub async fn with_retry<F, Fut, T, E>(mut operation: F, policy: RetryPolicy) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Error>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                let err = err.into();
                if attempt > policy.retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt,
                    policy.retries + 1,
                    err
                );
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
