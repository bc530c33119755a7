use std::future::Future;

use anyhow::Result;
use threadline_provider::ProviderError;
use tokio::time;

use crate::config::RetryPolicy;

/// Whether `err` signals a transient backend condition worth retrying.
pub fn is_transient(err: &anyhow::Error) -> bool {
    if let Some(provider_err) = err.downcast_ref::<ProviderError>() {
        return provider_err.is_transient();
    }
    let msg = err.to_string();
    msg.contains("[retryable]") || msg.contains("429") || msg.contains("503")
}

/// Run `op` until it succeeds, fails with a non-transient error, or
/// `policy.max_attempts` attempts are used up. The last error is returned
/// unchanged.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = is_transient(&err);
                if retryable && attempt + 1 < max_attempts {
                    let backoff = policy.delay_for(attempt);
                    attempt += 1;
                    tracing::warn!(
                        op = label,
                        attempt,
                        max_attempts,
                        delay_ms = backoff.as_millis() as u64,
                        "transient backend error, backing off: {err}"
                    );
                    time::sleep(backoff).await;
                    continue;
                }
                tracing::debug!(
                    op = label,
                    attempts = attempt + 1,
                    retryable,
                    "giving up: {err}"
                );
                return Err(err);
            }
        }
    }
}
