// Rate-limit retry — spec §4.C4 "Rate-limit retry", §7 error taxonomy #7.
//
// Grounded on the teacher's `claude::retry::with_retry` (exponential backoff,
// fixed attempt count). The spec narrows this to exactly one retry, gated on
// the error message containing a rate-limit indicator, after a ~1s sleep;
// anything else propagates immediately.

use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

fn looks_rate_limited(err: &anyhow::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("rate limit") || msg.contains("rate-limit") || msg.contains("429")
}

/// Execute `f` once; on a rate-limit-flavored error, sleep ~1s and retry
/// exactly once more. Any other error, or a second failure, propagates.
pub async fn with_rate_limit_retry<F, Fut, T>(f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    match f().await {
        Ok(result) => Ok(result),
        Err(e) if looks_rate_limited(&e) => {
            tracing::warn!("rate limited, retrying once after {:?}: {e}", RATE_LIMIT_DELAY);
            sleep(RATE_LIMIT_DELAY).await;
            f().await
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scenario S5: a provider erroring with "rate limit" then succeeding
    /// results in exactly one retry and a successful response.
    #[tokio::test]
    async fn retries_once_on_rate_limit_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let start = std::time::Instant::now();

        let result: Result<&str> = with_rate_limit_retry(|| async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                anyhow::bail!("HTTP 429: rate limit exceeded")
            } else {
                Ok("ok")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= RATE_LIMIT_DELAY);
    }

    #[tokio::test]
    async fn non_rate_limit_errors_do_not_retry() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = with_rate_limit_retry(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("connection refused")
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_rate_limit_failure_propagates() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = with_rate_limit_retry(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("429 rate limit")
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
