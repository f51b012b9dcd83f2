use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Fixed delay between attempts, no cap on the number of attempts.
pub fn new_backoff(delay: Duration) -> ConstantBuilder {
    ConstantBuilder::default()
        .with_delay(delay)
        .without_max_times()
}

/// Any error is worth another attempt.
pub fn always<E>(_: &E) -> bool {
    true
}

/// Runs `operation` until it succeeds, fails with an error `transient`
/// rejects, or `cancel_token` is cancelled. The last error is returned as is
/// so callers can tell a give-up from a permanent failure.
pub async fn retry<T, E, F, Fut, P>(
    operation: F,
    action: &str,
    backoff: ConstantBuilder,
    cancel_token: CancellationToken,
    transient: P,
) -> Result<T, E>
where
    E: std::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
    F: FnMut() -> Fut,
    P: Fn(&E) -> bool,
{
    operation
        .retry(backoff)
        .notify(|e: &E, d: Duration| warn!("Retrying {} after {:?}: {}", action, d, e))
        .when(|e: &E| !cancel_token.is_cancelled() && transient(e))
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, anyhow};

    use super::*;

    #[tokio::test]
    async fn test_retry_until_success() -> Result<()> {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let value = retry(
            || async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err(anyhow!("not yet"))
                } else {
                    Ok(42)
                }
            },
            "test operation",
            new_backoff(Duration::from_millis(1)),
            CancellationToken::new(),
            always,
        )
        .await?;
        assert_eq!(value, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let result: Result<(), String> = retry(
            || async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("connection reset".to_string())
                } else {
                    Err("WRONGTYPE".to_string())
                }
            },
            "test operation",
            new_backoff(Duration::from_millis(1)),
            CancellationToken::new(),
            |e: &String| e != "WRONGTYPE",
        )
        .await;
        assert_eq!(result, Err("WRONGTYPE".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_stops_when_cancelled() {
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let result: Result<()> = retry(
            || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("unreachable store"))
            },
            "test operation",
            new_backoff(Duration::from_millis(1)),
            cancel_token,
            always,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
