//! Async timeout wrapping

use crate::error::{ResilienceError, ResilienceResult};
use std::future::Future;
use std::time::Duration;

/// Awaits `future`, bounding it by `limit` when one is set.
///
/// `None` means unbounded: the future is simply awaited. A `Some` limit
/// races the future against a timer and maps expiry to
/// [`ResilienceError::Timeout`], which classifies as retryable.
pub async fn with_timeout<F, T>(limit: Option<Duration>, future: F) -> ResilienceResult<T>
where
    F: Future<Output = T>,
{
    match limit {
        None => Ok(future.await),
        Some(duration) => tokio::time::timeout(duration, future)
            .await
            .map_err(|_| ResilienceError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unbounded_passes_through() {
        let value = with_timeout(None, async { 42 }).await.expect("no timeout");
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_fast_future_within_limit() {
        let value = with_timeout(Some(Duration::from_secs(1)), async { 7 })
            .await
            .expect("within limit");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_slow_future_times_out() {
        let result = with_timeout(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            1
        })
        .await;

        assert!(matches!(result, Err(ResilienceError::Timeout(_))));
    }
}
