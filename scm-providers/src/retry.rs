//! Bounded retry with increasing delay for transient provider failures.
//!
//! Content reads hit provider rate limits first (many small files per sync
//! pass), so retries are kept short: a few attempts with a growing pause.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::ScmResult;

/// Default attempt count for content fetches.
pub const DEFAULT_ATTEMPTS: usize = 3;

/// Base delay; attempt `n` waits `n * BASE_DELAY_MS` before retrying.
const BASE_DELAY_MS: u64 = 300;

/// Runs `op` up to `attempts` times, retrying only transient errors
/// (429/5xx/timeout/network). Non-transient errors return immediately.
pub async fn with_retry<T, F, Fut>(op_name: &str, attempts: usize, op: F) -> ScmResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ScmResult<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < attempts => {
                let delay = Duration::from_millis(BASE_DELAY_MS * attempt as u64);
                warn!(
                    op = op_name,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "transient provider error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let out: ScmResult<u32> = with_retry("test", 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ProviderError::Timeout)
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(out.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let calls = AtomicUsize::new(0);
        let out: ScmResult<u32> = with_retry("test", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::NotFound) }
        })
        .await;
        assert!(matches!(out, Err(ProviderError::NotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
