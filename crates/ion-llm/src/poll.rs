use std::future::Future;
use std::time::Duration;

use ion_core::error::IonError;

/// Outcome of a bounded polling loop.
#[derive(Debug)]
pub enum Poll<T> {
    /// The predicate was satisfied.
    Ready(T),
    /// All attempts were used without the predicate holding.
    TimedOut,
    /// The probe itself failed.
    Failed(IonError),
}

impl<T> Poll<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Poll::Ready(_))
    }
}

/// Poll `probe` every `interval` until it yields a value, fails, or
/// `max_attempts` are exhausted.
///
/// The probe returns `Ok(Some(v))` when ready, `Ok(None)` to keep waiting.
/// The first attempt runs immediately; the interval applies between attempts.
pub async fn poll_until<F, Fut, T>(interval: Duration, max_attempts: u32, mut probe: F) -> Poll<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ion_core::error::Result<Option<T>>>,
{
    for attempt in 0..max_attempts {
        if attempt > 0 {
            tokio::time::sleep(interval).await;
        }
        match probe().await {
            Ok(Some(value)) => return Poll::Ready(value),
            Ok(None) => continue,
            Err(e) => return Poll::Failed(e),
        }
    }
    Poll::TimedOut
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_ready_on_first_attempt() {
        let result = poll_until(Duration::from_millis(1), 5, || async { Ok(Some(42)) }).await;
        assert!(matches!(result, Poll::Ready(42)));
    }

    #[tokio::test]
    async fn test_ready_after_retries() {
        let calls = AtomicU32::new(0);
        let result = poll_until(Duration::from_millis(1), 10, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok((n >= 3).then_some("done")) }
        })
        .await;
        assert!(matches!(result, Poll::Ready("done")));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_times_out_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Poll<()> = poll_until(Duration::from_millis(1), 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
        .await;
        assert!(matches!(result, Poll::TimedOut));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_probe_error_stops_polling() {
        let calls = AtomicU32::new(0);
        let result: Poll<()> = poll_until(Duration::from_millis(1), 5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(IonError::Ingest("boom".to_string())) }
        })
        .await;
        assert!(matches!(result, Poll::Failed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
