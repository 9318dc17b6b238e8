use crate::Result;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Interval between visibility probes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run `check` until it reports `true` or `timeout` elapses.
///
/// Returns `Ok(false)` on timeout. The condition is always probed at least
/// once, and a probe that is still pending at the deadline is abandoned, so
/// the call never outlives `timeout` by more than one scheduler tick.
/// Errors from `check` end the wait immediately.
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining.max(Duration::from_millis(1)), check()).await {
            Ok(Ok(true)) => return Ok(true),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Ok(false),
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Like [`poll_until`], but a failed probe counts as "not yet".
///
/// Probes fail transiently while a document is being replaced (the old
/// execution context is destroyed mid-call), so only the deadline ends the
/// wait. On timeout the last probe error, if any, is returned for reporting.
pub async fn poll_through_errors<F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> std::result::Result<(), Option<String>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let last_error = Mutex::new(None);
    let met = poll_until(timeout, interval, || {
        let probe = check();
        let last_error = &last_error;
        async move {
            match probe.await {
                Ok(met) => Ok(met),
                Err(e) => {
                    if let Ok(mut slot) = last_error.lock() {
                        *slot = Some(e.to_string());
                    }
                    Ok(false)
                }
            }
        }
    })
    .await
    .unwrap_or(false);

    if met {
        Ok(())
    } else {
        Err(last_error.into_inner().unwrap_or_else(|p| p.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_immediate_success() {
        let calls = AtomicU32::new(0);
        let met = poll_until(Duration::from_secs(1), POLL_INTERVAL, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(true) }
        })
        .await
        .unwrap();

        assert!(met);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_several_polls() {
        let calls = AtomicU32::new(0);
        let met = poll_until(Duration::from_secs(5), Duration::from_millis(10), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(n >= 3) }
        })
        .await
        .unwrap();

        assert!(met);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_within_bound() {
        let start = std::time::Instant::now();
        let met = poll_until(Duration::from_millis(150), Duration::from_millis(20), || async {
            Ok(false)
        })
        .await
        .unwrap();

        assert!(!met);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(150), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_hanging_probe_does_not_outlive_timeout() {
        let start = std::time::Instant::now();
        let met = poll_until(Duration::from_millis(100), POLL_INTERVAL, || {
            std::future::pending::<Result<bool>>()
        })
        .await
        .unwrap();

        assert!(!met);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_probe_error_ends_wait() {
        let calls = AtomicU32::new(0);
        let err = poll_until(Duration::from_secs(5), Duration::from_millis(10), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Assertion("probe failed".into())) }
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("probe failed"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_errors_keep_polling() {
        let calls = AtomicU32::new(0);
        let result = poll_through_errors(Duration::from_secs(5), Duration::from_millis(10), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(Error::Assertion("Execution context was destroyed".into()))
                } else {
                    Ok(true)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_error_reported_at_deadline() {
        let start = std::time::Instant::now();
        let result = poll_through_errors(Duration::from_millis(100), Duration::from_millis(10), || async {
            Err(Error::Assertion("no document".into()))
        })
        .await;

        let last = result.unwrap_err().expect("last error is kept");
        assert!(last.contains("no document"), "{}", last);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_plain_timeout_has_no_error() {
        let result = poll_through_errors(Duration::from_millis(50), Duration::from_millis(10), || async {
            Ok(false)
        })
        .await;

        assert_eq!(result, Err(None));
    }
}
