//! Bounded retry runner for store calls.
//!
//! Every attempt runs under the policy's call timeout; an expired timeout is
//! a transient failure. Only transient failures are retried. Constraint
//! violations, lookups that found nothing and other business answers return
//! on the first attempt.

use crate::StoreError;
use award_utils::BackoffPolicy;
use std::future::Future;
use tracing::{debug, warn};

pub async fn retrying<T, F, Fut>(
    policy: &BackoffPolicy,
    operation: &'static str,
    mut call: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let timeout = policy.call_timeout();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation,
                after: timeout,
            }),
        };

        let err = match outcome {
            Ok(value) => {
                if attempts > 1 {
                    debug!(operation, attempts, "store call recovered");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() => err,
            Err(err) => return Err(err),
        };

        if !policy.allows_another(attempts) {
            warn!(operation, attempts, error = %err, "store call retries exhausted");
            return Err(StoreError::RetriesExhausted {
                operation,
                attempts,
                last: Box::new(err),
            });
        }

        let delay = policy.delay_for(attempts);
        warn!(operation, attempts, ?delay, error = %err, "transient store failure, retrying");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            ..BackoffPolicy::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retried_with_backoff() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let started = Instant::now();
        let result = retrying(&policy(5), "op", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StoreError::Transient("reset".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn business_errors_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = retrying(&policy(5), "op", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::NotFound("9".into()))
        })
        .await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = retrying(&policy(3), "op", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Transient("down".into()))
        })
        .await;

        match result {
            Err(StoreError::RetriesExhausted {
                operation,
                attempts,
                last,
            }) => {
                assert_eq!(operation, "op");
                assert_eq!(attempts, 3);
                assert!(last.is_transient());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out_and_counts_as_transient() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retrying(&policy(2), "slow", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok("done")
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
