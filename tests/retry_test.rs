use portfolio_scanner::{with_retry, BackoffKind, FetchError, RetryOutcome, RetryPolicy, TerminalError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Paused-clock durations land on whole milliseconds
fn assert_elapsed(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(20),
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}

async fn fail_then_succeed(policy: &RetryPolicy, failures: u32) -> (RetryOutcome<u32>, u32, Duration) {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let outcome = with_retry(policy, || {
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if attempt <= failures {
                Err(FetchError::Transport(format!("attempt {attempt} refused")))
            } else {
                Ok(attempt)
            }
        }
    })
    .await;

    (outcome, calls.load(Ordering::SeqCst), start.elapsed())
}

#[tokio::test(start_paused = true)]
async fn test_success_after_k_failures_records_k_plus_one_attempts() {
    let policy = RetryPolicy::new(3, Duration::from_millis(200));

    for failures in 0..=3 {
        let (outcome, calls, elapsed) = fail_then_succeed(&policy, failures).await;

        assert_eq!(
            outcome,
            RetryOutcome::Success {
                value: failures + 1,
                attempts: failures + 1
            }
        );
        assert_eq!(calls, failures + 1);
        assert_elapsed(elapsed, Duration::from_millis(200) * failures);
    }
}

#[tokio::test(start_paused = true)]
async fn test_budget_exhausted_returns_terminal_error() {
    let policy = RetryPolicy::new(3, Duration::from_millis(200));

    let (outcome, calls, _) = fail_then_succeed(&policy, 10).await;

    assert_eq!(calls, 4);
    assert_eq!(
        outcome,
        RetryOutcome::Terminal(TerminalError {
            message: "transport error: attempt 4 refused".to_string(),
            attempts: 4,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_permanent_error_is_not_retried() {
    let policy = RetryPolicy::new(5, Duration::from_secs(1));
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let outcome: RetryOutcome<()> = with_retry(&policy, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async {
            Err(FetchError::InvalidAddress {
                address: "0x12".to_string(),
                reason: "too short".to_string(),
            })
        }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.attempts(), 1);
    assert!(!outcome.is_success());
    assert_elapsed(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_makes_a_single_attempt() {
    let policy = RetryPolicy::new(0, Duration::from_secs(1));

    let (outcome, calls, elapsed) = fail_then_succeed(&policy, 1).await;

    assert_eq!(calls, 1);
    assert_eq!(outcome.attempts(), 1);
    assert!(outcome.into_result().is_err());
    assert_elapsed(elapsed, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_doubles_the_delay() {
    let policy = RetryPolicy::new(3, Duration::from_millis(100)).with_backoff(BackoffKind::Exponential);

    let (outcome, calls, elapsed) = fail_then_succeed(&policy, 3).await;

    assert!(outcome.is_success());
    assert_eq!(calls, 4);
    assert_elapsed(elapsed, Duration::from_millis(100 + 200 + 400));
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_is_capped_at_one_minute() {
    let policy = RetryPolicy::new(3, Duration::from_secs(20)).with_backoff(BackoffKind::Exponential);

    let (outcome, calls, elapsed) = fail_then_succeed(&policy, 3).await;

    assert!(outcome.is_success());
    assert_eq!(calls, 4);
    // 20s, 40s, then 80s capped to 60s
    assert_elapsed(elapsed, Duration::from_secs(20 + 40 + 60));
}

#[test]
fn test_exponential_schedule_has_no_jitter() {
    use backoff::backoff::Backoff;

    let policy = RetryPolicy::new(5, Duration::from_millis(250)).with_backoff(BackoffKind::Exponential);
    let mut backoff = policy.create_backoff();

    let delays: Vec<_> = (0..4).filter_map(|_| backoff.next_backoff()).collect();
    assert_eq!(
        delays,
        vec![
            Duration::from_millis(250),
            Duration::from_millis(500),
            Duration::from_millis(1000),
            Duration::from_millis(2000),
        ]
    );
}

#[test]
fn test_timeouts_and_rate_limits_are_transient() {
    assert!(FetchError::Timeout(Duration::from_secs(1)).is_transient());
    assert!(FetchError::RateLimited("slow down".to_string()).is_transient());
    assert!(FetchError::Transport("connection reset".to_string()).is_transient());
    assert!(!FetchError::Rpc {
        code: -32602,
        message: "invalid params".to_string()
    }
    .is_transient());
    assert!(!FetchError::Decode("bad json".to_string()).is_transient());
}
