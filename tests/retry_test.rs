//! Integration tests for `Retry` configured from settings

use gizmos::{BackoffStrategy, Error, ErrorKind, Retry, RetryConfig, Settings};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

#[test]
fn test_retry_from_settings_json() {
    let settings = Settings::from_json_str(
        r#"{"retry": {"max_attempts": 4, "delay_ms": 0, "retry_on": ["custom"]}}"#,
    )
    .unwrap();
    let mut retry = Retry::from_config(&settings.retry).unwrap();
    let calls = AtomicU32::new(0);

    let result = retry.call(|| {
        if calls.fetch_add(1, Ordering::SeqCst) < 3 {
            Err(Error::custom("Flaky", "not yet"))
        } else {
            Ok("done")
        }
    });

    assert_eq!(result.unwrap(), Some("done"));
    assert_eq!(retry.attempts(), 4);
    assert_eq!(retry.caught().len(), 3);
}

#[test]
fn test_unwatched_kind_is_not_retried() {
    let config = RetryConfig {
        retry_on: vec![ErrorKind::Timeout],
        ..RetryConfig::fast()
    };
    let mut retry = Retry::from_config(&config).unwrap();
    let calls = AtomicU32::new(0);

    let err = retry
        .call(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Error::configuration("broken"))
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_linear_backoff_grows_the_wait() {
    let mut retry = Retry::new(3, Duration::from_millis(10))
        .unwrap()
        .with_backoff(BackoffStrategy::linear(Duration::from_millis(20)))
        .raise_last(false);

    let start = Instant::now();
    let result = retry.call(|| Err::<(), _>(Error::custom("Down", "503"))).unwrap();

    // waits of 10ms then 30ms
    assert!(result.is_none());
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[tokio::test(start_paused = true)]
async fn test_async_retry_waits_without_blocking() {
    let mut retry = Retry::new(3, Duration::from_secs(5))
        .unwrap()
        .asynchronous(true);
    let calls = AtomicU32::new(0);

    let start = tokio::time::Instant::now();
    let result = retry
        .call_async(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(Error::custom("Flaky", "first"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(result, Some(1));
    assert!(start.elapsed() >= Duration::from_secs(5));
}
