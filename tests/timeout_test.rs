//! Integration tests for `Timeout` across its strategies

use gizmos::{Error, ErrorKind, Timeout, TimeoutStrategy};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_watcher_returns_at_the_deadline() {
    let timeout = Timeout::new(Duration::from_millis(50))
        .unwrap()
        .with_strategy(TimeoutStrategy::Watcher)
        .unwrap()
        .with_operation("download");

    let start = Instant::now();
    let err = timeout
        .call(|| {
            thread::sleep(Duration::from_secs(2));
            Ok::<_, Error>(())
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.to_string().contains("download"));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_errors_from_the_call_are_preserved() {
    let timeout = Timeout::new(Duration::from_secs(5))
        .unwrap()
        .with_strategy(TimeoutStrategy::Watcher)
        .unwrap();

    let err = timeout
        .call(|| Err::<(), _>(Error::custom("Refused", "port closed")))
        .unwrap_err();
    assert_eq!(err.name(), "Refused");
}

#[cfg(unix)]
mod signal {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(sigalrm)]
    fn test_signal_reports_overrun_after_return() {
        let timeout = Timeout::new(Duration::from_millis(50))
            .unwrap()
            .with_strategy(TimeoutStrategy::Signal)
            .unwrap()
            .with_error(|operation, cutoff| {
                Error::custom("Deadline", format!("{operation} exceeded {cutoff:?}"))
            });

        let err = timeout
            .call(|| {
                thread::sleep(Duration::from_millis(200));
                Ok::<_, Error>(1)
            })
            .unwrap_err();
        assert_eq!(err.name(), "Deadline");
        assert!(err.to_string().contains("50ms"));
    }

    #[test]
    #[serial(sigalrm)]
    fn test_signal_fast_call_succeeds() {
        let timeout = Timeout::new(Duration::from_secs(1))
            .unwrap()
            .with_strategy(TimeoutStrategy::Signal)
            .unwrap();
        assert_eq!(timeout.call(|| Ok::<_, Error>("quick")).unwrap(), "quick");
    }
}

#[tokio::test(start_paused = true)]
async fn test_async_future_is_cancelled() {
    let timeout = Timeout::new(Duration::from_secs(1)).unwrap();

    let err = timeout
        .call_async(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, Error>(())
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let value = timeout.call_async(async { Ok::<_, Error>(5) }).await.unwrap();
    assert_eq!(value, 5);
}
