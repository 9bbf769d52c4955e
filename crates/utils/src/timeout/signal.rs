//! `SIGALRM` based timeout executor for Unix.
//!
//! The task runs on the calling thread under a one-shot interval timer. A
//! signal handler cannot unwind the task, so the handler only raises a flag
//! and the overrun is reported once the task returns.

use super::{CancellableExecutor, Completion};
use gizmos_core::{Error, Result};
use signal_hook::consts::SIGALRM;
use signal_hook::SigId;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Only one `ITIMER_REAL` exists per process
static ALARM_ARMED: AtomicBool = AtomicBool::new(false);

/// Runs tasks on the calling thread under a process-wide alarm
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalExecutor;

/// Disarms the timer and releases the alarm on every exit path
struct ArmedAlarm {
    id: SigId,
}

impl ArmedAlarm {
    fn arm(cutoff: Duration, fired: &Arc<AtomicBool>) -> Result<Self> {
        if ALARM_ARMED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::busy(
                "SIGALRM",
                "another signal timeout is already running in this process",
            ));
        }

        let id = match signal_hook::flag::register(SIGALRM, Arc::clone(fired)) {
            Ok(id) => id,
            Err(e) => {
                ALARM_ARMED.store(false, Ordering::SeqCst);
                return Err(Error::configuration(format!(
                    "failed to install SIGALRM handler: {e}"
                )));
            }
        };
        let alarm = Self { id };

        set_timer(cutoff).map_err(|e| {
            Error::configuration(format!("failed to arm the interval timer: {e}"))
        })?;
        Ok(alarm)
    }
}

impl Drop for ArmedAlarm {
    fn drop(&mut self) {
        if let Err(e) = set_timer(Duration::ZERO) {
            tracing::warn!(error = %e, "failed to disarm the interval timer");
        }
        signal_hook::low_level::unregister(self.id);
        ALARM_ARMED.store(false, Ordering::SeqCst);
    }
}

fn to_timeval(duration: Duration) -> libc::timeval {
    libc::timeval {
        tv_sec: libc::time_t::try_from(duration.as_secs()).unwrap_or(libc::time_t::MAX),
        tv_usec: libc::suseconds_t::from(duration.subsec_micros() as i32),
    }
}

/// Arm `ITIMER_REAL` for one shot after `after`, or disarm it for zero
fn set_timer(after: Duration) -> io::Result<()> {
    // a sub-microsecond cutoff would read as "disarm"
    let after = if after.is_zero() {
        after
    } else {
        after.max(Duration::from_micros(1))
    };
    let value = libc::itimerval {
        it_interval: to_timeval(Duration::ZERO),
        it_value: to_timeval(after),
    };
    // SAFETY: `value` is a valid itimerval and a null old-value pointer is allowed.
    let rc = unsafe { libc::setitimer(libc::ITIMER_REAL, &value, std::ptr::null_mut()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

impl CancellableExecutor for SignalExecutor {
    fn run_with_timeout<T, F>(&self, task: F, cutoff: Duration) -> Result<Completion<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let fired = Arc::new(AtomicBool::new(false));
        let alarm = ArmedAlarm::arm(cutoff, &fired)?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(task))
            .unwrap_or_else(|payload| Err(Error::from_panic(&*payload)));
        drop(alarm);

        if fired.load(Ordering::SeqCst) {
            tracing::debug!(cutoff = ?cutoff, "alarm fired before the task returned");
            Ok(Completion::TimedOut)
        } else {
            Ok(Completion::Finished(outcome))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gizmos_core::ErrorKind;
    use serial_test::serial;
    use std::thread;

    #[test]
    #[serial(sigalrm)]
    fn test_fast_task_finishes() {
        let completion = SignalExecutor
            .run_with_timeout(|| Ok(5), Duration::from_millis(200))
            .unwrap();
        assert!(matches!(completion, Completion::Finished(Ok(5))));
    }

    #[test]
    #[serial(sigalrm)]
    fn test_slow_task_times_out() {
        let completion = SignalExecutor
            .run_with_timeout(
                || {
                    thread::sleep(Duration::from_millis(300));
                    Ok(())
                },
                Duration::from_millis(50),
            )
            .unwrap();
        assert!(matches!(completion, Completion::TimedOut));
    }

    #[test]
    #[serial(sigalrm)]
    fn test_nested_use_is_busy() {
        let completion = SignalExecutor
            .run_with_timeout(
                || {
                    SignalExecutor
                        .run_with_timeout(|| Ok(()), Duration::from_millis(10))
                        .map(|_| ())
                },
                Duration::from_secs(1),
            )
            .unwrap();

        match completion {
            Completion::Finished(Err(e)) => assert_eq!(e.kind(), ErrorKind::Busy),
            other => panic!("expected busy error, got {other:?}"),
        }
        assert!(!ALARM_ARMED.load(Ordering::SeqCst));
    }

    #[test]
    #[serial(sigalrm)]
    fn test_panic_is_reported_and_alarm_released() {
        let completion = SignalExecutor
            .run_with_timeout(|| -> Result<()> { panic!("inside alarm") }, Duration::from_secs(1))
            .unwrap();
        match completion {
            Completion::Finished(Err(e)) => assert_eq!(e.kind(), ErrorKind::Panicked),
            other => panic!("expected panic error, got {other:?}"),
        }
        assert!(!ALARM_ARMED.load(Ordering::SeqCst));
    }
}
