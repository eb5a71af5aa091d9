//! Cancellation signal for background threads.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A one-shot cancellation token that sleeping threads can wait on.
#[derive(Clone, Default)]
pub(crate) struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cancels the signal and wakes all waiters.
    pub(crate) fn cancel(&self) {
        let (flag, cv) = &*self.inner;
        *flag.lock() = true;
        cv.notify_all();
    }

    /// Sleeps up to `timeout`. Returns true if cancelled.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cv) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut cancelled = flag.lock();
        while !*cancelled {
            if cv.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn times_out_when_not_cancelled() {
        let signal = ShutdownSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn cancel_wakes_waiter() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let cancelled = waiter.wait_timeout(Duration::from_secs(30));
            (cancelled, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        signal.cancel();

        let (cancelled, elapsed) = handle.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn cancelled_signal_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.cancel();
        assert!(signal.wait_timeout(Duration::from_secs(30)));
    }
}
