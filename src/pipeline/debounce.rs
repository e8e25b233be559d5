//! Signal/wait coordination that coalesces bursts of changes
//!
//! The ingestor calls `signal()` once per newly pending node. The worker
//! calls `await_batch()`, which returns once per burst: after the first
//! signal it waits out the quiet window, and every signal arriving before
//! the window closes is absorbed into the same wake-up.

use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Why `await_batch` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The quiet window elapsed after the first signal
    QuietWindowElapsed,
    /// The pending backlog hit the flush threshold
    Flushed,
}

#[derive(Debug, Default)]
struct SignalState {
    signalled: bool,
    flush: bool,
}

#[derive(Debug)]
pub struct DebounceScheduler {
    quiet_window: Duration,
    state: Mutex<SignalState>,
    /// Wakes a worker waiting for the first signal
    signals: Notify,
    /// Cuts a running quiet window short
    flushes: Notify,
}

impl DebounceScheduler {
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            quiet_window,
            state: Mutex::new(SignalState::default()),
            signals: Notify::new(),
            flushes: Notify::new(),
        }
    }

    pub fn quiet_window(&self) -> Duration {
        self.quiet_window
    }

    /// Record that work is pending.
    pub fn signal(&self) {
        self.state.lock().unwrap().signalled = true;
        self.signals.notify_waiters();
    }

    /// Record that work is pending and the quiet window should not be
    /// waited out.
    pub fn request_flush(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.signalled = true;
            state.flush = true;
        }
        self.signals.notify_waiters();
        self.flushes.notify_waiters();
    }

    /// Whether a signal has arrived since the last wake-up
    pub fn is_signalled(&self) -> bool {
        self.state.lock().unwrap().signalled
    }

    /// Wait for the next burst to settle.
    ///
    /// Returns `None` if `cancel` fires first; nothing is consumed in
    /// that case.
    pub async fn await_batch(&self, cancel: &CancellationToken) -> Option<Wake> {
        // Phase 1: wait for the first signal
        loop {
            // Register interest before inspecting state; notify_waiters()
            // reaches futures created before the call even if not yet polled.
            let signalled = self.signals.notified();
            if cancel.is_cancelled() {
                return None;
            }
            if self.is_signalled() {
                break;
            }
            tokio::select! {
                _ = signalled => {}
                _ = cancel.cancelled() => return None,
            }
        }

        // Phase 2: quiet window, unless a flush is already requested
        let flushed = self.flushes.notified();
        let wake = if self.state.lock().unwrap().flush {
            Wake::Flushed
        } else {
            tokio::select! {
                _ = tokio::time::sleep(self.quiet_window) => Wake::QuietWindowElapsed,
                _ = flushed => Wake::Flushed,
                _ = cancel.cancelled() => return None,
            }
        };

        // Everything signalled up to here belongs to this wake-up
        let mut state = self.state.lock().unwrap();
        state.signalled = false;
        state.flush = false;
        trace!(?wake, "debounce window closed");
        Some(wake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{advance, sleep, Instant};

    #[tokio::test(start_paused = true)]
    async fn waits_out_quiet_window_after_signal() {
        let scheduler = DebounceScheduler::new(Duration::from_millis(1000));
        let cancel = CancellationToken::new();

        let start = Instant::now();
        scheduler.signal();
        let wake = scheduler.await_batch(&cancel).await;

        assert_eq!(wake, Some(Wake::QuietWindowElapsed));
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(!scheduler.is_signalled());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_window_yields_one_wake() {
        let scheduler = Arc::new(DebounceScheduler::new(Duration::from_millis(1000)));
        let cancel = CancellationToken::new();

        let burst = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                for _ in 0..5 {
                    scheduler.signal();
                    sleep(Duration::from_millis(150)).await;
                }
            })
        };

        assert_eq!(
            scheduler.await_batch(&cancel).await,
            Some(Wake::QuietWindowElapsed)
        );
        burst.await.unwrap();

        // All five signals were absorbed: the next wait blocks until cancelled
        let waiter = {
            let scheduler = scheduler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.await_batch(&cancel).await })
        };
        advance(Duration::from_secs(10)).await;
        assert!(!waiter.is_finished());
        cancel.cancel();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn signal_before_wait_is_not_lost() {
        let scheduler = DebounceScheduler::new(Duration::from_millis(10));
        let cancel = CancellationToken::new();

        scheduler.signal();
        sleep(Duration::from_secs(5)).await;

        assert!(scheduler.await_batch(&cancel).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_idle_returns_promptly() {
        let scheduler = Arc::new(DebounceScheduler::new(Duration::from_millis(1000)));
        let cancel = CancellationToken::new();

        let waiter = {
            let scheduler = scheduler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.await_batch(&cancel).await })
        };
        tokio::task::yield_now().await;
        cancel.cancel();

        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_quiet_window_keeps_signal() {
        let scheduler = Arc::new(DebounceScheduler::new(Duration::from_millis(1000)));
        let cancel = CancellationToken::new();
        scheduler.signal();

        let waiter = {
            let scheduler = scheduler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.await_batch(&cancel).await })
        };
        sleep(Duration::from_millis(300)).await;
        cancel.cancel();

        assert_eq!(waiter.await.unwrap(), None);
        assert!(scheduler.is_signalled());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_cuts_quiet_window_short() {
        let scheduler = Arc::new(DebounceScheduler::new(Duration::from_secs(60)));
        let cancel = CancellationToken::new();
        scheduler.signal();

        let waiter = {
            let scheduler = scheduler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let start = Instant::now();
                (scheduler.await_batch(&cancel).await, start.elapsed())
            })
        };
        sleep(Duration::from_millis(100)).await;
        scheduler.request_flush();

        let (wake, elapsed) = waiter.await.unwrap();
        assert_eq!(wake, Some(Wake::Flushed));
        assert!(elapsed < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_requested_before_wait_skips_window() {
        let scheduler = DebounceScheduler::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        scheduler.request_flush();

        let start = Instant::now();
        assert_eq!(scheduler.await_batch(&cancel).await, Some(Wake::Flushed));
        assert!(start.elapsed() < Duration::from_secs(60));
    }
}
