use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Lightweight cancellation token fired when a consumer detaches.
///
/// Cancellation is advisory and one-way: once fired it never resets. The
/// token is cheap to clone and safe to poll from any task; `cancelled()`
/// resolves immediately when the signal already fired.
#[derive(Clone, Debug, Default)]
pub struct DisconnectSignal {
    inner: Arc<SignalInner>,
}

#[derive(Debug, Default)]
struct SignalInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl DisconnectSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Wait until the signal fires.
    pub async fn cancelled(&self) {
        // Register before re-checking the flag so a concurrent cancel()
        // between check and await cannot be missed.
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
