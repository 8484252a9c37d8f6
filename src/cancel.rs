//! Per-request cancellation.
//!
//! A [`CancelHandle`] is kept by the caller; the paired [`CancelSignal`] is
//! attached to the request. Cancelling is sticky: once fired, every current
//! and future wait on the signal completes immediately, so a signal shared by
//! all attempts of one work item cancels each of them.

use std::time::Duration;
use tokio::sync::watch;

/// Caller side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

/// Request side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Create a linked handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (
        CancelHandle {
            tx: std::sync::Arc::new(tx),
        },
        CancelSignal { rx },
    )
}

/// A signal that fires on its own after `delay`.
///
/// Must be called from within a tokio runtime.
pub fn cancel_after(delay: Duration) -> CancelSignal {
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        handle.cancel();
    });
    signal
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the paired handle cancels.
    ///
    /// If every handle is dropped without cancelling, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let sender_gone = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if sender_gone {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_wakes_waiter() {
        let (handle, signal) = cancel_pair();
        let waiter = tokio::spawn(async move { signal.cancelled().await });
        handle.cancel();
        waiter.await.unwrap();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_is_sticky_for_late_waiters() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        signal.cancelled().await;
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fires_after_delay() {
        let signal = cancel_after(Duration::from_millis(300));
        assert!(!signal.is_cancelled());
        tokio::time::sleep(Duration::from_millis(301)).await;
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_handle_never_cancels() {
        let (handle, signal) = cancel_pair();
        drop(handle);
        let waited =
            tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
    }
}
