//! Cooperative stop signal for long-running harvests.
//!
//! The harvest loop checks the signal between requests and wakes from its
//! sleeps when it fires. An in-flight request is allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Creates a connected handle/signal pair.
#[must_use]
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
}

/// Triggers a stop. Cloneable; stopping more than once is harmless.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        stop_channel().1
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Every handle is gone; the value can no longer change.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleeps for `duration` unless a stop arrives first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if interrupted.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_stopped() {
            return false;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = self.stopped() => false,
        }
    }
}
