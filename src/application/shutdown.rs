use std::time::Duration;
use tokio::sync::watch;

/// Sending half of a cancellation signal. Dropping it without calling
/// [`ShutdownTrigger::trigger`] does not cancel anything.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half, observed by the poll loop between cycles only.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleep for `duration` unless shutdown is triggered first.
    ///
    /// Returns `true` when the whole duration elapsed, `false` when woken by
    /// the trigger.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_triggered() {
            return false;
        }

        let rx = &mut self.rx;
        let cancelled = async move {
            if rx.wait_for(|stop| *stop).await.is_err() {
                // Trigger dropped: nobody can cancel any more.
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = cancelled => false,
        }
    }
}
