//! Wait-until-observable primitive.
//!
//! Replaces blind "sleep for a block" delays: a read is polled until its
//! result satisfies a predicate, bounded by a timeout and abortable through
//! a [`CancelToken`].

use crate::error::{Result, SimError};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Clonable cancellation flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any token clone, so this cannot close
        // while we hold `self`.
        let _ = rx.wait_for(|c| *c).await;
    }
}

// ---------------------------------------------------------------------------
// Confirmer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Confirmer {
    timeout: Duration,
    poll_interval: Duration,
    cancel: CancelToken,
}

impl Confirmer {
    pub fn new(timeout: Duration, poll_interval: Duration, cancel: CancelToken) -> Self {
        Self {
            timeout,
            poll_interval,
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Poll `read` until `done` accepts its output, returning that output.
    ///
    /// The read runs at least once, even with a zero timeout. Read errors
    /// are returned immediately; there is no retry.
    pub async fn wait_until<T, F, Fut, P>(&self, what: &str, mut read: F, done: P) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&T) -> bool,
    {
        let start = Instant::now();
        let mut attempts = 0u32;
        loop {
            if self.cancel.is_cancelled() {
                return Err(SimError::Cancelled);
            }

            let value = read().await?;
            attempts += 1;
            if done(&value) {
                tracing::debug!(what, attempts, "condition observed");
                return Ok(value);
            }

            let waited = start.elapsed();
            if waited >= self.timeout {
                return Err(SimError::ConfirmationTimeout {
                    what: what.to_string(),
                    waited,
                });
            }
            tracing::debug!(what, attempts, "not yet observable");
            self.pause(self.poll_interval.min(self.timeout - waited))
                .await?;
        }
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return if self.cancel.is_cancelled() {
                Err(SimError::Cancelled)
            } else {
                Ok(())
            };
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => Err(SimError::Cancelled),
        }
    }
}
