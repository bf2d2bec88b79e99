//! Per-call cancellation and deadline scope.
//!
//! Every broadcaster operation takes a [`CallContext`]. Transport calls and
//! poll sleeps are raced against it, so a caller can always bound how long an
//! operation runs and can tell a cancellation apart from a remote failure.

use std::future::{pending, Future};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Why a context stopped an operation.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Cancelled {
    /// The context was cancelled explicitly.
    #[error("operation cancelled")]
    Cancelled,

    /// The context's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation scope threaded from the caller into every operation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Handle that cancels every context derived from it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context with an explicit cancel handle.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            deadline: None,
            cancel: Some(rx),
        };
        (ctx, CancelHandle { tx })
    }

    /// A context cancelled whenever `rx` flips to `true`.
    pub fn from_signal(rx: watch::Receiver<bool>) -> Self {
        Self {
            deadline: None,
            cancel: Some(rx),
        }
    }

    /// Derive a context whose deadline is at most `timeout` from now.
    ///
    /// An earlier existing deadline is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context with the earlier of the current and the given deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            cancel: self.cancel.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check of the context state.
    pub fn check(&self) -> Result<(), Cancelled> {
        if let Some(rx) = &self.cancel {
            if *rx.borrow() {
                return Err(Cancelled::Cancelled);
            }
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Cancelled::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> Cancelled {
        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        let cancelled = async {
            let Some(rx) = &self.cancel else {
                return pending::<()>().await;
            };
            let mut rx = rx.clone();
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Sender gone without cancelling: nothing can cancel us anymore.
                    return pending::<()>().await;
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Cancelled::Cancelled,
            _ = deadline => Cancelled::DeadlineExceeded,
        }
    }

    /// Run `fut` unless the context ends first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            out = fut => Ok(out),
        }
    }
}
