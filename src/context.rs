//! Cancellation and deadline signal threaded through a call.
//!
//! A [`Context`] is observed by both the backoff sleep and the network call.
//! It carries an optional deadline and the cancellation flags of every
//! [`CancelHandle`] in its ancestry.

use std::future::{pending, Future};
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Reason a [`Context`] is done.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ContextError {
    /// [`CancelHandle::cancel`] was called.
    #[error("context canceled")]
    Cancelled,
    /// The deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation and deadline token for one logical call.
#[derive(Clone, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Vec<watch::Receiver<bool>>,
}

/// Cancels the paired [`Context`] and every context derived from it.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    /// Marks the paired context as cancelled.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl Context {
    /// A context that is never done.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().child_with_timeout(timeout)
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: Vec::new(),
        }
    }

    /// A context that is done once the returned handle cancels it.
    pub fn cancellable() -> (Self, CancelHandle) {
        Self::background().child_cancellable()
    }

    /// Derives a context that also expires `timeout` from now.
    ///
    /// The earlier of the parent deadline and the new one wins.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, candidate) {
            (Some(parent), Some(child)) => Some(parent.min(child)),
            (parent, None) => parent,
            (None, child) => child,
        };
        Self {
            deadline,
            cancel: self.cancel.clone(),
        }
    }

    /// Derives a context with its own cancellation handle.
    ///
    /// The child is done when either its own handle or any ancestor's
    /// handle cancels. Cancelling the child leaves the parent live.
    pub fn child_cancellable(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut cancel = self.cancel.clone();
        cancel.push(rx);
        let context = Self {
            deadline: self.deadline,
            cancel,
        };
        (context, CancelHandle(tx))
    }

    /// Deadline of this context, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.iter().any(|rx| *rx.borrow()) {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> ContextError {
        let cancelled = wait_cancelled(&self.cancel);
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => ContextError::Cancelled,
            () = expired => ContextError::DeadlineExceeded,
        }
    }

    /// Sleeps for `duration` unless the context is done first.
    pub(crate) async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            _ = self.done() => {}
        }
    }
}

/// Resolves once any flag in `receivers` is set.
///
/// A receiver whose handle was dropped without cancelling never resolves.
fn wait_cancelled(
    receivers: &[watch::Receiver<bool>],
) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
    Box::pin(async move {
        let Some((first, rest)) = receivers.split_first() else {
            return pending::<()>().await;
        };
        let mut rx = first.clone();
        let own = async move {
            let dropped = rx.wait_for(|cancelled| *cancelled).await.is_err();
            if dropped {
                pending::<()>().await;
            }
        };
        tokio::select! {
            () = own => {}
            () = wait_cancelled(rest) => {}
        }
    })
}
