//! Completion handles for asynchronous operations.

use crate::error::{Result, SimError};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// The eventual outcome of an accepted operation.
///
/// Awaiting the completion yields the result once the operation has
/// committed (or was merely accepted, for two-phase operations). Callers
/// without an async runtime can poll it with [`try_take`](Self::try_take).
#[derive(Debug)]
#[must_use = "a completion carries the operation's outcome"]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T>>,
}

/// The sending half of a [`Completion`].
#[derive(Debug)]
pub(crate) struct Resolver<T> {
    tx: oneshot::Sender<Result<T>>,
}

impl<T> Resolver<T> {
    pub(crate) fn resolve(self, result: Result<T>) {
        // The caller may have dropped the completion; the operation still ran.
        let _ = self.tx.send(result);
    }
}

impl<T> Completion<T> {
    /// Creates a completion and the resolver that settles it.
    pub(crate) fn pending() -> (Resolver<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (Resolver { tx }, Self { rx })
    }

    /// Creates an already settled completion.
    pub fn ready(result: Result<T>) -> Self {
        let (resolver, completion) = Self::pending();
        resolver.resolve(result);
        completion
    }

    /// Takes the outcome if it has arrived.
    ///
    /// Returns `None` while the operation is still pending and after the
    /// outcome has already been taken.
    pub fn try_take(&mut self) -> Option<Result<T>> {
        self.rx.try_recv().ok()
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(SimError::Runtime(
                    "operation dropped before completing".to_string(),
                ))
            })
        })
    }
}
