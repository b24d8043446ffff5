//! One-shot waits on the handler registries.
//!
//! An [`Awaiting`] owns the receiving half of a oneshot channel and a
//! [`Registration`] guard for the handler feeding it. Dropping the future,
//! whether it resolved, timed out or was abandoned, drops the guard, and
//! the guard queues the handler's removal.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use super::control::Control;
use crate::error::{ClientError, Result};
use crate::handlers::{HandlerId, HandlerKind};

/// Removes a handler when dropped.
pub(crate) struct Registration {
    control: mpsc::UnboundedSender<Control>,
    kind: HandlerKind,
    id: HandlerId,
}

impl Registration {
    pub fn new(control: mpsc::UnboundedSender<Control>, kind: HandlerKind, id: HandlerId) -> Self {
        Self { control, kind, id }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        // Removal is idempotent; the loop may already be gone.
        let _ = self.control.send(Control::Remove(self.kind, self.id));
        trace!(kind = self.kind.as_str(), handler = %self.id, "Released one-shot handler");
    }
}

/// The sending side shared with the one-shot handler.
///
/// Taking the sender is what makes the handler fire at most once, even if
/// two matching events race before its removal is applied.
pub(crate) struct Slot<T>(Arc<Mutex<Option<oneshot::Sender<T>>>>);

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Slot<T> {
    /// Deliver `value` if nothing was delivered yet. Returns whether it was.
    pub fn fill(&self, value: T) -> bool {
        match self.0.lock().take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.0.lock().is_none()
    }
}

/// Create the slot/receiver pair for a one-shot handler.
pub(crate) fn slot<T>() -> (Slot<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (Slot(Arc::new(Mutex::new(Some(tx)))), rx)
}

/// Resolves with the first event a one-shot handler captured.
///
/// Fails with [`ClientError::Closed`] if the connection ends first.
#[must_use = "the handler is removed as soon as this is dropped"]
pub struct Awaiting<T> {
    rx: oneshot::Receiver<T>,
    registration: Registration,
}

impl<T> Awaiting<T> {
    pub(crate) fn new(rx: oneshot::Receiver<T>, registration: Registration) -> Self {
        Self { rx, registration }
    }

    /// Id of the handler behind this wait.
    pub fn handler_id(&self) -> HandlerId {
        self.registration.id
    }
}

impl<T> Future for Awaiting<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.map_err(|_| ClientError::Closed))
    }
}
