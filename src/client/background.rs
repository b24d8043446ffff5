//! Isolated background execution for handler bodies.
//!
//! Each unit runs in its own spawned task. The supervising future only
//! inspects the outcome: an `Err` is logged as a warning, a panic as an
//! error, and neither reaches the dispatch loop or sibling handlers.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{Instrument, error, warn};

use crate::error::HandlerResult;
use crate::handlers::{HandlerId, HandlerKind};
use crate::telemetry::spans;

/// Run `fut` in its own task and log how it ended.
pub(crate) async fn supervise<F>(kind: HandlerKind, id: HandlerId, fut: F)
where
    F: Future<Output = HandlerResult> + Send + 'static,
{
    let span = spans::handler(kind.as_str(), id);
    match tokio::spawn(fut.instrument(span)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(kind = kind.as_str(), handler = %id, error = %e, "Handler failed");
        }
        Err(join_err) if join_err.is_panic() => {
            error!(kind = kind.as_str(), handler = %id, "Handler panicked");
        }
        Err(join_err) => {
            warn!(kind = kind.as_str(), handler = %id, error = %join_err, "Handler cancelled");
        }
    }
}

/// Fire-and-forget variant of [`supervise`].
pub(crate) fn spawn_isolated<F>(kind: HandlerKind, id: HandlerId, fut: F) -> JoinHandle<()>
where
    F: Future<Output = HandlerResult> + Send + 'static,
{
    tokio::spawn(supervise(kind, id, fut))
}
