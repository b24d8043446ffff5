//! Telemetry utilities: tracing spans and subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies. With
/// `json`, events are emitted as one JSON object per line.
pub fn init(default_filter: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    use crate::handlers::HandlerId;

    /// Span for one server connection; covers the dispatch loop.
    pub fn connection(host: &str, nick: &str) -> Span {
        info_span!("connection", host = %host, nick = %nick)
    }

    /// Span for one background handler invocation.
    pub fn handler(kind: &'static str, id: HandlerId) -> Span {
        info_span!("handler", kind = kind, id = %id)
    }
}
