//! Unified error handling for asif.
//!
//! `ClientError` covers everything the client API and the dispatch loop can
//! fail with. Handler bodies use [`HandlerResult`] and are free to return any
//! error; the loop logs those instead of propagating them.

use asif_proto::ProtocolError;
use thiserror::Error;

// ============================================================================
// Client Errors
// ============================================================================

/// Errors surfaced by the client API and the dispatch loop.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The dispatch loop is gone; nothing can be sent or registered.
    #[error("connection closed")]
    Closed,

    #[error("client is already running")]
    AlreadyRunning,

    /// A module or channel proxy was read before it was attached.
    #[error("{0} is not attached to a client yet")]
    NotAttached(String),

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Two rules were given for a field that accepts only one.
    #[error("conflicting {0} filters")]
    ConflictingFilter(&'static str),

    #[error("nickname {nick} still in use after {attempts} attempts")]
    NickRetriesExhausted { nick: String, attempts: u32 },

    #[error("message has no reply target")]
    NoReplyTarget,
}

impl ClientError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Protocol(_) => "protocol",
            Self::Closed => "closed",
            Self::AlreadyRunning => "already_running",
            Self::NotAttached(_) => "not_attached",
            Self::InvalidPattern { .. } => "invalid_pattern",
            Self::ConflictingFilter(_) => "conflicting_filter",
            Self::NickRetriesExhausted { .. } => "nick_retries_exhausted",
            Self::NoReplyTarget => "no_reply_target",
        }
    }
}

/// Result type for client operations.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Result type for user handler bodies.
pub type HandlerResult = anyhow::Result<()>;
