//! Request outcome taxonomy
//!
//! These are input types: the host transport constructs them when a request
//! finishes and feeds them to the engine's hooks. The engine classifies them
//! and never re-throws them.

use http::StatusCode;
use thiserror::Error;

/// Terminal outcome of one dispatched request, as reported by the host
///
/// A tagged variant rather than a pair of nullable arguments: a request either
/// produced a response or failed with a transport error, never both.
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    Success(&'a ResponseSummary),
    Failure(&'a TransportError),
}

/// The slice of a response the switch condition cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSummary {
    status: StatusCode,
}

impl ResponseSummary {
    pub fn new(status: StatusCode) -> Self {
        Self { status }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Transport-level failure reported by the host
///
/// Mirrors the three shapes a failing HTTP client produces: a connection-level
/// failure (DNS, connect refused), a fatal error that may wrap a deeper cause,
/// and a request that completed with an error status.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// DNS resolution or TCP connect failure
    #[error("connection failed: {0}")]
    Connect(String),

    /// Unrecoverable failure terminating the attempt, possibly wrapping the
    /// error that triggered it
    #[error("fatal transport failure: {message}")]
    Fatal {
        message: String,
        cause: Option<Box<TransportError>>,
    },

    /// The request reached the server but came back with an error status
    #[error("request failed: {message}")]
    Request {
        message: String,
        status: Option<StatusCode>,
    },
}

impl TransportError {
    /// Whether this error, or any wrapped cause, is a connection-level failure
    pub fn is_connection_failure(&self) -> bool {
        match self {
            TransportError::Connect(_) => true,
            TransportError::Fatal { cause, .. } => cause
                .as_deref()
                .is_some_and(TransportError::is_connection_failure),
            TransportError::Request { .. } => false,
        }
    }

    /// First HTTP status code found walking the cause chain, if any
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Connect(_) => None,
            TransportError::Fatal { cause, .. } => {
                cause.as_deref().and_then(TransportError::http_status)
            }
            TransportError::Request { status, .. } => *status,
        }
    }
}
