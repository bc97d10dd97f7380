//! Failure taxonomy and classification.
//!
//! Collaborator failures are recovered into one of four [`ErrorKind`]s, each
//! of which owns its wire contract (status, `Retry-After`, header tag).

use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised by backing-store collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("lookup timeout after {0} ms")]
    Timeout(u64),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("pool exhausted: {0} lookups in flight")]
    PoolExhausted(usize),

    /// Anything the driver reports that has no dedicated variant.
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Wire-level failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    ConnectionRefused,
    PoolExhausted,
    Unknown,
}

impl ErrorKind {
    /// Classify a raised failure.
    ///
    /// Typed [`StoreError`] variants map directly. Anything else is matched on
    /// its message, case-insensitively.
    pub fn classify(err: &(dyn std::error::Error + 'static)) -> Self {
        if let Some(store) = err.downcast_ref::<StoreError>() {
            match store {
                StoreError::Timeout(_) => return ErrorKind::Timeout,
                StoreError::ConnectionRefused(_) => return ErrorKind::ConnectionRefused,
                StoreError::PoolExhausted(_) => return ErrorKind::PoolExhausted,
                StoreError::Backend(_) => {}
            }
        }
        Self::from_message(&err.to_string())
    }

    /// Substring classification of a failure message.
    pub fn from_message(message: &str) -> Self {
        let message = message.to_ascii_lowercase();
        if message.contains("timeout") || message.contains("timed out") {
            ErrorKind::Timeout
        } else if message.contains("econnrefused") || message.contains("connection") {
            ErrorKind::ConnectionRefused
        } else if message.contains("pool exhausted") {
            ErrorKind::PoolExhausted
        } else {
            ErrorKind::Unknown
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Timeout | ErrorKind::ConnectionRefused => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::PoolExhausted => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Seconds a client should wait before retrying, if retrying makes sense.
    pub fn retry_after_secs(self) -> Option<u64> {
        match self {
            ErrorKind::Timeout => Some(30),
            ErrorKind::ConnectionRefused => Some(60),
            ErrorKind::PoolExhausted => Some(5),
            ErrorKind::Unknown => None,
        }
    }

    /// Value of the `X-Status-Page-Error` header.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionRefused => "connection_refused",
            ErrorKind::PoolExhausted => "pool_exhausted",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Client-facing message for JSON error bodies.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "The service took too long to respond. Please try again.",
            ErrorKind::ConnectionRefused => "The service is temporarily unavailable. Please try again later.",
            ErrorKind::PoolExhausted => "Too many concurrent requests. Please retry shortly.",
            ErrorKind::Unknown => "An unexpected error occurred.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seconds since the unix epoch, for log records.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
