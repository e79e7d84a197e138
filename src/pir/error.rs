//! Error handling for the PIR protocol
//!
//! Every fallible operation in the crate returns [`Result`], carrying a
//! [`PirError`] whose variant tells the caller what to do next: fix the
//! configuration, resend a full request, or give up.

use thiserror::Error;

/// Protocol-level failures that a caller can recover from by re-issuing a
/// request (typically a key-inclusive one).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A keyless request arrived for a session the server has no keys for.
    #[error("no evaluation keys cached for session {session_id:#x}")]
    SessionDesync { session_id: u64 },

    /// A response does not match the shape of the request it answers.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A response refers to a request this client never issued (or already consumed).
    #[error("no pending request with id {request_id}")]
    UnknownRequest { request_id: u64 },

    /// A response marks a static part as reusable but none is cached.
    #[error("static component for block {block} was never received")]
    MissingStaticComponent { block: usize },

    /// A request was built against public parameters the server no longer
    /// serves. The caller fetches the current ones and creates a new client.
    #[error("request targets public parameters {request:#x}, server serves {current:#x}")]
    StaleParameters { request: u64, current: u64 },
}

/// PIR operation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PirError {
    /// Invalid parameters; fatal at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Request/response shape or session state mismatch; recoverable.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Decryption or decoding produced an inconsistent value.
    #[error("cryptographic failure: {0}")]
    CryptographicFailure(String),

    /// An operation was called out of order (e.g. before preprocessing).
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A caller-supplied argument is out of range or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Wire encoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PirError {
    /// Whether re-issuing the request (with fresh keys) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PirError::Protocol(_))
    }
}

impl From<bincode::Error> for PirError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for PIR operations
pub type Result<T> = std::result::Result<T, PirError>;

/// Create a string-carrying `PirError` variant with format string support
macro_rules! pir_err {
    ($kind:ident, $($arg:tt)*) => {
        $crate::pir::error::PirError::$kind(format!($($arg)*))
    };
}

pub(crate) use pir_err;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_builds_variant() {
        let err = pir_err!(InvalidArgument, "index {} out of range", 7);
        assert_eq!(err, PirError::InvalidArgument("index 7 out of range".into()));
        assert_eq!(err.to_string(), "invalid argument: index 7 out of range");
    }

    #[test]
    fn test_only_protocol_errors_retry() {
        let desync: PirError = ProtocolError::SessionDesync { session_id: 1 }.into();
        assert!(desync.is_retryable());
        let stale: PirError = ProtocolError::StaleParameters {
            request: 1,
            current: 2,
        }
        .into();
        assert!(stale.is_retryable());
        assert!(!pir_err!(CryptographicFailure, "noise").is_retryable());
        assert!(!pir_err!(Configuration, "bad").is_retryable());
    }
}
