//! Unified error types for the ARI client.
//!
//! Mirrors the teacher's layered error design: a transport-facing variant
//! set, kept as plain strings rather than wrapped source errors so that
//! [`ClientError`] stays `Clone` and can be handed to every listener that
//! observes a lifecycle failure, not just the original caller.

use thiserror::Error;

/// Errors produced anywhere in the ARI client.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// A transport-level failure occurred before any HTTP response was
    /// received: DNS failure, connection refused, timeout, etc.
    #[error("host is not reachable: {cause}")]
    HostIsNotReachable {
        /// The underlying cause, as reported by the transport.
        cause: String,
    },

    /// The API schema could not be fetched or parsed at connect time.
    #[error("failed to load API schema: {reason}")]
    ApiLoad {
        /// Reason for the failure.
        reason: String,
    },

    /// The server responded with a non-2xx status. The message is the
    /// server's response body `message` field verbatim (or the raw body
    /// text if it did not parse as `{"message": ...}`).
    #[error("{0}")]
    Operation(String),

    /// A malformed event frame or post-connect schema fragment was
    /// encountered. Non-fatal: the caller of `connect`/`start` never sees
    /// this variant, it is only logged and the offending frame is skipped.
    #[error("protocol error: {reason}")]
    Protocol {
        /// Reason for the failure.
        reason: String,
    },
}

/// Result type used throughout the ARI client.
pub type ClientResult<T> = Result<T, ClientError>;
