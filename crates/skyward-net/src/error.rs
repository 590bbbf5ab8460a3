//! Transport-level error type.

use std::time::Duration;

use crate::messages::CodecError;

/// Errors surfaced by the datagram transport and client handshake.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Socket operation failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Outgoing message could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// No discovery announcement arrived in time.
    #[error("no server discovered within {0:?}")]
    DiscoveryTimeout(Duration),

    /// The authority did not answer the login in time.
    #[error("login timed out after {0:?}")]
    LoginTimeout(Duration),

    /// The authority refused the credentials.
    #[error("login failed: {0}")]
    LoginFailed(String),
}
