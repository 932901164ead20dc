use radius_proto::{EapError, PacketError};
use thiserror::Error;

/// Errors an authentication attempt can end with
///
/// Every variant maps to a stable numeric code (see [`ClientError::code`])
/// so callers can act on the outcome without matching variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Socket could not be created or connected (code 2)
    #[error("Socket failure: {0}")]
    Socket(String),

    /// Server answered Access-Reject, or MS-CHAP reported a mapped failure
    /// (code 3)
    #[error("{0}")]
    Rejected(String),

    /// No complete response before the configured deadline (code 28)
    #[error("Operation timed out")]
    Timeout,

    /// The request datagram could not be sent (code 55)
    #[error("Send error: {0}")]
    Send(String),

    /// The response could not be received (code 56)
    #[error("Receive error: {0}")]
    Receive(String),

    /// The response datagram did not parse as a RADIUS packet (code 100)
    #[error("Invalid response packet: {0}")]
    InvalidResponse(String),

    /// The Response-Authenticator did not match the pending request
    /// (code 101)
    #[error("Response authenticator mismatch")]
    AuthenticatorMismatch,

    /// The challenge/response conversation went off the rails (code 102)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Caller handed the API something unusable (code 127)
    #[error("Bad argument: {0}")]
    BadArgument(String),
}

impl ClientError {
    /// Stable numeric error code
    pub fn code(&self) -> u8 {
        match self {
            ClientError::Socket(_) => 2,
            ClientError::Rejected(_) => 3,
            ClientError::Timeout => 28,
            ClientError::Send(_) => 55,
            ClientError::Receive(_) => 56,
            ClientError::InvalidResponse(_) => 100,
            ClientError::AuthenticatorMismatch => 101,
            ClientError::Protocol(_) => 102,
            ClientError::BadArgument(_) => 127,
        }
    }

    /// True for outcomes where another server from the list may still
    /// succeed; Access-Reject is final.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ClientError::Rejected(_))
    }
}

impl From<PacketError> for ClientError {
    fn from(err: PacketError) -> Self {
        ClientError::InvalidResponse(err.to_string())
    }
}

impl From<EapError> for ClientError {
    fn from(err: EapError) -> Self {
        ClientError::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ClientError::Socket("x".into()).code(), 2);
        assert_eq!(ClientError::Rejected("x".into()).code(), 3);
        assert_eq!(ClientError::Timeout.code(), 28);
        assert_eq!(ClientError::Send("x".into()).code(), 55);
        assert_eq!(ClientError::Receive("x".into()).code(), 56);
        assert_eq!(ClientError::InvalidResponse("x".into()).code(), 100);
        assert_eq!(ClientError::AuthenticatorMismatch.code(), 101);
        assert_eq!(ClientError::Protocol("x".into()).code(), 102);
        assert_eq!(ClientError::BadArgument("x".into()).code(), 127);
    }

    #[test]
    fn test_reject_is_final() {
        assert!(!ClientError::Rejected("Access rejected".into()).is_retryable());
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::AuthenticatorMismatch.is_retryable());
    }
}
