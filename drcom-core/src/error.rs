//! Error types for drcom-core

/// Result type alias for drcom operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Packet is too short to be valid
    #[error("Packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort {
        expected: usize,
        actual: usize,
    },

    /// Response carried a leading byte other than the one expected here
    #[error("Unexpected response code: expected 0x{expected:02x}, got 0x{actual:02x}")]
    UnexpectedCode {
        expected: u8,
        actual: u8,
    },

    /// Unknown packet code
    #[error("Unknown packet code: 0x{0:02x}")]
    UnknownCode(u8),

    /// Operation not allowed in the current state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// Salt or package tail written twice in one session
    #[error("Session {0} already set")]
    TokenAlreadySet(&'static str),

    /// Salt or package tail read before it was captured
    #[error("Session {0} not set")]
    TokenMissing(&'static str),

    /// Invalid credentials or host data
    #[error("Invalid input: {0}")]
    Types(#[from] drcom_types::Error),
}

impl Error {
    /// Check if the error is a response mismatch (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PacketTooShort { .. }
                | Self::UnexpectedCode { .. }
                | Self::UnknownCode(_)
        )
    }
}
