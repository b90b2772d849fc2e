//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

/// Why the gateway did not accept the login
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("gateway rejected login with code 0x{code:02x}")]
    Rejected { code: u8 },

    #[error("no login reply after {attempts} attempts")]
    NoResponse { attempts: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Protocol error: {0}")]
    Protocol(#[from] drcom_core::Error),
    
    #[error("Transport error: {0}")]
    Transport(#[from] drcom_transport::Error),
    
    #[error("Invalid input: {0}")]
    Types(#[from] drcom_types::Error),
    
    #[error("No challenge reply after {attempts} attempts")]
    Timeout { attempts: usize },
    
    #[error("Authentication failed: {0}")]
    Auth(AuthFailure),
}

impl Error {
    /// Check if the gateway explicitly refused the credentials
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if the handshake ran out of attempts waiting for a reply
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<AuthFailure> for Error {
    fn from(failure: AuthFailure) -> Self {
        Self::Auth(failure)
    }
}
