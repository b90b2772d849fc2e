//! DrCOM packet type codes

use std::fmt;

use crate::error::{Error, Result};

/// Leading byte of every DrCOM datagram
///
/// Requests and responses share one code space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Code {
    // Client requests
    Challenge = 0x01,
    Login = 0x03,
    KeepAlive = 0xff,

    // Server responses
    ChallengeAck = 0x02,
    LoginAccepted = 0x04,
    KeepAliveAck = 0x07,
    Message = 0x4d,
}

impl Code {
    /// Get code name
    pub fn name(self) -> &'static str {
        match self {
            Self::Challenge => "CHALLENGE",
            Self::Login => "LOGIN",
            Self::KeepAlive => "KEEP_ALIVE",
            Self::ChallengeAck => "CHALLENGE_ACK",
            Self::LoginAccepted => "LOGIN_ACCEPTED",
            Self::KeepAliveAck => "KEEP_ALIVE_ACK",
            Self::Message => "MESSAGE",
        }
    }
}

impl From<Code> for u8 {
    fn from(code: Code) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Code {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Challenge),
            0x03 => Ok(Self::Login),
            0xff => Ok(Self::KeepAlive),
            0x02 => Ok(Self::ChallengeAck),
            0x04 => Ok(Self::LoginAccepted),
            0x07 => Ok(Self::KeepAliveAck),
            0x4d => Ok(Self::Message),
            _ => Err(Error::UnknownCode(value)),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02x})", self.name(), *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_conversion() {
        assert_eq!(u8::from(Code::Challenge), 0x01);
        assert_eq!(Code::try_from(0x04).unwrap(), Code::LoginAccepted);
        assert_eq!(Code::try_from(0xff).unwrap(), Code::KeepAlive);
        assert_eq!(Code::try_from(0x07).unwrap(), Code::KeepAliveAck);
        assert_eq!(Code::try_from(0x4d).unwrap(), Code::Message);
    }

    #[test]
    fn test_unknown_code() {
        assert!(matches!(Code::try_from(0x09), Err(Error::UnknownCode(0x09))));
        assert!(matches!(Code::try_from(0x05), Err(Error::UnknownCode(0x05))));
    }

    #[test]
    fn test_code_display() {
        assert_eq!(Code::LoginAccepted.to_string(), "LOGIN_ACCEPTED(0x04)");
    }
}
