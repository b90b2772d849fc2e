//! Account credentials

use std::fmt;

use crate::error::{Error, Result};

/// Username and password presented to the gateway
///
/// The username travels in a fixed-width field of the login packet and its
/// length is encoded in the packet header, so it is validated on construction.
/// The password is opaque bytes and is only ever fed into MD5.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: Vec<u8>,
}

impl Credentials {
    /// Longest accepted username
    pub const MAX_USERNAME_LEN: usize = 32;

    /// Create validated credentials
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the username is empty, longer than
    /// [`Self::MAX_USERNAME_LEN`] bytes, or contains anything other than
    /// printable ASCII.
    ///
    /// # Examples
    ///
    /// ```
    /// use drcom_types::Credentials;
    ///
    /// let creds = Credentials::new("542207150101", "hunter2").unwrap();
    /// assert_eq!(creds.username(), "542207150101");
    /// assert!(Credentials::new("", "x").is_err());
    /// ```
    pub fn new(username: impl Into<String>, password: impl Into<Vec<u8>>) -> Result<Self> {
        let username = username.into();

        if username.is_empty() {
            return Err(Error::Validation("username must not be empty".into()));
        }

        if username.len() > Self::MAX_USERNAME_LEN {
            return Err(Error::Validation(format!(
                "username is {} bytes (max: {})",
                username.len(),
                Self::MAX_USERNAME_LEN
            )));
        }

        if !username.bytes().all(|b| matches!(b, b' '..=b'~')) {
            return Err(Error::Validation("username must be printable ASCII".into()));
        }

        Ok(Self {
            username,
            password: password.into(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &[u8] {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
