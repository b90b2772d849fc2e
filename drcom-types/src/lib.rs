//! Type definitions for drcom

pub mod credentials;
pub mod error;
pub mod host;

pub use credentials::Credentials;
pub use error::{Error, Result};
pub use host::{HostProfile, MacAddress, OsVersion};
