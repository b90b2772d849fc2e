//! Host description sent in the login packet

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Octets in transmission order
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<u64> for MacAddress {
    /// Take the low 48 bits, most significant octet first
    fn from(value: u64) -> Self {
        let be = value.to_be_bytes();
        Self([be[2], be[3], be[4], be[5], be[6], be[7]])
    }
}

impl From<MacAddress> for u64 {
    fn from(mac: MacAddress) -> Self {
        let o = mac.0;
        u64::from_be_bytes([0, 0, o[0], o[1], o[2], o[3], o[4], o[5]])
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` or twelve bare hex digits
    fn from_str(s: &str) -> Result<Self> {
        let digits: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();

        if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Parse(format!("invalid MAC address: {}", s)));
        }

        let value = u64::from_str_radix(&digits, 16)
            .map_err(|e| Error::Parse(format!("invalid MAC address {}: {}", s, e)))?;

        Ok(Self::from(value))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// Windows-style OS version block reported to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub platform_id: u32,
}

impl Default for OsVersion {
    /// Windows XP SP2, the value stock clients report
    fn default() -> Self {
        Self {
            major: 5,
            minor: 1,
            build: 2600,
            platform_id: 2,
        }
    }
}

/// Host information presented during login
///
/// Built once by whatever detects the local interface and then handed to
/// the client unchanged for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProfile {
    /// IPv4 address of the authenticating interface
    pub ip: Ipv4Addr,

    /// Host name (truncated to 32 bytes on the wire)
    pub hostname: String,

    /// Hardware address of the authenticating interface
    pub mac: MacAddress,

    /// OS label such as `WINDOWS` or `LINUX` (truncated to 32 bytes)
    pub os_label: String,

    pub os_version: OsVersion,

    pub primary_dns: Ipv4Addr,

    pub secondary_dns: Ipv4Addr,

    pub dhcp_server: Ipv4Addr,
}

impl HostProfile {
    pub const DEFAULT_PRIMARY_DNS: Ipv4Addr = Ipv4Addr::new(114, 114, 114, 114);
    pub const DEFAULT_SECONDARY_DNS: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);
    pub const DEFAULT_DHCP_SERVER: Ipv4Addr = Ipv4Addr::new(10, 255, 0, 197);

    /// Create a profile with default DNS, DHCP and OS version fields
    pub fn new(
        ip: Ipv4Addr,
        hostname: impl Into<String>,
        mac: MacAddress,
        os_label: impl Into<String>,
    ) -> Self {
        Self {
            ip,
            hostname: hostname.into(),
            mac,
            os_label: os_label.into(),
            os_version: OsVersion::default(),
            primary_dns: Self::DEFAULT_PRIMARY_DNS,
            secondary_dns: Self::DEFAULT_SECONDARY_DNS,
            dhcp_server: Self::DEFAULT_DHCP_SERVER,
        }
    }

    /// Set primary and secondary DNS servers
    pub fn with_dns(mut self, primary: Ipv4Addr, secondary: Ipv4Addr) -> Self {
        self.primary_dns = primary;
        self.secondary_dns = secondary;
        self
    }

    /// Set DHCP server
    pub fn with_dhcp_server(mut self, dhcp_server: Ipv4Addr) -> Self {
        self.dhcp_server = dhcp_server;
        self
    }

    /// Set reported OS version
    pub fn with_os_version(mut self, os_version: OsVersion) -> Self {
        self.os_version = os_version;
        self
    }
}

impl fmt::Display for HostProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Host[{} ip={} mac={} os={}]",
            self.hostname, self.ip, self.mac, self.os_label
        )
    }
}
