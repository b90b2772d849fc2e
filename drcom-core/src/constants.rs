//! Protocol constants

/// Per-attempt wait for a challenge or login reply (seconds)
pub const DEFAULT_TIMEOUT: u64 = 3;

/// Maximum attempts for each handshake phase
pub const MAX_RETRIES: usize = 5;

/// Delay between login attempts (seconds)
pub const LOGIN_RETRY_DELAY: u64 = 1;

/// Keep-alive period (seconds)
pub const HEARTBEAT_INTERVAL: u64 = 20;

/// Pause after a failed keep-alive before trying again (seconds)
pub const HEARTBEAT_BACKOFF: u64 = 5;

/// Fixed bytes of the login packet
pub mod login {
    /// Control check status
    pub const CONTROL_CHECK_STATUS: u8 = 0x20;

    /// Adapter count
    pub const ADAPTER_NUM: u8 = 0x03;

    /// Number of NICs reported
    pub const NIC_COUNT: u8 = 0x01;

    /// "Keep IP" flag
    pub const IPDOG: u8 = 0x01;

    /// Appended before hashing the 8-byte integrity tag
    pub const MD5_TAG_SUFFIX: [u8; 4] = [0x14, 0x00, 0x07, 0x0b];

    /// Size of the Windows OSVERSIONINFO header that precedes the version fields
    pub const OS_VERSION_INFO_SIZE: u32 = 0x94;

    /// Auth version
    pub const AUTH_VERSION: [u8; 2] = [0x22, 0x00];

    /// Adapter tag
    pub const ADAPTER_TAG: [u8; 2] = [0x02, 0x0c];

    /// Appended (followed by the MAC) before computing the checksum
    pub const CHECKSUM_TAG: [u8; 6] = [0x01, 0x26, 0x07, 0x11, 0x00, 0x00];

    pub const AUTO_LOGOUT: u8 = 0x00;

    pub const BROADCAST_MODE: u8 = 0x00;

    /// Last two bytes of every login packet
    pub const TRAILER: [u8; 2] = [0xc2, 0x66];
}

/// Challenge request fields
pub mod challenge {
    /// Second byte of the request
    pub const REQUEST_TAG: u8 = 0x02;

    /// Byte following the seed
    pub const VERSION: u8 = 0x09;

    /// Lower bound of the random seed offset (inclusive)
    pub const JITTER_MIN: u32 = 0x0F;

    /// Upper bound of the random seed offset (exclusive)
    pub const JITTER_MAX: u32 = 0xFF;
}
