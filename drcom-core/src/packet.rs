//! DrCOM packet building and response parsing

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tracing::trace;

use drcom_types::{Credentials, HostProfile};

use crate::{
    auth, checksum,
    code::Code,
    constants::{challenge, login},
    error::{Error, Result},
    session::{PackageTail, Salt, Session},
};

/// Logical type of an outgoing packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Challenge,
    Login,
    KeepAlive,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Challenge => "challenge",
            Self::Login => "login",
            Self::KeepAlive => "keep-alive",
        };
        f.write_str(name)
    }
}

/// Encoded DrCOM request
///
/// Every request has a fixed layout. Offsets are load-bearing: the gateway
/// silently drops anything that does not match byte for byte.
///
/// # Challenge (20 bytes)
///
/// ```text
/// ┌──────┬──────┬───────────┬──────┬────────────┐
/// │ 0x01 │ 0x02 │ seed (LE) │ 0x09 │ 15 × 0x00  │
/// │  1   │  1   │     2     │  1   │     15     │
/// └──────┴──────┴───────────┴──────┴────────────┘
/// ```
///
/// # Login (330 bytes)
///
/// ```text
///   0  03 01 00 len        len = username length + 20
///   4  md5_a               16
///  20  username            36, zero padded
///  56  control status      1
///  57  adapter count       1
///  58  md5_a[..6] ^ mac    6
///  64  md5_b               16
///  80  NIC count           1
///  81  host IP             4
///  85  reserved            12
///  97  md5(..96 ++ 14 00 07 0b)[..8]
/// 105  keep-IP flag        1
/// 106  reserved            4
/// 110  hostname            32
/// 142  primary DNS         4
/// 146  DHCP server         4
/// 150  secondary DNS       4
/// 154  reserved            8
/// 162  OS version block    20 (size 0x94, major, minor, build, platform; u32 LE)
/// 182  OS label            32
/// 214  reserved            96
/// 310  auth version        2
/// 312  adapter tag         2
/// 314  checksum(..313 ++ 01 26 07 11 00 00 ++ mac)
/// 318  reserved            2
/// 320  mac                 6
/// 326  auto logout, broadcast mode, c2 66
/// ```
///
/// # Keep-alive (42 bytes)
///
/// ```text
/// ┌──────┬───────┬──────────┬──────────────┬────────────┬──────────┐
/// │ 0xff │ md5_a │ 3 × 0x00 │ package tail │ time (BE)  │ 4 × 0x00 │
/// │  1   │  16   │    3     │      16      │     2      │    4     │
/// └──────┴───────┴──────────┴──────────────┴────────────┴──────────┘
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketKind,

    /// Wire bytes
    pub bytes: Bytes,
}

impl Packet {
    pub const CHALLENGE_LEN: usize = 20;

    pub const LOGIN_LEN: usize = 330;

    pub const KEEPALIVE_LEN: usize = 42;

    /// Width of the username field
    pub const USERNAME_FIELD: usize = 36;

    /// Width of the hostname and OS label fields
    pub const NAME_FIELD: usize = 32;

    /// Build a challenge request
    ///
    /// # Examples
    ///
    /// ```
    /// use drcom_core::Packet;
    ///
    /// let packet = Packet::challenge(0x1234);
    /// assert_eq!(&packet.bytes[..5], &[0x01, 0x02, 0x34, 0x12, 0x09]);
    /// assert_eq!(packet.len(), Packet::CHALLENGE_LEN);
    /// ```
    pub fn challenge(seed: u16) -> Self {
        let mut buf = BytesMut::with_capacity(Self::CHALLENGE_LEN);

        buf.put_u8(Code::Challenge.into());
        buf.put_u8(challenge::REQUEST_TAG);
        buf.put_u16_le(seed);
        buf.put_u8(challenge::VERSION);
        buf.put_bytes(0, 15);

        Self::finish(PacketKind::Challenge, buf)
    }

    /// Build a login request for the salt of the current challenge
    pub fn login(salt: &Salt, credentials: &Credentials, host: &HostProfile) -> Self {
        let password = credentials.password();
        let username = credentials.username().as_bytes();
        let mac = host.mac.octets();
        let md5_a = auth::md5_a(salt, password);

        let mut buf = BytesMut::with_capacity(Self::LOGIN_LEN);

        // Header; usernames are at most 32 bytes so the length fits a byte
        buf.put_u8(Code::Login.into());
        buf.put_u8(0x01);
        buf.put_u8(0x00);
        buf.put_u8((username.len() + 20) as u8);

        buf.put_slice(&md5_a);
        put_padded(&mut buf, username, Self::USERNAME_FIELD);
        buf.put_u8(login::CONTROL_CHECK_STATUS);
        buf.put_u8(login::ADAPTER_NUM);
        buf.put_slice(&auth::obfuscate_mac(&md5_a, host.mac));
        buf.put_slice(&auth::md5_b(salt, password));

        buf.put_u8(login::NIC_COUNT);
        buf.put_slice(&host.ip.octets());
        buf.put_bytes(0, 12);

        let tag = auth::md5(&[&buf[..], &login::MD5_TAG_SUFFIX]);
        buf.put_slice(&tag[..8]);

        buf.put_u8(login::IPDOG);
        buf.put_bytes(0, 4);
        put_padded(&mut buf, host.hostname.as_bytes(), Self::NAME_FIELD);
        buf.put_slice(&host.primary_dns.octets());
        buf.put_slice(&host.dhcp_server.octets());
        buf.put_slice(&host.secondary_dns.octets());
        buf.put_bytes(0, 8);

        let os = host.os_version;
        buf.put_u32_le(login::OS_VERSION_INFO_SIZE);
        buf.put_u32_le(os.major);
        buf.put_u32_le(os.minor);
        buf.put_u32_le(os.build);
        buf.put_u32_le(os.platform_id);
        put_padded(&mut buf, host.os_label.as_bytes(), Self::NAME_FIELD);
        buf.put_bytes(0, 96);

        buf.put_slice(&login::AUTH_VERSION);
        buf.put_slice(&login::ADAPTER_TAG);

        let mut summed = Vec::with_capacity(buf.len() + login::CHECKSUM_TAG.len() + mac.len());
        summed.extend_from_slice(&buf);
        summed.extend_from_slice(&login::CHECKSUM_TAG);
        summed.extend_from_slice(&mac);
        buf.put_slice(&checksum::calculate(&summed));

        buf.put_bytes(0, 2);
        buf.put_slice(&mac);
        buf.put_u8(login::AUTO_LOGOUT);
        buf.put_u8(login::BROADCAST_MODE);
        buf.put_slice(&login::TRAILER);

        Self::finish(PacketKind::Login, buf)
    }

    /// Build a keep-alive from the session's salt and package tail
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidSessionState`] unless the session is
    /// `Authenticated` or `HeartbeatActive`, so a keep-alive can never be
    /// built before login completes or after teardown.
    pub fn keepalive(session: &Session, password: &[u8], unix_secs: u64) -> Result<Self> {
        let (salt, tail) = session.keepalive_tokens()?;

        let mut buf = BytesMut::with_capacity(Self::KEEPALIVE_LEN);

        buf.put_u8(Code::KeepAlive.into());
        buf.put_slice(&auth::md5_a(&salt, password));
        buf.put_bytes(0, 3);
        buf.put_slice(tail.as_bytes());
        buf.put_u16(keepalive_time(unix_secs));
        buf.put_bytes(0, 4);

        Ok(Self::finish(PacketKind::KeepAlive, buf))
    }

    /// Get total packet size
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn finish(kind: PacketKind, buf: BytesMut) -> Self {
        let packet = Self {
            kind,
            bytes: buf.freeze(),
        };
        trace!("Built {}", packet);
        packet
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .field("head", &hex::encode(&self.bytes[..self.bytes.len().min(8)]))
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet[{}](len={})", self.kind, self.bytes.len())
    }
}

/// Seed for a challenge request
///
/// `jitter` is a small random offset so probes are not predictable from
/// the clock alone.
pub fn challenge_seed(unix_secs: u64, jitter: u32) -> u16 {
    (unix_secs.wrapping_add(u64::from(jitter)) % 0xFFFF) as u16
}

/// Time field of a keep-alive
pub fn keepalive_time(unix_secs: u64) -> u16 {
    (unix_secs % 0xFFFF) as u16
}

/// Extract the salt from a challenge reply
///
/// # Errors
///
/// Any reply that is not a well-formed `0x02` acknowledgement fails with a
/// recoverable error; the caller treats it as "not yet" and retries.
pub fn parse_challenge_response(buf: &[u8]) -> Result<Salt> {
    const MIN_LEN: usize = 8;

    let Some(&lead) = buf.first() else {
        return Err(Error::PacketTooShort {
            expected: MIN_LEN,
            actual: 0,
        });
    };

    if lead != u8::from(Code::ChallengeAck) {
        return Err(Error::UnexpectedCode {
            expected: Code::ChallengeAck.into(),
            actual: lead,
        });
    }

    if buf.len() < MIN_LEN {
        return Err(Error::PacketTooShort {
            expected: MIN_LEN,
            actual: buf.len(),
        });
    }

    let mut salt = [0u8; Salt::LEN];
    salt.copy_from_slice(&buf[4..8]);

    Ok(Salt::new(salt))
}

/// Result of a login reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// `0x04`: the gateway issued a package tail
    Accepted(PackageTail),

    /// Any other leading byte
    Rejected { code: u8 },
}

/// Interpret a login reply
///
/// # Errors
///
/// Recoverable errors for an empty reply, an accepted reply too short to
/// carry the package tail, or a late `0x02` challenge acknowledgement.
pub fn parse_login_response(buf: &[u8]) -> Result<LoginOutcome> {
    const TAIL_START: usize = 23;
    const MIN_LEN: usize = TAIL_START + PackageTail::LEN;

    let Some(&lead) = buf.first() else {
        return Err(Error::PacketTooShort {
            expected: 1,
            actual: 0,
        });
    };

    if lead == u8::from(Code::ChallengeAck) {
        return Err(Error::UnexpectedCode {
            expected: Code::LoginAccepted.into(),
            actual: lead,
        });
    }

    if lead != u8::from(Code::LoginAccepted) {
        return Ok(LoginOutcome::Rejected { code: lead });
    }

    if buf.len() < MIN_LEN {
        return Err(Error::PacketTooShort {
            expected: MIN_LEN,
            actual: buf.len(),
        });
    }

    let mut tail = [0u8; PackageTail::LEN];
    tail.copy_from_slice(&buf[TAIL_START..MIN_LEN]);

    Ok(LoginOutcome::Accepted(PackageTail::new(tail)))
}

/// Append `data` truncated or zero-padded to exactly `width` bytes
fn put_padded(buf: &mut BytesMut, data: &[u8], width: usize) {
    let n = data.len().min(width);
    buf.put_slice(&data[..n]);
    buf.put_bytes(0, width - n);
}

#[cfg(test)]
mod tests {
    use super::*;
    use drcom_types::MacAddress;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::net::Ipv4Addr;

    fn salt() -> Salt {
        Salt::new([1, 2, 3, 4])
    }

    fn host() -> HostProfile {
        HostProfile::new(
            Ipv4Addr::new(10, 30, 22, 17),
            "LAPTOP-01",
            MacAddress::from(0x20689df3d066),
            "WINDOWS",
        )
    }

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials::new(username, password).unwrap()
    }

    fn authenticated_session() -> Session {
        let session = Session::new();
        session.begin_challenge().unwrap();
        session.set_salt(salt()).unwrap();
        session.authenticate(PackageTail::new([0xAB; 16])).unwrap();
        session
    }

    #[test]
    fn test_challenge_layout() {
        let packet = Packet::challenge(0xBEEF);

        assert_eq!(packet.kind, PacketKind::Challenge);
        assert_eq!(packet.len(), Packet::CHALLENGE_LEN);
        assert_eq!(&packet.bytes[..5], &[0x01, 0x02, 0xEF, 0xBE, 0x09]);
        assert!(packet.bytes[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_challenge_seed() {
        assert_eq!(challenge_seed(100, 15), 115);
        assert_eq!(challenge_seed(0xFFFF, 0), 0);
        assert_eq!(challenge_seed(0xFFFF + 20, 30), 50);
    }

    #[test]
    fn test_parse_challenge_response() {
        let mut reply = vec![0x02, 0x00, 0x00, 0x00, 0xDE, 0xAD, 0xBE, 0xEF];
        reply.extend_from_slice(&[0u8; 68]);

        let salt = parse_challenge_response(&reply).unwrap();
        assert_eq!(salt.as_bytes(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_parse_challenge_response_echoed_request() {
        // A reply shaped like our own request, with the ack code and salt in place
        let mut reply = Packet::challenge(0x1234).bytes.to_vec();
        reply[0] = 0x02;
        reply[4..8].copy_from_slice(&[9, 8, 7, 6]);

        assert_eq!(parse_challenge_response(&reply).unwrap(), Salt::new([9, 8, 7, 6]));
    }

    #[test]
    fn test_parse_challenge_response_wrong_code() {
        let reply = [0x05, 0, 0, 0, 1, 2, 3, 4];
        let err = parse_challenge_response(&reply).unwrap_err();

        assert!(matches!(err, Error::UnexpectedCode { actual: 0x05, .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_parse_challenge_response_too_short() {
        assert!(matches!(
            parse_challenge_response(&[0x02, 0, 0, 0, 1]),
            Err(Error::PacketTooShort { expected: 8, actual: 5 })
        ));
        assert!(parse_challenge_response(&[]).unwrap_err().is_recoverable());
    }

    #[test]
    fn test_login_layout() {
        let packet = Packet::login(&salt(), &creds("student01", "secret"), &host());
        let b = &packet.bytes;

        assert_eq!(packet.kind, PacketKind::Login);
        assert_eq!(b.len(), Packet::LOGIN_LEN);

        // Header
        assert_eq!(&b[..4], &[0x03, 0x01, 0x00, 9 + 20]);

        // md5_a
        assert_eq!(&b[4..20], &auth::md5_a(&salt(), b"secret"));

        // Username
        assert_eq!(&b[20..29], b"student01");
        assert!(b[29..56].iter().all(|&x| x == 0));

        assert_eq!(b[56], login::CONTROL_CHECK_STATUS);
        assert_eq!(b[57], login::ADAPTER_NUM);
        assert_eq!(hex::encode(&b[58..64]), "99c95e32440f");
        assert_eq!(&b[64..80], &auth::md5_b(&salt(), b"secret"));

        assert_eq!(b[80], login::NIC_COUNT);
        assert_eq!(&b[81..85], &[10, 30, 22, 17]);
        assert!(b[85..97].iter().all(|&x| x == 0));

        let tag = auth::md5(&[&b[..97], &login::MD5_TAG_SUFFIX]);
        assert_eq!(&b[97..105], &tag[..8]);

        assert_eq!(b[105], login::IPDOG);
        assert_eq!(&b[110..119], b"LAPTOP-01");
        assert_eq!(&b[142..146], &[114, 114, 114, 114]);
        assert_eq!(&b[146..150], &[10, 255, 0, 197]);
        assert_eq!(&b[150..154], &[8, 8, 8, 8]);

        assert_eq!(
            &b[162..182],
            &[
                0x94, 0, 0, 0, 0x05, 0, 0, 0, 0x01, 0, 0, 0, 0x28, 0x0a, 0, 0, 0x02, 0, 0, 0
            ]
        );
        assert_eq!(&b[182..189], b"WINDOWS");
        assert!(b[214..310].iter().all(|&x| x == 0));

        assert_eq!(&b[310..312], &login::AUTH_VERSION);
        assert_eq!(&b[312..314], &login::ADAPTER_TAG);

        let mac = [0x20, 0x68, 0x9d, 0xf3, 0xd0, 0x66];
        let mut summed = b[..314].to_vec();
        summed.extend_from_slice(&login::CHECKSUM_TAG);
        summed.extend_from_slice(&mac);
        assert_eq!(&b[314..318], &checksum::calculate(&summed));

        assert_eq!(&b[318..320], &[0, 0]);
        assert_eq!(&b[320..326], &mac);
        assert_eq!(&b[326..], &[0x00, 0x00, 0xc2, 0x66]);
    }

    #[test]
    fn test_login_truncates_long_names() {
        let host = HostProfile::new(
            Ipv4Addr::LOCALHOST,
            "h".repeat(40),
            MacAddress::from(1),
            "o".repeat(40),
        );
        let packet = Packet::login(&salt(), &creds("u", "p"), &host);

        assert_eq!(packet.len(), Packet::LOGIN_LEN);
        assert_eq!(&packet.bytes[110..142], "h".repeat(32).as_bytes());
        assert_eq!(&packet.bytes[182..214], "o".repeat(32).as_bytes());
    }

    #[test]
    fn test_login_length_byte_tracks_username() {
        let longest = "x".repeat(32);
        for name in ["a", "student01", longest.as_str()] {
            let packet = Packet::login(&salt(), &creds(name, "pw"), &host());
            assert_eq!(packet.bytes[3] as usize, name.len() + 20);
        }
    }

    proptest! {
        #[test]
        fn prop_login_length_ignores_password(
            password in proptest::collection::vec(any::<u8>(), 0..128),
        ) {
            let creds = Credentials::new("student01", password).unwrap();
            let packet = Packet::login(&salt(), &creds, &host());

            prop_assert_eq!(packet.len(), Packet::LOGIN_LEN);
        }
    }

    #[test]
    fn test_parse_login_accepted() {
        let mut reply = vec![0x04];
        reply.extend((1..23).map(|i| i as u8));
        reply.extend_from_slice(&[0x77; 16]);
        reply.extend_from_slice(&[0; 8]);

        assert_eq!(
            parse_login_response(&reply).unwrap(),
            LoginOutcome::Accepted(PackageTail::new([0x77; 16]))
        );
    }

    #[test]
    fn test_parse_login_rejected() {
        let reply = [0x09, 0, 0, 0, 0x03];
        assert_eq!(
            parse_login_response(&reply).unwrap(),
            LoginOutcome::Rejected { code: 0x09 }
        );

        assert_eq!(
            parse_login_response(&[0x05]).unwrap(),
            LoginOutcome::Rejected { code: 0x05 }
        );
    }

    #[test]
    fn test_parse_login_accepted_too_short() {
        let reply = [0x04; 30];
        let err = parse_login_response(&reply).unwrap_err();

        assert!(matches!(err, Error::PacketTooShort { expected: 39, actual: 30 }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_parse_login_stale_challenge_ack() {
        let err = parse_login_response(&[0x02, 0, 0, 0, 1, 2, 3, 4]).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_keepalive_layout() {
        let session = authenticated_session();
        let packet = Packet::keepalive(&session, b"secret", 0x1_0000 + 0x0102).unwrap();
        let b = &packet.bytes;

        assert_eq!(packet.kind, PacketKind::KeepAlive);
        assert_eq!(b.len(), Packet::KEEPALIVE_LEN);
        assert_eq!(b[0], 0xff);
        assert_eq!(&b[1..17], &auth::md5_a(&salt(), b"secret"));
        assert_eq!(&b[17..20], &[0, 0, 0]);
        assert_eq!(&b[20..36], &[0xAB; 16]);
        // (0x10102 % 0xFFFF) = 0x0103, big-endian
        assert_eq!(&b[36..38], &[0x01, 0x03]);
        assert_eq!(&b[38..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_keepalive_refused_before_login() {
        let session = Session::new();
        assert!(Packet::keepalive(&session, b"pw", 0).is_err());

        session.begin_challenge().unwrap();
        assert!(Packet::keepalive(&session, b"pw", 0).is_err());

        session.set_salt(salt()).unwrap();
        assert!(Packet::keepalive(&session, b"pw", 0).is_err());
    }

    #[test]
    fn test_keepalive_refused_after_disconnect() {
        let session = authenticated_session();
        session.start_heartbeat().unwrap();
        assert!(Packet::keepalive(&session, b"pw", 0).is_ok());

        session.close();
        assert!(matches!(
            Packet::keepalive(&session, b"pw", 0),
            Err(Error::InvalidSessionState(_))
        ));
    }
}
