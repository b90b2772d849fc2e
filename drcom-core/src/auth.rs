//! DrCOM credential digests
//!
//! Every proof the client sends is a plain MD5 over tag bytes, the
//! challenge salt and the password. None of these functions keep state;
//! the same inputs always produce the same bytes.

use md5::{Digest, Md5};

use drcom_types::MacAddress;

use crate::session::Salt;

/// MD5 digest length
pub const DIGEST_LEN: usize = 16;

/// 16-byte MD5 output
pub type Md5Digest = [u8; DIGEST_LEN];

/// MD5 over the concatenation of `parts`
pub fn md5(parts: &[&[u8]]) -> Md5Digest {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }

    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Primary password proof bound to the challenge
///
/// `MD5(0x03 0x01 ++ salt ++ password)`
///
/// # Examples
///
/// ```
/// use drcom_core::{auth, Salt};
///
/// let a = auth::md5_a(&Salt::new([1, 2, 3, 4]), b"secret");
/// assert_eq!(a.len(), 16);
/// ```
pub fn md5_a(salt: &Salt, password: &[u8]) -> Md5Digest {
    md5(&[&[0x03, 0x01], salt.as_bytes(), password])
}

/// Secondary password proof
///
/// `MD5(0x01 ++ password ++ salt ++ 0x00 0x00 0x00 0x00)`
pub fn md5_b(salt: &Salt, password: &[u8]) -> Md5Digest {
    md5(&[&[0x01], password, salt.as_bytes(), &[0x00; 4]])
}

/// Hide the MAC behind the first six bytes of `md5_a`
pub fn obfuscate_mac(md5_a: &Md5Digest, mac: MacAddress) -> [u8; 6] {
    let octets = mac.octets();
    let mut out = [0u8; 6];

    for (i, byte) in out.iter_mut().enumerate() {
        *byte = md5_a[i] ^ octets[i];
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn salt() -> Salt {
        Salt::new([1, 2, 3, 4])
    }

    #[test]
    fn test_md5_a_known_value() {
        assert_eq!(
            hex::encode(md5_a(&salt(), b"secret")),
            "b9a1c3c19469957bb6eefda62417688d"
        );
    }

    #[test]
    fn test_md5_b_known_value() {
        assert_eq!(
            hex::encode(md5_b(&salt(), b"secret")),
            "7b52c760145f1436c215bd1fc230743b"
        );
    }

    #[test]
    fn test_obfuscate_mac_known_value() {
        let a = md5_a(&salt(), b"secret");
        let hidden = obfuscate_mac(&a, MacAddress::from(0x20689df3d066));

        assert_eq!(hex::encode(hidden), "99c95e32440f");
    }

    #[test]
    fn test_obfuscate_mac_is_reversible() {
        let a = md5_a(&salt(), b"secret");
        let mac = MacAddress::new([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        let hidden = obfuscate_mac(&a, mac);

        let recovered: Vec<u8> = hidden.iter().zip(a.iter()).map(|(h, k)| h ^ k).collect();
        assert_eq!(recovered, mac.octets().to_vec());
    }

    #[test]
    fn test_digests_depend_on_salt() {
        let other = Salt::new([4, 3, 2, 1]);

        assert_ne!(md5_a(&salt(), b"pw"), md5_a(&other, b"pw"));
        assert_ne!(md5_b(&salt(), b"pw"), md5_b(&other, b"pw"));
    }

    #[test]
    fn test_md5_concatenation() {
        assert_eq!(md5(&[b"ab", b"c"]), md5(&[b"abc"]));
    }
}
