//! HMAC-SHA256 signing and verification for webhooks and storage URLs.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keyed(key: &[u8], message: &[u8]) -> HmacSha256 {
    #[allow(clippy::expect_used)] // hmac takes keys of any length, it doesn't panic
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(message);
    mac
}

/// Computes `HMAC-SHA256(key, message)`.
#[must_use]
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    keyed(key, message).finalize().into_bytes().into()
}

/// Lowercase hex of `HMAC-SHA256(key, message)`.
#[must_use]
pub fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> String {
    hex::encode(hmac_sha256(key, message))
}

/// Checks a hex signature against `HMAC-SHA256(key, message)` in constant time.
///
/// Malformed hex never matches.
#[must_use]
pub fn verify_hmac_sha256_hex(key: &[u8], message: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    keyed(key, message).verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4231 test case 2
    #[test]
    fn test_rfc4231_short_key() {
        assert_eq!(
            hmac_sha256_hex(b"Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    // RFC 4231 test case 6: key longer than the block size
    #[test]
    fn test_rfc4231_long_key() {
        let key = [0xaa_u8; 131];
        assert_eq!(
            hmac_sha256_hex(&key, b"Test Using Larger Than Block-Size Key - Hash Key First"),
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
        );
    }

    #[test]
    fn test_verify_hmac_sha256_hex() {
        let good = hmac_sha256_hex(b"key", b"message");
        assert!(verify_hmac_sha256_hex(b"key", b"message", &good));
        assert!(!verify_hmac_sha256_hex(b"key", b"other", &good));
        assert!(!verify_hmac_sha256_hex(b"other", b"message", &good));
        assert!(!verify_hmac_sha256_hex(b"key", b"message", &good[..10]));
        assert!(!verify_hmac_sha256_hex(b"key", b"message", "not hex"));
        assert!(!verify_hmac_sha256_hex(b"key", b"message", ""));
    }
}
