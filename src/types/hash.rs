//! SHA-256 hashing helpers.
//!
//! Every hash in the wire format (entry hashes, block hashes, the
//! `previousHash` link) is a lowercase hex string of a SHA-256 digest.
//! Nothing here wraps the hash in a newtype: it's a plain string that
//! gets embedded directly in JSON payloads and in the block-hash
//! concatenation, so a `String` is the representation that actually
//! matches the wire.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// Returns `true` if `hash` begins with `difficulty` literal `'0'` hex
/// characters (nybbles, not bytes).
pub fn has_leading_zero_nybbles(hash: &str, difficulty: u32) -> bool {
    let want = difficulty as usize;
    if hash.len() < want {
        return false;
    }
    hash.as_bytes()[..want].iter().all(|&b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_is_deterministic_and_lowercase() {
        let a = sha256_hex(b"hello world");
        let b = sha256_hex(b"hello world");
        assert_eq!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn leading_zero_nybbles_boundary() {
        assert!(has_leading_zero_nybbles("00ab", 2));
        assert!(!has_leading_zero_nybbles("0fab", 2));
        assert!(has_leading_zero_nybbles("anything", 0));
    }
}
