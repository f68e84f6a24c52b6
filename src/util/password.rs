//! Salted password hashing and session tokens.
//!
//! Stored form is `hex(salt):hex(sha256(salt || password))` with a random
//! 16-byte salt. Verification compares digests in constant time.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SALT_LEN: usize = 16;

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// Hash a raw password with a fresh random salt.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LEN] = rand::random();
    format!("{}:{}", hex::encode(salt), hex::encode(digest(&salt, password)))
}

/// Check a raw password against a stored hash.
///
/// Malformed stored values never verify.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once(':') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        return false;
    };
    digest(&salt, password).ct_eq(&expected).into()
}

/// 32 random bytes, hex encoded.
#[must_use]
pub fn generate_session_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
    }

    #[test]
    fn salts_differ() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn stored_format() {
        let stored = hash_password("pw12");
        let (salt, hash) = stored.split_once(':').unwrap();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn malformed_stored_values_fail() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "nocolon"));
        assert!(!verify_password("pw", "zz:zz"));
        assert!(!verify_password("pw", "abc:def"));
        // Right shape, wrong digest length.
        assert!(!verify_password("pw", "00112233:abcd"));
    }

    #[test]
    fn verifies_uppercase_hex() {
        let stored = hash_password("pw1234").to_uppercase();
        assert!(verify_password("pw1234", &stored));
    }

    #[test]
    fn session_tokens_are_unique_hex() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
