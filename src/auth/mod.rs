//! Authentication and URL signing
//!
//! - bearer session tokens (HMAC-SHA256, dual-secret rotation)
//! - short-lived signed stream URLs
//! - credential checks against stored argon2 hashes

pub mod capability;
pub mod password;
pub mod tokens;

/// Compare two byte strings without an early exit.
///
/// Unequal lengths return false right away; the length of a valid
/// signature is not a secret.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
