//! Utility functions shared across modules.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `input`.
pub fn sha256_hex(input: impl AsRef<[u8]>) -> String {
    format!("{:x}", Sha256::digest(input.as_ref()))
}

/// First six hex characters of the SHA-256 digest of `input`.
///
/// Used to build collision-resistant but readable file names and activity ids.
///
/// # Examples
///
/// ```
/// use ridesync_core::utils::short_hash;
///
/// assert_eq!(short_hash("archive.zip").len(), 6);
/// assert_eq!(short_hash("archive.zip"), short_hash("archive.zip"));
/// ```
pub fn short_hash(input: &str) -> String {
    let mut digest = sha256_hex(input);
    digest.truncate(6);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("abc"), "ba7816");
        assert_ne!(short_hash("a.zip"), short_hash("b.zip"));
    }
}
