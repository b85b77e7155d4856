//! # Hashing & Entropy Utilities
//!
//! The Meridian platform derives every content identifier through the same
//! double-SHA-256 construction, so this module is deliberately small: one
//! hash family, one entropy source, nothing clever.
//!
//! Double hashing (`SHA-256(SHA-256(data))`) protects against length
//! extension and keeps identifier derivation interoperable with the core
//! chain's transaction hashing, which uses the same construction.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::config::ENTROPY_LENGTH;

/// Compute the SHA-256 hash of the input data as a fixed-size array.
///
/// # Example
///
/// ```
/// use meridian_protocol::crypto::sha256;
///
/// let digest = sha256(b"meridian");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the double-SHA-256 hash: `SHA-256(SHA-256(data))`.
///
/// This is the identifier-derivation workhorse. Document ids and
/// asset-lock outpoint identifiers are both `double_sha256` digests of
/// their canonical byte encodings.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Feeds the parts sequentially into one hasher, then re-hashes the
/// digest. Same result as `double_sha256(concat(parts))`, no temporary
/// buffer.
pub fn double_sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let first = hasher.finalize();
    Sha256::digest(first).into()
}

/// Generate 32 bytes of high-quality entropy for document-id derivation.
///
/// Uses the OS CSPRNG via `rand::rngs::OsRng`. The entropy is embedded in
/// the create transition and committed to by the derived document id, so
/// it must be unpredictable — a counter or timestamp here would let anyone
/// front-run document ids.
pub fn generate_entropy() -> [u8; ENTROPY_LENGTH] {
    let mut entropy = [0u8; ENTROPY_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    entropy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256 of the empty string — the canonical test vector everyone
        // should have memorized by now.
        let digest = sha256(b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn double_sha256_is_sha256_of_sha256() {
        let single = sha256(b"meridian");
        let double = double_sha256(b"meridian");
        assert_ne!(single, double);
        assert_eq!(double, sha256(&single));
    }

    #[test]
    fn multi_matches_concatenation() {
        let concatenated = double_sha256(b"hello world");
        let parts = double_sha256_multi(&[b"hello", b" ", b"world"]);
        assert_eq!(parts, concatenated);
    }

    #[test]
    fn entropy_is_not_constant() {
        // Two draws colliding means the CSPRNG is broken (or we are).
        let a = generate_entropy();
        let b = generate_entropy();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }
}
