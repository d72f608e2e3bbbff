//! Blake2b hashing helpers
//!
//! Filecoin uses blake2b everywhere: 256-bit digests for message content
//! hashes and signing, 160-bit digests for key-derived address payloads.

use blake2::digest::consts::{U20, U32};
use blake2::{Blake2b, Digest};

/// Length of an address payload derived from a public key
pub const PAYLOAD_HASH_LEN: usize = 20;

/// Computes the blake2b-256 hash of the input data
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Computes the blake2b-160 hash used for secp256k1 and actor address payloads
pub fn blake2b_160(data: &[u8]) -> [u8; PAYLOAD_HASH_LEN] {
    let mut hasher = Blake2b::<U20>::new();
    hasher.update(data);
    let mut out = [0u8; PAYLOAD_HASH_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Computes blake2b-256 and returns it as a hex string
pub fn blake2b_256_hex(data: &[u8]) -> String {
    hex::encode(blake2b_256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake2b_256_empty() {
        assert_eq!(
            blake2b_256_hex(b""),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn test_digest_lengths() {
        assert_eq!(blake2b_256(b"abc").len(), 32);
        assert_eq!(blake2b_160(b"abc").len(), PAYLOAD_HASH_LEN);
    }
}
