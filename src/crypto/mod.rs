//! Cryptographic utilities
//!
//! This module provides:
//! - blake2b hashing for content hashes, and address payloads
//! - Key pairs and the Lotus key-info formats
//! - The `Signer` seam with a built-in secp256k1 implementation

pub mod hash;
pub mod keys;
pub mod signer;

pub use hash::{blake2b_160, blake2b_256, blake2b_256_hex};
pub use keys::{KeyError, KeyPair, SigType, Signature};
pub use signer::{Secp256k1Signer, Signer};
