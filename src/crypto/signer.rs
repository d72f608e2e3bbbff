//! Signature schemes
//!
//! The `Signer` trait is the seam to whatever implements the signature
//! algorithms. `Secp256k1Signer` is the built-in implementation; BLS signing
//! is left to external implementations of the trait.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message as SecpMessage, Secp256k1, SecretKey};

use super::hash::blake2b_256;
use super::keys::{KeyError, SigType, Signature};
use crate::core::address::Address;

/// Length of a recoverable secp256k1 signature: r, s and the recovery id
pub const SECP_SIGNATURE_LEN: usize = 65;

/// Signs and verifies arbitrary payloads
pub trait Signer: Send + Sync {
    fn sign(&self, sig_type: SigType, private_key: &[u8], data: &[u8])
        -> Result<Signature, KeyError>;

    fn verify(&self, signature: &Signature, address: &Address, data: &[u8])
        -> Result<bool, KeyError>;
}

/// secp256k1 signatures over the blake2b-256 digest of the payload
pub struct Secp256k1Signer {
    secp: Secp256k1<All>,
}

impl Secp256k1Signer {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Default for Secp256k1Signer {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer for Secp256k1Signer {
    fn sign(
        &self,
        sig_type: SigType,
        private_key: &[u8],
        data: &[u8],
    ) -> Result<Signature, KeyError> {
        if sig_type != SigType::Secp256k1 {
            return Err(KeyError::UnsupportedKeyType(
                sig_type.key_info_name().to_string(),
            ));
        }
        let secret_key = SecretKey::from_slice(private_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let digest = SecpMessage::from_digest_slice(&blake2b_256(data))?;
        let (recovery_id, compact) = self
            .secp
            .sign_ecdsa_recoverable(&digest, &secret_key)
            .serialize_compact();

        let mut bytes = Vec::with_capacity(SECP_SIGNATURE_LEN);
        bytes.extend_from_slice(&compact);
        bytes.push(recovery_id.to_i32() as u8);
        Ok(Signature {
            sig_type,
            data: bytes,
        })
    }

    fn verify(
        &self,
        signature: &Signature,
        address: &Address,
        data: &[u8],
    ) -> Result<bool, KeyError> {
        if signature.sig_type != SigType::Secp256k1 {
            return Err(KeyError::UnsupportedKeyType(
                signature.sig_type.key_info_name().to_string(),
            ));
        }
        if signature.data.len() != SECP_SIGNATURE_LEN {
            return Err(KeyError::InvalidSignature);
        }
        let recovery_id = RecoveryId::from_i32(i32::from(signature.data[64]))?;
        let recoverable = RecoverableSignature::from_compact(&signature.data[..64], recovery_id)?;
        let digest = SecpMessage::from_digest_slice(&blake2b_256(data))?;
        let public_key = self.secp.recover_ecdsa(&digest, &recoverable)?;
        Ok(Address::new_secp256k1(&public_key.serialize_uncompressed()) == *address)
    }
}
