//! Key pairs and signatures
//!
//! Key material is supplied by the caller for each operation and never
//! persisted here. secp256k1 keys can be generated or imported from the
//! Lotus key-info formats; BLS keys must come with their address.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::core::address::Address;
use crate::core::json;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),
    #[error("Invalid key info: {0}")]
    InvalidKeyInfo(String),
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// Signature scheme of a key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SigType {
    Secp256k1 = 1,
    Bls = 2,
}

impl SigType {
    /// Name used in Lotus key-info documents
    pub fn key_info_name(self) -> &'static str {
        match self {
            SigType::Secp256k1 => "secp256k1",
            SigType::Bls => "bls",
        }
    }
}

impl Serialize for SigType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for SigType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            1 => Ok(SigType::Secp256k1),
            2 => Ok(SigType::Bls),
            other => Err(de::Error::custom(format!("unknown signature type {}", other))),
        }
    }
}

/// A signature as carried by a signed message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(rename = "Type")]
    pub sig_type: SigType,
    #[serde(rename = "Data", with = "json::base64_bytes")]
    pub data: Vec<u8>,
}

/// Lotus key-info document
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KeyInfo {
    #[serde(rename = "Type")]
    key_type: String,
    private_key: String,
}

/// An address together with the private key that controls it
#[derive(Clone)]
pub struct KeyPair {
    pub address: Address,
    pub sig_type: SigType,
    private_key: Vec<u8>,
}

impl KeyPair {
    /// Wrap externally derived key material
    pub fn new(address: Address, sig_type: SigType, private_key: Vec<u8>) -> Self {
        Self {
            address,
            sig_type,
            private_key,
        }
    }

    /// Generate a new random secp256k1 key pair
    pub fn generate_secp256k1() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            address: Address::new_secp256k1(&public_key.serialize_uncompressed()),
            sig_type: SigType::Secp256k1,
            private_key: secret_key.secret_bytes().to_vec(),
        }
    }

    /// Create a secp256k1 key pair from a raw 32-byte private key
    pub fn from_secp256k1_private_key(bytes: &[u8]) -> Result<Self, KeyError> {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self {
            address: Address::new_secp256k1(&public_key.serialize_uncompressed()),
            sig_type: SigType::Secp256k1,
            private_key: secret_key.secret_bytes().to_vec(),
        })
    }

    /// Create a key pair from a hex-encoded raw secp256k1 private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| KeyError::InvalidPrivateKey)?;
        Self::from_secp256k1_private_key(&bytes)
    }

    /// Import a Lotus `json-lotus` key-info document
    pub fn from_lotus_json(document: &str) -> Result<Self, KeyError> {
        let info: KeyInfo = serde_json::from_str(document.trim())
            .map_err(|e| KeyError::InvalidKeyInfo(e.to_string()))?;
        match info.key_type.as_str() {
            "secp256k1" => {
                let bytes = STANDARD
                    .decode(&info.private_key)
                    .map_err(|e| KeyError::InvalidKeyInfo(e.to_string()))?;
                Self::from_secp256k1_private_key(&bytes)
            }
            other => Err(KeyError::UnsupportedKeyType(other.to_string())),
        }
    }

    /// Import a Lotus `hex-lotus` export (hex of the key-info document)
    pub fn from_lotus_hex(export: &str) -> Result<Self, KeyError> {
        let document = hex::decode(export.trim())
            .map_err(|e| KeyError::InvalidKeyInfo(e.to_string()))?;
        let document =
            String::from_utf8(document).map_err(|e| KeyError::InvalidKeyInfo(e.to_string()))?;
        Self::from_lotus_json(&document)
    }

    /// Export in the Lotus `hex-lotus` format
    pub fn to_lotus_hex(&self) -> Result<String, KeyError> {
        let info = KeyInfo {
            key_type: self.sig_type.key_info_name().to_string(),
            private_key: STANDARD.encode(&self.private_key),
        };
        let document =
            serde_json::to_vec(&info).map_err(|e| KeyError::InvalidKeyInfo(e.to_string()))?;
        Ok(hex::encode(document))
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .field("sig_type", &self.sig_type)
            .finish_non_exhaustive()
    }
}
