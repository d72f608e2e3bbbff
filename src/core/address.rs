//! Filecoin addresses
//!
//! An address is either the short numeric ID form assigned by the init actor
//! or a robust form derived from a key or actor creation data. Two addresses
//! of different forms can name the same account, so exact comparisons must be
//! made after resolving robust addresses to their ID form.

use fvm_ipld_encoding::BytesDe;
use fvm_shared::address::{Address as FvmAddress, Payload};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::crypto::hash::{blake2b_160, PAYLOAD_HASH_LEN};

/// Network prefix used when formatting addresses
pub const MAINNET_PREFIX: char = 'f';
/// Network prefix accepted for test networks
pub const TESTNET_PREFIX: char = 't';
/// Length of a BLS public key payload
pub const BLS_PUBLIC_KEY_LEN: usize = 48;

/// Errors that can occur while parsing or building addresses
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,
    #[error("Unknown network prefix '{0}'")]
    UnknownNetwork(char),
    #[error("Unsupported address protocol {0}")]
    UnsupportedProtocol(u8),
    #[error("Invalid ID address: {0}")]
    InvalidId(String),
    #[error("Invalid payload length {len} for protocol {protocol}")]
    InvalidLength { protocol: u8, len: usize },
    /// Bad base32 text, checksum or payload
    #[error("Invalid address: {0}")]
    Invalid(String),
}

/// Protocol of a robust (non-ID) address
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Secp256k1 = 1,
    Actor = 2,
    Bls = 3,
}

impl Protocol {
    fn from_byte(byte: u8) -> Result<Self, AddressError> {
        match byte {
            1 => Ok(Protocol::Secp256k1),
            2 => Ok(Protocol::Actor),
            3 => Ok(Protocol::Bls),
            other => Err(AddressError::UnsupportedProtocol(other)),
        }
    }

    fn payload_len(self) -> usize {
        match self {
            Protocol::Secp256k1 | Protocol::Actor => PAYLOAD_HASH_LEN,
            Protocol::Bls => BLS_PUBLIC_KEY_LEN,
        }
    }
}

/// An account or actor address
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// Short numeric form, `f0<id>`
    Id(u64),
    /// Long cryptographic form, `f1`/`f2`/`f3`
    Robust { protocol: Protocol, payload: Vec<u8> },
}

/// Returns true when the address must be looked up on chain before it can be
/// compared byte-for-byte with an ID address
pub fn needs_resolution(addr: &Address) -> bool {
    matches!(addr, Address::Robust { .. })
}

impl Address {
    /// Create an ID address
    pub fn new_id(id: u64) -> Self {
        Address::Id(id)
    }

    /// Create a secp256k1 address from an uncompressed public key
    pub fn new_secp256k1(public_key: &[u8]) -> Self {
        Address::Robust {
            protocol: Protocol::Secp256k1,
            payload: blake2b_160(public_key).to_vec(),
        }
    }

    /// Create an actor address from the actor's creation data
    pub fn new_actor(data: &[u8]) -> Self {
        Address::Robust {
            protocol: Protocol::Actor,
            payload: blake2b_160(data).to_vec(),
        }
    }

    /// Create a BLS address from a public key
    pub fn new_bls(public_key: &[u8]) -> Result<Self, AddressError> {
        Self::robust(Protocol::Bls, public_key.to_vec())
    }

    /// Create a robust address from a raw payload, validating its length
    pub fn robust(protocol: Protocol, payload: Vec<u8>) -> Result<Self, AddressError> {
        if payload.len() != protocol.payload_len() {
            return Err(AddressError::InvalidLength {
                protocol: protocol as u8,
                len: payload.len(),
            });
        }
        Ok(Address::Robust { protocol, payload })
    }

    /// The protocol byte: 0 for ID addresses
    pub fn protocol_byte(&self) -> u8 {
        match self {
            Address::Id(_) => 0,
            Address::Robust { protocol, .. } => *protocol as u8,
        }
    }

    /// The actor id, if this is an ID address
    pub fn id(&self) -> Option<u64> {
        match self {
            Address::Id(id) => Some(*id),
            Address::Robust { .. } => None,
        }
    }

    pub fn is_id(&self) -> bool {
        !needs_resolution(self)
    }

    /// Binary form: protocol byte followed by the payload
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Address::Id(id) => FvmAddress::new_id(*id).to_bytes(),
            Address::Robust { protocol, payload } => {
                let mut out = Vec::with_capacity(payload.len() + 1);
                out.push(*protocol as u8);
                out.extend_from_slice(payload);
                out
            }
        }
    }

    /// Parse the binary form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let (&protocol, payload) = bytes.split_first().ok_or(AddressError::Empty)?;
        if protocol != 0 {
            // length errors keep their own variant
            Self::robust(Protocol::from_byte(protocol)?, payload.to_vec())?;
        }
        let address = FvmAddress::from_bytes(bytes).map_err(|e| match protocol {
            0 => AddressError::InvalidId(hex::encode(payload)),
            _ => AddressError::Invalid(e.to_string()),
        })?;
        Self::from_fvm(&address)
    }

    /// Convert to the shared actor-state address type
    pub fn to_fvm(&self) -> Result<FvmAddress, AddressError> {
        FvmAddress::from_bytes(&self.to_bytes())
            .map_err(|e| AddressError::Invalid(e.to_string()))
    }

    /// Convert from the shared actor-state address type
    pub fn from_fvm(address: &FvmAddress) -> Result<Self, AddressError> {
        match address.payload() {
            Payload::ID(id) => Ok(Address::Id(*id)),
            Payload::Secp256k1(hash) => Self::robust(Protocol::Secp256k1, hash.to_vec()),
            Payload::Actor(hash) => Self::robust(Protocol::Actor, hash.to_vec()),
            Payload::BLS(key) => Self::robust(Protocol::Bls, key.to_vec()),
            _ => Err(AddressError::UnsupportedProtocol(address.protocol() as u8)),
        }
    }

    /// Format with an explicit network prefix
    pub fn to_string_with_prefix(&self, prefix: char) -> String {
        match self {
            Address::Id(id) => format!("{}0{}", prefix, id),
            Address::Robust { protocol, payload } => match self.to_fvm() {
                // the checksum does not cover the network prefix
                Ok(address) => format!("{}{}", prefix, &address.to_string()[1..]),
                Err(_) => format!("{}{}{}", prefix, *protocol as u8, hex::encode(payload)),
            },
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with_prefix(MAINNET_PREFIX))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let network = chars.next().ok_or(AddressError::Empty)?;
        if network != MAINNET_PREFIX && network != TESTNET_PREFIX {
            return Err(AddressError::UnknownNetwork(network));
        }
        let protocol = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(|| AddressError::InvalidId(s.to_string()))? as u8;
        let rest = chars.as_str();

        if protocol == 0 {
            if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AddressError::InvalidId(s.to_string()));
            }
            let id = rest
                .parse::<u64>()
                .map_err(|_| AddressError::InvalidId(s.to_string()))?;
            return Ok(Address::Id(id));
        }

        Protocol::from_byte(protocol)?;
        let mainnet = format!("{}{}{}", MAINNET_PREFIX, protocol, rest);
        let address =
            FvmAddress::from_str(&mainnet).map_err(|e| AddressError::Invalid(e.to_string()))?;
        Self::from_fvm(&address)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(de::Error::custom)
        } else {
            let BytesDe(bytes) = BytesDe::deserialize(deserializer)?;
            Address::from_bytes(&bytes).map_err(de::Error::custom)
        }
    }
}
