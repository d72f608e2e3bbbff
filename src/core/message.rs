//! Messages, their content hashes and on-chain lookups
//!
//! A `Message` is the unsigned transaction record. Its canonical encoding is
//! a DAG-CBOR tuple; the content hash of that encoding is what gets signed and
//! what the node uses to refer to the message once pushed.

use cid::multihash::Multihash;
use cid::Cid;
use fvm_ipld_encoding::BytesSer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::address::Address;
use super::json;
use super::token::TokenAmount;
use crate::crypto::hash::blake2b_256;
use crate::crypto::keys::Signature;

/// Actor method number
pub type MethodNum = u64;

/// Plain value transfer
pub const METHOD_SEND: MethodNum = 0;
/// Actor constructor
pub const METHOD_CONSTRUCTOR: MethodNum = 1;

/// Multicodec for DAG-CBOR
pub const DAG_CBOR: u64 = 0x71;
/// Multihash code for blake2b-256
pub const BLAKE2B_256: u64 = 0xb220;

/// Errors from canonical encoding
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("CBOR encoding failed: {0}")]
    Cbor(#[from] fvm_ipld_encoding::Error),
    #[error("Multihash error: {0}")]
    Multihash(String),
}

/// Content identifier of DAG-CBOR data hashed with blake2b-256
pub fn dag_cbor_cid(data: &[u8]) -> Result<Cid, EncodingError> {
    let digest = blake2b_256(data);
    let hash = Multihash::<64>::wrap(BLAKE2B_256, &digest)
        .map_err(|e| EncodingError::Multihash(e.to_string()))?;
    Ok(Cid::new_v1(DAG_CBOR, hash))
}

/// An unsigned message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(default)]
    pub version: u64,
    pub to: Address,
    pub from: Address,
    #[serde(rename = "Nonce")]
    pub sequence: u64,
    pub value: TokenAmount,
    pub gas_limit: i64,
    pub gas_fee_cap: TokenAmount,
    pub gas_premium: TokenAmount,
    pub method: MethodNum,
    #[serde(with = "json::base64_bytes", default)]
    pub params: Vec<u8>,
}

impl Message {
    /// True when any pricing field is still unset
    pub fn needs_gas_estimate(&self) -> bool {
        self.gas_limit == 0 || self.gas_fee_cap.is_zero() || self.gas_premium.is_zero()
    }

    /// Canonical DAG-CBOR encoding
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        let tuple = (
            self.version,
            &self.to,
            &self.from,
            self.sequence,
            &self.value,
            self.gas_limit,
            &self.gas_fee_cap,
            &self.gas_premium,
            self.method,
            BytesSer(&self.params),
        );
        Ok(fvm_ipld_encoding::to_vec(&tuple)?)
    }

    /// Content hash of the canonical encoding
    pub fn cid(&self) -> Result<Cid, EncodingError> {
        dag_cbor_cid(&self.canonical_bytes()?)
    }

    /// Bytes handed to the signer: the binary form of the content hash
    pub fn signing_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(self.cid()?.to_bytes())
    }
}

/// A message together with the signature over its content hash
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedMessage {
    pub message: Message,
    pub signature: Signature,
}

/// Reference to a pushed message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef(#[serde(with = "json::cid_link")] pub Cid);

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageRef {
    type Err = cid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Cid::try_from(s.trim())?))
    }
}

/// Execution receipt of an included message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Receipt {
    pub exit_code: i64,
    #[serde(rename = "Return", with = "json::base64_bytes", default)]
    pub return_data: Vec<u8>,
    #[serde(default)]
    pub gas_used: i64,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Terminal observation of a message on chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MsgLookup {
    pub message: MessageRef,
    pub receipt: Receipt,
    pub height: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            version: 0,
            to: Address::new_id(1001),
            from: Address::new_secp256k1(&[4u8; 65]),
            sequence: 7,
            value: TokenAmount::from_whole(10),
            gas_limit: 5000,
            gas_fee_cap: TokenAmount::from(100_000),
            gas_premium: TokenAmount::from(1_000),
            method: METHOD_SEND,
            params: Vec::new(),
        }
    }

    #[test]
    fn test_canonical_encoding_is_deterministic() {
        let a = sample_message();
        let b = sample_message();
        assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
        assert_eq!(a.cid().unwrap(), b.cid().unwrap());
        // ten element CBOR array
        assert_eq!(a.canonical_bytes().unwrap()[0], 0x8a);
    }

    #[test]
    fn test_every_field_changes_the_hash() {
        let base = sample_message().cid().unwrap();
        let variants: Vec<Box<dyn Fn(&mut Message)>> = vec![
            Box::new(|m| m.to = Address::new_id(1002)),
            Box::new(|m| m.from = Address::new_id(5)),
            Box::new(|m| m.sequence += 1),
            Box::new(|m| m.value = TokenAmount::from_whole(11)),
            Box::new(|m| m.gas_limit += 1),
            Box::new(|m| m.gas_fee_cap = TokenAmount::from(100_001)),
            Box::new(|m| m.gas_premium = TokenAmount::from(1_001)),
            Box::new(|m| m.method = 2),
            Box::new(|m| m.params = vec![0x80]),
        ];
        for mutate in variants {
            let mut msg = sample_message();
            mutate(&mut msg);
            assert_ne!(msg.cid().unwrap(), base);
        }
    }

    #[test]
    fn test_cid_prefix() {
        let cid = sample_message().cid().unwrap();
        assert_eq!(cid.codec(), DAG_CBOR);
        assert_eq!(cid.hash().code(), BLAKE2B_256);
        assert!(cid.to_string().starts_with("bafy2bzace"));
    }

    #[test]
    fn test_message_json_shape() {
        let value = serde_json::to_value(sample_message()).unwrap();
        assert_eq!(value["To"], "f01001");
        assert_eq!(value["Nonce"], 7);
        assert_eq!(value["Value"], "10000000000000000000");
        assert_eq!(value["GasLimit"], 5000);
        assert!(value["Params"].is_null());

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample_message());
    }

    #[test]
    fn test_msg_lookup_from_node_json() {
        let cid = dag_cbor_cid(b"lookup").unwrap();
        let raw = serde_json::json!({
            "Message": { "/": cid.to_string() },
            "Receipt": { "ExitCode": 0, "Return": "hAP0AEA=", "GasUsed": 1200 },
            "ReturnDec": null,
            "TipSet": [],
            "Height": 3100
        });
        let lookup: MsgLookup = serde_json::from_value(raw).unwrap();
        assert_eq!(lookup.message, MessageRef(cid));
        assert!(lookup.receipt.is_success());
        assert_eq!(lookup.receipt.return_data, vec![0x84, 0x03, 0xf4, 0x00, 0x40]);
        assert_eq!(lookup.height, 3100);
    }

    #[test]
    fn test_message_ref_parse() {
        let cid = dag_cbor_cid(b"ref").unwrap();
        let parsed: MessageRef = cid.to_string().parse().unwrap();
        assert_eq!(parsed.0, cid);
        assert!("not-a-cid".parse::<MessageRef>().is_err());
    }
}
