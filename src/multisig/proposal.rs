//! Proposal hashing
//!
//! A multisig approval or cancel names a pending transaction by id and, to
//! guard against a different transaction taking that id, by the hash of the
//! proposal it expects to find there.

use fvm_ipld_encoding::tuple::{serde_tuple, Deserialize_tuple, Serialize_tuple};
use fvm_ipld_encoding::to_vec;

use super::error::MultisigError;
use crate::core::json;
use crate::core::{Address, EncodingError, MethodNum, TokenAmount};
use crate::crypto::blake2b_256;
use crate::rpc::PendingTransaction;

/// The fields a proposal hash commits to
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ProposalHashData {
    /// ID address of the proposer
    pub requester: Address,
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    #[serde(with = "json::bytes")]
    pub params: Vec<u8>,
}

impl ProposalHashData {
    /// Create hash data; `requester` must already be resolved to an ID address
    pub fn new(
        requester: Address,
        to: Address,
        value: TokenAmount,
        method: MethodNum,
        params: Vec<u8>,
    ) -> Result<Self, MultisigError> {
        if !requester.is_id() {
            return Err(MultisigError::invalid(format!(
                "proposal requester {} is not an ID address",
                requester
            )));
        }
        Ok(Self {
            requester,
            to,
            value,
            method,
            params,
        })
    }

    /// Hash data of a transaction as the multisig actor stores it
    pub fn from_pending(txn: &PendingTransaction) -> Result<Self, MultisigError> {
        let requester = txn.approved.first().cloned().ok_or_else(|| {
            MultisigError::invalid(format!("pending transaction {} has no approvals", txn.id))
        })?;
        Self::new(
            requester,
            txn.to.clone(),
            txn.value.clone(),
            txn.method,
            txn.params.clone(),
        )
    }

    pub fn serialize(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(to_vec(self)?)
    }

    /// blake2b-256 of the canonical encoding
    pub fn hash(&self) -> Result<[u8; 32], EncodingError> {
        Ok(blake2b_256(&self.serialize()?))
    }

    /// Human-readable list of the fields that differ from `other`
    pub fn describe_differences(&self, other: &ProposalHashData) -> String {
        let mut diffs = Vec::new();
        if self.requester != other.requester {
            diffs.push(format!("proposer {} != {}", self.requester, other.requester));
        }
        if self.to != other.to {
            diffs.push(format!("to {} != {}", self.to, other.to));
        }
        if self.value != other.value {
            diffs.push(format!("value {} != {}", self.value, other.value));
        }
        if self.method != other.method {
            diffs.push(format!("method {} != {}", self.method, other.method));
        }
        if self.params != other.params {
            diffs.push(format!(
                "params {} != {}",
                hex::encode(&self.params),
                hex::encode(&other.params)
            ));
        }
        if diffs.is_empty() {
            "hashes differ".to_string()
        } else {
            diffs.join(", ")
        }
    }
}

/// What an approver or canceller believes a pending transaction does
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalDetails {
    pub proposer: Address,
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    pub params: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProposalHashData {
        ProposalHashData::new(
            Address::new_id(300),
            Address::new_id(200),
            TokenAmount::from_whole(10),
            0,
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_hash_is_independent_of_construction_order() {
        let literal = ProposalHashData {
            params: Vec::new(),
            method: 0,
            value: TokenAmount::from_whole(10),
            to: Address::new_id(200),
            requester: Address::new_id(300),
        };
        assert_eq!(literal.serialize().unwrap(), sample().serialize().unwrap());
        assert_eq!(literal.hash().unwrap(), sample().hash().unwrap());
    }

    #[test]
    fn test_layout_is_five_tuple() {
        let bytes = sample().serialize().unwrap();
        assert_eq!(bytes[0], 0x85);
    }

    #[test]
    fn test_every_field_changes_the_hash() {
        let base = sample().hash().unwrap();
        let mut variants = Vec::new();

        let mut v = sample();
        v.requester = Address::new_id(301);
        variants.push(v);
        let mut v = sample();
        v.to = Address::new_id(201);
        variants.push(v);
        let mut v = sample();
        v.value = TokenAmount::from_whole(11);
        variants.push(v);
        let mut v = sample();
        v.method = 2;
        variants.push(v);
        let mut v = sample();
        v.params = vec![0x80];
        variants.push(v);

        for v in variants {
            assert_ne!(v.hash().unwrap(), base);
        }
    }

    #[test]
    fn test_robust_requester_is_rejected() {
        let result = ProposalHashData::new(
            Address::new_actor(b"proposer"),
            Address::new_id(200),
            TokenAmount::zero(),
            0,
            Vec::new(),
        );
        assert!(matches!(
            result,
            Err(MultisigError::Wallet(crate::wallet::WalletError::InvalidInput(_)))
        ));
    }

    #[test]
    fn test_from_pending_uses_first_approver() {
        let txn = PendingTransaction {
            id: 3,
            to: Address::new_id(200),
            value: TokenAmount::from_whole(10),
            method: 0,
            params: Vec::new(),
            approved: vec![Address::new_id(300), Address::new_id(301)],
        };
        assert_eq!(ProposalHashData::from_pending(&txn).unwrap(), sample());
    }

    #[test]
    fn test_describe_differences() {
        let mut other = sample();
        other.to = Address::new_id(201);
        assert_eq!(sample().describe_differences(&other), "to f0200 != f0201");
    }
}
