//! Typed node responses
//!
//! Every RPC result is decoded into one of these structs at the boundary; a
//! response of the wrong shape fails there instead of deep inside a caller.

use cid::Cid;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::core::json::{self, null_default};
use crate::core::{Address, MethodNum, TokenAmount};

/// Errors talking to the node
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Node returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Unexpected response shape for {method}: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Empty result for {0}")]
    EmptyResult(String),
}

/// Current chain head
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChainHead {
    pub height: i64,
}

/// Pricing fields filled in by gas estimation
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GasEstimate {
    pub gas_limit: i64,
    pub gas_fee_cap: TokenAmount,
    pub gas_premium: TokenAmount,
}

/// On-chain actor record
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActorState {
    #[serde(with = "json::cid_link")]
    pub code: Cid,
    #[serde(with = "json::cid_link")]
    pub head: Cid,
    pub nonce: u64,
    pub balance: TokenAmount,
}

/// A beneficiary change waiting for approval
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PendingBeneficiaryChange {
    pub new_beneficiary: Address,
    pub new_quota: TokenAmount,
    pub new_expiration: i64,
    #[serde(default)]
    pub approved_by_beneficiary: bool,
    #[serde(default)]
    pub approved_by_nominee: bool,
}

/// Control addresses and pending changes of a storage miner
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerInfo {
    pub owner: Address,
    pub worker: Address,
    #[serde(default, deserialize_with = "optional_address")]
    pub new_worker: Option<Address>,
    #[serde(default)]
    pub worker_change_epoch: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub control_addresses: Vec<Address>,
    #[serde(default)]
    pub beneficiary: Option<Address>,
    #[serde(default)]
    pub pending_beneficiary_term: Option<PendingBeneficiaryChange>,
}

/// A transaction waiting for approvals inside a multisig actor
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PendingTransaction {
    #[serde(rename = "ID")]
    pub id: i64,
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    #[serde(with = "json::base64_bytes", default)]
    pub params: Vec<u8>,
    #[serde(default, deserialize_with = "null_default")]
    pub approved: Vec<Address>,
}

/// Nodes report "no pending worker" as null, an empty string or `<empty>`
fn optional_address<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Address>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() || s == "<empty>" => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_miner_info_without_pending_changes() {
        let info: MinerInfo = serde_json::from_value(json!({
            "Owner": "f0100",
            "Worker": "f0101",
            "NewWorker": "<empty>",
            "WorkerChangeEpoch": -1,
            "ControlAddresses": null,
            "PeerId": null,
            "Beneficiary": "f0100",
            "PendingBeneficiaryTerm": null
        }))
        .unwrap();
        assert_eq!(info.owner, Address::new_id(100));
        assert_eq!(info.new_worker, None);
        assert!(info.control_addresses.is_empty());
        assert_eq!(info.pending_beneficiary_term, None);
    }

    #[test]
    fn test_miner_info_with_pending_changes() {
        let info: MinerInfo = serde_json::from_value(json!({
            "Owner": "f0100",
            "Worker": "f0101",
            "NewWorker": "f0102",
            "WorkerChangeEpoch": 2000,
            "ControlAddresses": ["f0103"],
            "Beneficiary": "f0100",
            "PendingBeneficiaryTerm": {
                "NewBeneficiary": "f0104",
                "NewQuota": "5000",
                "NewExpiration": 900000,
                "ApprovedByBeneficiary": false,
                "ApprovedByNominee": false
            }
        }))
        .unwrap();
        assert_eq!(info.new_worker, Some(Address::new_id(102)));
        assert_eq!(info.worker_change_epoch, 2000);
        assert_eq!(info.control_addresses, vec![Address::new_id(103)]);
        let term = info.pending_beneficiary_term.unwrap();
        assert_eq!(term.new_quota, TokenAmount::from(5000));
    }

    #[test]
    fn test_pending_transaction() {
        let txn: PendingTransaction = serde_json::from_value(json!({
            "ID": 3,
            "To": "f0200",
            "Value": "10000000000000000000",
            "Method": 0,
            "Params": null,
            "Approved": ["f0300"]
        }))
        .unwrap();
        assert_eq!(txn.id, 3);
        assert!(txn.params.is_empty());
        assert_eq!(txn.approved, vec![Address::new_id(300)]);
    }

    #[test]
    fn test_bad_shape_is_an_error() {
        let result: Result<ChainHead, _> = serde_json::from_value(json!({"Height": "tall"}));
        assert!(result.is_err());
    }
}
