//! Built-in actor method numbers, parameters and return values
//!
//! All structs encode as positional CBOR tuples, the layout the actors
//! expect on chain.

use cid::Cid;
use fvm_ipld_encoding::tuple::{serde_tuple, Deserialize_tuple, Serialize_tuple};

use crate::core::json;
use crate::core::{Address, MethodNum, TokenAmount};

/// The init actor, which deploys new multisig actors
pub const INIT_ACTOR_ADDR: Address = Address::Id(1);

/// Multisig actor methods
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum MultisigMethod {
    Constructor = 1,
    Propose = 2,
    Approve = 3,
    Cancel = 4,
    AddSigner = 5,
    RemoveSigner = 6,
    SwapSigner = 7,
    ChangeNumApprovalsThreshold = 8,
    LockBalance = 9,
}

/// Storage miner actor methods used by the recipes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum MinerMethod {
    ChangeWorkerAddress = 3,
    WithdrawBalance = 16,
    ConfirmChangeWorkerAddress = 21,
    ChangeOwnerAddress = 23,
    ChangeBeneficiary = 30,
}

/// Init actor methods
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum InitMethod {
    Exec = 2,
}

impl MultisigMethod {
    pub fn number(self) -> MethodNum {
        self as MethodNum
    }
}

impl MinerMethod {
    pub fn number(self) -> MethodNum {
        self as MethodNum
    }
}

impl InitMethod {
    pub fn number(self) -> MethodNum {
        self as MethodNum
    }
}

// ============================================================================
// Multisig
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ConstructorParams {
    pub signers: Vec<Address>,
    pub num_approvals_threshold: u64,
    pub unlock_duration: i64,
    pub start_epoch: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ProposeParams {
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    #[serde(with = "json::bytes")]
    pub params: Vec<u8>,
}

/// Result of a proposal; `applied` is set when the threshold was already met
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ProposeReturn {
    pub txn_id: i64,
    pub applied: bool,
    pub code: u32,
    #[serde(with = "json::bytes")]
    pub ret: Vec<u8>,
}

/// Approve and cancel parameters; an empty hash skips the on-chain check
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct TxnIdParams {
    pub id: i64,
    #[serde(with = "json::bytes")]
    pub proposal_hash: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ApproveReturn {
    pub applied: bool,
    pub code: u32,
    #[serde(with = "json::bytes")]
    pub ret: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct AddSignerParams {
    pub signer: Address,
    pub increase: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct RemoveSignerParams {
    pub signer: Address,
    pub decrease: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct SwapSignerParams {
    pub from: Address,
    pub to: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ChangeNumApprovalsThresholdParams {
    pub new_threshold: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct LockBalanceParams {
    pub start_epoch: i64,
    pub unlock_duration: i64,
    pub amount: TokenAmount,
}

// ============================================================================
// Init
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ExecParams {
    pub code_cid: Cid,
    #[serde(with = "json::bytes")]
    pub constructor_params: Vec<u8>,
}

/// Addresses of a freshly deployed actor
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ExecReturn {
    pub id_address: Address,
    pub robust_address: Address,
}

// ============================================================================
// Storage miner
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct WithdrawBalanceParams {
    pub amount_requested: TokenAmount,
}

/// Also used to replace control addresses while keeping the worker
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ChangeWorkerAddressParams {
    pub new_worker: Address,
    pub new_control_addrs: Vec<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ChangeBeneficiaryParams {
    pub new_beneficiary: Address,
    pub new_quota: TokenAmount,
    pub new_expiration: i64,
}
