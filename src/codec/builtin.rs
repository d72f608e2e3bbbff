//! Codec for the multisig and storage miner methods this crate builds

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{ActorKind, CodecError, ParamsCodec};
use crate::core::{Address, MethodNum, METHOD_SEND};
use crate::multisig::params::{
    AddSignerParams, ChangeBeneficiaryParams, ChangeNumApprovalsThresholdParams,
    ChangeWorkerAddressParams, ConstructorParams, LockBalanceParams, MinerMethod,
    MultisigMethod, ProposeParams, RemoveSignerParams, SwapSignerParams, TxnIdParams,
    WithdrawBalanceParams,
};

/// Parameter layouts a method can have
enum Layout {
    Empty,
    Constructor,
    Propose,
    TxnId,
    AddSigner,
    RemoveSigner,
    SwapSigner,
    Threshold,
    LockBalance,
    WithdrawBalance,
    ChangeWorker,
    ChangeOwner,
    ChangeBeneficiary,
}

#[derive(Clone, Copy, Debug)]
pub struct BuiltinParamsCodec {
    actor: ActorKind,
}

impl BuiltinParamsCodec {
    /// Create a codec for one actor type
    pub fn for_actor(actor: ActorKind) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> ActorKind {
        self.actor
    }

    fn layout(&self, method: MethodNum) -> Result<Layout, CodecError> {
        if method == METHOD_SEND {
            return Ok(Layout::Empty);
        }
        let layout = match self.actor {
            ActorKind::Multisig => match method {
                m if m == MultisigMethod::Constructor.number() => Layout::Constructor,
                m if m == MultisigMethod::Propose.number() => Layout::Propose,
                m if m == MultisigMethod::Approve.number() => Layout::TxnId,
                m if m == MultisigMethod::Cancel.number() => Layout::TxnId,
                m if m == MultisigMethod::AddSigner.number() => Layout::AddSigner,
                m if m == MultisigMethod::RemoveSigner.number() => Layout::RemoveSigner,
                m if m == MultisigMethod::SwapSigner.number() => Layout::SwapSigner,
                m if m == MultisigMethod::ChangeNumApprovalsThreshold.number() => {
                    Layout::Threshold
                }
                m if m == MultisigMethod::LockBalance.number() => Layout::LockBalance,
                _ => return Err(self.unknown(method)),
            },
            ActorKind::Miner => match method {
                m if m == MinerMethod::ChangeWorkerAddress.number() => Layout::ChangeWorker,
                m if m == MinerMethod::WithdrawBalance.number() => Layout::WithdrawBalance,
                m if m == MinerMethod::ConfirmChangeWorkerAddress.number() => Layout::Empty,
                m if m == MinerMethod::ChangeOwnerAddress.number() => Layout::ChangeOwner,
                m if m == MinerMethod::ChangeBeneficiary.number() => Layout::ChangeBeneficiary,
                _ => return Err(self.unknown(method)),
            },
        };
        Ok(layout)
    }

    fn unknown(&self, method: MethodNum) -> CodecError {
        CodecError::UnknownMethod {
            actor: self.actor,
            method,
        }
    }
}

fn encode_as<T: Serialize + DeserializeOwned>(params: &Value) -> Result<Vec<u8>, CodecError> {
    let typed: T = serde_json::from_value(params.clone())?;
    Ok(fvm_ipld_encoding::to_vec(&typed)?)
}

fn decode_as<T: Serialize + DeserializeOwned>(params: &[u8]) -> Result<Value, CodecError> {
    let typed: T = fvm_ipld_encoding::from_slice(params)?;
    Ok(serde_json::to_value(&typed)?)
}

impl ParamsCodec for BuiltinParamsCodec {
    fn encode_params(&self, method: MethodNum, params: &Value) -> Result<Vec<u8>, CodecError> {
        match self.layout(method)? {
            Layout::Empty if params.is_null() => Ok(Vec::new()),
            Layout::Empty => Err(CodecError::UnexpectedParams(method)),
            Layout::Constructor => encode_as::<ConstructorParams>(params),
            Layout::Propose => encode_as::<ProposeParams>(params),
            Layout::TxnId => encode_as::<TxnIdParams>(params),
            Layout::AddSigner => encode_as::<AddSignerParams>(params),
            Layout::RemoveSigner => encode_as::<RemoveSignerParams>(params),
            Layout::SwapSigner => encode_as::<SwapSignerParams>(params),
            Layout::Threshold => encode_as::<ChangeNumApprovalsThresholdParams>(params),
            Layout::LockBalance => encode_as::<LockBalanceParams>(params),
            Layout::WithdrawBalance => encode_as::<WithdrawBalanceParams>(params),
            Layout::ChangeWorker => encode_as::<ChangeWorkerAddressParams>(params),
            Layout::ChangeOwner => encode_as::<Address>(params),
            Layout::ChangeBeneficiary => encode_as::<ChangeBeneficiaryParams>(params),
        }
    }

    fn decode_params(&self, method: MethodNum, params: &[u8]) -> Result<Value, CodecError> {
        match self.layout(method)? {
            Layout::Empty if params.is_empty() => Ok(Value::Null),
            Layout::Empty => Err(CodecError::UnexpectedParams(method)),
            Layout::Constructor => decode_as::<ConstructorParams>(params),
            Layout::Propose => decode_as::<ProposeParams>(params),
            Layout::TxnId => decode_as::<TxnIdParams>(params),
            Layout::AddSigner => decode_as::<AddSignerParams>(params),
            Layout::RemoveSigner => decode_as::<RemoveSignerParams>(params),
            Layout::SwapSigner => decode_as::<SwapSignerParams>(params),
            Layout::Threshold => decode_as::<ChangeNumApprovalsThresholdParams>(params),
            Layout::LockBalance => decode_as::<LockBalanceParams>(params),
            Layout::WithdrawBalance => decode_as::<WithdrawBalanceParams>(params),
            Layout::ChangeWorker => decode_as::<ChangeWorkerAddressParams>(params),
            Layout::ChangeOwner => decode_as::<Address>(params),
            Layout::ChangeBeneficiary => decode_as::<ChangeBeneficiaryParams>(params),
        }
    }
}
