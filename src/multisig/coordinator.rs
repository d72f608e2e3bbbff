//! Multisig coordinator
//!
//! Builds the messages of the propose / approve / cancel protocol and the
//! recipes layered on it. Nothing here signs or submits; every builder
//! returns a `MessageDraft` for the wallet pipeline.

use cid::Cid;
use fvm_ipld_encoding::{from_slice, to_vec};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::error::MultisigError;
use super::operation::{lookup_id, ActorCall, Operation, Route};
use super::params::{
    ApproveReturn, ConstructorParams, ExecParams, ExecReturn, InitMethod, MultisigMethod,
    ProposeParams, ProposeReturn, TxnIdParams, INIT_ACTOR_ADDR,
};
use super::proposal::{ProposalDetails, ProposalHashData};
use crate::codec::{ActorKind, BuiltinParamsCodec, ParamsCodec};
use crate::core::{Address, MethodNum, MsgLookup, TokenAmount};
use crate::rpc::{NodeApi, PendingTransaction};
use crate::wallet::{MessageBuilder, MessageDraft};

/// Actor code names as reported by the node
const MULTISIG_CODE: &str = "multisig";
const MINER_CODE: &str = "storageminer";

/// Parameters for deploying a new multisig
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateMultisig {
    pub signers: Vec<Address>,
    /// Defaults to the number of signers
    pub threshold: Option<u64>,
    pub unlock_duration: i64,
    pub start_epoch: i64,
    /// Initial balance sent along with the creation
    pub value: TokenAmount,
}

/// A pending transaction with its parameters decoded where possible
#[derive(Clone, Debug, PartialEq)]
pub struct PendingSummary {
    pub transaction: PendingTransaction,
    pub decoded_params: Option<serde_json::Value>,
}

/// Balance and pending transactions of a multisig
#[derive(Clone, Debug, PartialEq)]
pub struct MultisigSummary {
    pub address: Address,
    pub balance: TokenAmount,
    pub pending: Vec<PendingSummary>,
}

pub struct MultisigCoordinator<N: NodeApi + ?Sized> {
    node: Arc<N>,
}

impl<N: NodeApi + ?Sized> MultisigCoordinator<N> {
    /// Create a new coordinator over `node`
    pub fn new(node: Arc<N>) -> Self {
        Self { node }
    }

    /// Build a message that deploys a multisig through the init actor
    pub async fn create(
        &self,
        sender: &Address,
        request: &CreateMultisig,
    ) -> Result<MessageDraft, MultisigError> {
        if request.signers.is_empty() {
            return Err(MultisigError::invalid("a multisig needs at least one signer"));
        }
        for (i, signer) in request.signers.iter().enumerate() {
            if request.signers[..i].contains(signer) {
                return Err(MultisigError::invalid(format!("duplicate signer {}", signer)));
            }
        }
        let signer_count = request.signers.len() as u64;
        let threshold = request.threshold.unwrap_or(signer_count);
        if threshold == 0 || threshold > signer_count {
            return Err(MultisigError::invalid(format!(
                "threshold {} must be between 1 and {}",
                threshold, signer_count
            )));
        }
        if request.unlock_duration < 0 {
            return Err(MultisigError::invalid("negative unlock duration"));
        }

        let constructor_params = to_vec(&ConstructorParams {
            signers: request.signers.clone(),
            num_approvals_threshold: threshold,
            unlock_duration: request.unlock_duration,
            start_epoch: request.start_epoch,
        })?;
        let code_cid = self.multisig_code().await?;
        let params = to_vec(&ExecParams {
            code_cid,
            constructor_params,
        })?;

        log::info!(
            "Creating {}-of-{} multisig with {}",
            threshold,
            signer_count,
            request.value
        );
        Ok(MessageBuilder::new()
            .from(sender.clone())
            .to(INIT_ACTOR_ADDR)
            .value(request.value.clone())
            .call(InitMethod::Exec.number(), params)
            .build()?)
    }

    /// Propose a call to be made by `multisig`
    pub async fn propose(
        &self,
        sender: &Address,
        multisig: &Address,
        to: &Address,
        value: &TokenAmount,
        method: MethodNum,
        params: Vec<u8>,
    ) -> Result<MessageDraft, MultisigError> {
        let operation = Operation::Transfer {
            to: to.clone(),
            value: value.clone(),
            method,
            params,
        };
        let route = Route::Propose {
            multisig: multisig.clone(),
        };
        self.build_and_route(sender, &operation, &route).await
    }

    /// Approve `txn_id` after checking it matches `details`
    pub async fn approve(
        &self,
        sender: &Address,
        multisig: &Address,
        txn_id: i64,
        details: &ProposalDetails,
    ) -> Result<MessageDraft, MultisigError> {
        let route = Route::Approve {
            multisig: multisig.clone(),
            txn_id,
            proposer: details.proposer.clone(),
        };
        self.build_and_route(sender, &transfer(details), &route).await
    }

    /// Cancel `txn_id`, which `sender` must have proposed
    pub async fn cancel(
        &self,
        sender: &Address,
        multisig: &Address,
        txn_id: i64,
        details: &ProposalDetails,
    ) -> Result<MessageDraft, MultisigError> {
        let proposer = lookup_id(&*self.node, &details.proposer).await?;
        let canceller = lookup_id(&*self.node, sender).await?;
        if proposer != canceller {
            return Err(MultisigError::invalid(format!(
                "only the proposer {} can cancel transaction {}",
                details.proposer, txn_id
            )));
        }
        let route = Route::Cancel {
            multisig: multisig.clone(),
            txn_id,
        };
        self.build_and_route(sender, &transfer(details), &route).await
    }

    /// Approve by id alone; the actor does not check what is being approved
    pub fn approve_blind(
        &self,
        sender: &Address,
        multisig: &Address,
        txn_id: i64,
    ) -> Result<MessageDraft, MultisigError> {
        log::warn!("Approving transaction {} on {} without a proposal check", txn_id, multisig);
        txn_message(sender, multisig, MultisigMethod::Approve, txn_id, Vec::new())
    }

    /// Cancel by id alone
    pub fn cancel_blind(
        &self,
        sender: &Address,
        multisig: &Address,
        txn_id: i64,
    ) -> Result<MessageDraft, MultisigError> {
        txn_message(sender, multisig, MultisigMethod::Cancel, txn_id, Vec::new())
    }

    /// Build `operation` and wrap it for `route`
    ///
    /// Approve and cancel routes re-encode the operation without the
    /// chain-state prechecks, compare the rebuilt proposal with the pending
    /// transaction on chain and fail with `ProposalMismatch` before anything
    /// is sent.
    pub async fn build_and_route(
        &self,
        sender: &Address,
        operation: &Operation,
        route: &Route,
    ) -> Result<MessageDraft, MultisigError> {
        if operation.targets_multisig() && route.multisig().is_none() {
            return Err(MultisigError::invalid(format!(
                "{} must be routed through a multisig",
                operation.name()
            )));
        }
        log::debug!("Building {} routed as {:?}", operation.name(), route);

        match route {
            Route::Direct => {
                let call = operation.prepare(&*self.node, None).await?;
                Ok(MessageBuilder::new()
                    .from(sender.clone())
                    .to(call.to)
                    .value(call.value)
                    .call(call.method, call.params)
                    .build()?)
            }
            Route::Propose { multisig } => {
                self.ensure_multisig(multisig).await?;
                let call = operation.prepare(&*self.node, Some(multisig)).await?;
                let params = to_vec(&ProposeParams {
                    to: call.to,
                    value: call.value,
                    method: call.method,
                    params: call.params,
                })?;
                Ok(MessageBuilder::new()
                    .from(sender.clone())
                    .to(multisig.clone())
                    .call(MultisigMethod::Propose.number(), params)
                    .build()?)
            }
            Route::Approve {
                multisig,
                txn_id,
                proposer,
            } => {
                let call = operation.encode(&*self.node, Some(multisig)).await?;
                let requester = lookup_id(&*self.node, proposer).await?;
                let hash = self.verify_pending(multisig, *txn_id, requester, call).await?;
                txn_message(sender, multisig, MultisigMethod::Approve, *txn_id, hash)
            }
            Route::Cancel { multisig, txn_id } => {
                let call = operation.encode(&*self.node, Some(multisig)).await?;
                let requester = lookup_id(&*self.node, sender).await?;
                let hash = self.verify_pending(multisig, *txn_id, requester, call).await?;
                txn_message(sender, multisig, MultisigMethod::Cancel, *txn_id, hash)
            }
        }
    }

    pub async fn pending(
        &self,
        multisig: &Address,
    ) -> Result<Vec<PendingTransaction>, MultisigError> {
        self.node
            .pending_transactions(multisig)
            .await
            .map_err(MultisigError::query)
    }

    /// Balance and pending transactions of `multisig`
    pub async fn inspect(&self, multisig: &Address) -> Result<MultisigSummary, MultisigError> {
        let actor = self.node.actor(multisig).await.map_err(MultisigError::query)?;
        let codes = self.actor_codes().await?;
        if codes.get(MULTISIG_CODE) != Some(&actor.code) {
            return Err(MultisigError::NotMultisig(multisig.clone()));
        }

        let mut pending = Vec::new();
        for transaction in self.pending(multisig).await? {
            let decoded_params = self
                .decode_pending_params(multisig, &transaction, codes.get(MINER_CODE))
                .await;
            pending.push(PendingSummary {
                transaction,
                decoded_params,
            });
        }
        Ok(MultisigSummary {
            address: multisig.clone(),
            balance: actor.balance,
            pending,
        })
    }

    async fn decode_pending_params(
        &self,
        multisig: &Address,
        txn: &PendingTransaction,
        miner_code: Option<&Cid>,
    ) -> Option<serde_json::Value> {
        let kind = if &txn.to == multisig {
            ActorKind::Multisig
        } else {
            let target = self.node.actor(&txn.to).await.ok()?;
            if Some(&target.code) != miner_code {
                return None;
            }
            ActorKind::Miner
        };
        match BuiltinParamsCodec::for_actor(kind).decode_params(txn.method, &txn.params) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("Could not decode params of transaction {}: {}", txn.id, e);
                None
            }
        }
    }

    async fn verify_pending(
        &self,
        multisig: &Address,
        txn_id: i64,
        requester: Address,
        call: ActorCall,
    ) -> Result<Vec<u8>, MultisigError> {
        let local =
            ProposalHashData::new(requester, call.to, call.value, call.method, call.params)?;
        let pending = self.pending(multisig).await?;
        let txn = pending.iter().find(|t| t.id == txn_id).ok_or_else(|| {
            MultisigError::PendingTransactionNotFound {
                multisig: multisig.clone(),
                txn_id,
            }
        })?;
        let remote = ProposalHashData::from_pending(txn)?;

        let hash = local.hash()?;
        if hash != remote.hash()? {
            return Err(MultisigError::ProposalMismatch {
                txn_id,
                detail: local.describe_differences(&remote),
            });
        }
        log::debug!("Transaction {} on {} matches the proposal", txn_id, multisig);
        Ok(hash.to_vec())
    }

    async fn actor_codes(&self) -> Result<std::collections::HashMap<String, Cid>, MultisigError> {
        let version = self
            .node
            .network_version()
            .await
            .map_err(MultisigError::query)?;
        self.node
            .actor_code_cids(version)
            .await
            .map_err(MultisigError::query)
    }

    async fn multisig_code(&self) -> Result<Cid, MultisigError> {
        self.actor_codes()
            .await?
            .get(MULTISIG_CODE)
            .copied()
            .ok_or_else(|| MultisigError::invalid("node reports no multisig actor code"))
    }

    async fn ensure_multisig(&self, multisig: &Address) -> Result<(), MultisigError> {
        let actor = self.node.actor(multisig).await.map_err(MultisigError::query)?;
        if actor.code != self.multisig_code().await? {
            return Err(MultisigError::NotMultisig(multisig.clone()));
        }
        Ok(())
    }
}

fn transfer(details: &ProposalDetails) -> Operation {
    Operation::Transfer {
        to: details.to.clone(),
        value: details.value.clone(),
        method: details.method,
        params: details.params.clone(),
    }
}

fn txn_message(
    sender: &Address,
    multisig: &Address,
    method: MultisigMethod,
    txn_id: i64,
    proposal_hash: Vec<u8>,
) -> Result<MessageDraft, MultisigError> {
    let params = to_vec(&TxnIdParams {
        id: txn_id,
        proposal_hash,
    })?;
    Ok(MessageBuilder::new()
        .from(sender.clone())
        .to(multisig.clone())
        .call(method.number(), params)
        .build()?)
}

fn decode_return<T: DeserializeOwned>(lookup: &MsgLookup) -> Result<T, MultisigError> {
    if lookup.receipt.return_data.is_empty() {
        return Err(MultisigError::InvalidReturn(format!(
            "message {} returned no data",
            lookup.message
        )));
    }
    from_slice(&lookup.receipt.return_data)
        .map_err(|e| MultisigError::InvalidReturn(format!("message {}: {}", lookup.message, e)))
}

/// Transaction id assigned by a confirmed proposal
pub fn decode_propose_return(lookup: &MsgLookup) -> Result<ProposeReturn, MultisigError> {
    decode_return(lookup)
}

pub fn decode_approve_return(lookup: &MsgLookup) -> Result<ApproveReturn, MultisigError> {
    decode_return(lookup)
}

/// Addresses of a multisig deployed by `create`
pub fn decode_exec_return(lookup: &MsgLookup) -> Result<ExecReturn, MultisigError> {
    decode_return(lookup)
}
