//! Operations and routes
//!
//! An `Operation` says what should happen; a `Route` says who sends it. The
//! same operation can be sent by its owner directly or proposed, approved or
//! cancelled through a multisig. Preparing an operation checks current chain
//! state and encodes the actor call it boils down to. Approvals and cancels
//! only re-encode a call that was checked when it was proposed.

use fvm_ipld_encoding::to_vec;

use super::error::MultisigError;
use super::params::{
    AddSignerParams, ChangeBeneficiaryParams, ChangeNumApprovalsThresholdParams,
    ChangeWorkerAddressParams, LockBalanceParams, MinerMethod, MultisigMethod,
    RemoveSignerParams, SwapSignerParams, WithdrawBalanceParams,
};
use crate::core::{Address, MethodNum, TokenAmount};
use crate::rpc::NodeApi;

/// Something a signer wants to happen on chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Send value, optionally invoking a method on the recipient
    Transfer {
        to: Address,
        value: TokenAmount,
        method: MethodNum,
        params: Vec<u8>,
    },
    AddSigner {
        signer: Address,
        increase: bool,
    },
    RemoveSigner {
        signer: Address,
        decrease: bool,
    },
    SwapSigner {
        from: Address,
        to: Address,
    },
    ChangeThreshold {
        new_threshold: u64,
    },
    LockBalance {
        start_epoch: i64,
        unlock_duration: i64,
        amount: TokenAmount,
    },
    /// Withdraw from a miner; no amount means everything available
    WithdrawBalance {
        miner: Address,
        amount: Option<TokenAmount>,
    },
    ChangeOwner {
        miner: Address,
        new_owner: Address,
    },
    ChangeWorker {
        miner: Address,
        new_worker: Address,
    },
    ConfirmChangeWorker {
        miner: Address,
        new_worker: Address,
    },
    SetControlAddresses {
        miner: Address,
        control_addresses: Vec<Address>,
    },
    ChangeBeneficiary {
        miner: Address,
        beneficiary: Address,
        quota: TokenAmount,
        expiration: i64,
        overwrite_pending: bool,
    },
    ConfirmChangeBeneficiary {
        miner: Address,
    },
}

/// How an operation reaches the chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// The sender calls the target actor itself
    Direct,
    Propose {
        multisig: Address,
    },
    /// Approve the pending transaction `txn_id`, first proposed by `proposer`
    Approve {
        multisig: Address,
        txn_id: i64,
        proposer: Address,
    },
    /// Cancel a transaction the sender proposed
    Cancel {
        multisig: Address,
        txn_id: i64,
    },
}

impl Route {
    pub fn multisig(&self) -> Option<&Address> {
        match self {
            Route::Direct => None,
            Route::Propose { multisig }
            | Route::Approve { multisig, .. }
            | Route::Cancel { multisig, .. } => Some(multisig),
        }
    }
}

/// A fully encoded call to an actor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorCall {
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    pub params: Vec<u8>,
}

impl ActorCall {
    fn new(to: Address, method: MethodNum, params: Vec<u8>) -> Self {
        Self {
            to,
            value: TokenAmount::zero(),
            method,
            params,
        }
    }
}

impl Operation {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Transfer { .. } => "transfer",
            Operation::AddSigner { .. } => "add-signer",
            Operation::RemoveSigner { .. } => "remove-signer",
            Operation::SwapSigner { .. } => "swap-signer",
            Operation::ChangeThreshold { .. } => "change-threshold",
            Operation::LockBalance { .. } => "lock-balance",
            Operation::WithdrawBalance { .. } => "withdraw-balance",
            Operation::ChangeOwner { .. } => "change-owner",
            Operation::ChangeWorker { .. } => "change-worker",
            Operation::ConfirmChangeWorker { .. } => "confirm-change-worker",
            Operation::SetControlAddresses { .. } => "set-control-addresses",
            Operation::ChangeBeneficiary { .. } => "change-beneficiary",
            Operation::ConfirmChangeBeneficiary { .. } => "confirm-change-beneficiary",
        }
    }

    /// Operations that call the multisig actor itself
    pub fn targets_multisig(&self) -> bool {
        matches!(
            self,
            Operation::AddSigner { .. }
                | Operation::RemoveSigner { .. }
                | Operation::SwapSigner { .. }
                | Operation::ChangeThreshold { .. }
                | Operation::LockBalance { .. }
        )
    }

    /// Check the operation against chain state and encode the call
    ///
    /// `multisig` is the routing multisig, required by operations that target it.
    pub async fn prepare<N: NodeApi + ?Sized>(
        &self,
        node: &N,
        multisig: Option<&Address>,
    ) -> Result<ActorCall, MultisigError> {
        self.build(node, multisig, true).await
    }

    /// Encode the call without the chain-state prechecks
    ///
    /// Used to rebuild the proposal of a pending transaction; state may have
    /// moved since it was proposed. Addresses are still resolved to ID form
    /// and a withdrawal needs an explicit amount.
    pub async fn encode<N: NodeApi + ?Sized>(
        &self,
        node: &N,
        multisig: Option<&Address>,
    ) -> Result<ActorCall, MultisigError> {
        self.build(node, multisig, false).await
    }

    async fn build<N: NodeApi + ?Sized>(
        &self,
        node: &N,
        multisig: Option<&Address>,
        check_state: bool,
    ) -> Result<ActorCall, MultisigError> {
        let own_multisig = || {
            multisig.cloned().ok_or_else(|| {
                MultisigError::invalid(format!(
                    "{} must be routed through a multisig",
                    self.name()
                ))
            })
        };

        match self {
            Operation::Transfer {
                to,
                value,
                method,
                params,
            } => {
                if value.is_negative() {
                    return Err(MultisigError::invalid(format!("negative value {}", value)));
                }
                Ok(ActorCall {
                    to: to.clone(),
                    value: value.clone(),
                    method: *method,
                    params: params.clone(),
                })
            }
            Operation::AddSigner { signer, increase } => Ok(ActorCall::new(
                own_multisig()?,
                MultisigMethod::AddSigner.number(),
                to_vec(&AddSignerParams {
                    signer: signer.clone(),
                    increase: *increase,
                })?,
            )),
            Operation::RemoveSigner { signer, decrease } => Ok(ActorCall::new(
                own_multisig()?,
                MultisigMethod::RemoveSigner.number(),
                to_vec(&RemoveSignerParams {
                    signer: signer.clone(),
                    decrease: *decrease,
                })?,
            )),
            Operation::SwapSigner { from, to } => {
                if from == to {
                    return Err(MultisigError::invalid("cannot swap a signer for itself"));
                }
                Ok(ActorCall::new(
                    own_multisig()?,
                    MultisigMethod::SwapSigner.number(),
                    to_vec(&SwapSignerParams {
                        from: from.clone(),
                        to: to.clone(),
                    })?,
                ))
            }
            Operation::ChangeThreshold { new_threshold } => {
                if *new_threshold == 0 {
                    return Err(MultisigError::invalid("threshold must be at least 1"));
                }
                Ok(ActorCall::new(
                    own_multisig()?,
                    MultisigMethod::ChangeNumApprovalsThreshold.number(),
                    to_vec(&ChangeNumApprovalsThresholdParams {
                        new_threshold: *new_threshold,
                    })?,
                ))
            }
            Operation::LockBalance {
                start_epoch,
                unlock_duration,
                amount,
            } => {
                if *unlock_duration <= 0 {
                    return Err(MultisigError::invalid("unlock duration must be positive"));
                }
                if amount.is_negative() {
                    return Err(MultisigError::invalid(format!(
                        "negative lock amount {}",
                        amount
                    )));
                }
                Ok(ActorCall::new(
                    own_multisig()?,
                    MultisigMethod::LockBalance.number(),
                    to_vec(&LockBalanceParams {
                        start_epoch: *start_epoch,
                        unlock_duration: *unlock_duration,
                        amount: amount.clone(),
                    })?,
                ))
            }
            Operation::WithdrawBalance { miner, amount } => {
                let amount = match (amount, check_state) {
                    (Some(requested), false) => requested.clone(),
                    (None, false) => {
                        return Err(MultisigError::invalid(format!(
                            "the amount proposed for withdrawal from {} is required",
                            miner
                        )));
                    }
                    (requested, true) => {
                        let available = node
                            .miner_available_balance(miner)
                            .await
                            .map_err(MultisigError::query)?;
                        match requested {
                            None => available,
                            Some(requested) if requested > &available => {
                                return Err(MultisigError::invalid(format!(
                                    "requested {} but only {} is available",
                                    requested, available
                                )));
                            }
                            Some(requested) => requested.clone(),
                        }
                    }
                };
                if !amount.is_positive() {
                    return Err(MultisigError::invalid(format!(
                        "nothing to withdraw from {}",
                        miner
                    )));
                }
                log::debug!("Withdrawing {} from {}", amount, miner);
                Ok(ActorCall::new(
                    miner.clone(),
                    MinerMethod::WithdrawBalance.number(),
                    to_vec(&WithdrawBalanceParams {
                        amount_requested: amount,
                    })?,
                ))
            }
            Operation::ChangeOwner { miner, new_owner } => {
                let new_owner = lookup_id(node, new_owner).await?;
                if check_state {
                    let info = node.miner_info(miner).await.map_err(MultisigError::query)?;
                    if info.owner == new_owner {
                        return Err(MultisigError::AlreadyActive(format!(
                            "{} already owns {}",
                            new_owner, miner
                        )));
                    }
                }
                Ok(ActorCall::new(
                    miner.clone(),
                    MinerMethod::ChangeOwnerAddress.number(),
                    to_vec(&new_owner)?,
                ))
            }
            Operation::ChangeWorker { miner, new_worker } => {
                let new_worker = lookup_id(node, new_worker).await?;
                let info = node.miner_info(miner).await.map_err(MultisigError::query)?;
                match &info.new_worker {
                    _ if !check_state => {}
                    Some(pending) if *pending == new_worker => {
                        return Err(MultisigError::AlreadyPending(format!(
                            "{} is already the pending worker of {}",
                            new_worker, miner
                        )));
                    }
                    None if info.worker == new_worker => {
                        return Err(MultisigError::AlreadyActive(format!(
                            "{} is already the worker of {}",
                            new_worker, miner
                        )));
                    }
                    _ => {}
                }
                Ok(ActorCall::new(
                    miner.clone(),
                    MinerMethod::ChangeWorkerAddress.number(),
                    to_vec(&ChangeWorkerAddressParams {
                        new_worker,
                        new_control_addrs: info.control_addresses,
                    })?,
                ))
            }
            Operation::ConfirmChangeWorker { miner, new_worker } => {
                if !check_state {
                    return Ok(ActorCall::new(
                        miner.clone(),
                        MinerMethod::ConfirmChangeWorkerAddress.number(),
                        Vec::new(),
                    ));
                }
                let new_worker = lookup_id(node, new_worker).await?;
                let info = node.miner_info(miner).await.map_err(MultisigError::query)?;
                match &info.new_worker {
                    None => {
                        return Err(MultisigError::NoPendingChange(format!(
                            "no worker change pending for {}",
                            miner
                        )))
                    }
                    Some(pending) if *pending != new_worker => {
                        return Err(MultisigError::NoPendingChange(format!(
                            "pending worker of {} is {}, not {}",
                            miner, pending, new_worker
                        )))
                    }
                    Some(_) => {}
                }
                let head = node.chain_head().await.map_err(MultisigError::query)?;
                if head.height < info.worker_change_epoch {
                    return Err(MultisigError::NotYetConfirmable {
                        ready_at: info.worker_change_epoch,
                        height: head.height,
                    });
                }
                Ok(ActorCall::new(
                    miner.clone(),
                    MinerMethod::ConfirmChangeWorkerAddress.number(),
                    Vec::new(),
                ))
            }
            Operation::SetControlAddresses {
                miner,
                control_addresses,
            } => {
                let mut resolved = Vec::with_capacity(control_addresses.len());
                for address in control_addresses {
                    resolved.push(lookup_id(node, address).await?);
                }
                let info = node.miner_info(miner).await.map_err(MultisigError::query)?;
                Ok(ActorCall::new(
                    miner.clone(),
                    MinerMethod::ChangeWorkerAddress.number(),
                    to_vec(&ChangeWorkerAddressParams {
                        new_worker: info.worker,
                        new_control_addrs: resolved,
                    })?,
                ))
            }
            Operation::ChangeBeneficiary {
                miner,
                beneficiary,
                quota,
                expiration,
                overwrite_pending,
            } => {
                if quota.is_negative() {
                    return Err(MultisigError::invalid(format!("negative quota {}", quota)));
                }
                if *expiration < 0 {
                    return Err(MultisigError::invalid(format!(
                        "negative expiration {}",
                        expiration
                    )));
                }
                let beneficiary = lookup_id(node, beneficiary).await?;
                if check_state {
                    let info = node.miner_info(miner).await.map_err(MultisigError::query)?;
                    if let Some(term) = &info.pending_beneficiary_term {
                        if !overwrite_pending {
                            return Err(MultisigError::AlreadyPending(format!(
                                "beneficiary change to {} is pending for {}",
                                term.new_beneficiary, miner
                            )));
                        }
                        log::warn!(
                            "Replacing pending beneficiary change to {} on {}",
                            term.new_beneficiary,
                            miner
                        );
                    }
                }
                Ok(ActorCall::new(
                    miner.clone(),
                    MinerMethod::ChangeBeneficiary.number(),
                    to_vec(&ChangeBeneficiaryParams {
                        new_beneficiary: beneficiary,
                        new_quota: quota.clone(),
                        new_expiration: *expiration,
                    })?,
                ))
            }
            Operation::ConfirmChangeBeneficiary { miner } => {
                let info = node.miner_info(miner).await.map_err(MultisigError::query)?;
                let term = info.pending_beneficiary_term.ok_or_else(|| {
                    MultisigError::NoPendingChange(format!(
                        "no beneficiary change pending for {}",
                        miner
                    ))
                })?;
                Ok(ActorCall::new(
                    miner.clone(),
                    MinerMethod::ChangeBeneficiary.number(),
                    to_vec(&ChangeBeneficiaryParams {
                        new_beneficiary: term.new_beneficiary,
                        new_quota: term.new_quota,
                        new_expiration: term.new_expiration,
                    })?,
                ))
            }
        }
    }
}

pub(crate) async fn lookup_id<N: NodeApi + ?Sized>(
    node: &N,
    address: &Address,
) -> Result<Address, MultisigError> {
    if address.is_id() {
        return Ok(address.clone());
    }
    node.lookup_id(address).await.map_err(MultisigError::query)
}
