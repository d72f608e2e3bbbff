use thiserror::Error;

use crate::core::{Address, EncodingError};
use crate::rpc::RpcError;
use crate::wallet::WalletError;

/// Errors from building and routing multisig operations
#[derive(Error, Debug)]
pub enum MultisigError {
    /// The supplied proposal does not match the pending transaction on chain
    #[error("Proposal mismatch for transaction {txn_id}: {detail}")]
    ProposalMismatch { txn_id: i64, detail: String },
    #[error("Transaction {txn_id} is not pending in {multisig}")]
    PendingTransactionNotFound { multisig: Address, txn_id: i64 },
    #[error("{0} is not a multisig actor")]
    NotMultisig(Address),
    #[error("Nothing to do: {0}")]
    AlreadyActive(String),
    #[error("A change is already pending: {0}")]
    AlreadyPending(String),
    #[error("No pending change: {0}")]
    NoPendingChange(String),
    #[error("Change can be confirmed from epoch {ready_at}, chain is at {height}")]
    NotYetConfirmable { ready_at: i64, height: i64 },
    #[error("Unexpected return value: {0}")]
    InvalidReturn(String),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl MultisigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        MultisigError::Wallet(WalletError::InvalidInput(message.into()))
    }

    pub(crate) fn query(error: RpcError) -> Self {
        MultisigError::Wallet(WalletError::QueryFailed(error))
    }
}

impl From<EncodingError> for MultisigError {
    fn from(e: EncodingError) -> Self {
        MultisigError::Wallet(WalletError::Encoding(e))
    }
}

impl From<fvm_ipld_encoding::Error> for MultisigError {
    fn from(e: fvm_ipld_encoding::Error) -> Self {
        MultisigError::from(EncodingError::from(e))
    }
}
