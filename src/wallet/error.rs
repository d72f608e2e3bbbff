//! Pipeline error taxonomy

use thiserror::Error;

use crate::core::{Address, EncodingError, MessageRef};
use crate::crypto::KeyError;
use crate::rpc::RpcError;

/// Errors surfaced by the message pipeline
#[derive(Error, Debug)]
pub enum WalletError {
    /// Malformed input caught before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Gas estimation or sequence lookup failed
    #[error("Could not resolve message fields: {0}")]
    ResolutionFailed(#[source] RpcError),
    #[error("Node query failed: {0}")]
    QueryFailed(#[source] RpcError),
    #[error("Key address {key} does not match message sender {from}")]
    AddressMismatch { key: Address, from: Address },
    /// The node refused the push
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),
    /// The message was not seen in time; it may still be included later
    #[error("Message {message} not found after {attempts} attempts, it may still be included")]
    ConfirmationTimeout { message: MessageRef, attempts: u32 },
    /// Included on chain with a nonzero exit code
    #[error("Message {message} failed on chain with exit code {code}")]
    ActorExecutionFailed { message: MessageRef, code: i64 },
    #[error("Wait for message {message} was cancelled")]
    Cancelled { message: MessageRef },
    #[error("Signing failed: {0}")]
    Signing(#[from] KeyError),
    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodingError),
}

impl WalletError {
    /// The pushed message this error refers to, when it happened after submission
    pub fn message_ref(&self) -> Option<&MessageRef> {
        match self {
            WalletError::ConfirmationTimeout { message, .. }
            | WalletError::ActorExecutionFailed { message, .. }
            | WalletError::Cancelled { message } => Some(message),
            _ => None,
        }
    }
}
