//! Signing and submission
//!
//! A message is only ever signed by the key of its own sender. Pushing is the
//! point of no return: once the node accepts it the sequence is consumed.

use super::error::WalletError;
use crate::core::{Message, MessageRef, SignedMessage};
use crate::crypto::{KeyPair, Signer};
use crate::rpc::{NodeApi, RpcError};

pub struct Submitter<'a, N: NodeApi + ?Sized> {
    node: &'a N,
    signer: &'a dyn Signer,
}

impl<'a, N: NodeApi + ?Sized> Submitter<'a, N> {
    pub fn new(node: &'a N, signer: &'a dyn Signer) -> Self {
        Self { node, signer }
    }

    /// Sign `message` with `key`, refusing if the key is not the sender
    pub fn sign(&self, key: &KeyPair, message: Message) -> Result<SignedMessage, WalletError> {
        if key.address != message.from {
            return Err(WalletError::AddressMismatch {
                key: key.address.clone(),
                from: message.from,
            });
        }
        let payload = message.signing_bytes()?;
        let signature = self.signer.sign(key.sig_type, key.private_key(), &payload)?;
        log::debug!(
            "Signed message from {} with sequence {}",
            message.from,
            message.sequence
        );
        Ok(SignedMessage { message, signature })
    }

    /// Push a signed message to the node's mempool
    pub async fn submit(&self, signed: &SignedMessage) -> Result<MessageRef, WalletError> {
        let message_ref = self.node.push(signed).await.map_err(|e| match e {
            RpcError::Rpc { message, .. } => WalletError::SubmissionFailed(message),
            other => WalletError::SubmissionFailed(other.to_string()),
        })?;
        log::info!(
            "Pushed message {} from {} (sequence {})",
            message_ref,
            signed.message.from,
            signed.message.sequence
        );
        Ok(message_ref)
    }
}
