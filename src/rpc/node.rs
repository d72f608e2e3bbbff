//! The node interface the pipeline depends on

use async_trait::async_trait;
use cid::Cid;
use std::collections::HashMap;

use super::types::{ActorState, ChainHead, GasEstimate, MinerInfo, PendingTransaction, RpcError};
use crate::core::{Address, Message, MessageRef, MsgLookup, SignedMessage, TokenAmount};

/// Query and submit operations of a remote Filecoin node.
///
/// Every call is a single request with no retry. `push` is the only call that
/// changes remote state.
#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn chain_head(&self) -> Result<ChainHead, RpcError>;

    async fn balance(&self, address: &Address) -> Result<TokenAmount, RpcError>;

    /// Estimate pricing for `message`, never exceeding `max_fee` in total
    async fn estimate_gas(
        &self,
        message: &Message,
        max_fee: &TokenAmount,
    ) -> Result<GasEstimate, RpcError>;

    /// Next sequence number the mempool expects from `address`
    async fn next_sequence(&self, address: &Address) -> Result<u64, RpcError>;

    async fn lookup_id(&self, address: &Address) -> Result<Address, RpcError>;

    async fn actor(&self, address: &Address) -> Result<ActorState, RpcError>;

    async fn miner_info(&self, miner: &Address) -> Result<MinerInfo, RpcError>;

    async fn miner_available_balance(&self, miner: &Address) -> Result<TokenAmount, RpcError>;

    /// Key address behind an account actor
    async fn account_key(&self, address: &Address) -> Result<Address, RpcError>;

    async fn push(&self, message: &SignedMessage) -> Result<MessageRef, RpcError>;

    /// `Ok(None)` while the message is not yet on chain
    async fn search_message(&self, message: &MessageRef) -> Result<Option<MsgLookup>, RpcError>;

    /// Blocks on the node side until the message has `confidence` confirmations
    async fn wait_message(
        &self,
        message: &MessageRef,
        confidence: u64,
    ) -> Result<Option<MsgLookup>, RpcError>;

    async fn pending_transactions(
        &self,
        multisig: &Address,
    ) -> Result<Vec<PendingTransaction>, RpcError>;

    async fn network_version(&self) -> Result<u32, RpcError>;

    /// Builtin actor code CIDs keyed by actor name for a network version
    async fn actor_code_cids(&self, version: u32) -> Result<HashMap<String, Cid>, RpcError>;
}
