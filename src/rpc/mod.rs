//! Remote node access
//!
//! `NodeApi` is the interface the pipeline and the multisig coordinator are
//! written against. `LotusClient` implements it over JSON-RPC.

pub mod client;
pub mod node;
pub mod types;

pub use client::LotusClient;
pub use node::NodeApi;
pub use types::{
    ActorState, ChainHead, GasEstimate, MinerInfo, PendingBeneficiaryChange, PendingTransaction,
    RpcError,
};
