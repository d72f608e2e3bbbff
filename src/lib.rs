//! fil-wallet: client-side message pipeline and multisig coordinator for Filecoin
//!
//! This crate turns a transfer or call intent into a priced, sequenced and
//! signed message, pushes it to a node and tracks it to inclusion. On top of
//! that it implements the multisig propose / approve / cancel protocol:
//! - Address and token amount types with their text and CBOR forms
//! - Canonical message encoding and content hashes
//! - secp256k1 signing behind a `Signer` trait
//! - A typed JSON-RPC client for Lotus-compatible nodes
//! - Gas and sequence resolution, submission and cancellable confirmation polling
//! - Proposal hashing with a client-side check before approving or cancelling
//! - Miner management recipes routed directly or through a multisig
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fil_wallet::config::WalletConfig;
//! use fil_wallet::crypto::Secp256k1Signer;
//! use fil_wallet::rpc::LotusClient;
//! use fil_wallet::wallet::{MessageBuilder, Wallet};
//!
//! let config = WalletConfig::from_file("wallet.yaml".as_ref())?;
//! let node = Arc::new(LotusClient::new(&config.chain)?);
//! let wallet = Wallet::new(node, Arc::new(Secp256k1Signer::new()), &config)?;
//! let key = config.account.key_pair()?;
//!
//! let draft = MessageBuilder::new()
//!     .from(key.address.clone())
//!     .to("f01234".parse()?)
//!     .value(TokenAmount::parse_fil("1.5")?)
//!     .build()?;
//! let confirmed = wallet.send_and_wait(&key, draft, &CancellationToken::new()).await?;
//! println!("Included at height {}", confirmed.lookup.height);
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod core;
pub mod crypto;
pub mod multisig;
pub mod rpc;
pub mod wallet;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use codec::{ActorKind, BuiltinParamsCodec, ParamsCodec};
pub use config::WalletConfig;
pub use core::{Address, Message, MessageRef, MsgLookup, SignedMessage, TokenAmount};
pub use crypto::{KeyPair, Secp256k1Signer, Signer};
pub use multisig::{MultisigCoordinator, MultisigError, Operation, ProposalHashData, Route};
pub use rpc::{LotusClient, NodeApi};
pub use wallet::{MessageBuilder, Wallet, WalletError};
