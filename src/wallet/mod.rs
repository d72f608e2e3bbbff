//! Message pipeline
//!
//! Builder, resolver, signer/submitter and confirmation waiter, plus the
//! `Wallet` facade that runs them in order.

pub mod builder;
pub mod error;
pub mod resolver;
pub mod submit;
pub mod waiter;
pub mod wallet;

pub use builder::{MessageBuilder, MessageDraft};
pub use error::WalletError;
pub use resolver::FeeAndSequenceResolver;
pub use submit::Submitter;
pub use waiter::{check_receipt, ConfirmationWaiter, WaitState};
pub use wallet::{Confirmed, Wallet};
