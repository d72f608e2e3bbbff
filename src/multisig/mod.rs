//! Multisig propose / approve / cancel protocol
//!
//! A multisig actor executes a call once a threshold of its signers has
//! approved it. One signer proposes, which gives the call a transaction id;
//! the others approve that id. Approvals and cancels carry a hash of the
//! proposal so the actor rejects them if a different call sits under the id.
//!
//! # Example
//!
//! ```ignore
//! let coordinator = MultisigCoordinator::new(node.clone());
//!
//! // Propose a transfer out of the multisig
//! let draft = coordinator.propose(&alice, &msig, &dest, &amount, METHOD_SEND, vec![]).await?;
//! let confirmed = wallet.send_and_wait(&alice_key, draft, &cancel).await?;
//! let txn_id = decode_propose_return(&confirmed.lookup)?.txn_id;
//!
//! // A second signer approves after checking what they approve
//! let draft = coordinator.approve(&bob, &msig, txn_id, &details).await?;
//! wallet.send_and_wait(&bob_key, draft, &cancel).await?;
//! ```

pub mod coordinator;
pub mod error;
pub mod operation;
pub mod params;
pub mod proposal;

pub use coordinator::{
    decode_approve_return, decode_exec_return, decode_propose_return, CreateMultisig,
    MultisigCoordinator, MultisigSummary, PendingSummary,
};
pub use error::MultisigError;
pub use operation::{ActorCall, Operation, Route};
pub use params::{
    ApproveReturn, ExecReturn, InitMethod, MinerMethod, MultisigMethod, ProposeReturn,
    INIT_ACTOR_ADDR,
};
pub use proposal::{ProposalDetails, ProposalHashData};
