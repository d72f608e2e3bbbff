//! Actor parameter encoding
//!
//! Method parameters travel as CBOR on chain and as positional JSON arrays
//! at the edges (command line, logs). `ParamsCodec` converts between the two
//! for one actor type.

pub mod builtin;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::core::MethodNum;

pub use builtin::BuiltinParamsCodec;

/// Errors converting method parameters
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{actor} actor has no known method {method}")]
    UnknownMethod { actor: ActorKind, method: MethodNum },
    #[error("Method {0} takes no parameters")]
    UnexpectedParams(MethodNum),
    #[error("Unknown actor kind: {0}")]
    UnknownActor(String),
    #[error("Invalid JSON parameters: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid CBOR parameters: {0}")]
    Cbor(#[from] fvm_ipld_encoding::Error),
}

/// Built-in actor types with known parameter layouts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorKind {
    Multisig,
    Miner,
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorKind::Multisig => write!(f, "multisig"),
            ActorKind::Miner => write!(f, "miner"),
        }
    }
}

impl FromStr for ActorKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multisig" | "msig" => Ok(ActorKind::Multisig),
            "miner" | "storageminer" => Ok(ActorKind::Miner),
            other => Err(CodecError::UnknownActor(other.to_string())),
        }
    }
}

/// Converts method parameters between JSON and their on-chain bytes
pub trait ParamsCodec: Send + Sync {
    fn encode_params(
        &self,
        method: MethodNum,
        params: &serde_json::Value,
    ) -> Result<Vec<u8>, CodecError>;

    fn decode_params(&self, method: MethodNum, params: &[u8])
        -> Result<serde_json::Value, CodecError>;
}
