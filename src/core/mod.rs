//! Core data model
//!
//! This module contains the values every other component passes around:
//! - Addresses (ID and robust forms)
//! - Token amounts (attoFIL)
//! - Messages, signed messages and their content hashes
//! - On-chain lookups and receipts

pub mod address;
pub mod json;
pub mod message;
pub mod token;

pub use address::{needs_resolution, Address, AddressError, Protocol};
pub use message::{
    dag_cbor_cid, EncodingError, Message, MessageRef, MethodNum, MsgLookup, Receipt,
    SignedMessage, METHOD_CONSTRUCTOR, METHOD_SEND,
};
pub use token::{TokenAmount, TokenError};
