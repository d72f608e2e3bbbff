//! Command-line handlers used by the `fil-wallet` binary

pub mod commands;

pub use commands::*;
