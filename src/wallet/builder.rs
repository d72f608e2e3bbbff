//! Message assembly
//!
//! Turns caller intent into a `Message`. Pricing and sequence fields that the
//! caller leaves out are zero here and get filled by the resolver.

use super::error::WalletError;
use crate::core::{Address, Message, MethodNum, TokenAmount, METHOD_SEND};

/// A built message and whether its sequence was chosen by the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageDraft {
    pub message: Message,
    pub sequence_pinned: bool,
}

/// Builder for unsigned messages
#[derive(Clone, Debug, Default)]
pub struct MessageBuilder {
    from: Option<Address>,
    to: Option<Address>,
    value: TokenAmount,
    method: MethodNum,
    params: Vec<u8>,
    gas_limit: Option<i64>,
    gas_fee_cap: Option<TokenAmount>,
    gas_premium: Option<TokenAmount>,
    sequence: Option<u64>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self {
            method: METHOD_SEND,
            ..Default::default()
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn value(mut self, value: TokenAmount) -> Self {
        self.value = value;
        self
    }

    /// Set the actor method and its encoded parameters
    pub fn call(mut self, method: MethodNum, params: Vec<u8>) -> Self {
        self.method = method;
        self.params = params;
        self
    }

    pub fn gas_limit(mut self, gas_limit: i64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn gas_fee_cap(mut self, fee_cap: TokenAmount) -> Self {
        self.gas_fee_cap = Some(fee_cap);
        self
    }

    pub fn gas_premium(mut self, premium: TokenAmount) -> Self {
        self.gas_premium = Some(premium);
        self
    }

    /// Pin the sequence instead of asking the node for the next one
    pub fn sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Assemble the message
    pub fn build(self) -> Result<MessageDraft, WalletError> {
        let from = self
            .from
            .ok_or_else(|| WalletError::InvalidInput("message sender is required".into()))?;
        let to = self
            .to
            .ok_or_else(|| WalletError::InvalidInput("message recipient is required".into()))?;

        if self.value.is_negative() {
            return Err(WalletError::InvalidInput(format!(
                "negative value {}",
                self.value
            )));
        }
        let gas_limit = self.gas_limit.unwrap_or(0);
        if gas_limit < 0 {
            return Err(WalletError::InvalidInput(format!(
                "negative gas limit {}",
                gas_limit
            )));
        }
        let gas_fee_cap = self.gas_fee_cap.unwrap_or_default();
        let gas_premium = self.gas_premium.unwrap_or_default();
        if gas_fee_cap.is_negative() || gas_premium.is_negative() {
            return Err(WalletError::InvalidInput("negative gas price".into()));
        }

        Ok(MessageDraft {
            message: Message {
                version: 0,
                to,
                from,
                sequence: self.sequence.unwrap_or(0),
                value: self.value,
                gas_limit,
                gas_fee_cap,
                gas_premium,
                method: self.method,
                params: self.params,
            },
            sequence_pinned: self.sequence.is_some(),
        })
    }
}
