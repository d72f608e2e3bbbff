//! Fee and sequence resolution
//!
//! Fills the pricing fields the caller left unset with one gas estimate and
//! assigns the next sequence unless the caller pinned one. At most two node
//! round-trips per message; nothing is retried.

use super::builder::MessageDraft;
use super::error::WalletError;
use crate::core::{Message, TokenAmount};
use crate::rpc::NodeApi;

pub struct FeeAndSequenceResolver<'a, N: NodeApi + ?Sized> {
    node: &'a N,
    max_fee: TokenAmount,
}

impl<'a, N: NodeApi + ?Sized> FeeAndSequenceResolver<'a, N> {
    /// `max_fee` caps the total fee the node may price the message at
    pub fn new(node: &'a N, max_fee: TokenAmount) -> Self {
        Self { node, max_fee }
    }

    pub async fn resolve(&self, draft: MessageDraft) -> Result<Message, WalletError> {
        let MessageDraft {
            mut message,
            sequence_pinned,
        } = draft;

        if message.needs_gas_estimate() {
            let estimate = self
                .node
                .estimate_gas(&message, &self.max_fee)
                .await
                .map_err(WalletError::ResolutionFailed)?;
            log::debug!(
                "Gas estimate for {}: limit {}, fee cap {}, premium {}",
                message.from,
                estimate.gas_limit,
                estimate.gas_fee_cap,
                estimate.gas_premium
            );

            if message.gas_limit == 0 {
                message.gas_limit = estimate.gas_limit;
            }
            if message.gas_fee_cap.is_zero() {
                message.gas_fee_cap = estimate.gas_fee_cap;
            }
            if message.gas_premium.is_zero() {
                message.gas_premium = estimate.gas_premium;
            }
        }

        if !sequence_pinned {
            message.sequence = self
                .node
                .next_sequence(&message.from)
                .await
                .map_err(WalletError::ResolutionFailed)?;
            log::debug!("Assigned sequence {} to {}", message.sequence, message.from);
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Address;
    use crate::testing::FakeNode;
    use crate::wallet::MessageBuilder;

    fn builder() -> MessageBuilder {
        MessageBuilder::new()
            .from(Address::new_id(100))
            .to(Address::new_id(200))
            .value(TokenAmount::from_whole(1))
    }

    #[tokio::test]
    async fn test_unset_fields_are_estimated_once() {
        let node = FakeNode::new();
        let resolver = FeeAndSequenceResolver::new(&node, TokenAmount::from_whole(1));

        let msg = resolver.resolve(builder().build().unwrap()).await.unwrap();

        assert_eq!(node.calls("estimate_gas"), 1);
        assert_eq!(node.calls("next_sequence"), 1);
        assert_eq!(msg.gas_limit, 1_000_000);
        assert_eq!(msg.gas_fee_cap, TokenAmount::from(200_000));
        assert_eq!(msg.gas_premium, TokenAmount::from(100_000));
        assert_eq!(msg.sequence, 4);
    }

    #[tokio::test]
    async fn test_preset_gas_limit_is_not_clobbered() {
        let node = FakeNode::new();
        let resolver = FeeAndSequenceResolver::new(&node, TokenAmount::from_whole(1));

        let msg = resolver
            .resolve(builder().gas_limit(5000).build().unwrap())
            .await
            .unwrap();

        assert_eq!(node.calls("estimate_gas"), 1);
        assert_eq!(msg.gas_limit, 5000);
        assert!(!msg.gas_fee_cap.is_zero());
        assert!(!msg.gas_premium.is_zero());
    }

    #[tokio::test]
    async fn test_fully_priced_pinned_message_makes_no_calls() {
        let node = FakeNode::new();
        let resolver = FeeAndSequenceResolver::new(&node, TokenAmount::from_whole(1));

        let draft = builder()
            .gas_limit(5000)
            .gas_fee_cap(TokenAmount::from(7))
            .gas_premium(TokenAmount::from(3))
            .sequence(11)
            .build()
            .unwrap();
        let msg = resolver.resolve(draft).await.unwrap();

        assert_eq!(node.calls("estimate_gas"), 0);
        assert_eq!(node.calls("next_sequence"), 0);
        assert_eq!(msg.sequence, 11);
        assert_eq!(msg.gas_fee_cap, TokenAmount::from(7));
    }

    #[tokio::test]
    async fn test_estimate_failure_is_fatal() {
        let node = FakeNode::new();
        node.with(|s| s.estimate_error = Some("insufficient funds".into()));
        let resolver = FeeAndSequenceResolver::new(&node, TokenAmount::from_whole(1));

        let err = resolver.resolve(builder().build().unwrap()).await.unwrap_err();
        assert!(matches!(err, WalletError::ResolutionFailed(_)));
        assert_eq!(node.calls("next_sequence"), 0);
    }

    #[tokio::test]
    async fn test_sequence_failure_is_fatal() {
        let node = FakeNode::new();
        node.with(|s| s.sequence_error = Some("actor not found".into()));
        let resolver = FeeAndSequenceResolver::new(&node, TokenAmount::from_whole(1));

        let err = resolver.resolve(builder().build().unwrap()).await.unwrap_err();
        assert!(matches!(err, WalletError::ResolutionFailed(_)));
    }
}
