//! Wallet facade over the message pipeline
//!
//! Runs builder output through resolution, signing, submission and
//! confirmation, strictly one step after another.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::builder::MessageDraft;
use super::error::WalletError;
use super::resolver::FeeAndSequenceResolver;
use super::submit::Submitter;
use super::waiter::{check_receipt, ConfirmationWaiter};
use crate::config::{ConfigError, ConfirmationConfig, WalletConfig};
use crate::core::{Address, Message, MessageRef, MsgLookup, SignedMessage, TokenAmount};
use crate::crypto::{KeyPair, Signer};
use crate::rpc::{NodeApi, RpcError};

/// A pushed message and its successful on-chain lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmed {
    pub message: MessageRef,
    pub lookup: MsgLookup,
}

/// Sends messages through a node
pub struct Wallet<N: NodeApi + ?Sized> {
    node: Arc<N>,
    signer: Arc<dyn Signer>,
    max_fee: TokenAmount,
    confirmation: ConfirmationConfig,
}

impl<N: NodeApi + ?Sized> Wallet<N> {
    /// Create a new wallet from an explicit configuration
    pub fn new(
        node: Arc<N>,
        signer: Arc<dyn Signer>,
        config: &WalletConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            node,
            signer,
            max_fee: config.chain.max_fee()?,
            confirmation: config.confirmation.clone(),
        })
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn max_fee(&self) -> &TokenAmount {
        &self.max_fee
    }

    /// Current balance of `address`
    pub async fn balance(&self, address: &Address) -> Result<TokenAmount, WalletError> {
        self.node
            .balance(address)
            .await
            .map_err(WalletError::QueryFailed)
    }

    /// Fill pricing and sequence fields
    pub async fn resolve(&self, draft: MessageDraft) -> Result<Message, WalletError> {
        FeeAndSequenceResolver::new(&*self.node, self.max_fee.clone())
            .resolve(draft)
            .await
    }

    pub fn sign(&self, key: &KeyPair, message: Message) -> Result<SignedMessage, WalletError> {
        Submitter::new(&*self.node, &*self.signer).sign(key, message)
    }

    pub async fn submit(&self, signed: &SignedMessage) -> Result<MessageRef, WalletError> {
        Submitter::new(&*self.node, &*self.signer).submit(signed).await
    }

    /// Resolve, sign and push a message, returning its reference
    ///
    /// An ID-form sender is accepted when the node maps it to the key's
    /// address; the message then carries the key address.
    pub async fn send(
        &self,
        key: &KeyPair,
        mut draft: MessageDraft,
    ) -> Result<MessageRef, WalletError> {
        if key.address != draft.message.from {
            if !self.is_key_account(key, &draft.message.from).await? {
                return Err(WalletError::AddressMismatch {
                    key: key.address.clone(),
                    from: draft.message.from,
                });
            }
            log::debug!(
                "Sender {} is the account of {}",
                draft.message.from,
                key.address
            );
            draft.message.from = key.address.clone();
        }
        let message = self.resolve(draft).await?;
        let signed = self.sign(key, message)?;
        self.submit(&signed).await
    }

    async fn is_key_account(&self, key: &KeyPair, from: &Address) -> Result<bool, WalletError> {
        if !from.is_id() {
            return Ok(false);
        }
        let account = self
            .node
            .account_key(from)
            .await
            .map_err(WalletError::QueryFailed)?;
        Ok(account == key.address)
    }

    /// Poll until the message is on chain or the configured attempt cap is hit
    pub async fn wait(
        &self,
        message: &MessageRef,
        cancel: &CancellationToken,
    ) -> Result<MsgLookup, WalletError> {
        ConfirmationWaiter::new(&*self.node, &self.confirmation)
            .wait(message, cancel)
            .await
    }

    /// Send a message and wait for it to be included
    pub async fn send_and_wait(
        &self,
        key: &KeyPair,
        draft: MessageDraft,
        cancel: &CancellationToken,
    ) -> Result<Confirmed, WalletError> {
        let message = self.send(key, draft).await?;
        let lookup = self.wait(&message, cancel).await?;
        Ok(Confirmed { message, lookup })
    }

    /// Block on the node's own wait with the configured confidence
    pub async fn wait_message(
        &self,
        message: &MessageRef,
        cancel: &CancellationToken,
    ) -> Result<MsgLookup, WalletError> {
        let found = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(WalletError::Cancelled { message: *message });
            }
            found = self.node.wait_message(message, self.confirmation.confidence) => found,
        };
        let found = match found {
            Ok(found) => found,
            Err(RpcError::Transport(e)) if e.is_timeout() => None,
            Err(e) => return Err(WalletError::QueryFailed(e)),
        };
        match found {
            Some(lookup) => check_receipt(lookup),
            None => Err(WalletError::ConfirmationTimeout {
                message: *message,
                attempts: 1,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Signer;
    use crate::testing::{lookup, FakeNode};
    use crate::wallet::MessageBuilder;
    use std::time::Duration;

    fn wallet(node: Arc<FakeNode>) -> Wallet<FakeNode> {
        let mut config = WalletConfig::default();
        config.confirmation.interval_secs = 0;
        config.confirmation.max_attempts = 3;
        Wallet::new(node, Arc::new(Secp256k1Signer::new()), &config).unwrap()
    }

    fn transfer(from: Address) -> MessageDraft {
        MessageBuilder::new()
            .from(from)
            .to(Address::new_id(200))
            .value(TokenAmount::from_whole(2))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_runs_the_whole_pipeline() {
        let node = Arc::new(FakeNode::new());
        let wallet = wallet(node.clone());
        let key = KeyPair::generate_secp256k1();

        let message_ref = wallet.send(&key, transfer(key.address.clone())).await.unwrap();

        let pushed = node.pushed();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].message.sequence, 4);
        assert_eq!(pushed[0].message.gas_limit, 1_000_000);
        assert_eq!(message_ref, MessageRef(pushed[0].message.cid().unwrap()));
    }

    #[tokio::test]
    async fn test_send_with_wrong_key_makes_no_calls() {
        let node = Arc::new(FakeNode::new());
        let wallet = wallet(node.clone());
        let key = KeyPair::generate_secp256k1();

        let other = KeyPair::generate_secp256k1();

        let err = wallet
            .send(&key, transfer(other.address.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, WalletError::AddressMismatch { .. }));
        assert_eq!(node.calls("account_key"), 0);
        assert_eq!(node.calls("estimate_gas"), 0);
        assert_eq!(node.calls("push"), 0);
    }

    #[tokio::test]
    async fn test_send_accepts_id_form_of_key_account() {
        let node = Arc::new(FakeNode::new());
        let wallet = wallet(node.clone());
        let key = KeyPair::generate_secp256k1();
        node.with(|s| {
            s.account_keys.insert(Address::new_id(100), key.address.clone());
        });

        wallet.send(&key, transfer(Address::new_id(100))).await.unwrap();

        let pushed = node.pushed();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].message.from, key.address);
        assert_eq!(node.calls("account_key"), 1);
    }

    #[tokio::test]
    async fn test_send_rejects_id_form_of_another_account() {
        let node = Arc::new(FakeNode::new());
        let wallet = wallet(node.clone());
        let key = KeyPair::generate_secp256k1();
        let other = KeyPair::generate_secp256k1();
        node.with(|s| {
            s.account_keys.insert(Address::new_id(100), other.address.clone());
        });

        let err = wallet
            .send(&key, transfer(Address::new_id(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, WalletError::AddressMismatch { .. }));
        assert_eq!(node.calls("estimate_gas"), 0);
        assert_eq!(node.calls("push"), 0);
    }

    #[tokio::test]
    async fn test_send_and_wait() {
        let node = Arc::new(FakeNode::new());
        let wallet = wallet(node.clone());
        let key = KeyPair::generate_secp256k1();
        node.with(|s| {
            s.searches.push_back(Ok(None));
            s.searches.push_back(Ok(Some(lookup(
                MessageRef(crate::testing::cid_of("x")),
                0,
                Vec::new(),
            ))));
        });

        let confirmed = wallet
            .send_and_wait(&key, transfer(key.address.clone()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(confirmed.lookup.receipt.exit_code, 0);
        assert_eq!(node.calls("search_message"), 2);
    }

    #[tokio::test]
    async fn test_timeout_keeps_the_reference() {
        let node = Arc::new(FakeNode::new());
        let wallet = wallet(node.clone());
        let key = KeyPair::generate_secp256k1();

        let err = wallet
            .send_and_wait(&key, transfer(key.address.clone()), &CancellationToken::new())
            .await
            .unwrap_err();

        let pushed = node.pushed();
        assert!(matches!(err, WalletError::ConfirmationTimeout { attempts: 3, .. }));
        assert_eq!(
            err.message_ref(),
            Some(&MessageRef(pushed[0].message.cid().unwrap()))
        );
    }

    #[tokio::test]
    async fn test_wait_message_uses_node_wait() {
        let node = Arc::new(FakeNode::new());
        let wallet = wallet(node.clone());
        let message = MessageRef(crate::testing::cid_of("waited"));
        node.with(|s| s.searches.push_back(Ok(Some(lookup(message, 16, Vec::new())))));

        let err = wallet
            .wait_message(&message, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::ActorExecutionFailed { code: 16, .. }));
        assert_eq!(node.calls("wait_message"), 1);
    }

    #[tokio::test]
    async fn test_wait_message_honours_cancellation() {
        let node = Arc::new(FakeNode::new());
        node.with(|s| s.search_delay = Some(Duration::from_secs(3600)));
        let wallet = wallet(node.clone());
        let message = MessageRef(crate::testing::cid_of("slow"));
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = wallet.wait_message(&message, &cancel).await.unwrap_err();

        assert!(matches!(err, WalletError::Cancelled { .. }));
        assert_eq!(err.message_ref(), Some(&message));
        assert_eq!(node.calls("wait_message"), 1);
    }

    #[tokio::test]
    async fn test_node_wait_timeout_is_confirmation_timeout() {
        use crate::rpc::LotusClient;
        use httpmock::prelude::*;

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).body_includes("Filecoin.StateWaitMsg");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(serde_json::json!({"jsonrpc": "2.0", "result": null, "id": 1}));
        });
        let mut config = WalletConfig::default();
        config.chain.rpc_addr = server.url("/rpc/v1");
        config.chain.wait_timeout_secs = 1;
        let node = Arc::new(LotusClient::new(&config.chain).unwrap());
        let wallet = Wallet::new(node, Arc::new(Secp256k1Signer::new()), &config).unwrap();
        let message = MessageRef(crate::testing::cid_of("slow"));

        let err = wallet
            .wait_message(&message, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, WalletError::ConfirmationTimeout { attempts: 1, .. }));
        assert_eq!(err.message_ref(), Some(&message));
    }

    #[tokio::test]
    async fn test_balance() {
        let node = Arc::new(FakeNode::new());
        node.with(|s| {
            s.balances.insert(Address::new_id(100), TokenAmount::from_whole(3));
        });
        let wallet = wallet(node);
        assert_eq!(
            wallet.balance(&Address::new_id(100)).await.unwrap(),
            TokenAmount::from_whole(3)
        );
    }
}
