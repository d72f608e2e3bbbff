//! In-memory node for unit tests

use async_trait::async_trait;
use cid::Cid;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::{
    dag_cbor_cid, Address, Message, MessageRef, MsgLookup, Receipt, SignedMessage, TokenAmount,
};
use crate::rpc::{
    ActorState, ChainHead, GasEstimate, MinerInfo, NodeApi, PendingTransaction, RpcError,
};

/// Scripted node state
pub(crate) struct FakeState {
    pub height: i64,
    pub balances: HashMap<Address, TokenAmount>,
    pub estimate: GasEstimate,
    pub estimate_error: Option<String>,
    pub next_sequence: u64,
    pub sequence_error: Option<String>,
    pub ids: HashMap<Address, Address>,
    pub actors: HashMap<Address, ActorState>,
    pub miners: HashMap<Address, MinerInfo>,
    pub available: HashMap<Address, TokenAmount>,
    pub account_keys: HashMap<Address, Address>,
    pub pushed: Vec<SignedMessage>,
    pub push_error: Option<String>,
    /// Results handed out by successive searches; `None` once exhausted
    pub searches: VecDeque<Result<Option<MsgLookup>, String>>,
    /// Time each search or wait takes before answering
    pub search_delay: Option<Duration>,
    pub pending: HashMap<Address, Vec<PendingTransaction>>,
    pub network_version: u32,
    pub code_cids: HashMap<String, Cid>,
    pub calls: HashMap<&'static str, usize>,
}

pub(crate) struct FakeNode {
    state: Mutex<FakeState>,
}

pub(crate) fn cid_of(label: &str) -> Cid {
    dag_cbor_cid(label.as_bytes()).unwrap()
}

pub(crate) fn lookup(message: MessageRef, exit_code: i64, return_data: Vec<u8>) -> MsgLookup {
    MsgLookup {
        message,
        receipt: Receipt {
            exit_code,
            return_data,
            gas_used: 1000,
        },
        height: 100,
    }
}

fn not_found(what: &str) -> RpcError {
    RpcError::Rpc {
        code: 1,
        message: format!("{} not found", what),
    }
}

impl FakeNode {
    pub fn new() -> Self {
        let mut code_cids = HashMap::new();
        code_cids.insert("multisig".to_string(), cid_of("multisig-code"));
        code_cids.insert("account".to_string(), cid_of("account-code"));
        Self {
            state: Mutex::new(FakeState {
                height: 1000,
                balances: HashMap::new(),
                estimate: GasEstimate {
                    gas_limit: 1_000_000,
                    gas_fee_cap: TokenAmount::from(200_000),
                    gas_premium: TokenAmount::from(100_000),
                },
                estimate_error: None,
                next_sequence: 4,
                sequence_error: None,
                ids: HashMap::new(),
                actors: HashMap::new(),
                miners: HashMap::new(),
                available: HashMap::new(),
                account_keys: HashMap::new(),
                pushed: Vec::new(),
                push_error: None,
                searches: VecDeque::new(),
                search_delay: None,
                pending: HashMap::new(),
                network_version: 21,
                code_cids,
                calls: HashMap::new(),
            }),
        }
    }

    /// Mutate the scripted state
    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn calls(&self, method: &str) -> usize {
        self.with(|s| s.calls.get(method).copied().unwrap_or(0))
    }

    async fn search_delay(&self) {
        if let Some(delay) = self.with(|s| s.search_delay) {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn pushed(&self) -> Vec<SignedMessage> {
        self.with(|s| s.pushed.clone())
    }

    /// Register `address` as a multisig actor
    pub fn add_multisig(&self, address: &Address, balance: TokenAmount) {
        self.with(|s| {
            let code = s.code_cids["multisig"];
            s.actors.insert(
                address.clone(),
                ActorState {
                    code,
                    head: cid_of("multisig-head"),
                    nonce: 0,
                    balance,
                },
            );
        });
    }

    fn record(&self, method: &'static str) {
        self.with(|s| *s.calls.entry(method).or_insert(0) += 1);
    }
}

#[async_trait]
impl NodeApi for FakeNode {
    async fn chain_head(&self) -> Result<ChainHead, RpcError> {
        self.record("chain_head");
        Ok(ChainHead {
            height: self.with(|s| s.height),
        })
    }

    async fn balance(&self, address: &Address) -> Result<TokenAmount, RpcError> {
        self.record("balance");
        Ok(self.with(|s| s.balances.get(address).cloned().unwrap_or_default()))
    }

    async fn estimate_gas(
        &self,
        _message: &Message,
        _max_fee: &TokenAmount,
    ) -> Result<GasEstimate, RpcError> {
        self.record("estimate_gas");
        self.with(|s| match &s.estimate_error {
            Some(message) => Err(RpcError::Rpc {
                code: 1,
                message: message.clone(),
            }),
            None => Ok(s.estimate.clone()),
        })
    }

    async fn next_sequence(&self, _address: &Address) -> Result<u64, RpcError> {
        self.record("next_sequence");
        self.with(|s| match &s.sequence_error {
            Some(message) => Err(RpcError::Rpc {
                code: 1,
                message: message.clone(),
            }),
            None => Ok(s.next_sequence),
        })
    }

    async fn lookup_id(&self, address: &Address) -> Result<Address, RpcError> {
        self.record("lookup_id");
        if address.is_id() {
            return Ok(address.clone());
        }
        self.with(|s| s.ids.get(address).cloned())
            .ok_or_else(|| not_found("actor"))
    }

    async fn actor(&self, address: &Address) -> Result<ActorState, RpcError> {
        self.record("actor");
        self.with(|s| s.actors.get(address).cloned())
            .ok_or_else(|| not_found("actor"))
    }

    async fn miner_info(&self, miner: &Address) -> Result<MinerInfo, RpcError> {
        self.record("miner_info");
        self.with(|s| s.miners.get(miner).cloned())
            .ok_or_else(|| not_found("miner"))
    }

    async fn miner_available_balance(&self, miner: &Address) -> Result<TokenAmount, RpcError> {
        self.record("miner_available_balance");
        self.with(|s| s.available.get(miner).cloned())
            .ok_or_else(|| not_found("miner"))
    }

    async fn account_key(&self, address: &Address) -> Result<Address, RpcError> {
        self.record("account_key");
        self.with(|s| s.account_keys.get(address).cloned())
            .ok_or_else(|| not_found("account"))
    }

    async fn push(&self, message: &SignedMessage) -> Result<MessageRef, RpcError> {
        self.record("push");
        let cid = message.message.cid().map_err(|e| RpcError::Rpc {
            code: 1,
            message: e.to_string(),
        })?;
        self.with(|s| match &s.push_error {
            Some(error) => Err(RpcError::Rpc {
                code: 1,
                message: error.clone(),
            }),
            None => {
                s.pushed.push(message.clone());
                Ok(MessageRef(cid))
            }
        })
    }

    async fn search_message(&self, _message: &MessageRef) -> Result<Option<MsgLookup>, RpcError> {
        self.record("search_message");
        self.search_delay().await;
        match self.with(|s| s.searches.pop_front()) {
            None => Ok(None),
            Some(Ok(found)) => Ok(found),
            Some(Err(message)) => Err(RpcError::Rpc { code: 1, message }),
        }
    }

    async fn wait_message(
        &self,
        message: &MessageRef,
        _confidence: u64,
    ) -> Result<Option<MsgLookup>, RpcError> {
        self.record("wait_message");
        self.search_delay().await;
        match self.with(|s| s.searches.pop_front()) {
            None => Ok(None),
            Some(Ok(found)) => Ok(found.map(|l| MsgLookup {
                message: *message,
                ..l
            })),
            Some(Err(message)) => Err(RpcError::Rpc { code: 1, message }),
        }
    }

    async fn pending_transactions(
        &self,
        multisig: &Address,
    ) -> Result<Vec<PendingTransaction>, RpcError> {
        self.record("pending_transactions");
        Ok(self.with(|s| s.pending.get(multisig).cloned().unwrap_or_default()))
    }

    async fn network_version(&self) -> Result<u32, RpcError> {
        self.record("network_version");
        Ok(self.with(|s| s.network_version))
    }

    async fn actor_code_cids(&self, _version: u32) -> Result<HashMap<String, Cid>, RpcError> {
        self.record("actor_code_cids");
        Ok(self.with(|s| s.code_cids.clone()))
    }
}
