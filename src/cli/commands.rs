//! CLI commands for the wallet
//!
//! Implements all command handlers for the CLI interface.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::codec::{ActorKind, BuiltinParamsCodec, ParamsCodec};
use crate::config::WalletConfig;
use crate::core::{Address, MessageRef, MethodNum, TokenAmount};
use crate::crypto::{KeyPair, Secp256k1Signer};
use crate::multisig::{
    decode_approve_return, decode_exec_return, decode_propose_return, CreateMultisig,
    MultisigCoordinator, Operation, ProposalDetails, Route,
};
use crate::rpc::LotusClient;
use crate::wallet::{Confirmed, MessageBuilder, MessageDraft, Wallet};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub config: WalletConfig,
    pub wallet: Wallet<LotusClient>,
    pub coordinator: MultisigCoordinator<LotusClient>,
    /// Fired by Ctrl-C to stop a confirmation wait
    pub cancel: CancellationToken,
}

impl AppState {
    /// Connect to the configured node
    pub fn new(config: WalletConfig) -> CliResult<Self> {
        let node = Arc::new(LotusClient::new(&config.chain)?);
        log::debug!("Using node at {}", node.url());
        let wallet = Wallet::new(node.clone(), Arc::new(Secp256k1Signer::new()), &config)?;

        Ok(Self {
            coordinator: MultisigCoordinator::new(node),
            wallet,
            config,
            cancel: CancellationToken::new(),
        })
    }

    fn key(&self) -> CliResult<KeyPair> {
        Ok(self.config.account.key_pair()?)
    }

    fn print_link(&self, message: &MessageRef) {
        if let Some(explorer) = &self.config.chain.explorer {
            println!("   🔗 {}{}", explorer, message);
        }
    }

    /// Send a draft, print its reference and optionally wait for it
    async fn submit(
        &self,
        key: &KeyPair,
        draft: MessageDraft,
        wait: bool,
    ) -> CliResult<Option<Confirmed>> {
        let message = self.wallet.send(key, draft).await?;
        println!("📤 Message sent: {}", message);
        self.print_link(&message);
        if !wait {
            return Ok(None);
        }

        println!("⏳ Waiting for confirmation...");
        let lookup = match self.wallet.wait(&message, &self.cancel).await {
            Ok(lookup) => lookup,
            Err(e) => {
                if let Some(message) = e.message_ref() {
                    println!("⚠️  Check status later with: fil-wallet wait {}", message);
                }
                return Err(e.into());
            }
        };
        println!("✅ Included at height {}", lookup.height);
        println!("   ⛽ Gas used: {}", lookup.receipt.gas_used);
        Ok(Some(Confirmed { message, lookup }))
    }
}

/// Options of the `send` command
pub struct SendOptions {
    pub to: String,
    pub amount: String,
    pub from: Option<String>,
    pub method: MethodNum,
    pub params_hex: Option<String>,
    pub gas_limit: Option<i64>,
    pub gas_fee_cap: Option<String>,
    pub gas_premium: Option<String>,
    pub nonce: Option<u64>,
    pub wait: bool,
}

/// Claimed contents of a pending multisig transaction
pub struct ProposalArgs {
    pub to: String,
    pub amount: String,
    pub method: MethodNum,
    pub params_hex: Option<String>,
}

pub fn parse_address(s: &str) -> CliResult<Address> {
    Ok(s.trim().parse::<Address>()?)
}

pub fn parse_amount(s: &str) -> CliResult<TokenAmount> {
    Ok(TokenAmount::parse_fil(s)?)
}

pub fn parse_params(params_hex: Option<&str>) -> CliResult<Vec<u8>> {
    match params_hex {
        None => Ok(Vec::new()),
        Some(h) => Ok(hex::decode(h.trim_start_matches("0x"))?),
    }
}

/// Show the balance of an address
pub async fn cmd_balance(state: &AppState, address: &str) -> CliResult<()> {
    let address = parse_address(address)?;
    let balance = state.wallet.balance(&address).await?;
    println!("💰 Balance of {}: {}", address, balance);
    Ok(())
}

/// Send value or call a method
pub async fn cmd_send(state: &AppState, options: SendOptions) -> CliResult<()> {
    let key = state.key()?;
    let from = match &options.from {
        Some(from) => parse_address(from)?,
        None => key.address.clone(),
    };

    let mut builder = MessageBuilder::new()
        .from(from)
        .to(parse_address(&options.to)?)
        .value(parse_amount(&options.amount)?)
        .call(options.method, parse_params(options.params_hex.as_deref())?);
    if let Some(gas_limit) = options.gas_limit {
        builder = builder.gas_limit(gas_limit);
    }
    if let Some(fee_cap) = &options.gas_fee_cap {
        builder = builder.gas_fee_cap(fee_cap.parse()?);
    }
    if let Some(premium) = &options.gas_premium {
        builder = builder.gas_premium(premium.parse()?);
    }
    if let Some(nonce) = options.nonce {
        builder = builder.sequence(nonce);
    }

    println!("💸 Sending {} to {}", options.amount, options.to);
    state.submit(&key, builder.build()?, options.wait).await?;
    Ok(())
}

/// Wait for a previously pushed message
pub async fn cmd_wait(state: &AppState, message: &str) -> CliResult<()> {
    let message: MessageRef = message.parse()?;
    println!("⏳ Waiting for {}...", message);
    let lookup = state.wallet.wait(&message, &state.cancel).await?;
    println!("✅ Included at height {}", lookup.height);
    println!("   Exit code: {}", lookup.receipt.exit_code);
    Ok(())
}

/// Generate a new secp256k1 key
pub fn cmd_key_generate() -> CliResult<()> {
    let key = KeyPair::generate_secp256k1();
    println!("🔑 New key generated!");
    println!("   Address: {}", key.address);
    println!("   Export (hex-lotus): {}", key.to_lotus_hex()?);
    println!("   ⚠️  Store the export somewhere safe; it is the only copy.");
    Ok(())
}

/// Show the address of the configured key
pub fn cmd_key_show(config: &WalletConfig) -> CliResult<()> {
    let key = config.account.key_pair()?;
    println!("🔑 Address: {}", key.address);
    Ok(())
}

/// Encode JSON parameters to hex
pub fn cmd_params_encode(actor: &str, method: MethodNum, json: &str) -> CliResult<()> {
    let codec = BuiltinParamsCodec::for_actor(actor.parse::<ActorKind>()?);
    let value: serde_json::Value = serde_json::from_str(json)?;
    let bytes = codec.encode_params(method, &value)?;
    println!("{}", hex::encode(bytes));
    Ok(())
}

/// Decode hex parameters to JSON
pub fn cmd_params_decode(actor: &str, method: MethodNum, params_hex: &str) -> CliResult<()> {
    let codec = BuiltinParamsCodec::for_actor(actor.parse::<ActorKind>()?);
    let bytes = parse_params(Some(params_hex))?;
    let value = codec.decode_params(method, &bytes)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Deploy a new multisig
pub async fn cmd_msig_create(
    state: &AppState,
    signers: &[String],
    threshold: Option<u64>,
    value: &str,
    unlock_duration: i64,
    start_epoch: i64,
) -> CliResult<()> {
    let key = state.key()?;
    let request = CreateMultisig {
        signers: signers
            .iter()
            .map(|s| parse_address(s))
            .collect::<CliResult<Vec<_>>>()?,
        threshold,
        unlock_duration,
        start_epoch,
        value: parse_amount(value)?,
    };

    let draft = state.coordinator.create(&key.address, &request).await?;
    if let Some(confirmed) = state.submit(&key, draft, true).await? {
        let ret = decode_exec_return(&confirmed.lookup)?;
        println!("🔐 Multisig created!");
        println!("   ID address: {}", ret.id_address);
        println!("   Robust address: {}", ret.robust_address);
    }
    Ok(())
}

/// Propose a transfer out of a multisig
pub async fn cmd_msig_propose(
    state: &AppState,
    multisig: &str,
    proposal: ProposalArgs,
) -> CliResult<()> {
    let key = state.key()?;
    let multisig = parse_address(multisig)?;
    let draft = state
        .coordinator
        .propose(
            &key.address,
            &multisig,
            &parse_address(&proposal.to)?,
            &parse_amount(&proposal.amount)?,
            proposal.method,
            parse_params(proposal.params_hex.as_deref())?,
        )
        .await?;
    report(
        state.submit(&key, draft, true).await?,
        &Route::Propose { multisig },
    )
}

/// Approve a pending transaction, checking it first unless `blind`
pub async fn cmd_msig_approve(
    state: &AppState,
    multisig: &str,
    txn_id: i64,
    proposer: Option<&str>,
    proposal: Option<ProposalArgs>,
    blind: bool,
) -> CliResult<()> {
    let key = state.key()?;
    let multisig = parse_address(multisig)?;
    let proposer = proposer.map(parse_address).transpose()?;
    let draft = match txn_check(proposer, proposal.as_ref(), blind)? {
        TxnCheck::Proposal(details) => {
            state
                .coordinator
                .approve(&key.address, &multisig, txn_id, &details)
                .await?
        }
        TxnCheck::Blind => {
            println!("⚠️  Approving transaction {} without checking its contents", txn_id);
            state.coordinator.approve_blind(&key.address, &multisig, txn_id)?
        }
    };
    let route = Route::Approve {
        multisig,
        txn_id,
        proposer: key.address.clone(),
    };
    report(state.submit(&key, draft, true).await?, &route)
}

/// Cancel a transaction the configured key proposed
pub async fn cmd_msig_cancel(
    state: &AppState,
    multisig: &str,
    txn_id: i64,
    proposal: Option<ProposalArgs>,
    blind: bool,
) -> CliResult<()> {
    let key = state.key()?;
    let multisig = parse_address(multisig)?;
    let proposer = proposal.as_ref().map(|_| key.address.clone());
    let draft = match txn_check(proposer, proposal.as_ref(), blind)? {
        TxnCheck::Proposal(details) => {
            state
                .coordinator
                .cancel(&key.address, &multisig, txn_id, &details)
                .await?
        }
        TxnCheck::Blind => {
            println!("⚠️  Cancelling transaction {} without checking its contents", txn_id);
            state.coordinator.cancel_blind(&key.address, &multisig, txn_id)?
        }
    };
    state.submit(&key, draft, true).await?;
    println!("🗑️  Transaction {} cancelled", txn_id);
    Ok(())
}

/// Show balance and pending transactions of a multisig
pub async fn cmd_msig_inspect(state: &AppState, multisig: &str) -> CliResult<()> {
    let summary = state.coordinator.inspect(&parse_address(multisig)?).await?;
    println!("🔐 Multisig {}", summary.address);
    println!("   💰 Balance: {}", summary.balance);

    if summary.pending.is_empty() {
        println!("   No pending transactions.");
        return Ok(());
    }
    println!("   Pending transactions ({}):", summary.pending.len());
    for pending in &summary.pending {
        let txn = &pending.transaction;
        println!("   #{} → {} ({})", txn.id, txn.to, txn.value);
        println!("      ├─ Method: {}", txn.method);
        match &pending.decoded_params {
            Some(params) => println!("      ├─ Params: {}", params),
            None if txn.params.is_empty() => {}
            None => println!("      ├─ Params: 0x{}", hex::encode(&txn.params)),
        }
        let approved: Vec<String> = txn.approved.iter().map(|a| a.to_string()).collect();
        println!("      └─ Approved by: {}", approved.join(", "));
    }
    Ok(())
}

/// Build an operation for `route`, send it and wait for the result
pub async fn cmd_route(state: &AppState, operation: Operation, route: Route) -> CliResult<()> {
    let key = state.key()?;
    println!("🛠️  {} via {}", operation.name(), route_name(&route));
    let draft = state
        .coordinator
        .build_and_route(&key.address, &operation, &route)
        .await?;
    report(state.submit(&key, draft, true).await?, &route)
}

/// How an approval or cancel identifies the transaction it acts on
#[derive(Debug, PartialEq, Eq)]
enum TxnCheck {
    /// Compare with the pending transaction before sending
    Proposal(ProposalDetails),
    /// Act on the id alone, only when asked for with `--blind`
    Blind,
}

fn txn_check(
    proposer: Option<Address>,
    proposal: Option<&ProposalArgs>,
    blind: bool,
) -> CliResult<TxnCheck> {
    match (proposer, proposal, blind) {
        (None, None, true) => Ok(TxnCheck::Blind),
        (_, _, true) => Err("--blind cannot be combined with proposal flags".into()),
        (Some(proposer), Some(proposal), false) => {
            Ok(TxnCheck::Proposal(details(proposer, proposal)?))
        }
        (None, _, false) => {
            Err("the proposer is required; pass --proposer, or --blind to skip the check".into())
        }
        (Some(_), None, false) => {
            Err("the proposal is required; pass --to, or --blind to skip the check".into())
        }
    }
}

fn details(proposer: Address, proposal: &ProposalArgs) -> CliResult<ProposalDetails> {
    Ok(ProposalDetails {
        proposer,
        to: parse_address(&proposal.to)?,
        value: parse_amount(&proposal.amount)?,
        method: proposal.method,
        params: parse_params(proposal.params_hex.as_deref())?,
    })
}

fn route_name(route: &Route) -> String {
    match route {
        Route::Direct => "direct message".to_string(),
        Route::Propose { multisig } => format!("proposal to {}", multisig),
        Route::Approve {
            multisig, txn_id, ..
        } => format!("approval of {} on {}", txn_id, multisig),
        Route::Cancel { multisig, txn_id } => format!("cancel of {} on {}", txn_id, multisig),
    }
}

/// Print what a confirmed multisig message did
fn report(confirmed: Option<Confirmed>, route: &Route) -> CliResult<()> {
    let Some(confirmed) = confirmed else {
        return Ok(());
    };
    match route {
        Route::Propose { .. } => {
            let ret = decode_propose_return(&confirmed.lookup)?;
            println!("📝 Transaction ID: {}", ret.txn_id);
            if ret.applied {
                println!("   Threshold met, executed with exit code {}", ret.code);
            } else {
                println!("   Waiting for more approvals");
            }
        }
        Route::Approve { .. } => {
            let ret = decode_approve_return(&confirmed.lookup)?;
            if ret.applied {
                println!("🎉 Threshold met, executed with exit code {}", ret.code);
            } else {
                println!("👍 Approval recorded");
            }
        }
        Route::Direct | Route::Cancel { .. } => {}
    }
    Ok(())
}
