//! fil-wallet CLI Application
//!
//! A command-line interface for sending messages and coordinating multisig
//! actors through a Filecoin node.

use clap::{Args, Parser, Subcommand};
use fil_wallet::cli::{self, AppState, CliResult, ProposalArgs, SendOptions};
use fil_wallet::config::WalletConfig;
use fil_wallet::multisig::{Operation, Route};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fil-wallet")]
#[command(version)]
#[command(about = "Send messages and coordinate multisig actors through a Filecoin node")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Node RPC endpoint, overrides the config file
    #[arg(long, global = true)]
    rpc: Option<String>,

    /// Node API token, overrides the config file
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the balance of an address
    Balance {
        address: String,
    },

    /// Send FIL or call a method
    Send {
        /// Recipient address
        to: String,

        /// Amount, e.g. "1.5" or "42 attofil"
        amount: String,

        /// Sender, defaults to the configured key
        #[arg(long)]
        from: Option<String>,

        #[arg(long, default_value = "0")]
        method: u64,

        /// Method parameters as hex
        #[arg(long)]
        params_hex: Option<String>,

        #[arg(long)]
        gas_limit: Option<i64>,

        /// Fee cap in attoFIL
        #[arg(long)]
        gas_fee_cap: Option<String>,

        /// Premium in attoFIL
        #[arg(long)]
        gas_premium: Option<String>,

        #[arg(long)]
        nonce: Option<u64>,

        /// Wait for the message to be included
        #[arg(long)]
        wait: bool,
    },

    /// Wait for a pushed message
    Wait {
        /// Message CID
        message: String,
    },

    /// Key operations
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Convert actor method parameters between JSON and hex
    Params {
        #[command(subcommand)]
        action: ParamsCommands,
    },

    /// Multisig operations
    Msig {
        #[command(subcommand)]
        action: MsigCommands,
    },

    /// Storage miner management sent directly by the owner or worker
    Miner {
        #[command(subcommand)]
        action: MinerCommands,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Generate a new secp256k1 key
    Generate,

    /// Show the address of the configured key
    Show,
}

#[derive(Subcommand)]
enum ParamsCommands {
    /// Encode positional JSON parameters
    Encode {
        /// Actor kind: multisig or miner
        #[arg(long)]
        actor: String,

        #[arg(long)]
        method: u64,

        json: String,
    },

    /// Decode hex parameters
    Decode {
        /// Actor kind: multisig or miner
        #[arg(long)]
        actor: String,

        #[arg(long)]
        method: u64,

        params_hex: String,
    },
}

/// The transaction a multisig message refers to
#[derive(Args)]
struct ProposalFlags {
    /// Destination of the transaction
    #[arg(long)]
    to: Option<String>,

    #[arg(long, default_value = "0")]
    amount: String,

    #[arg(long, default_value = "0")]
    method: u64,

    #[arg(long)]
    params_hex: Option<String>,
}

impl ProposalFlags {
    fn proposal(&self) -> Option<ProposalArgs> {
        self.to.as_ref().map(|to| ProposalArgs {
            to: to.clone(),
            amount: self.amount.clone(),
            method: self.method,
            params_hex: self.params_hex.clone(),
        })
    }
}

/// Routing for multisig recipes; proposes unless told otherwise
#[derive(Args)]
struct RouteFlags {
    /// Approve this pending transaction instead of proposing
    #[arg(long, requires = "proposer", conflicts_with = "cancel")]
    approve: Option<i64>,

    /// Proposer of the transaction being approved
    #[arg(long)]
    proposer: Option<String>,

    /// Cancel this pending transaction instead of proposing
    #[arg(long)]
    cancel: Option<i64>,
}

impl RouteFlags {
    fn route(&self, multisig: &str) -> CliResult<Route> {
        let multisig = cli::parse_address(multisig)?;
        Ok(match (self.approve, self.cancel) {
            (Some(txn_id), _) => Route::Approve {
                multisig,
                txn_id,
                proposer: cli::parse_address(self.proposer.as_deref().unwrap_or_default())?,
            },
            (None, Some(txn_id)) => Route::Cancel { multisig, txn_id },
            (None, None) => Route::Propose { multisig },
        })
    }
}

#[derive(Subcommand)]
enum MsigCommands {
    /// Deploy a new multisig
    Create {
        /// Signer addresses (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        signers: Vec<String>,

        /// Approvals required, defaults to all signers
        #[arg(long)]
        threshold: Option<u64>,

        /// Initial balance
        #[arg(long, default_value = "0")]
        value: String,

        /// Vesting duration in epochs
        #[arg(long, default_value = "0")]
        unlock_duration: i64,

        #[arg(long, default_value = "0")]
        start_epoch: i64,
    },

    /// Propose a transaction
    Propose {
        multisig: String,
        to: String,
        amount: String,

        #[arg(long, default_value = "0")]
        method: u64,

        #[arg(long)]
        params_hex: Option<String>,
    },

    /// Approve a pending transaction
    Approve {
        multisig: String,
        txn_id: i64,

        /// Proposer of the transaction; with --to, the approval is checked first
        #[arg(long)]
        proposer: Option<String>,

        #[command(flatten)]
        proposal: ProposalFlags,

        /// Approve by id alone, without checking the transaction contents
        #[arg(long)]
        blind: bool,
    },

    /// Cancel a transaction you proposed
    Cancel {
        multisig: String,
        txn_id: i64,

        #[command(flatten)]
        proposal: ProposalFlags,

        /// Cancel by id alone, without checking the transaction contents
        #[arg(long)]
        blind: bool,
    },

    /// Show balance and pending transactions
    Inspect {
        multisig: String,
    },

    /// Add a signer
    AddSigner {
        multisig: String,
        signer: String,

        /// Also raise the threshold by one
        #[arg(long)]
        increase: bool,

        #[command(flatten)]
        route: RouteFlags,
    },

    /// Remove a signer
    RemoveSigner {
        multisig: String,
        signer: String,

        /// Also lower the threshold by one
        #[arg(long)]
        decrease: bool,

        #[command(flatten)]
        route: RouteFlags,
    },

    /// Replace one signer with another
    SwapSigner {
        multisig: String,
        from: String,
        to: String,

        #[command(flatten)]
        route: RouteFlags,
    },

    /// Change the number of approvals required
    Threshold {
        multisig: String,
        threshold: u64,

        #[command(flatten)]
        route: RouteFlags,
    },

    /// Lock part of the balance under a vesting schedule
    LockBalance {
        multisig: String,
        amount: String,

        #[arg(long)]
        start_epoch: i64,

        #[arg(long)]
        unlock_duration: i64,

        #[command(flatten)]
        route: RouteFlags,
    },

    /// Miner management through the multisig that owns the miner
    #[command(flatten)]
    Miner(MsigMinerCommands),
}

#[derive(Subcommand)]
enum MsigMinerCommands {
    /// Withdraw miner balance
    Withdraw {
        multisig: String,
        #[command(flatten)]
        recipe: WithdrawArgs,
        #[command(flatten)]
        route: RouteFlags,
    },
    /// Change the miner owner
    SetOwner {
        multisig: String,
        #[command(flatten)]
        recipe: SetOwnerArgs,
        #[command(flatten)]
        route: RouteFlags,
    },
    /// Request a worker change
    ChangeWorker {
        multisig: String,
        #[command(flatten)]
        recipe: WorkerArgs,
        #[command(flatten)]
        route: RouteFlags,
    },
    /// Confirm a requested worker change
    ConfirmWorker {
        multisig: String,
        #[command(flatten)]
        recipe: WorkerArgs,
        #[command(flatten)]
        route: RouteFlags,
    },
    /// Replace the control addresses
    SetControl {
        multisig: String,
        #[command(flatten)]
        recipe: ControlArgs,
        #[command(flatten)]
        route: RouteFlags,
    },
    /// Propose a new beneficiary
    ChangeBeneficiary {
        multisig: String,
        #[command(flatten)]
        recipe: BeneficiaryArgs,
        #[command(flatten)]
        route: RouteFlags,
    },
    /// Accept a pending beneficiary change
    ConfirmBeneficiary {
        multisig: String,
        #[command(flatten)]
        recipe: MinerArg,
        #[command(flatten)]
        route: RouteFlags,
    },
}

#[derive(Subcommand)]
enum MinerCommands {
    /// Withdraw miner balance
    Withdraw(WithdrawArgs),
    /// Change the miner owner
    SetOwner(SetOwnerArgs),
    /// Request a worker change
    ChangeWorker(WorkerArgs),
    /// Confirm a requested worker change
    ConfirmWorker(WorkerArgs),
    /// Replace the control addresses
    SetControl(ControlArgs),
    /// Propose a new beneficiary
    ChangeBeneficiary(BeneficiaryArgs),
    /// Accept a pending beneficiary change
    ConfirmBeneficiary(MinerArg),
}

#[derive(Args)]
struct MinerArg {
    /// Miner actor address
    #[arg(long)]
    miner: String,
}

#[derive(Args)]
struct WithdrawArgs {
    #[arg(long)]
    miner: String,

    /// Amount to withdraw, defaults to everything available
    #[arg(long)]
    amount: Option<String>,
}

#[derive(Args)]
struct SetOwnerArgs {
    #[arg(long)]
    miner: String,

    #[arg(long)]
    new_owner: String,
}

#[derive(Args)]
struct WorkerArgs {
    #[arg(long)]
    miner: String,

    #[arg(long)]
    worker: String,
}

#[derive(Args)]
struct ControlArgs {
    #[arg(long)]
    miner: String,

    /// Control addresses (comma-separated); empty clears them
    #[arg(long, value_delimiter = ',')]
    addresses: Vec<String>,
}

#[derive(Args)]
struct BeneficiaryArgs {
    #[arg(long)]
    miner: String,

    #[arg(long)]
    beneficiary: String,

    /// Total amount the beneficiary may withdraw
    #[arg(long)]
    quota: String,

    /// Epoch at which the beneficiary term ends
    #[arg(long)]
    expiration: i64,

    /// Replace a beneficiary change that is already pending
    #[arg(long)]
    overwrite_pending: bool,
}

impl MsigMinerCommands {
    fn into_parts(self) -> CliResult<(Operation, Route)> {
        let (operation, multisig, route) = match self {
            MsigMinerCommands::Withdraw {
                multisig,
                recipe,
                route,
            } => (recipe.operation()?, multisig, route),
            MsigMinerCommands::SetOwner {
                multisig,
                recipe,
                route,
            } => (recipe.operation()?, multisig, route),
            MsigMinerCommands::ChangeWorker {
                multisig,
                recipe,
                route,
            } => (recipe.change()?, multisig, route),
            MsigMinerCommands::ConfirmWorker {
                multisig,
                recipe,
                route,
            } => (recipe.confirm()?, multisig, route),
            MsigMinerCommands::SetControl {
                multisig,
                recipe,
                route,
            } => (recipe.operation()?, multisig, route),
            MsigMinerCommands::ChangeBeneficiary {
                multisig,
                recipe,
                route,
            } => (recipe.operation()?, multisig, route),
            MsigMinerCommands::ConfirmBeneficiary {
                multisig,
                recipe,
                route,
            } => (recipe.confirm_beneficiary()?, multisig, route),
        };
        Ok((operation, route.route(&multisig)?))
    }
}

impl MinerCommands {
    fn operation(self) -> CliResult<Operation> {
        match self {
            MinerCommands::Withdraw(args) => args.operation(),
            MinerCommands::SetOwner(args) => args.operation(),
            MinerCommands::ChangeWorker(args) => args.change(),
            MinerCommands::ConfirmWorker(args) => args.confirm(),
            MinerCommands::SetControl(args) => args.operation(),
            MinerCommands::ChangeBeneficiary(args) => args.operation(),
            MinerCommands::ConfirmBeneficiary(args) => args.confirm_beneficiary(),
        }
    }
}

impl MinerArg {
    fn confirm_beneficiary(&self) -> CliResult<Operation> {
        Ok(Operation::ConfirmChangeBeneficiary {
            miner: cli::parse_address(&self.miner)?,
        })
    }
}

impl WithdrawArgs {
    fn operation(&self) -> CliResult<Operation> {
        Ok(Operation::WithdrawBalance {
            miner: cli::parse_address(&self.miner)?,
            amount: self.amount.as_deref().map(cli::parse_amount).transpose()?,
        })
    }
}

impl SetOwnerArgs {
    fn operation(&self) -> CliResult<Operation> {
        Ok(Operation::ChangeOwner {
            miner: cli::parse_address(&self.miner)?,
            new_owner: cli::parse_address(&self.new_owner)?,
        })
    }
}

impl WorkerArgs {
    fn change(&self) -> CliResult<Operation> {
        Ok(Operation::ChangeWorker {
            miner: cli::parse_address(&self.miner)?,
            new_worker: cli::parse_address(&self.worker)?,
        })
    }

    fn confirm(&self) -> CliResult<Operation> {
        Ok(Operation::ConfirmChangeWorker {
            miner: cli::parse_address(&self.miner)?,
            new_worker: cli::parse_address(&self.worker)?,
        })
    }
}

impl ControlArgs {
    fn operation(&self) -> CliResult<Operation> {
        Ok(Operation::SetControlAddresses {
            miner: cli::parse_address(&self.miner)?,
            control_addresses: self
                .addresses
                .iter()
                .filter(|a| !a.is_empty())
                .map(|a| cli::parse_address(a))
                .collect::<CliResult<Vec<_>>>()?,
        })
    }
}

impl BeneficiaryArgs {
    fn operation(&self) -> CliResult<Operation> {
        Ok(Operation::ChangeBeneficiary {
            miner: cli::parse_address(&self.miner)?,
            beneficiary: cli::parse_address(&self.beneficiary)?,
            quota: cli::parse_amount(&self.quota)?,
            expiration: self.expiration,
            overwrite_pending: self.overwrite_pending,
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => WalletConfig::from_file(path)?,
        None => WalletConfig::default(),
    };
    if let Some(rpc) = cli.rpc {
        config.chain.rpc_addr = rpc;
    }
    if let Some(token) = cli.token {
        config.chain.token = Some(token);
    }

    // Handle offline commands without connecting to a node
    match &cli.command {
        Commands::Key { action } => {
            return match action {
                KeyCommands::Generate => cli::cmd_key_generate(),
                KeyCommands::Show => cli::cmd_key_show(&config),
            };
        }
        Commands::Params { action } => {
            return match action {
                ParamsCommands::Encode {
                    actor,
                    method,
                    json,
                } => cli::cmd_params_encode(actor, *method, json),
                ParamsCommands::Decode {
                    actor,
                    method,
                    params_hex,
                } => cli::cmd_params_decode(actor, *method, params_hex),
            };
        }
        _ => {}
    }

    let state = AppState::new(config)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        // Handle Ctrl+C by abandoning any wait in progress
        let cancel = state.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("\n📴 Stopping...");
                cancel.cancel();
            }
        });

        run(cli.command, &state).await
    })
}

async fn run(command: Commands, state: &AppState) -> CliResult<()> {
    match command {
        Commands::Key { .. } | Commands::Params { .. } => unreachable!("handled offline"),

        Commands::Balance { address } => cli::cmd_balance(state, &address).await,

        Commands::Send {
            to,
            amount,
            from,
            method,
            params_hex,
            gas_limit,
            gas_fee_cap,
            gas_premium,
            nonce,
            wait,
        } => {
            let options = SendOptions {
                to,
                amount,
                from,
                method,
                params_hex,
                gas_limit,
                gas_fee_cap,
                gas_premium,
                nonce,
                wait,
            };
            cli::cmd_send(state, options).await
        }

        Commands::Wait { message } => cli::cmd_wait(state, &message).await,

        Commands::Msig { action } => match action {
            MsigCommands::Create {
                signers,
                threshold,
                value,
                unlock_duration,
                start_epoch,
            } => {
                cli::cmd_msig_create(
                    state,
                    &signers,
                    threshold,
                    &value,
                    unlock_duration,
                    start_epoch,
                )
                .await
            }
            MsigCommands::Propose {
                multisig,
                to,
                amount,
                method,
                params_hex,
            } => {
                let proposal = ProposalArgs {
                    to,
                    amount,
                    method,
                    params_hex,
                };
                cli::cmd_msig_propose(state, &multisig, proposal).await
            }
            MsigCommands::Approve {
                multisig,
                txn_id,
                proposer,
                proposal,
                blind,
            } => {
                cli::cmd_msig_approve(
                    state,
                    &multisig,
                    txn_id,
                    proposer.as_deref(),
                    proposal.proposal(),
                    blind,
                )
                .await
            }
            MsigCommands::Cancel {
                multisig,
                txn_id,
                proposal,
                blind,
            } => {
                cli::cmd_msig_cancel(state, &multisig, txn_id, proposal.proposal(), blind).await
            }
            MsigCommands::Inspect { multisig } => cli::cmd_msig_inspect(state, &multisig).await,
            MsigCommands::AddSigner {
                multisig,
                signer,
                increase,
                route,
            } => {
                let operation = Operation::AddSigner {
                    signer: cli::parse_address(&signer)?,
                    increase,
                };
                cli::cmd_route(state, operation, route.route(&multisig)?).await
            }
            MsigCommands::RemoveSigner {
                multisig,
                signer,
                decrease,
                route,
            } => {
                let operation = Operation::RemoveSigner {
                    signer: cli::parse_address(&signer)?,
                    decrease,
                };
                cli::cmd_route(state, operation, route.route(&multisig)?).await
            }
            MsigCommands::SwapSigner {
                multisig,
                from,
                to,
                route,
            } => {
                let operation = Operation::SwapSigner {
                    from: cli::parse_address(&from)?,
                    to: cli::parse_address(&to)?,
                };
                cli::cmd_route(state, operation, route.route(&multisig)?).await
            }
            MsigCommands::Threshold {
                multisig,
                threshold,
                route,
            } => {
                let operation = Operation::ChangeThreshold {
                    new_threshold: threshold,
                };
                cli::cmd_route(state, operation, route.route(&multisig)?).await
            }
            MsigCommands::LockBalance {
                multisig,
                amount,
                start_epoch,
                unlock_duration,
                route,
            } => {
                let operation = Operation::LockBalance {
                    start_epoch,
                    unlock_duration,
                    amount: cli::parse_amount(&amount)?,
                };
                cli::cmd_route(state, operation, route.route(&multisig)?).await
            }
            MsigCommands::Miner(recipe) => {
                let (operation, route) = recipe.into_parts()?;
                cli::cmd_route(state, operation, route).await
            }
        },

        Commands::Miner { action } => {
            cli::cmd_route(state, action.operation()?, Route::Direct).await
        }
    }
}
