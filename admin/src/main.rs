//! Canopy admin CLI: runs custody operations against an LMDB data directory
//! and prints each result as JSON on stdout. Logs go to stderr.

use anyhow::Context;
use canopy_service::{init_logging, Custody, LogFormat, ServiceConfig};
use canopy_store::Store;
use canopy_trust::TrustFilter;
use canopy_types::{EntityId, TokenId, TransferId, TreeId, TrustId};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "canopy-admin", about = "Canopy custody store administration")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and env vars override them.
    #[arg(long, env = "CANOPY_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the LMDB environment.
    #[arg(long, env = "CANOPY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level filter, e.g. "info" or "warn,canopy_ledger=debug".
    #[arg(long, env = "CANOPY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CANOPY_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Entities (principals).
    #[command(subcommand)]
    Entity(EntityCmd),
    /// Wallets and the sub-wallet forest.
    #[command(subcommand)]
    Wallet(WalletCmd),
    /// Trust relationships between entities.
    #[command(subcommand)]
    Trust(TrustCmd),
    /// Tokens and lineage trees.
    #[command(subcommand)]
    Token(TokenCmd),
    /// Pending and completed transfers.
    #[command(subcommand)]
    Transfer(TransferCmd),
}

#[derive(Subcommand)]
enum EntityCmd {
    Create { name: String },
    Show { id: u64 },
}

#[derive(Subcommand)]
enum WalletCmd {
    /// Create a top-level wallet owned by the acting entity.
    Create {
        #[arg(long = "as")]
        actor: u64,
        name: String,
    },
    /// Create a managed sub-wallet under a wallet the actor controls.
    AddManaged {
        #[arg(long = "as")]
        actor: u64,
        #[arg(long)]
        parent: String,
        name: String,
    },
    Show { name: String },
    /// List direct sub-wallets of a wallet the actor controls.
    Subs {
        #[arg(long = "as")]
        actor: u64,
        name: String,
    },
}

#[derive(Subcommand)]
enum TrustCmd {
    /// Request trust from the owner of a wallet.
    Request {
        #[arg(long = "as")]
        actor: u64,
        /// send, received, manage, yield, deduct or release.
        request_type: String,
        wallet: String,
    },
    Accept {
        #[arg(long = "as")]
        actor: u64,
        id: u64,
    },
    Cancel {
        #[arg(long = "as")]
        actor: u64,
        id: u64,
    },
    List {
        #[arg(long = "as")]
        actor: u64,
        #[arg(long)]
        state: Option<String>,
        #[arg(long = "type")]
        trust_type: Option<String>,
        #[arg(long)]
        request_type: Option<String>,
    },
}

#[derive(Subcommand)]
enum TokenCmd {
    /// Record a newly issued token in a wallet.
    Mint {
        wallet: String,
        #[arg(long)]
        parent: Option<u64>,
    },
    Show { uuid: String },
    Tree { tree_id: u64 },
    /// Tokens in a wallet the actor controls.
    List {
        #[arg(long = "as")]
        actor: u64,
        wallet: String,
    },
    /// Every transfer of a token, oldest first.
    History { id: u64 },
}

#[derive(Subcommand)]
enum TransferCmd {
    Create {
        #[arg(long = "as")]
        actor: u64,
        token: u64,
        /// Destination wallet name.
        to: String,
    },
    Claim {
        #[arg(long = "as")]
        actor: u64,
        id: u64,
    },
    Void {
        #[arg(long = "as")]
        actor: u64,
        id: u64,
    },
    /// Transfers waiting for the actor to claim.
    Pending {
        #[arg(long = "as")]
        actor: u64,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.parse::<LogFormat>()?;
    }
    Ok(config)
}

fn json<T: Serialize>(value: T) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

fn run<S: Store>(custody: &Custody<S>, command: Command) -> anyhow::Result<serde_json::Value> {
    let dir = custody.directory();
    match command {
        Command::Entity(cmd) => match cmd {
            EntityCmd::Create { name } => json(dir.create_entity(&name)?),
            EntityCmd::Show { id } => {
                let id = EntityId::new(id);
                let entity = dir.get_entity(id)?;
                let wallets = dir.wallets_of(id)?;
                Ok(serde_json::json!({ "entity": entity, "wallets": wallets }))
            }
        },
        Command::Wallet(cmd) => match cmd {
            WalletCmd::Create { actor, name } => {
                json(dir.create_wallet(EntityId::new(actor), &name)?)
            }
            WalletCmd::AddManaged { actor, parent, name } => {
                json(custody.add_managed_wallet_as(EntityId::new(actor), &parent, &name)?)
            }
            WalletCmd::Show { name } => {
                let wallet = dir.get_wallet_by_name(&name)?;
                let ancestors = dir.ancestors(wallet.id)?;
                Ok(serde_json::json!({ "wallet": wallet, "ancestors": ancestors }))
            }
            WalletCmd::Subs { actor, name } => {
                let wallet = dir.get_wallet_by_name(&name)?;
                json(custody.sub_wallets_as(EntityId::new(actor), wallet.id)?)
            }
        },
        Command::Trust(cmd) => {
            let trust = custody.trust();
            match cmd {
                TrustCmd::Request {
                    actor,
                    request_type,
                    wallet,
                } => {
                    json(trust.request(&request_type, &wallet, EntityId::new(actor))?)
                }
                TrustCmd::Accept { actor, id } => {
                    json(trust.accept(TrustId::new(id), EntityId::new(actor))?)
                }
                TrustCmd::Cancel { actor, id } => {
                    json(trust.cancel(TrustId::new(id), EntityId::new(actor))?)
                }
                TrustCmd::List {
                    actor,
                    state,
                    trust_type,
                    request_type,
                } => {
                    let filter = TrustFilter::parse(
                        state.as_deref(),
                        trust_type.as_deref(),
                        request_type.as_deref(),
                    )?;
                    json(trust.list_by_entity(EntityId::new(actor), &filter)?)
                }
            }
        }
        Command::Token(cmd) => {
            let tokens = custody.tokens();
            match cmd {
                TokenCmd::Mint { wallet, parent } => {
                    let wallet = dir.get_wallet_by_name(&wallet)?;
                    json(tokens.mint(wallet.id, parent.map(TokenId::new))?)
                }
                TokenCmd::Show { uuid } => json(tokens.get_by_uuid(&uuid)?),
                TokenCmd::Tree { tree_id } => json(tokens.get_tree(TreeId::new(tree_id))?),
                TokenCmd::List { actor, wallet } => {
                    json(custody.tokens_in_wallet_as(EntityId::new(actor), &wallet)?)
                }
                TokenCmd::History { id } => json(tokens.history(TokenId::new(id))?),
            }
        }
        Command::Transfer(cmd) => {
            let transfers = custody.transfers();
            match cmd {
                TransferCmd::Create { actor, token, to } => {
                    let destination = dir.get_wallet_by_name(&to)?;
                    json(transfers.create_transfer(
                        TokenId::new(token),
                        EntityId::new(actor),
                        destination.id,
                    )?)
                }
                TransferCmd::Claim { actor, id } => {
                    json(transfers.claim(TransferId::new(id), EntityId::new(actor))?)
                }
                TransferCmd::Void { actor, id } => {
                    json(transfers.void(TransferId::new(id), EntityId::new(actor))?)
                }
                TransferCmd::Pending { actor } => {
                    json(transfers.get_pending_transfers(EntityId::new(actor))?)
                }
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level)?;

    let custody = Custody::open(&config)
        .with_context(|| format!("opening custody store at {}", config.data_dir.display()))?;
    tracing::debug!(data_dir = %config.data_dir.display(), "custody store ready");

    let outcome = run(&custody, cli.command);
    custody.shutdown()?;

    let value = outcome?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
