//! arsv-client: command-line front end for the ARSV treasury.
//!
//! Usage:
//!   arsv-client [OPTIONS] <COMMAND>
//!
//! Commands:
//!   balances                      Show USDT and ARSV balances
//!   buy <AMOUNT>                  Approve USDT and buy ARSV
//!   sell <AMOUNT>                 Approve ARSV and sell it for USDT
//!   info                          Show the treasury's view functions
//!   transfer <TOKEN> <TO> <AMT>   Transfer ARSV or USDT
//!   watch                         Stream purchase/sale events until Ctrl-C
//!
//! The signing key is read from `ARSV_PRIVATE_KEY` (or `.env`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use arsv_client::{ClientConfig, ConsoleUi, RpcWallet, SessionClient, WalletProvider};
use arsv_common::Token;

/// CLI arguments for arsv-client.
#[derive(Parser, Debug)]
#[command(name = "arsv-client")]
#[command(about = "Buy and sell ARSV against the treasury on Sepolia")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/client.toml")]
    config: PathBuf,

    /// JSON-RPC endpoint (overrides config file)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides config file)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show USDT and ARSV balances of the wallet
    Balances,
    /// Approve USDT and buy ARSV with the given USDT amount
    Buy { amount: String },
    /// Approve ARSV and sell the given ARSV amount
    Sell { amount: String },
    /// Show the treasury's view functions
    Info,
    /// Transfer ARSV or USDT to another address
    Transfer {
        token: Token,
        to: Address,
        amount: String,
    },
    /// Stream purchase and sale events until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // Load environment variables from .env file (if present)
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let args = Args::parse();

    let config_found = args.config.exists();
    let mut config = if config_found {
        ClientConfig::from_file(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?
    } else {
        ClientConfig::default()
    };

    config.apply_env_overrides();
    config.apply_cli_overrides(args.rpc_url, args.log_level);

    init_logging(&config.log_level)?;

    if !config_found {
        warn!("Config file not found at {:?}, using defaults", args.config);
    }

    config.validate().context("Configuration validation failed")?;

    info!(
        network = %config.network.name,
        chain_id = config.network.chain_id,
        treasury = %config.contracts.treasury,
        "Starting arsv-client"
    );

    let wallet: Option<Arc<dyn WalletProvider>> = match config.wallet.private_key.clone() {
        Some(key) => Some(Arc::new(RpcWallet::connect(&key, &config).await?)),
        None => None,
    };

    let mut client = SessionClient::new(config, wallet, Arc::new(ConsoleUi));
    client.connect().await?;

    match args.command {
        Command::Balances => {
            // connect() already refreshed and printed the balances
        }
        Command::Buy { amount } => {
            let receipt = client.buy_arsv(&amount).await?;
            println!("Approval tx: {}", receipt.approval.tx_hash);
            println!("Buy tx:      {}", receipt.swap.tx_hash);
        }
        Command::Sell { amount } => {
            let receipt = client.sell_arsv(&amount).await?;
            println!("Approval tx: {}", receipt.approval.tx_hash);
            println!("Sell tx:     {}", receipt.swap.tx_hash);
        }
        Command::Info => {
            let treasury_info = client.treasury_info().await?;
            for (label, value) in treasury_info.display_lines(client.config().tokens.decimals) {
                println!("{:<20} {}", label, value);
            }
        }
        Command::Transfer { token, to, amount } => {
            let outcome = client.transfer(token, to, &amount).await?;
            println!("Transfer tx: {}", outcome.tx_hash);
        }
        Command::Watch => {
            if !client.is_listening() {
                warn!("Event listener is not running");
            }
            info!("Watching treasury events, press Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");
        }
    }

    client.disconnect();
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")
}
