//! Wallet session client for the ARSV treasury.
//!
//! Connects a signing wallet to Sepolia, reads ARSV/USDT balances, runs the
//! approve-then-swap sequence for buys and sells, and turns the treasury's
//! `TokensPurchased`/`TokensSold` events into log lines. Pricing and fees
//! live in the treasury contract; this crate only sequences calls.
//!
//! ## Modules
//!
//! - `config`: Configuration loading and validation
//! - `wallet`: `WalletProvider` trait, event subscriptions and the alloy RPC wallet
//! - `contracts`: Typed token and treasury bindings
//! - `session`: `SessionClient` state machine
//! - `ui`: Output surface (console and in-memory)

pub mod config;
pub mod contracts;
pub mod error;
pub mod session;
pub mod ui;
pub mod wallet;

pub use config::ClientConfig;
pub use contracts::{TokenContract, TreasuryContract};
pub use error::ClientError;
pub use session::{
    Balances, INVALID_AMOUNT_ALERT, Session, SessionClient, SessionState, SwapPhase, SwapReceipt,
    WALLET_MISSING_STATUS,
};
pub use ui::{ConsoleUi, EventLogEntry, MemoryUi, SharedUi, Ui, ViewState};
pub use wallet::{EventSubscription, RpcWallet, TreasuryInfo, WalletProvider};
