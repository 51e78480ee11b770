//! Wallet provider abstraction.
//!
//! This module provides the `WalletProvider` trait that sits between the
//! session client and the chain. The same session code works with:
//! - `RpcWallet`: a local signing key plus a JSON-RPC endpoint (alloy)
//! - Scripted providers in tests that record every call
//!
//! Every write method resolves only after the transaction is included and
//! succeeded; a reverted receipt is reported as `ClientError::ChainCall`.

pub mod rpc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use arsv_common::{TreasuryEvent, TxOutcome, format_units};

use crate::error::ClientError;

pub use rpc::RpcWallet;

/// Snapshot of the treasury's read-only views, raw on-chain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreasuryInfo {
    pub usdt_balance: U256,
    pub arsv_balance: U256,
    pub max_buyable_usdt: U256,
    pub fee_recipient: Address,
    pub approved_withdrawer: Address,
    pub buy_price: U256,
    pub sell_price: U256,
    pub buy_fee: U256,
    pub sell_fee: U256,
}

impl TreasuryInfo {
    /// Label/value pairs for display.
    ///
    /// Token balances are rendered at `decimals`. Prices and fees use a scale
    /// only the contract knows, so they are shown raw.
    pub fn display_lines(&self, decimals: u8) -> Vec<(&'static str, String)> {
        vec![
            ("USDT reserve", format_units(self.usdt_balance, decimals)),
            ("ARSV reserve", format_units(self.arsv_balance, decimals)),
            ("Max buyable USDT", format_units(self.max_buyable_usdt, decimals)),
            ("Fee recipient", self.fee_recipient.to_string()),
            ("Approved withdrawer", self.approved_withdrawer.to_string()),
            ("Buy price", self.buy_price.to_string()),
            ("Sell price", self.sell_price.to_string()),
            ("Buy fee", self.buy_fee.to_string()),
            ("Sell fee", self.sell_fee.to_string()),
        ]
    }
}

/// Access to accounts, chain state and transaction submission.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for the signing account.
    ///
    /// # Errors
    ///
    /// Returns `ChainCall` if the wallet refuses the request.
    async fn request_accounts(&self) -> Result<Address, ClientError>;

    /// Chain id the wallet is currently connected to.
    async fn chain_id(&self) -> Result<u64, ClientError>;

    /// ERC-20 `balanceOf`.
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ClientError>;

    /// ERC-20 `decimals`.
    async fn decimals(&self, token: Address) -> Result<u8, ClientError>;

    /// ERC-20 `approve`, awaiting inclusion.
    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxOutcome, ClientError>;

    /// ERC-20 `transfer`, awaiting inclusion.
    async fn transfer(&self, token: Address, to: Address, amount: U256)
    -> Result<TxOutcome, ClientError>;

    /// Treasury `buyARSV(usdtAmount)`, awaiting inclusion.
    async fn buy_arsv(&self, treasury: Address, usdt_amount: U256) -> Result<TxOutcome, ClientError>;

    /// Treasury `sellARSV(arsvAmount)`, awaiting inclusion.
    async fn sell_arsv(&self, treasury: Address, arsv_amount: U256) -> Result<TxOutcome, ClientError>;

    /// Read every treasury view in one go.
    async fn treasury_info(&self, treasury: Address) -> Result<TreasuryInfo, ClientError>;

    /// Subscribe to `TokensPurchased` and `TokensSold` from now on.
    async fn subscribe_treasury_events(
        &self,
        treasury: Address,
    ) -> Result<EventSubscription, ClientError>;
}

/// Live stream of treasury events.
///
/// Dropping the subscription stops the producing task.
#[derive(Debug)]
pub struct EventSubscription {
    rx: mpsc::Receiver<TreasuryEvent>,
    task: Option<JoinHandle<()>>,
}

impl EventSubscription {
    /// Wrap a receiver fed by `task`.
    pub fn new(rx: mpsc::Receiver<TreasuryEvent>, task: JoinHandle<()>) -> Self {
        Self { rx, task: Some(task) }
    }

    /// Wrap a receiver whose sender is owned elsewhere.
    pub fn from_receiver(rx: mpsc::Receiver<TreasuryEvent>) -> Self {
        Self { rx, task: None }
    }

    /// Next event, or `None` once the stream is closed.
    pub async fn next(&mut self) -> Option<TreasuryEvent> {
        self.rx.recv().await
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
