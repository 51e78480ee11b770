//! Typed bindings for the two tokens and the treasury.
//!
//! A binding pairs a fixed address with the session's wallet provider and
//! works in `TokenAmount`s so callers never handle raw integers directly.

use std::sync::Arc;

use alloy::primitives::Address;

use arsv_common::{Token, TokenAmount, TxOutcome};

use crate::error::ClientError;
use crate::wallet::{EventSubscription, TreasuryInfo, WalletProvider};

/// Binding for one ERC-20 token.
#[derive(Clone)]
pub struct TokenContract {
    token: Token,
    address: Address,
    decimals: u8,
    wallet: Arc<dyn WalletProvider>,
}

impl TokenContract {
    pub fn new(token: Token, address: Address, decimals: u8, wallet: Arc<dyn WalletProvider>) -> Self {
        Self {
            token,
            address,
            decimals,
            wallet,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Scale used for every conversion on this binding.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub async fn balance_of(&self, owner: Address) -> Result<TokenAmount, ClientError> {
        let raw = self.wallet.balance_of(self.address, owner).await?;
        Ok(TokenAmount::from_raw(raw, self.decimals))
    }

    /// Allow `spender` to pull `amount` from the connected account.
    pub async fn approve(&self, spender: Address, amount: &TokenAmount) -> Result<TxOutcome, ClientError> {
        self.wallet.approve(self.address, spender, amount.raw()).await
    }

    pub async fn transfer(&self, to: Address, amount: &TokenAmount) -> Result<TxOutcome, ClientError> {
        self.wallet.transfer(self.address, to, amount.raw()).await
    }

    /// Value reported by the contract's own `decimals()`.
    pub async fn onchain_decimals(&self) -> Result<u8, ClientError> {
        self.wallet.decimals(self.address).await
    }
}

impl std::fmt::Debug for TokenContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenContract")
            .field("token", &self.token)
            .field("address", &self.address)
            .field("decimals", &self.decimals)
            .finish()
    }
}

/// Binding for the ARSV treasury.
#[derive(Clone)]
pub struct TreasuryContract {
    address: Address,
    wallet: Arc<dyn WalletProvider>,
}

impl TreasuryContract {
    pub fn new(address: Address, wallet: Arc<dyn WalletProvider>) -> Self {
        Self { address, wallet }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Pay `usdt_amount` USDT for ARSV. Requires a prior USDT approval.
    pub async fn buy_arsv(&self, usdt_amount: &TokenAmount) -> Result<TxOutcome, ClientError> {
        self.wallet.buy_arsv(self.address, usdt_amount.raw()).await
    }

    /// Sell `arsv_amount` ARSV for USDT. Requires a prior ARSV approval.
    pub async fn sell_arsv(&self, arsv_amount: &TokenAmount) -> Result<TxOutcome, ClientError> {
        self.wallet.sell_arsv(self.address, arsv_amount.raw()).await
    }

    pub async fn info(&self) -> Result<TreasuryInfo, ClientError> {
        self.wallet.treasury_info(self.address).await
    }

    /// Purchase and sale events from now on.
    pub async fn events(&self) -> Result<EventSubscription, ClientError> {
        self.wallet.subscribe_treasury_events(self.address).await
    }
}

impl std::fmt::Debug for TreasuryContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreasuryContract")
            .field("address", &self.address)
            .finish()
    }
}
