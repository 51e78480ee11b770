//! Shared types for the ARSV treasury client.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256, U256, address};

use crate::amount::format_units;

/// Chain id of the Sepolia testnet.
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

/// ARSV token deployment on Sepolia.
pub const ARSV_TOKEN_ADDRESS: Address = address!("0xd53702873A346bF73b1De9232ab9Ba3Bcf232dAC");

/// USDT token deployment on Sepolia.
pub const USDT_TOKEN_ADDRESS: Address = address!("0x7bc4B2fFcEaa7a612057DCed6f20f37e0575c1F8");

/// ARSV treasury (exchange) deployment on Sepolia.
pub const TREASURY_ADDRESS: Address = address!("0x81e2872E29b3e3f991fa62767bCdD1BA7cc8fe29");

/// The two fungible tokens the treasury exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Arsv,
    Usdt,
}

impl Token {
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Arsv => "ARSV",
            Token::Usdt => "USDT",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Token {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arsv" => Ok(Token::Arsv),
            "usdt" => Ok(Token::Usdt),
            other => Err(format!("Unknown token: {}", other)),
        }
    }
}

/// Direction of a treasury swap, seen from the ARSV side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapSide {
    /// Pay USDT, receive ARSV.
    Buy,
    /// Pay ARSV, receive USDT.
    Sell,
}

impl SwapSide {
    /// Token the treasury pulls from the caller, and therefore the one to approve.
    pub fn source_token(&self) -> Token {
        match self {
            SwapSide::Buy => Token::Usdt,
            SwapSide::Sell => Token::Arsv,
        }
    }

    /// Status shown while the approval is pending.
    pub fn approving_status(&self) -> String {
        format!("Approving {}...", self.source_token())
    }

    /// Status shown while the swap itself is pending.
    pub fn submitting_status(&self) -> &'static str {
        match self {
            SwapSide::Buy => "Buying ARSV...",
            SwapSide::Sell => "Selling ARSV...",
        }
    }

    /// Status shown once the swap is confirmed.
    pub fn completed_status(&self) -> &'static str {
        match self {
            SwapSide::Buy => "Purchase complete.",
            SwapSide::Sell => "Sale complete.",
        }
    }
}

impl fmt::Display for SwapSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapSide::Buy => write!(f, "buy"),
            SwapSide::Sell => write!(f, "sell"),
        }
    }
}

/// Inclusion data of a confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// A `TokensPurchased` emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseEvent {
    pub buyer: Address,
    pub usdt_amount: U256,
    pub arsv_amount: U256,
    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
}

/// A `TokensSold` emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleEvent {
    pub seller: Address,
    pub arsv_amount: U256,
    pub usdt_amount: U256,
    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
}

/// Typed treasury event delivered by a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreasuryEvent {
    Purchased(PurchaseEvent),
    Sold(SaleEvent),
}

impl TreasuryEvent {
    /// Account that triggered the event.
    pub fn account(&self) -> Address {
        match self {
            TreasuryEvent::Purchased(e) => e.buyer,
            TreasuryEvent::Sold(e) => e.seller,
        }
    }

    pub fn side(&self) -> SwapSide {
        match self {
            TreasuryEvent::Purchased(_) => SwapSide::Buy,
            TreasuryEvent::Sold(_) => SwapSide::Sell,
        }
    }

    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            TreasuryEvent::Purchased(e) => e.tx_hash,
            TreasuryEvent::Sold(e) => e.tx_hash,
        }
    }

    /// Human-readable log line with both amounts rendered at `decimals`.
    pub fn log_line(&self, decimals: u8) -> String {
        match self {
            TreasuryEvent::Purchased(e) => format!(
                "Purchase: {} bought {} ARSV with {} USDT",
                e.buyer,
                format_units(e.arsv_amount, decimals),
                format_units(e.usdt_amount, decimals),
            ),
            TreasuryEvent::Sold(e) => format!(
                "Sale: {} sold {} ARSV for {} USDT",
                e.seller,
                format_units(e.arsv_amount, decimals),
                format_units(e.usdt_amount, decimals),
            ),
        }
    }
}

impl fmt::Display for TreasuryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreasuryEvent::Purchased(e) => write!(
                f,
                "TokensPurchased({} usdt={} arsv={})",
                e.buyer, e.usdt_amount, e.arsv_amount
            ),
            TreasuryEvent::Sold(e) => write!(
                f,
                "TokensSold({} arsv={} usdt={})",
                e.seller, e.arsv_amount, e.usdt_amount
            ),
        }
    }
}
