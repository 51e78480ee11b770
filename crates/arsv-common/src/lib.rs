//! Shared types for the ARSV treasury client.
//!
//! This crate contains:
//! - Fixed-point amount parsing and formatting (`amount`)
//! - Token, swap and treasury event types plus the Sepolia deployment constants (`types`)

pub mod amount;
pub mod types;

pub use amount::{AmountError, DEFAULT_DECIMALS, MAX_DECIMALS, TokenAmount, format_units, parse_units};
pub use types::*;
