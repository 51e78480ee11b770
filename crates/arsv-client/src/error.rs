//! Error kinds surfaced by the session client.

use arsv_common::AmountError;
use thiserror::Error;

/// Errors that can occur while talking to the wallet and the treasury.
///
/// The set is closed: every failure the client reports maps onto one of
/// these kinds, each carrying a message that is safe to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No signing wallet is available.
    #[error("Wallet not installed")]
    WalletMissing,

    /// The wallet is on a different chain than the treasury deployment.
    #[error("Wrong network: expected chain {expected}, connected to {actual}")]
    NetworkMismatch { expected: u64, actual: u64 },

    /// User input failed validation before any network call.
    #[error("Invalid amount: {0}")]
    InvalidInput(String),

    /// A wallet request, transaction submission or confirmation failed.
    #[error("{0}")]
    ChainCall(String),

    /// A read-only contract call failed.
    #[error("Read failed: {0}")]
    Read(String),

    /// An operation that needs a ready session ran before `connect()` succeeded.
    #[error("Not connected")]
    NotConnected,
}

impl From<AmountError> for ClientError {
    fn from(err: AmountError) -> Self {
        ClientError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_mismatch_display() {
        let err = ClientError::NetworkMismatch {
            expected: 11155111,
            actual: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("11155111"));
        assert!(msg.contains("1"));
    }

    #[test]
    fn test_chain_call_display_is_raw_message() {
        let err = ClientError::ChainCall("execution reverted".to_string());
        assert_eq!(err.to_string(), "execution reverted");
    }

    #[test]
    fn test_from_amount_error() {
        let err: ClientError = AmountError::Empty.into();
        assert_eq!(err, ClientError::InvalidInput("Amount is empty".to_string()));
    }
}
