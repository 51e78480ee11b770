//! Wallet session and the client that drives it.
//!
//! ## Lifecycle
//!
//! `Disconnected → Connecting → (NetworkMismatch | Ready)`
//!
//! Contract bindings exist only in `Ready`. Balance reads and swaps repeat
//! from there; `disconnect()` or a failed reconnect drops the session.
//!
//! ## Swaps
//!
//! Buy and sell both run `Idle → Approving → Approved → Submitting → Confirmed`.
//! The approval must be included before the swap is sent. A failing step
//! returns the phase to `Idle` and nothing further is sent. A granted approval
//! is never revoked.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::Address;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use arsv_common::{SwapSide, Token, TokenAmount, TxOutcome};

use crate::config::ClientConfig;
use crate::contracts::{TokenContract, TreasuryContract};
use crate::error::ClientError;
use crate::ui::SharedUi;
use crate::wallet::{TreasuryInfo, WalletProvider};

/// Alert shown when an amount fails validation.
pub const INVALID_AMOUNT_ALERT: &str = "Enter a valid amount.";

/// Status shown when no wallet is available.
pub const WALLET_MISSING_STATUS: &str = "Wallet not installed.";

/// Connection state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    /// Wallet answered from a chain other than the configured one.
    NetworkMismatch,
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::NetworkMismatch => write!(f, "network_mismatch"),
            SessionState::Ready => write!(f, "ready"),
        }
    }
}

/// Progress of the current (or last) swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPhase {
    Idle,
    Approving,
    Approved,
    Submitting,
    Confirmed,
}

/// A connected wallet bound to the treasury deployment.
#[derive(Debug)]
pub struct Session {
    pub account: Address,
    pub chain_id: u64,
    pub arsv: TokenContract,
    pub usdt: TokenContract,
    pub treasury: TreasuryContract,
}

impl Session {
    pub fn token(&self, token: Token) -> &TokenContract {
        match token {
            Token::Arsv => &self.arsv,
            Token::Usdt => &self.usdt,
        }
    }
}

/// Balances of the connected account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balances {
    pub usdt: TokenAmount,
    pub arsv: TokenAmount,
}

/// Both transactions of a completed swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapReceipt {
    pub side: SwapSide,
    pub amount: TokenAmount,
    pub approval: TxOutcome,
    pub swap: TxOutcome,
}

/// Drives one wallet session against the treasury and reports to a `Ui`.
pub struct SessionClient {
    config: ClientConfig,
    wallet: Option<Arc<dyn WalletProvider>>,
    ui: SharedUi,
    state: SessionState,
    session: Option<Arc<Session>>,
    listener: Option<JoinHandle<()>>,
    phase: Mutex<SwapPhase>,
    swap_lock: tokio::sync::Mutex<()>,
}

impl SessionClient {
    /// Create a disconnected client.
    ///
    /// `wallet` is `None` when no signing capability is available; `connect`
    /// then reports the wallet as missing.
    pub fn new(config: ClientConfig, wallet: Option<Arc<dyn WalletProvider>>, ui: SharedUi) -> Self {
        Self {
            config,
            wallet,
            ui,
            state: SessionState::Disconnected,
            session: None,
            listener: None,
            phase: Mutex::new(SwapPhase::Idle),
            swap_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn swap_phase(&self) -> SwapPhase {
        *self.phase.lock()
    }

    /// The active session, if connected.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.clone()
    }

    pub fn account(&self) -> Option<Address> {
        self.session.as_ref().map(|s| s.account)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns true while an event listener task is alive.
    pub fn is_listening(&self) -> bool {
        self.listener.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Authorize the wallet, check the network, bind contracts, then refresh
    /// balances and start listening for treasury events.
    ///
    /// Every failure is also written to the status line.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.disconnect();

        let Some(wallet) = self.wallet.clone() else {
            warn!("No wallet available, connect aborted");
            self.ui.set_status(WALLET_MISSING_STATUS);
            return Err(ClientError::WalletMissing);
        };

        self.state = SessionState::Connecting;
        debug!("Requesting wallet accounts");

        let account = match wallet.request_accounts().await {
            Ok(account) => account,
            Err(e) => return Err(self.fail_connect(e)),
        };
        self.ui.set_account(&account.to_string());

        let chain_id = match wallet.chain_id().await {
            Ok(id) => id,
            Err(e) => return Err(self.fail_connect(e)),
        };

        let expected = self.config.network.chain_id;
        if chain_id != expected {
            warn!(expected, actual = chain_id, "Wallet is on the wrong network");
            self.state = SessionState::NetworkMismatch;
            self.ui
                .set_status(&format!("Connect to the {} network.", self.config.network.name));
            return Err(ClientError::NetworkMismatch {
                expected,
                actual: chain_id,
            });
        }

        let decimals = self.config.tokens.decimals;
        let contracts = &self.config.contracts;
        let session = Session {
            account,
            chain_id,
            arsv: TokenContract::new(Token::Arsv, contracts.arsv_token, decimals, wallet.clone()),
            usdt: TokenContract::new(Token::Usdt, contracts.usdt_token, decimals, wallet.clone()),
            treasury: TreasuryContract::new(contracts.treasury, wallet),
        };

        if self.config.tokens.verify_decimals {
            verify_decimals(&session, decimals).await;
        }

        self.session = Some(Arc::new(session));
        self.state = SessionState::Ready;
        info!(account = %account, chain_id, "Session ready");
        self.ui.set_status(&format!(
            "Connected to {} and contracts initialized.",
            self.config.network.name
        ));

        self.update_balances().await;

        if let Err(e) = self.listen_to_events().await {
            warn!(error = %e, "Event subscription failed, continuing without event log");
        }

        Ok(())
    }

    fn fail_connect(&mut self, err: ClientError) -> ClientError {
        error!(error = %err, "Failed to connect");
        self.state = SessionState::Disconnected;
        self.session = None;
        self.ui.set_status(&format!("Error connecting: {}", err));
        err
    }

    /// Drop the session and stop the event listener.
    pub fn disconnect(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if self.session.take().is_some() {
            info!("Session closed");
        }
        self.state = SessionState::Disconnected;
        *self.phase.lock() = SwapPhase::Idle;
    }

    /// Read both balances and show them.
    ///
    /// Failures are logged and swallowed; the displays keep their previous
    /// values. Returns the balances when the refresh succeeded.
    pub async fn update_balances(&self) -> Option<Balances> {
        let Some(session) = self.session.clone() else {
            warn!("Balance refresh requested without a session");
            return None;
        };

        let result = async {
            let usdt = session.usdt.balance_of(session.account).await?;
            let arsv = session.arsv.balance_of(session.account).await?;
            Ok::<_, ClientError>(Balances { usdt, arsv })
        }
        .await;

        match result {
            Ok(balances) => {
                self.ui.set_usdt_balance(&balances.usdt.to_string());
                self.ui.set_arsv_balance(&balances.arsv.to_string());
                debug!(usdt = %balances.usdt, arsv = %balances.arsv, "Balances updated");
                Some(balances)
            }
            Err(e) => {
                error!(error = %e, "Failed to update balances");
                None
            }
        }
    }

    /// Approve USDT and buy ARSV with `amount_text` USDT.
    pub async fn buy_arsv(&self, amount_text: &str) -> Result<SwapReceipt, ClientError> {
        self.swap(SwapSide::Buy, amount_text).await
    }

    /// Approve ARSV and sell `amount_text` ARSV.
    pub async fn sell_arsv(&self, amount_text: &str) -> Result<SwapReceipt, ClientError> {
        self.swap(SwapSide::Sell, amount_text).await
    }

    async fn swap(&self, side: SwapSide, amount_text: &str) -> Result<SwapReceipt, ClientError> {
        let amount = self.parse_amount(amount_text)?;
        let session = self.require_session()?;

        // Held across both steps so a concurrent swap cannot replace our approval.
        let _guard = if self.config.execution.serialize_swaps {
            Some(self.swap_lock.lock().await)
        } else {
            None
        };

        let source = session.token(side.source_token());
        let spender = session.treasury.address();

        self.set_phase(SwapPhase::Approving);
        self.ui.set_status(&side.approving_status());
        info!(side = %side, amount = %amount, token = %source.token(), "Approving treasury");

        let approval = match source.approve(spender, &amount).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.abort_swap(side, e)),
        };
        self.set_phase(SwapPhase::Approved);

        self.set_phase(SwapPhase::Submitting);
        self.ui.set_status(side.submitting_status());

        let result = match side {
            SwapSide::Buy => session.treasury.buy_arsv(&amount).await,
            SwapSide::Sell => session.treasury.sell_arsv(&amount).await,
        };
        let swap = match result {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.abort_swap(side, e)),
        };

        self.set_phase(SwapPhase::Confirmed);
        self.ui.set_status(side.completed_status());
        info!(
            side = %side,
            amount = %amount,
            approval_tx = %approval.tx_hash,
            swap_tx = %swap.tx_hash,
            "Swap confirmed"
        );

        self.update_balances().await;

        Ok(SwapReceipt {
            side,
            amount,
            approval,
            swap,
        })
    }

    fn abort_swap(&self, side: SwapSide, err: ClientError) -> ClientError {
        error!(side = %side, phase = ?self.swap_phase(), error = %err, "Swap aborted");
        self.set_phase(SwapPhase::Idle);
        self.ui.set_status(&format!("Error: {}", err));
        err
    }

    fn set_phase(&self, phase: SwapPhase) {
        *self.phase.lock() = phase;
    }

    /// Validate user input, alerting on failure.
    fn parse_amount(&self, amount_text: &str) -> Result<TokenAmount, ClientError> {
        TokenAmount::parse(amount_text, self.config.tokens.decimals).map_err(|e| {
            warn!(input = amount_text, error = %e, "Rejected amount");
            self.ui.alert(INVALID_AMOUNT_ALERT);
            ClientError::from(e)
        })
    }

    fn require_session(&self) -> Result<Arc<Session>, ClientError> {
        self.session.clone().ok_or_else(|| {
            let err = ClientError::NotConnected;
            self.ui.set_status(&format!("Error: {}", err));
            err
        })
    }

    /// Transfer `amount_text` of `token` to `to`.
    pub async fn transfer(
        &self,
        token: Token,
        to: Address,
        amount_text: &str,
    ) -> Result<TxOutcome, ClientError> {
        let amount = self.parse_amount(amount_text)?;
        let session = self.require_session()?;

        self.ui.set_status(&format!("Transferring {}...", token));
        match session.token(token).transfer(to, &amount).await {
            Ok(outcome) => {
                info!(token = %token, to = %to, amount = %amount, tx_hash = %outcome.tx_hash, "Transfer confirmed");
                self.ui.set_status("Transfer complete.");
                self.update_balances().await;
                Ok(outcome)
            }
            Err(e) => {
                error!(token = %token, error = %e, "Transfer failed");
                self.ui.set_status(&format!("Error: {}", e));
                Err(e)
            }
        }
    }

    /// Read the treasury's view functions.
    pub async fn treasury_info(&self) -> Result<TreasuryInfo, ClientError> {
        let session = self.require_session()?;
        session.treasury.info().await.inspect_err(|e| {
            error!(error = %e, "Failed to read treasury views");
        })
    }

    /// Subscribe to treasury events and append each one to the event log.
    ///
    /// Replaces any previous listener. The subscription lives until
    /// `disconnect()` or until the client is dropped.
    pub async fn listen_to_events(&mut self) -> Result<(), ClientError> {
        let session = self.session.clone().ok_or(ClientError::NotConnected)?;
        let mut subscription = session.treasury.events().await?;

        if let Some(previous) = self.listener.take() {
            previous.abort();
        }

        let ui = self.ui.clone();
        let decimals = self.config.tokens.decimals;
        self.listener = Some(tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                info!(
                    side = %event.side(),
                    account = %event.account(),
                    tx_hash = ?event.tx_hash(),
                    "Treasury event"
                );
                ui.append_event(&event.log_line(decimals));
            }
            debug!("Treasury event listener finished");
        }));

        Ok(())
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

/// Compare the configured scale with each token's `decimals()`.
///
/// Only warns: the configured scale stays in effect.
async fn verify_decimals(session: &Session, expected: u8) {
    for contract in [&session.usdt, &session.arsv] {
        match contract.onchain_decimals().await {
            Ok(actual) if actual == expected => {
                debug!(token = %contract.token(), decimals = actual, "Token decimals match");
            }
            Ok(actual) => warn!(
                token = %contract.token(),
                configured = expected,
                onchain = actual,
                "Token decimals differ from configured scale"
            ),
            Err(e) => warn!(token = %contract.token(), error = %e, "Could not read token decimals"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Disconnected.to_string(), "disconnected");
        assert_eq!(SessionState::NetworkMismatch.to_string(), "network_mismatch");
        assert_eq!(SessionState::Ready.to_string(), "ready");
    }

    #[tokio::test]
    async fn test_connect_without_wallet() {
        let ui = crate::ui::MemoryUi::shared();
        let mut client = SessionClient::new(ClientConfig::default(), None, ui.clone());

        let err = client.connect().await.unwrap_err();
        assert_eq!(err, ClientError::WalletMissing);
        assert_eq!(ui.status(), WALLET_MISSING_STATUS);
        assert_eq!(ui.status_history().len(), 1);
        assert_eq!(client.state(), SessionState::Disconnected);
        assert!(client.session().is_none());
        assert!(ui.account().is_empty());
    }

    #[tokio::test]
    async fn test_swap_before_connect() {
        let ui = crate::ui::MemoryUi::shared();
        let client = SessionClient::new(ClientConfig::default(), None, ui.clone());

        let err = client.buy_arsv("10").await.unwrap_err();
        assert_eq!(err, ClientError::NotConnected);
        assert_eq!(ui.status(), "Error: Not connected");
        assert!(ui.alerts().is_empty());
        assert_eq!(client.swap_phase(), SwapPhase::Idle);
    }

    #[tokio::test]
    async fn test_invalid_amount_alerts_before_connection_check() {
        let ui = crate::ui::MemoryUi::shared();
        let client = SessionClient::new(ClientConfig::default(), None, ui.clone());

        let err = client.sell_arsv("abc").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
        assert_eq!(ui.alerts(), vec![INVALID_AMOUNT_ALERT.to_string()]);
        assert!(ui.status_history().is_empty());
    }

    #[tokio::test]
    async fn test_update_balances_without_session() {
        let ui = crate::ui::MemoryUi::shared();
        let client = SessionClient::new(ClientConfig::default(), None, ui.clone());

        assert!(client.update_balances().await.is_none());
        assert_eq!(ui.balances(), (String::new(), String::new()));
    }
}
