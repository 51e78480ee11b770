//! JSON-RPC wallet backed by a local signing key.
//!
//! Plays the role of the browser wallet: it owns the signing identity, talks
//! to the configured RPC endpoint and submits transactions through alloy's
//! generated contract bindings.
//!
//! Reads retry with exponential backoff when the RPC reports a rate limit.
//! Writes never retry: a failed send or confirmation is returned as is.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log};
use alloy::signers::Signer;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolEvent;
use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use arsv_common::{PurchaseEvent, SaleEvent, TreasuryEvent, TxOutcome};

use super::{EventSubscription, TreasuryInfo, WalletProvider};
use crate::config::ClientConfig;
use crate::error::ClientError;

/// Buffered events per subscription before the poller waits on the consumer.
const EVENT_CHANNEL_CAPACITY: usize = 256;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }

    #[sol(rpc)]
    interface IARSVTreasury {
        function buyARSV(uint256 usdtAmount) external;
        function sellARSV(uint256 arsvAmount) external;
        function getUSDTBalance() external view returns (uint256);
        function getARSVBalance() external view returns (uint256);
        function getMaxBuyableUSDT() external view returns (uint256);
        function feeRecipient() external view returns (address);
        function approvedWithdrawer() external view returns (address);
        function buyPrice() external view returns (uint256);
        function sellPrice() external view returns (uint256);
        function buyFee() external view returns (uint256);
        function sellFee() external view returns (uint256);

        event TokensPurchased(address indexed buyer, uint256 usdtAmount, uint256 arsvAmount);
        event TokensSold(address indexed seller, uint256 arsvAmount, uint256 usdtAmount);
    }
}

fn is_rate_limit_error(err: &str) -> bool {
    err.contains("-32090") || err.contains("rate limit") || err.contains("Too many requests")
}

/// Backoff before retry number `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_delay_ms.saturating_mul(factor))
}

/// Run a read, retrying with exponential backoff while the RPC reports rate limits.
///
/// Any other error fails immediately.
async fn read_with_retry<F, Fut, T>(
    desc: &str,
    max_retries: u32,
    base_delay_ms: u64,
    f: F,
) -> Result<T, ClientError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut last_error = String::new();
    for attempt in 0..max_retries {
        if attempt > 0 {
            let delay = backoff_delay(base_delay_ms, attempt);
            info!(
                call = desc,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Retrying RPC read after rate limit"
            );
            tokio::time::sleep(delay).await;
        }

        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if is_rate_limit_error(&e) => {
                warn!(call = desc, attempt = attempt + 1, error = %e, "RPC rate limit hit, will retry");
                last_error = e;
            }
            Err(e) => return Err(ClientError::Read(format!("Failed to get {}: {}", desc, e))),
        }
    }
    Err(ClientError::Read(format!(
        "Failed to get {} after {} attempts: {}",
        desc, max_retries, last_error
    )))
}

/// Await `fut` for at most `limit`. Failures and expiry both become `ChainCall`.
async fn with_timeout<T, E, Fut>(what: &str, limit: Duration, fut: Fut) -> Result<T, ClientError>
where
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    match timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ClientError::ChainCall(format!("{} failed: {}", what, e))),
        Err(_) => Err(ClientError::ChainCall(format!(
            "{} timed out after {}s",
            what,
            limit.as_secs()
        ))),
    }
}

/// Decode a raw treasury log into a typed event.
///
/// Returns `None` for logs that are neither `TokensPurchased` nor `TokensSold`.
pub(crate) fn decode_treasury_log(log: &Log) -> Option<TreasuryEvent> {
    if let Ok(decoded) = log.log_decode::<IARSVTreasury::TokensPurchased>() {
        let data = decoded.inner.data;
        return Some(TreasuryEvent::Purchased(PurchaseEvent {
            buyer: data.buyer,
            usdt_amount: data.usdtAmount,
            arsv_amount: data.arsvAmount,
            tx_hash: log.transaction_hash,
            block_number: log.block_number,
        }));
    }

    if let Ok(decoded) = log.log_decode::<IARSVTreasury::TokensSold>() {
        let data = decoded.inner.data;
        return Some(TreasuryEvent::Sold(SaleEvent {
            seller: data.seller,
            arsv_amount: data.arsvAmount,
            usdt_amount: data.usdtAmount,
            tx_hash: log.transaction_hash,
            block_number: log.block_number,
        }));
    }

    None
}

/// Wallet provider that signs locally and submits over JSON-RPC.
pub struct RpcWallet {
    signer_address: Address,
    provider: DynProvider,
    tx_send_timeout: Duration,
    tx_confirm_timeout: Duration,
    read_max_retries: u32,
    retry_base_delay_ms: u64,
    event_poll_interval: Duration,
}

impl RpcWallet {
    /// Build a wallet from a hex private key and the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed or the endpoint cannot be reached.
    pub async fn connect(private_key: &str, config: &ClientConfig) -> anyhow::Result<Self> {
        let key = private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer = PrivateKeySigner::from_str(key)
            .context("Invalid private key")?
            .with_chain_id(Some(config.network.chain_id));
        let signer_address = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect(&config.network.rpc_url)
            .await
            .with_context(|| format!("Failed to connect to RPC {}", config.network.rpc_url))?
            .erased();

        info!(
            account = %signer_address,
            rpc_url = %config.network.rpc_url,
            "RPC wallet initialized"
        );

        Ok(Self {
            signer_address,
            provider,
            tx_send_timeout: config.execution.tx_send_timeout(),
            tx_confirm_timeout: config.execution.tx_confirm_timeout(),
            read_max_retries: config.execution.read_max_retries,
            retry_base_delay_ms: config.execution.retry_base_delay_ms,
            event_poll_interval: config.execution.event_poll_interval(),
        })
    }

    async fn read<F, Fut, T>(&self, desc: &str, f: F) -> Result<T, ClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, String>>,
    {
        read_with_retry(desc, self.read_max_retries, self.retry_base_delay_ms, f).await
    }

    /// Hand a transaction to the RPC and wait until it is included.
    async fn submit<Fut>(&self, label: &str, send: Fut) -> Result<TxOutcome, ClientError>
    where
        Fut: Future<Output = Result<PendingTransactionBuilder<Ethereum>, alloy::contract::Error>>,
    {
        let pending = with_timeout(&format!("{} send", label), self.tx_send_timeout, send).await?;

        let tx_hash = *pending.tx_hash();
        debug!(call = label, tx_hash = %tx_hash, "Transaction sent, awaiting receipt");

        let receipt = with_timeout(
            &format!("{} confirmation (tx {})", label, tx_hash),
            self.tx_confirm_timeout,
            pending.get_receipt(),
        )
        .await?;

        if !receipt.status() {
            return Err(ClientError::ChainCall(format!(
                "{} transaction {} reverted",
                label, receipt.transaction_hash
            )));
        }

        info!(
            call = label,
            tx_hash = %receipt.transaction_hash,
            block = ?receipt.block_number,
            "Transaction confirmed"
        );

        Ok(TxOutcome {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        })
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn request_accounts(&self) -> Result<Address, ClientError> {
        Ok(self.signer_address)
    }

    async fn chain_id(&self) -> Result<u64, ClientError> {
        let provider = &self.provider;
        self.read("chain id", || async move {
            provider.get_chain_id().await.map_err(|e| e.to_string())
        })
        .await
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ClientError> {
        let contract = IERC20::new(token, self.provider.clone());
        let contract = &contract;
        self.read("token balance", || async move {
            contract.balanceOf(owner).call().await.map_err(|e| e.to_string())
        })
        .await
    }

    async fn decimals(&self, token: Address) -> Result<u8, ClientError> {
        let contract = IERC20::new(token, self.provider.clone());
        let contract = &contract;
        self.read("token decimals", || async move {
            contract.decimals().call().await.map_err(|e| e.to_string())
        })
        .await
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxOutcome, ClientError> {
        let contract = IERC20::new(token, self.provider.clone());
        let call = contract.approve(spender, amount);
        self.submit("approve", call.send()).await
    }

    async fn transfer(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxOutcome, ClientError> {
        let contract = IERC20::new(token, self.provider.clone());
        let call = contract.transfer(to, amount);
        self.submit("transfer", call.send()).await
    }

    async fn buy_arsv(&self, treasury: Address, usdt_amount: U256) -> Result<TxOutcome, ClientError> {
        let contract = IARSVTreasury::new(treasury, self.provider.clone());
        let call = contract.buyARSV(usdt_amount);
        self.submit("buyARSV", call.send()).await
    }

    async fn sell_arsv(&self, treasury: Address, arsv_amount: U256) -> Result<TxOutcome, ClientError> {
        let contract = IARSVTreasury::new(treasury, self.provider.clone());
        let call = contract.sellARSV(arsv_amount);
        self.submit("sellARSV", call.send()).await
    }

    async fn treasury_info(&self, treasury: Address) -> Result<TreasuryInfo, ClientError> {
        let contract = IARSVTreasury::new(treasury, self.provider.clone());
        let c = &contract;

        let (usdt_balance, arsv_balance, max_buyable_usdt) = tokio::try_join!(
            self.read("getUSDTBalance", || async move {
                c.getUSDTBalance().call().await.map_err(|e| e.to_string())
            }),
            self.read("getARSVBalance", || async move {
                c.getARSVBalance().call().await.map_err(|e| e.to_string())
            }),
            self.read("getMaxBuyableUSDT", || async move {
                c.getMaxBuyableUSDT().call().await.map_err(|e| e.to_string())
            }),
        )?;

        let (fee_recipient, approved_withdrawer) = tokio::try_join!(
            self.read("feeRecipient", || async move {
                c.feeRecipient().call().await.map_err(|e| e.to_string())
            }),
            self.read("approvedWithdrawer", || async move {
                c.approvedWithdrawer().call().await.map_err(|e| e.to_string())
            }),
        )?;

        let (buy_price, sell_price, buy_fee, sell_fee) = tokio::try_join!(
            self.read("buyPrice", || async move {
                c.buyPrice().call().await.map_err(|e| e.to_string())
            }),
            self.read("sellPrice", || async move {
                c.sellPrice().call().await.map_err(|e| e.to_string())
            }),
            self.read("buyFee", || async move {
                c.buyFee().call().await.map_err(|e| e.to_string())
            }),
            self.read("sellFee", || async move {
                c.sellFee().call().await.map_err(|e| e.to_string())
            }),
        )?;

        Ok(TreasuryInfo {
            usdt_balance,
            arsv_balance,
            max_buyable_usdt,
            fee_recipient,
            approved_withdrawer,
            buy_price,
            sell_price,
            buy_fee,
            sell_fee,
        })
    }

    async fn subscribe_treasury_events(
        &self,
        treasury: Address,
    ) -> Result<EventSubscription, ClientError> {
        let filter = Filter::new().address(treasury).event_signature(vec![
            IARSVTreasury::TokensPurchased::SIGNATURE_HASH,
            IARSVTreasury::TokensSold::SIGNATURE_HASH,
        ]);

        let poller = self
            .provider
            .watch_logs(&filter)
            .await
            .map_err(|e| ClientError::ChainCall(format!("Failed to install log filter: {}", e)))?;
        let stream = poller.with_poll_interval(self.event_poll_interval).into_stream();

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let task = tokio::spawn(async move {
            let mut stream = std::pin::pin!(stream);
            while let Some(logs) = stream.next().await {
                for log in logs {
                    match decode_treasury_log(&log) {
                        Some(event) => {
                            debug!(event = %event, "Treasury event received");
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                        None => debug!(tx_hash = ?log.transaction_hash, "Ignoring unrecognized treasury log"),
                    }
                }
            }
            warn!("Treasury event stream ended");
        });

        info!(treasury = %treasury, "Subscribed to treasury events");
        Ok(EventSubscription::new(rx, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rpc_log(treasury: Address, data: alloy::primitives::LogData) -> Log {
        Log {
            inner: alloy::primitives::Log { address: treasury, data },
            transaction_hash: Some(B256::repeat_byte(0x11)),
            block_number: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_rate_limit_error() {
        assert!(is_rate_limit_error("server returned -32090"));
        assert!(is_rate_limit_error("429 Too many requests"));
        assert!(!is_rate_limit_error("execution reverted"));
    }

    #[test]
    fn test_backoff_delay_doubles_and_saturates() {
        assert_eq!(backoff_delay(1000, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1000, 3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(0, 5), Duration::ZERO);
        // 2^69 would overflow u64.
        assert_eq!(backoff_delay(1000, 70), Duration::from_millis(u64::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_retries_rate_limit_then_succeeds() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = read_with_retry("token balance", 3, 1000, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("429 Too many requests".to_string())
                } else {
                    Ok(7u64)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s then 2s of backoff.
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_fails_fast_on_other_errors() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<u64, ClientError> = read_with_retry("token balance", 3, 1000, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("execution reverted".to_string()) }
        })
        .await;

        assert_eq!(
            result,
            Err(ClientError::Read(
                "Failed to get token balance: execution reverted".to_string()
            ))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<u64, ClientError> = read_with_retry("chain id", 3, 10, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("error code -32090: rate limit exceeded".to_string()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(ClientError::Read(msg)) => {
                assert!(msg.contains("after 3 attempts"), "unexpected message: {}", msg);
                assert!(msg.contains("-32090"));
            }
            other => panic!("Expected read failure, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires_on_stalled_future() {
        let result = with_timeout(
            "approve send",
            Duration::from_secs(30),
            std::future::pending::<Result<(), String>>(),
        )
        .await;

        assert_eq!(
            result,
            Err(ClientError::ChainCall("approve send timed out after 30s".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_passes_through_results() {
        let ok = with_timeout("buyARSV send", Duration::from_secs(30), async {
            Ok::<_, String>(5u8)
        })
        .await;
        assert_eq!(ok, Ok(5));

        let err = with_timeout("buyARSV send", Duration::from_secs(30), async {
            Err::<u8, _>("insufficient funds for gas")
        })
        .await;
        assert_eq!(
            err,
            Err(ClientError::ChainCall(
                "buyARSV send failed: insufficient funds for gas".to_string()
            ))
        );
    }

    #[test]
    fn test_decode_purchase_log() {
        let buyer = Address::repeat_byte(0x0a);
        let event = IARSVTreasury::TokensPurchased {
            buyer,
            usdtAmount: U256::from(500_000u64),
            arsvAmount: U256::from(250_000u64),
        };
        let log = rpc_log(Address::repeat_byte(0x33), event.encode_log_data());

        let decoded = decode_treasury_log(&log).unwrap();
        assert_eq!(
            decoded,
            TreasuryEvent::Purchased(PurchaseEvent {
                buyer,
                usdt_amount: U256::from(500_000u64),
                arsv_amount: U256::from(250_000u64),
                tx_hash: Some(B256::repeat_byte(0x11)),
                block_number: Some(42),
            })
        );
    }

    #[test]
    fn test_decode_sale_log() {
        let seller = Address::repeat_byte(0x0b);
        let event = IARSVTreasury::TokensSold {
            seller,
            arsvAmount: U256::from(10_000u64),
            usdtAmount: U256::from(20_000u64),
        };
        let log = rpc_log(Address::repeat_byte(0x33), event.encode_log_data());

        match decode_treasury_log(&log) {
            Some(TreasuryEvent::Sold(sale)) => {
                assert_eq!(sale.seller, seller);
                assert_eq!(sale.arsv_amount, U256::from(10_000u64));
                assert_eq!(sale.usdt_amount, U256::from(20_000u64));
            }
            other => panic!("Expected sale, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unrelated_log() {
        let data = alloy::primitives::LogData::new_unchecked(vec![B256::repeat_byte(0x99)], Default::default());
        assert!(decode_treasury_log(&rpc_log(Address::ZERO, data)).is_none());
    }
}
