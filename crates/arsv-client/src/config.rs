//! Configuration for arsv-client.
//!
//! Supports loading from TOML file with environment variable overrides.
//! Defaults point at the Sepolia treasury deployment.

use std::path::Path;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result, bail};
use serde::Deserialize;

use arsv_common::{
    ARSV_TOKEN_ADDRESS, DEFAULT_DECIMALS, MAX_DECIMALS, SEPOLIA_CHAIN_ID, TREASURY_ADDRESS,
    USDT_TOKEN_ADDRESS,
};

/// Public Sepolia RPC used when nothing else is configured.
pub const DEFAULT_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";

/// Top-level configuration for arsv-client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Logging level.
    pub log_level: String,

    /// Network the treasury lives on.
    pub network: NetworkConfig,

    /// Contract deployments.
    pub contracts: ContractsConfig,

    /// Token scale handling.
    pub tokens: TokensConfig,

    /// Transaction and RPC behaviour.
    pub execution: ExecutionConfig,

    /// Wallet configuration.
    pub wallet: WalletConfig,
}

/// Network parameters.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,

    /// Chain id the wallet must report before contracts are bound.
    pub chain_id: u64,

    /// Display name used in status messages.
    pub name: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: SEPOLIA_CHAIN_ID,
            name: "Sepolia".to_string(),
        }
    }
}

/// Contract addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractsConfig {
    pub arsv_token: Address,
    pub usdt_token: Address,
    pub treasury: Address,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            arsv_token: ARSV_TOKEN_ADDRESS,
            usdt_token: USDT_TOKEN_ADDRESS,
            treasury: TREASURY_ADDRESS,
        }
    }
}

/// Token scale configuration.
#[derive(Debug, Clone)]
pub struct TokensConfig {
    /// Fractional digits shared by both tokens.
    pub decimals: u8,

    /// Query `decimals()` on connect and warn when it disagrees with `decimals`.
    pub verify_decimals: bool,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
            verify_decimals: false,
        }
    }
}

/// Upper bound for `read_max_retries`.
pub const MAX_READ_RETRIES: u32 = 10;

/// Transaction and RPC behaviour.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Timeout for handing a transaction to the RPC (seconds).
    pub tx_send_timeout_secs: u64,

    /// Timeout for waiting on inclusion (seconds).
    pub tx_confirm_timeout_secs: u64,

    /// Attempts for read calls that hit an RPC rate limit.
    pub read_max_retries: u32,

    /// Base delay between read retries (milliseconds), doubled per attempt.
    pub retry_base_delay_ms: u64,

    /// Log polling interval for event subscriptions (milliseconds).
    pub event_poll_interval_ms: u64,

    /// Hold a lock across approve + swap so overlapping swaps cannot interleave.
    pub serialize_swaps: bool,
}

impl ExecutionConfig {
    pub fn tx_send_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_send_timeout_secs)
    }

    pub fn tx_confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_confirm_timeout_secs)
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_interval_ms)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            tx_send_timeout_secs: 30,
            tx_confirm_timeout_secs: 120,
            read_max_retries: 3,
            retry_base_delay_ms: 1000,
            event_poll_interval_ms: 4000,
            serialize_swaps: true,
        }
    }
}

/// Wallet configuration.
#[derive(Debug, Clone, Default)]
pub struct WalletConfig {
    /// Private key (loaded from env var, never in config file).
    pub private_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            network: NetworkConfig::default(),
            contracts: ContractsConfig::default(),
            tokens: TokensConfig::default(),
            execution: ExecutionConfig::default(),
            wallet: WalletConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlConfig = toml::from_str(content).context("Failed to parse TOML config")?;
        Self::try_from(file)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("ARSV_PRIVATE_KEY")
            && !key.trim().is_empty()
        {
            self.wallet.private_key = Some(key.trim().to_string());
        }
        if let Ok(url) = std::env::var("ARSV_RPC_URL")
            && !url.trim().is_empty()
        {
            self.network.rpc_url = url.trim().to_string();
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_cli_overrides(&mut self, rpc_url: Option<String>, log_level: Option<String>) {
        if let Some(url) = rpc_url {
            self.network.rpc_url = url;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
    }

    /// Validate configuration and return errors for invalid values.
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url.trim().is_empty() {
            bail!("rpc_url must not be empty");
        }
        if self.network.chain_id == 0 {
            bail!("chain_id must be non-zero");
        }

        let c = &self.contracts;
        if c.arsv_token.is_zero() || c.usdt_token.is_zero() || c.treasury.is_zero() {
            bail!("Contract addresses must be non-zero");
        }
        if c.arsv_token == c.usdt_token {
            bail!("arsv_token and usdt_token must differ");
        }
        if c.treasury == c.arsv_token || c.treasury == c.usdt_token {
            bail!("treasury address must differ from the token addresses");
        }

        if self.tokens.decimals > MAX_DECIMALS {
            bail!("decimals must be at most {}", MAX_DECIMALS);
        }

        if self.execution.tx_send_timeout_secs == 0 || self.execution.tx_confirm_timeout_secs == 0 {
            bail!("Transaction timeouts must be positive");
        }
        if self.execution.read_max_retries == 0 {
            bail!("read_max_retries must be at least 1");
        }
        if self.execution.read_max_retries > MAX_READ_RETRIES {
            bail!("read_max_retries must be at most {}", MAX_READ_RETRIES);
        }
        if self.execution.event_poll_interval_ms == 0 {
            bail!("event_poll_interval_ms must be positive");
        }

        Ok(())
    }
}

// ============================================================================
// TOML deserialization structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    general: GeneralToml,
    #[serde(default)]
    network: NetworkToml,
    #[serde(default)]
    contracts: ContractsToml,
    #[serde(default)]
    tokens: TokensToml,
    #[serde(default)]
    execution: ExecutionToml,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GeneralToml {
    log_level: String,
}

impl Default for GeneralToml {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NetworkToml {
    rpc_url: String,
    chain_id: u64,
    network_name: String,
}

impl Default for NetworkToml {
    fn default() -> Self {
        let defaults = NetworkConfig::default();
        Self {
            rpc_url: defaults.rpc_url,
            chain_id: defaults.chain_id,
            network_name: defaults.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ContractsToml {
    arsv_token: String,
    usdt_token: String,
    treasury: String,
}

impl Default for ContractsToml {
    fn default() -> Self {
        Self {
            arsv_token: ARSV_TOKEN_ADDRESS.to_string(),
            usdt_token: USDT_TOKEN_ADDRESS.to_string(),
            treasury: TREASURY_ADDRESS.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TokensToml {
    decimals: u8,
    verify_decimals: bool,
}

impl Default for TokensToml {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
            verify_decimals: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ExecutionToml {
    tx_send_timeout_secs: u64,
    tx_confirm_timeout_secs: u64,
    read_max_retries: u32,
    retry_base_delay_ms: u64,
    event_poll_interval_ms: u64,
    serialize_swaps: bool,
}

impl Default for ExecutionToml {
    fn default() -> Self {
        let defaults = ExecutionConfig::default();
        Self {
            tx_send_timeout_secs: defaults.tx_send_timeout_secs,
            tx_confirm_timeout_secs: defaults.tx_confirm_timeout_secs,
            read_max_retries: defaults.read_max_retries,
            retry_base_delay_ms: defaults.retry_base_delay_ms,
            event_poll_interval_ms: defaults.event_poll_interval_ms,
            serialize_swaps: defaults.serialize_swaps,
        }
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    value
        .trim()
        .parse::<Address>()
        .with_context(|| format!("Invalid address for {}: {}", field, value))
}

impl TryFrom<TomlConfig> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(toml: TomlConfig) -> Result<Self> {
        Ok(Self {
            log_level: toml.general.log_level,
            network: NetworkConfig {
                rpc_url: toml.network.rpc_url,
                chain_id: toml.network.chain_id,
                name: toml.network.network_name,
            },
            contracts: ContractsConfig {
                arsv_token: parse_address("arsv_token", &toml.contracts.arsv_token)?,
                usdt_token: parse_address("usdt_token", &toml.contracts.usdt_token)?,
                treasury: parse_address("treasury", &toml.contracts.treasury)?,
            },
            tokens: TokensConfig {
                decimals: toml.tokens.decimals,
                verify_decimals: toml.tokens.verify_decimals,
            },
            execution: ExecutionConfig {
                tx_send_timeout_secs: toml.execution.tx_send_timeout_secs,
                tx_confirm_timeout_secs: toml.execution.tx_confirm_timeout_secs,
                read_max_retries: toml.execution.read_max_retries,
                retry_base_delay_ms: toml.execution.retry_base_delay_ms,
                event_poll_interval_ms: toml.execution.event_poll_interval_ms,
                serialize_swaps: toml.execution.serialize_swaps,
            },
            wallet: WalletConfig::default(), // Always from env vars
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.network.chain_id, 11155111);
        assert_eq!(config.tokens.decimals, 4);
        assert!(!config.tokens.verify_decimals);
        assert_eq!(config.contracts.treasury, TREASURY_ADDRESS);
        assert!(config.wallet.private_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [general]
            log_level = "debug"

            [network]
            rpc_url = "http://localhost:8545"
            chain_id = 31337
            network_name = "Anvil"

            [contracts]
            treasury = "0x0000000000000000000000000000000000000abc"

            [tokens]
            verify_decimals = true

            [execution]
            tx_confirm_timeout_secs = 60
            serialize_swaps = false
        "#;

        let config = ClientConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.network.rpc_url, "http://localhost:8545");
        assert_eq!(config.network.chain_id, 31337);
        assert_eq!(config.network.name, "Anvil");
        assert_eq!(
            config.contracts.treasury,
            "0x0000000000000000000000000000000000000abc".parse::<Address>().unwrap()
        );
        assert_eq!(config.contracts.arsv_token, ARSV_TOKEN_ADDRESS);
        assert_eq!(config.tokens.decimals, 4);
        assert!(config.tokens.verify_decimals);
        assert_eq!(config.execution.tx_confirm_timeout(), Duration::from_secs(60));
        assert_eq!(config.execution.tx_send_timeout_secs, 30);
        assert!(!config.execution.serialize_swaps);
    }

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.network.chain_id, SEPOLIA_CHAIN_ID);
        assert_eq!(config.contracts, ContractsConfig::default());
    }

    #[test]
    fn test_parse_invalid_address() {
        let toml = r#"
            [contracts]
            arsv_token = "not-an-address"
        "#;
        assert!(ClientConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = ClientConfig::default();
        config.apply_cli_overrides(Some("http://override:8545".to_string()), Some("trace".to_string()));

        assert_eq!(config.network.rpc_url, "http://override:8545");
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_validate_same_token_addresses() {
        let mut config = ClientConfig::default();
        config.contracts.usdt_token = config.contracts.arsv_token;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_treasury_collides_with_token() {
        let mut config = ClientConfig::default();
        config.contracts.treasury = config.contracts.usdt_token;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_decimals_too_large() {
        let mut config = ClientConfig::default();
        config.tokens.decimals = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_retries() {
        let mut config = ClientConfig::default();
        config.execution.read_max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_retry_cap() {
        let mut config = ClientConfig::default();
        config.execution.read_max_retries = MAX_READ_RETRIES;
        assert!(config.validate().is_ok());

        config.execution.read_max_retries = 65;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_rpc_url() {
        let mut config = ClientConfig::default();
        config.network.rpc_url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
