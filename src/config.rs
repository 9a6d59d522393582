use crate::{
    consts::{
        BASE_CHAIN_ID, BASE_RPC_URL, BASE_SEPOLIA_CHAIN_ID, BASE_SEPOLIA_RPC_URL,
        CONFIRMATION_POLL_MS, CONFIRMATION_TIMEOUT_SECS, CREATOR_COIN_FACTORY,
        ENTRY_POINT_ADDRESS, PROVISION_RETRY_DELAY_MS, SIMPLE_ACCOUNT_FACTORY,
    },
    errors::CoinOpError,
};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, warn};

/// The two chain configurations a user can pick from
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    #[default]
    Test,
}

/// Endpoints and contracts of one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Expected chain id of `rpc_url`
    pub chain_id: u64,
    /// JSON-RPC node
    pub rpc_url: String,
    /// Paymaster endpoint (`pm_sponsorUserOperation`)
    pub paymaster_url: String,
    /// Bundler endpoint. Defaults to the paymaster endpoint.
    #[serde(default)]
    pub bundler_url: Option<String>,
    pub entry_point: Address,
    /// Smart account factory
    pub account_factory: Address,
    /// Creator coin factory
    pub coin_factory: Address,
    /// Referrer used when a deployment request names none
    pub platform_referrer: Address,
}

fn address_const(value: &str) -> Address {
    value.parse::<Address>().unwrap_or_default()
}

impl NetworkConfig {
    /// Base mainnet. The paymaster endpoint carries an API key and must be configured.
    pub fn base() -> Self {
        Self {
            chain_id: BASE_CHAIN_ID,
            rpc_url: BASE_RPC_URL.to_string(),
            paymaster_url: String::new(),
            bundler_url: None,
            entry_point: address_const(ENTRY_POINT_ADDRESS),
            account_factory: address_const(SIMPLE_ACCOUNT_FACTORY),
            coin_factory: address_const(CREATOR_COIN_FACTORY),
            platform_referrer: Address::zero(),
        }
    }

    /// Base Sepolia
    pub fn base_sepolia() -> Self {
        Self {
            chain_id: BASE_SEPOLIA_CHAIN_ID,
            rpc_url: BASE_SEPOLIA_RPC_URL.to_string(),
            ..Self::base()
        }
    }

    pub fn bundler_url(&self) -> &str {
        self.bundler_url.as_deref().unwrap_or(&self.paymaster_url)
    }

    /// Checks that the configuration is usable for `network`
    pub fn validate(&self, network: Network) -> Result<(), CoinOpError> {
        let expected = match network {
            Network::Main => BASE_CHAIN_ID,
            Network::Test => BASE_SEPOLIA_CHAIN_ID,
        };
        if self.chain_id != expected {
            return Err(CoinOpError::Config(format!(
                "{network:?} network expects chain {expected}, configured {}",
                self.chain_id
            )));
        }
        if self.rpc_url.is_empty() {
            return Err(CoinOpError::Config("rpc url is empty".to_string()));
        }
        if self.paymaster_url.is_empty() {
            return Err(CoinOpError::Config(format!(
                "paymaster url for {network:?} network is empty"
            )));
        }
        if self.coin_factory.is_zero() || self.account_factory.is_zero() || self.entry_point.is_zero() {
            return Err(CoinOpError::Config("contract address is zero".to_string()));
        }
        if self.platform_referrer.is_zero() {
            warn!("platform referrer is the zero address");
        }
        Ok(())
    }
}

/// Bounded retry applied to smart account construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Automatic retries after the first failure
    pub max_retries: u32,
    /// Fixed delay before each retry, in milliseconds
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_ms: PROVISION_RETRY_DELAY_MS,
        }
    }
}

/// Confirmation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: CONFIRMATION_TIMEOUT_SECS,
            poll_interval_ms: CONFIRMATION_POLL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinOpConfig {
    pub main: NetworkConfig,
    pub test: NetworkConfig,
    #[serde(default)]
    pub provisioning: RetryPolicy,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
}

impl Default for CoinOpConfig {
    fn default() -> Self {
        Self {
            main: NetworkConfig::base(),
            test: NetworkConfig::base_sepolia(),
            provisioning: RetryPolicy::default(),
            confirmation: ConfirmationConfig::default(),
        }
    }
}

impl CoinOpConfig {
    pub fn network(&self, network: Network) -> &NetworkConfig {
        match network {
            Network::Main => &self.main,
            Network::Test => &self.test,
        }
    }

    /// Loads a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, CoinOpError> {
        let content = fs::read_to_string(path)
            .map_err(|e| CoinOpError::Config(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| CoinOpError::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Defaults overridden by `MAIN_RPC_URL`, `MAIN_PAYMASTER_URL`, `MAIN_BUNDLER_URL`,
    /// `TEST_RPC_URL`, `TEST_PAYMASTER_URL`, `TEST_BUNDLER_URL` and `PLATFORM_REFERRER`
    pub fn from_env() -> Result<Self, CoinOpError> {
        let mut config = Self::default();
        apply_env(&mut config.main, "MAIN");
        apply_env(&mut config.test, "TEST");
        if let Ok(referrer) = env::var("PLATFORM_REFERRER") {
            let referrer = referrer
                .parse::<Address>()
                .map_err(|e| CoinOpError::Config(format!("PLATFORM_REFERRER: {e}")))?;
            config.main.platform_referrer = referrer;
            config.test.platform_referrer = referrer;
        }
        Ok(config)
    }
}

fn apply_env(network: &mut NetworkConfig, prefix: &str) {
    if let Ok(url) = env::var(format!("{prefix}_RPC_URL")) {
        network.rpc_url = url;
    }
    if let Ok(url) = env::var(format!("{prefix}_PAYMASTER_URL")) {
        network.paymaster_url = url;
    }
    if let Ok(url) = env::var(format!("{prefix}_BUNDLER_URL")) {
        network.bundler_url = Some(url);
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceFile {
    network: Network,
}

/// Network selection persisted on the client
#[derive(Debug, Clone)]
pub struct NetworkPreference {
    path: PathBuf,
}

impl NetworkPreference {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<config dir>/creator-coin/preference.json`
    pub fn default_location() -> Result<Self, CoinOpError> {
        let dir = dirs::config_dir()
            .ok_or_else(|| CoinOpError::Config("no config directory".to_string()))?;
        Ok(Self::new(dir.join("creator-coin").join("preference.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored network, or the default when nothing is stored yet
    pub fn load(&self) -> Result<Network, CoinOpError> {
        if !self.path.exists() {
            return Ok(Network::default());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| CoinOpError::Config(format!("reading {}: {e}", self.path.display())))?;
        let file: PreferenceFile = serde_json::from_str(&content)
            .map_err(|e| CoinOpError::Config(format!("parsing {}: {e}", self.path.display())))?;
        Ok(file.network)
    }

    pub fn save(&self, network: Network) -> Result<(), CoinOpError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CoinOpError::Config(format!("creating {}: {e}", parent.display())))?;
        }
        let content = serde_json::to_string_pretty(&PreferenceFile { network })
            .map_err(|e| CoinOpError::Config(e.to_string()))?;
        fs::write(&self.path, content)
            .map_err(|e| CoinOpError::Config(format!("writing {}: {e}", self.path.display())))?;
        info!(?network, "saved network preference");
        Ok(())
    }
}
