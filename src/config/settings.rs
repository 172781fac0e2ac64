//! Process configuration read from the environment

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use url::Url;

use crate::chain::Network;
use crate::core::constants::{DEFAULT_APP_URL, DEFAULT_NOTIFY_BASE_URL};
use crate::error::ConfigError;

pub const RPC_URL_ENV: &str = "POTLUCK_RPC_URL";
pub const SIGNER_KEY_ENV: &str = "POTLUCK_SIGNER_KEY";
pub const CHAIN_ENV: &str = "POTLUCK_CHAIN";
pub const NOTIFY_API_KEY_ENV: &str = "POTLUCK_NOTIFY_API_KEY";
pub const CONTRACT_ADDRESS_ENV: &str = "POTLUCK_CONTRACT_ADDRESS";
pub const NOTIFY_BASE_URL_ENV: &str = "POTLUCK_NOTIFY_BASE_URL";
pub const APP_URL_ENV: &str = "POTLUCK_APP_URL";
pub const CRON_SECRET_ENV: &str = "POTLUCK_CRON_SECRET";

#[derive(Clone)]
pub struct KeeperConfig {
    pub rpc_url: Url,
    pub network: Network,
    pub contract_address: Address,
    /// Transaction signer, already bound to the network's chain id
    pub signer: LocalWallet,
    pub notify_api_key: String,
    pub notify_base_url: Url,
    pub app_url: String,
    pub cron_secret: Option<String>,
}

impl std::fmt::Debug for KeeperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeeperConfig")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("network", &self.network)
            .field("contract_address", &self.contract_address)
            .field("signer_address", &self.signer.address())
            .field("notify_base_url", &self.notify_base_url.as_str())
            .field("app_url", &self.app_url)
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl KeeperConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        // Every required value is looked up before any parsing so a misconfigured
        // deployment reports the first missing name, not a parse error.
        let rpc_url = require(RPC_URL_ENV)?;
        let signer_key = require(SIGNER_KEY_ENV)?;
        let chain = require(CHAIN_ENV)?;
        let notify_api_key = require(NOTIFY_API_KEY_ENV)?;
        let contract_address = require(CONTRACT_ADDRESS_ENV)?;

        let rpc_url = Url::parse(&rpc_url).map_err(|e| ConfigError::Invalid {
            key: RPC_URL_ENV,
            reason: e.to_string(),
        })?;
        let network = chain.parse::<Network>().map_err(|reason| ConfigError::Invalid {
            key: CHAIN_ENV,
            reason,
        })?;
        let signer = signer_key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|_| ConfigError::Invalid {
                key: SIGNER_KEY_ENV,
                reason: "not a valid secp256k1 private key".to_string(),
            })?
            .with_chain_id(network.chain_id());
        let contract_address =
            contract_address
                .parse::<Address>()
                .map_err(|e| ConfigError::Invalid {
                    key: CONTRACT_ADDRESS_ENV,
                    reason: e.to_string(),
                })?;

        // Trailing slash so endpoint paths join below any base path
        let mut notify_base_url = get(NOTIFY_BASE_URL_ENV)
            .unwrap_or_else(|| DEFAULT_NOTIFY_BASE_URL.to_string());
        if !notify_base_url.ends_with('/') {
            notify_base_url.push('/');
        }
        let notify_base_url = Url::parse(&notify_base_url).map_err(|e| ConfigError::Invalid {
            key: NOTIFY_BASE_URL_ENV,
            reason: e.to_string(),
        })?;
        let app_url = get(APP_URL_ENV)
            .unwrap_or_else(|| DEFAULT_APP_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            rpc_url,
            network,
            contract_address,
            signer,
            notify_api_key,
            notify_base_url,
            app_url,
            cron_secret: get(CRON_SECRET_ENV),
        })
    }
}
