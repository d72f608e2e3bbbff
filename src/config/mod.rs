//! Wallet configuration
//!
//! The configuration is an explicit value: it is loaded once (from YAML or
//! defaults) and handed to the constructors that need it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::core::{TokenAmount, TokenError};
use crate::crypto::{KeyError, KeyPair};

/// Default Lotus API endpoint
pub const DEFAULT_RPC_ADDR: &str = "http://127.0.0.1:1234/rpc/v1";
/// Default cap on the total fee of a single message, in FIL
pub const DEFAULT_MAX_FEE: &str = "0.07";
/// Default delay between confirmation polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
/// Default number of confirmation polls before giving up
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;
/// Default time allowed for the node's blocking message wait
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 1800;

/// Errors loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid max fee: {0}")]
    MaxFee(#[from] TokenError),
    #[error("No account key configured")]
    MissingKey,
    #[error("Unknown key format: {0}")]
    UnknownKeyFormat(String),
    #[error("Invalid account key: {0}")]
    Key(#[from] KeyError),
}

/// Node connection and fee settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChainConfig {
    pub rpc_addr: String,
    pub token: Option<String>,
    /// Maximum total fee per message, as a FIL amount
    pub max_fee: String,
    /// URL prefix for printing message links
    pub explorer: Option<String>,
    pub request_timeout_secs: u64,
    /// Timeout of the node's blocking message wait, which outlives normal requests
    pub wait_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_addr: DEFAULT_RPC_ADDR.to_string(),
            token: None,
            max_fee: DEFAULT_MAX_FEE.to_string(),
            explorer: None,
            request_timeout_secs: 60,
            wait_timeout_secs: DEFAULT_WAIT_TIMEOUT_SECS,
        }
    }
}

impl ChainConfig {
    pub fn max_fee(&self) -> Result<TokenAmount, ConfigError> {
        Ok(TokenAmount::parse_fil(&self.max_fee)?)
    }
}

/// Where the signing key comes from
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccountConfig {
    pub key: Option<String>,
    /// `hex-lotus`, `json-lotus` or `hex`
    pub key_format: Option<String>,
}

impl AccountConfig {
    /// Decode the configured key
    pub fn key_pair(&self) -> Result<KeyPair, ConfigError> {
        let key = self.key.as_deref().ok_or(ConfigError::MissingKey)?;
        match self.key_format.as_deref().unwrap_or("hex-lotus") {
            "hex-lotus" => Ok(KeyPair::from_lotus_hex(key)?),
            "json-lotus" => Ok(KeyPair::from_lotus_json(key)?),
            "hex" => Ok(KeyPair::from_private_key_hex(key)?),
            other => Err(ConfigError::UnknownKeyFormat(other.to_string())),
        }
    }
}

/// Confirmation polling settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
    /// Confirmations requested from the node's blocking wait
    pub confidence: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            confidence: 5,
        }
    }
}

impl ConfirmationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Complete wallet configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WalletConfig {
    pub chain: ChainConfig,
    pub account: AccountConfig,
    pub confirmation: ConfirmationConfig,
}

impl WalletConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::read_to_string(path)?;
        Self::from_yaml(&file)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.chain.max_fee()?;
        Ok(config)
    }
}
