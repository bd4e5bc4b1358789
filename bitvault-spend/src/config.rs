//! Configuration for the spend engine
//!
//! Settings are stored in TOML. Every field has a default, so an empty file
//! is a valid configuration:
//!
//! ```toml
//! [wallet]
//! network = "testnet"
//! address_type = "p2wpkh"
//! fee_rate = 1
//! max_reselection_rounds = 16
//!
//! [chain]
//! # api_url = "https://blockstream.info/testnet/api"
//! timeout_seconds = 10
//!
//! [logging]
//! level = "Info"
//! ```
//!
//! ## Security Considerations
//!
//! - No key material is ever stored in this file. The WIF is handed to
//!   [`crate::wallet::SpendingWallet::from_config`] separately.
//! - All values must pass [`Config::validate`] before they reach the engine

use crate::chain::DEFAULT_TIMEOUT_SECS;
use crate::logging::LogConfig;
use crate::types::{parse_network, AddressType};
use anyhow::{anyhow, Result};
use bitcoin::Network;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub chain: ChainConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Wallet-specific configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// bitcoin, testnet, signet or regtest
    #[serde(default = "default_network")]
    pub network: String,

    /// Family of the wallet's own coins
    #[serde(default = "default_address_type")]
    pub address_type: String,

    /// Flat fee-rate in sat/vbyte; values <= 0 are floored to 1
    #[serde(default = "default_fee_rate")]
    pub fee_rate: i64,

    /// Upper bound on select/solve rounds when funding a spend
    #[serde(default = "default_max_reselection_rounds")]
    pub max_reselection_rounds: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            address_type: default_address_type(),
            fee_rate: default_fee_rate(),
            max_reselection_rounds: default_max_reselection_rounds(),
        }
    }
}

/// Chain backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Esplora base URL; defaults by network when absent
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;

        Self::from_toml(&content)
    }

    /// Load from `path`, or from [`default_config_path`] when none is given
    ///
    /// A missing file is created with default values first.
    pub fn load_or_create(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()
                .ok_or_else(|| anyhow!("No configuration directory on this platform"))?,
        };

        ensure_config_exists(&path)?;
        Self::load(&path)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow!("Failed to parse config file: {}", e))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        fs::write(path, content)
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path.display(), e))?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let network = self.network()?;
        self.address_type()?;

        if self.wallet.max_reselection_rounds == 0 {
            anyhow::bail!("Invalid max_reselection_rounds: must be greater than 0");
        }

        if self.chain.timeout_seconds == 0 {
            anyhow::bail!("Invalid chain timeout: must be greater than 0");
        }

        if let Some(url) = &self.chain.api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("Invalid api_url: {}", url);
            }
        } else if network == Network::Regtest {
            anyhow::bail!("regtest requires an explicit chain.api_url");
        }

        Ok(())
    }

    /// Configured network
    pub fn network(&self) -> Result<Network> {
        parse_network(&self.wallet.network).map_err(|e| anyhow!("{}", e))
    }

    /// Configured family of the wallet's own coins
    pub fn address_type(&self) -> Result<AddressType> {
        AddressType::from_str(&self.wallet.address_type).map_err(|e| anyhow!("{}", e))
    }
}

/// Default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bitvault").join("spend.toml"))
}

/// Ensure a configuration file exists at the specified path
/// If it doesn't exist, create it with default values
pub fn ensure_config_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        let default_config = Config::default();
        let content = toml::to_string_pretty(&default_config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| anyhow!("Failed to create config directory: {}", e))?;
            }
        }

        fs::write(path, content)
            .map_err(|e| anyhow!("Failed to write default config file: {}", e))?;
    }

    Ok(())
}

// Default value functions

fn default_network() -> String {
    "testnet".to_string()
}

fn default_address_type() -> String {
    AddressType::P2wpkh.as_str().to_string()
}

fn default_fee_rate() -> i64 {
    1
}

fn default_max_reselection_rounds() -> u32 {
    16
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
