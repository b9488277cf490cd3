//! Configuration management for the Ren Command Center CLI

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pending::TrackedAsset;
use crate::prices::COINGECKO_API;
use crate::renvm::DEFAULT_LIGHTNODE;
use crate::subgraph::DEFAULT_SUBGRAPH;

pub const TESTNET_LIGHTNODE: &str = "https://lightnode-testnet.herokuapp.com";

/// An ERC-20 reward token held by the payment contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Asset symbol as RenVM reports it (e.g. BTC)
    pub symbol: String,

    /// Ethereum address of the ren-token (e.g. renBTC)
    pub address: String,

    pub decimals: u32,
}

impl TokenConfig {
    fn new(symbol: &str, address: &str, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            address: address.to_string(),
            decimals,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// mainnet or testnet
    pub network: String,

    /// RenVM lightnode JSON-RPC URL
    pub renvm_rpc: String,

    /// Analytics subgraph GraphQL URL
    pub subgraph_url: String,

    /// Ethereum JSON-RPC URL
    pub ethereum_rpc: String,

    /// DarknodePayment contract address
    pub darknode_payment: Option<String>,

    /// DarknodeRegistry contract address
    pub darknode_registry: Option<String>,

    /// Currency for fee values (usd, eur, ...)
    pub quote_currency: String,

    /// Blocks the subgraph may trail the chain before claims are hidden
    pub subgraph_sync_tolerance: u64,

    /// Price API base URL
    pub price_api: String,

    /// Reward tokens
    pub tokens: Vec<TokenConfig>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            network: "mainnet".to_string(),
            renvm_rpc: DEFAULT_LIGHTNODE.to_string(),
            subgraph_url: DEFAULT_SUBGRAPH.to_string(),
            ethereum_rpc: "https://cloudflare-eth.com".to_string(),
            darknode_payment: None,
            darknode_registry: None,
            quote_currency: "usd".to_string(),
            subgraph_sync_tolerance: 100,
            price_api: COINGECKO_API.to_string(),
            tokens: vec![
                TokenConfig::new("BTC", "0xEB4C2781e4ebA804CE9a9803C67d0893436bB27D", 8),
                TokenConfig::new("ZEC", "0x1C5db575E2Ff833E46a2E9864C22F4B22E0B37C2", 8),
                TokenConfig::new("BCH", "0x459086F2376525BdCebA5bDDA135e4E9d3FeF5bf", 8),
                TokenConfig::new("DOGE", "0x3832d2F059E55934220881F831bE501D180671A7", 8),
                TokenConfig::new("FIL", "0xD5147bc8e386d91Cc5DBE72099DAC6C9b99276F5", 18),
            ],
        }
    }

    /// Switch network, moving the lightnode URL along when it is a default one
    pub fn with_network(mut self, network: &str) -> Self {
        let network = network.to_lowercase();
        if network == self.network {
            return self;
        }
        let default_rpc =
            self.renvm_rpc == DEFAULT_LIGHTNODE || self.renvm_rpc == TESTNET_LIGHTNODE;
        if default_rpc {
            self.renvm_rpc = match network.as_str() {
                "testnet" => TESTNET_LIGHTNODE.to_string(),
                _ => DEFAULT_LIGHTNODE.to_string(),
            };
        }
        self.network = network;
        self
    }

    pub fn tracked_assets(&self) -> Vec<TrackedAsset> {
        self.tokens
            .iter()
            .map(|t| TrackedAsset {
                symbol: t.symbol.clone(),
                decimals: t.decimals,
            })
            .collect()
    }

    pub fn token(&self, symbol: &str) -> Option<&TokenConfig> {
        let native = crate::fees::to_native_token_symbol(symbol);
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(&native))
    }

    pub fn darknode_payment(&self) -> Result<&str> {
        self.darknode_payment.as_deref().context(
            "DarknodePayment address not configured. Set darknode_payment in the config file",
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the config file path
pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("io", "renproject", "rcc")
        .context("Failed to determine config directory")?;

    let config_dir = proj_dirs.config_dir();
    std::fs::create_dir_all(config_dir)?;

    Ok(config_dir.join("config.toml"))
}

/// Load configuration from file
pub fn load_config() -> Result<Config> {
    let path = get_config_path()?;

    if !path.exists() {
        let config = Config::new();
        save_config(&config)?;
        tracing::info!("Created default config at {}", path.display());
        return Ok(config);
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Save configuration to file
pub fn save_config(config: &Config) -> Result<()> {
    let path = get_config_path()?;

    let content = toml::to_string_pretty(config)
        .context("Failed to serialize config")?;

    std::fs::write(&path, content)
        .context("Failed to write config file")?;

    Ok(())
}
