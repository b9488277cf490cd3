//! Input validation
//!
//! Addresses, keys and symbols are checked before anything is signed or sent.

use anyhow::Result;
use regex::Regex;

use crate::config::Config;
use crate::darknode_id::DarknodeId;

pub mod patterns {
    pub const ETH_ADDRESS: &str = r"^0x[a-fA-F0-9]{40}$";
    pub const PRIVATE_KEY: &str = r"^(0x)?[a-fA-F0-9]{64}$";
    pub const TOKEN_SYMBOL: &str = r"^[A-Za-z0-9]{2,12}$";
    pub const HTTP_URL: &str = r"^https?://[^\s/$.?#].[^\s]*$";
    pub const CURRENCY: &str = r"^[a-zA-Z]{3,5}$";
}

fn matches(pattern: &str, value: &str) -> bool {
    Regex::new(pattern)
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

pub fn is_ethereum_address(value: &str) -> bool {
    matches(patterns::ETH_ADDRESS, value)
}

pub fn is_private_key(value: &str) -> bool {
    matches(patterns::PRIVATE_KEY, value.trim())
}

pub fn is_token_symbol(value: &str) -> bool {
    matches(patterns::TOKEN_SYMBOL, value)
}

/// Validation result
#[derive(Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            anyhow::bail!("Validation failed:\n  - {}", self.errors.join("\n  - "))
        }
    }
}

/// Check every URL, address and token entry of a config
pub fn validate_config(config: &Config) -> ValidationResult {
    let mut errors = Vec::new();

    if !matches!(config.network.as_str(), "mainnet" | "testnet") {
        errors.push(format!("network must be mainnet or testnet, got {}", config.network));
    }

    for (field, url) in [
        ("renvm_rpc", &config.renvm_rpc),
        ("subgraph_url", &config.subgraph_url),
        ("ethereum_rpc", &config.ethereum_rpc),
        ("price_api", &config.price_api),
    ] {
        if !matches(patterns::HTTP_URL, url) {
            errors.push(format!("Field '{}' is not an http(s) URL: {}", field, url));
        }
    }

    for (field, address) in [
        ("darknode_payment", &config.darknode_payment),
        ("darknode_registry", &config.darknode_registry),
    ] {
        if let Some(address) = address {
            if !is_ethereum_address(address) {
                errors.push(format!("Field '{}' is not an Ethereum address: {}", field, address));
            }
        }
    }

    if !matches(patterns::CURRENCY, &config.quote_currency) {
        errors.push(format!("quote_currency is not a currency code: {}", config.quote_currency));
    }

    for token in &config.tokens {
        if !is_token_symbol(&token.symbol) {
            errors.push(format!("Invalid token symbol: {}", token.symbol));
        }
        if !is_ethereum_address(&token.address) {
            errors.push(format!(
                "Token {} has an invalid address: {}",
                token.symbol, token.address
            ));
        }
        if token.decimals > 36 {
            errors.push(format!("Token {} has {} decimals", token.symbol, token.decimals));
        }
    }

    ValidationResult::errors(errors)
}

/// Checks run before a withdrawal is signed
pub fn validate_withdrawal(id: &str, token_address: &str, private_key: &str) -> ValidationResult {
    let mut errors = Vec::new();

    if let Err(e) = DarknodeId::parse(id) {
        errors.push(e.to_string());
    }
    if !is_ethereum_address(token_address) {
        errors.push(format!("Invalid token address: {}", token_address));
    }
    if !is_private_key(private_key) {
        errors.push("Private key must be 32 bytes of hex".to_string());
    }

    ValidationResult::errors(errors)
}
