//! Data models for the Ren Command Center CLI

use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::numeric;

// ============================================================================
// TOKEN AMOUNTS
// ============================================================================

/// Decimal precision of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetInfo {
    pub decimals: u32,
}

/// An amount of one token with its converted display values
///
/// `amount` is in base units (e.g. satoshis). `amount_in_eth` and
/// `amount_in_usd` are converted from the standard-unit value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    pub symbol: String,
    pub asset: AssetInfo,
    #[serde(
        serialize_with = "numeric::serialize_decimal",
        deserialize_with = "numeric::deserialize_decimal"
    )]
    pub amount: BigDecimal,
    #[serde(
        serialize_with = "numeric::serialize_decimal",
        deserialize_with = "numeric::deserialize_decimal"
    )]
    pub amount_in_eth: BigDecimal,
    #[serde(
        serialize_with = "numeric::serialize_decimal",
        deserialize_with = "numeric::deserialize_decimal"
    )]
    pub amount_in_usd: BigDecimal,
}

impl TokenAmount {
    pub fn new(symbol: &str, decimals: u32, amount: BigDecimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            asset: AssetInfo { decimals },
            amount,
            amount_in_eth: BigDecimal::zero(),
            amount_in_usd: BigDecimal::zero(),
        }
    }
}

/// Token symbol -> amount, in insertion order. `None` means "no data for
/// this token", which is not the same thing as a zero amount.
pub type PendingRewards = IndexMap<String, Option<TokenAmount>>;

// ============================================================================
// RENVM BLOCK STATE
// ============================================================================

/// Which reward epoch to read from an asset's fee history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epoch {
    Current,
    Previous,
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Epoch::Current => write!(f, "current"),
            Epoch::Previous => write!(f, "previous"),
        }
    }
}

/// One completed reward epoch for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEpoch {
    #[serde(
        serialize_with = "numeric::serialize_decimal",
        deserialize_with = "numeric::deserialize_decimal"
    )]
    pub amount: BigDecimal,
    #[serde(deserialize_with = "numeric::deserialize_u64")]
    pub epoch: u64,
    #[serde(deserialize_with = "numeric::deserialize_u64")]
    pub num_nodes: u64,
}

/// Per-darknode claim bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeNode {
    pub node: String,
    #[serde(default, deserialize_with = "numeric::deserialize_claimed_epoch")]
    pub last_epoch_claimed: Option<u64>,
}

/// Fee history of one asset. Epochs are ordered ascending; the last entry
/// is the current epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeData {
    #[serde(default)]
    pub nodes: Vec<FeeNode>,
    #[serde(default)]
    pub epochs: Vec<FeeEpoch>,
    #[serde(
        default,
        serialize_with = "numeric::serialize_decimal",
        deserialize_with = "numeric::deserialize_decimal_or_zero"
    )]
    pub unassigned: BigDecimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetState {
    #[serde(default)]
    pub fees: Option<FeeData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNode {
    pub id: String,
    #[serde(default, deserialize_with = "numeric::deserialize_opt_u64")]
    pub entered_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEpoch {
    #[serde(deserialize_with = "numeric::deserialize_u64")]
    pub number: u64,
    /// Unix seconds at which the epoch started
    #[serde(deserialize_with = "numeric::deserialize_i64")]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    #[serde(default)]
    pub nodes: Vec<SystemNode>,
    #[serde(default)]
    pub epoch: Option<SystemEpoch>,
}

/// `state.v` of a block state: the `System` contract plus one entry per asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockStateValues {
    #[serde(rename = "System", default)]
    pub system: Option<SystemState>,
    #[serde(flatten)]
    pub assets: IndexMap<String, AssetState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockStateEnvelope {
    pub v: BlockStateValues,
}

/// Result of `ren_queryBlockState`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockState {
    pub state: BlockStateEnvelope,
}

// ============================================================================
// ANALYTICS SNAPSHOTS
// ============================================================================

/// Chains tracked by the analytics subgraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackerChain {
    Ethereum,
    BinanceSmartChain,
    Polygon,
    Fantom,
    Avalanche,
}

impl TrackerChain {
    pub const ALL: [TrackerChain; 5] = [
        TrackerChain::Ethereum,
        TrackerChain::BinanceSmartChain,
        TrackerChain::Fantom,
        TrackerChain::Polygon,
        TrackerChain::Avalanche,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerChain::Ethereum => "Ethereum",
            TrackerChain::BinanceSmartChain => "BinanceSmartChain",
            TrackerChain::Polygon => "Polygon",
            TrackerChain::Fantom => "Fantom",
            TrackerChain::Avalanche => "Avalanche",
        }
    }
}

impl std::fmt::Display for TrackerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TrackerChain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" | "eth" => Ok(TrackerChain::Ethereum),
            "binancesmartchain" | "bsc" => Ok(TrackerChain::BinanceSmartChain),
            "polygon" | "matic" => Ok(TrackerChain::Polygon),
            "fantom" | "ftm" => Ok(TrackerChain::Fantom),
            "avalanche" | "avax" => Ok(TrackerChain::Avalanche),
            _ => Err(format!(
                "Invalid chain: {}. Use Ethereum, BinanceSmartChain, Polygon, Fantom or Avalanche",
                s
            )),
        }
    }
}

/// Which amount list of a snapshot to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerVolumeType {
    Locked,
    Transacted,
}

impl std::fmt::Display for TrackerVolumeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerVolumeType::Locked => write!(f, "locked"),
            TrackerVolumeType::Transacted => write!(f, "transacted"),
        }
    }
}

impl std::str::FromStr for TrackerVolumeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "locked" => Ok(TrackerVolumeType::Locked),
            "transacted" | "volume" => Ok(TrackerVolumeType::Transacted),
            _ => Err(format!("Invalid type: {}. Use locked or transacted", s)),
        }
    }
}

/// Time window shown by the stats command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodType {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl std::str::FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hour" | "1h" => Ok(PeriodType::Hour),
            "day" | "24h" => Ok(PeriodType::Day),
            "week" | "7d" => Ok(PeriodType::Week),
            "month" | "1m" => Ok(PeriodType::Month),
            "year" | "1y" => Ok(PeriodType::Year),
            "all" => Ok(PeriodType::All),
            _ => Err(format!(
                "Invalid period: {}. Use hour, day, week, month, year or all",
                s
            )),
        }
    }
}

/// Unit in which snapshot amounts are projected
///
/// `Other` carries a lowercase quote-currency code (e.g. `eur`) and is
/// converted from the USD value through the price table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCurrency {
    BaseUnits,
    StandardUnits,
    Usd,
    Btc,
    Eth,
    Other(String),
}

impl DisplayCurrency {
    pub fn code(&self) -> &str {
        match self {
            DisplayCurrency::BaseUnits => "base",
            DisplayCurrency::StandardUnits => "standard",
            DisplayCurrency::Usd => "usd",
            DisplayCurrency::Btc => "btc",
            DisplayCurrency::Eth => "eth",
            DisplayCurrency::Other(code) => code,
        }
    }
}

impl std::fmt::Display for DisplayCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code().to_uppercase())
    }
}

impl std::str::FromStr for DisplayCurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "base" | "baseunits" => Ok(DisplayCurrency::BaseUnits),
            "standard" | "standardunits" => Ok(DisplayCurrency::StandardUnits),
            "usd" => Ok(DisplayCurrency::Usd),
            "btc" => Ok(DisplayCurrency::Btc),
            "eth" => Ok(DisplayCurrency::Eth),
            code if !code.is_empty() && code.chars().all(|c| c.is_ascii_alphabetic()) => {
                Ok(DisplayCurrency::Other(code.to_string()))
            }
            _ => Err(format!("Invalid currency: {}", s)),
        }
    }
}

/// Locked or transacted amount of one asset on one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotAmount {
    pub asset: String,
    pub chain: String,
    #[serde(
        serialize_with = "numeric::serialize_decimal",
        deserialize_with = "numeric::deserialize_decimal"
    )]
    pub amount: BigDecimal,
    #[serde(
        default,
        serialize_with = "numeric::serialize_decimal",
        deserialize_with = "numeric::deserialize_decimal_or_zero"
    )]
    pub amount_in_usd: BigDecimal,
    #[serde(
        default,
        serialize_with = "numeric::serialize_decimal",
        deserialize_with = "numeric::deserialize_decimal_or_zero"
    )]
    pub amount_in_btc: BigDecimal,
    #[serde(
        default,
        serialize_with = "numeric::serialize_decimal",
        deserialize_with = "numeric::deserialize_decimal_or_zero"
    )]
    pub amount_in_eth: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotAssetData {
    pub asset: String,
    #[serde(default)]
    pub decimals: u32,
    #[serde(default)]
    pub price_in_usd: f64,
}

/// Point-in-time analytics record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    #[serde(deserialize_with = "numeric::deserialize_i64")]
    pub timestamp: i64,
    #[serde(default)]
    pub locked: Vec<SnapshotAmount>,
    #[serde(default)]
    pub volume: Vec<SnapshotAmount>,
    #[serde(default)]
    pub prices: Vec<SnapshotAssetData>,
}

/// GraphQL alias -> snapshot, in response order
pub type SnapshotRecords = IndexMap<String, Snapshot>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_state_splits_system_from_assets() {
        let state: BlockState = serde_json::from_value(serde_json::json!({
            "state": { "v": {
                "System": {
                    "epoch": { "number": "12", "timestamp": "1650000000" },
                    "nodes": [{ "id": "node-a", "enteredAt": "3" }]
                },
                "BTC": { "fees": {
                    "epochs": [{ "amount": "100", "epoch": 11, "numNodes": "5" }],
                    "nodes": [],
                    "unassigned": "0"
                }},
                "ZEC": { "latestHeight": "100" }
            }}
        }))
        .unwrap();

        let symbols: Vec<_> = state.state.v.assets.keys().cloned().collect();
        assert_eq!(symbols, vec!["BTC", "ZEC"]);
        let system = state.state.v.system.as_ref().unwrap();
        assert_eq!(system.epoch.as_ref().unwrap().number, 12);
        assert_eq!(system.nodes[0].entered_at, Some(3));
        assert!(state.state.v.assets["ZEC"].fees.is_none());
    }

    #[test]
    fn test_display_currency_parsing() {
        assert_eq!("USD".parse::<DisplayCurrency>(), Ok(DisplayCurrency::Usd));
        assert_eq!(
            "BaseUnits".parse::<DisplayCurrency>(),
            Ok(DisplayCurrency::BaseUnits)
        );
        assert_eq!(
            "EUR".parse::<DisplayCurrency>(),
            Ok(DisplayCurrency::Other("eur".to_string()))
        );
        assert!("1$".parse::<DisplayCurrency>().is_err());
    }

    #[test]
    fn test_snapshot_defaults_missing_lists() {
        let snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "timestamp": "1650000000",
            "prices": [{ "asset": "BTC", "decimals": 8 }]
        }))
        .unwrap();
        assert!(snapshot.locked.is_empty());
        assert!(snapshot.volume.is_empty());
        assert_eq!(snapshot.prices[0].decimals, 8);
    }
}
