//! Fee extraction from RenVM block state
//!
//! Every lookup here treats missing data as "nothing": an absent asset,
//! node or epoch yields `None` or zero, never an error.

use bigdecimal::{BigDecimal, Zero};

use crate::models::{BlockState, Epoch, FeeData, FeeEpoch, TokenAmount};
use crate::prices::{self, TokenPrices};

/// Fee history for `symbol`, if RenVM reports one
pub fn get_fees_for_asset<'a>(symbol: &str, state: &'a BlockState) -> Option<&'a FeeData> {
    state
        .state
        .v
        .assets
        .get(symbol)
        .and_then(|asset| asset.fees.as_ref())
}

/// Epoch history for `symbol`, oldest first
pub fn get_fee_epochs<'a>(symbol: &str, state: &'a BlockState) -> &'a [FeeEpoch] {
    get_fees_for_asset(symbol, state)
        .map(|fees| fees.epochs.as_slice())
        .unwrap_or(&[])
}

/// Reward of one epoch entry, divided across its nodes when `per_node`
pub fn epoch_reward(entry: &FeeEpoch, symbol: &str, per_node: bool) -> BigDecimal {
    if !per_node {
        return entry.amount.clone();
    }
    if entry.num_nodes == 0 {
        tracing::warn!(
            "{} epoch {} reports zero nodes, per-node reward treated as 0",
            symbol,
            entry.epoch
        );
        return BigDecimal::zero();
    }
    entry.amount.clone() / BigDecimal::from(entry.num_nodes)
}

/// Total (or per-node) rewards for the current or previous epoch of `symbol`
pub fn get_token_rewards_for_epoch(
    symbol: &str,
    epoch: Epoch,
    state: &BlockState,
    per_node: bool,
) -> BigDecimal {
    let epochs = get_fee_epochs(symbol, state);

    let entry = match epoch {
        Epoch::Current => epochs.last(),
        Epoch::Previous if epochs.len() > 1 => epochs.get(epochs.len() - 2),
        Epoch::Previous => None,
    };

    entry
        .map(|e| epoch_reward(e, symbol, per_node))
        .unwrap_or_else(BigDecimal::zero)
}

/// Unpriced token amount
pub fn to_token_amount(amount: BigDecimal, symbol: &str, decimals: u32) -> TokenAmount {
    TokenAmount::new(symbol, decimals, amount)
}

/// Token amount priced in ETH and USD when a price table is available
pub fn get_token_fee_amounts(
    amount: BigDecimal,
    symbol: &str,
    decimals: u32,
    token_prices: Option<&TokenPrices>,
) -> TokenAmount {
    let data = to_token_amount(amount, symbol, decimals);
    match token_prices {
        Some(table) => prices::update_price(data, symbol, table),
        None => data,
    }
}

/// Strip the network prefixes from a token symbol ("renBTC" -> "BTC")
///
/// Each of `ren`, `test` and `dev` is removed at most once, in that order.
pub fn to_native_token_symbol(symbol: &str) -> String {
    let symbol = symbol.strip_prefix("ren").unwrap_or(symbol);
    let symbol = symbol.strip_prefix("test").unwrap_or(symbol);
    let symbol = symbol.strip_prefix("dev").unwrap_or(symbol);
    symbol.to_string()
}

/// Epoch at which the node entered the network
pub fn get_node_entered_at(renvm_node_id: &str, state: &BlockState) -> Option<u64> {
    state
        .state
        .v
        .system
        .as_ref()?
        .nodes
        .iter()
        .find(|node| node.id == renvm_node_id)
        .and_then(|node| node.entered_at)
}

/// Last epoch for which the node claimed `symbol` rewards. Zero is
/// reported as `None`.
pub fn get_last_epoch_claimed(
    renvm_node_id: &str,
    symbol: &str,
    state: &BlockState,
) -> Option<u64> {
    get_fees_for_asset(symbol, state)?
        .nodes
        .iter()
        .find(|node| node.node == renvm_node_id)
        .and_then(|node| node.last_epoch_claimed)
        .filter(|epoch| *epoch != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_state() -> BlockState {
        serde_json::from_value(serde_json::json!({
            "state": { "v": {
                "System": {
                    "epoch": { "number": 2, "timestamp": 1650000000 },
                    "nodes": [
                        { "id": "node-a", "enteredAt": "1" },
                        { "id": "node-b" }
                    ]
                },
                "BTC": { "fees": {
                    "epochs": [
                        { "amount": 100, "epoch": 1, "numNodes": 5 },
                        { "amount": 200, "epoch": 2, "numNodes": 4 }
                    ],
                    "nodes": [
                        { "node": "node-a", "lastEpochClaimed": "1" },
                        { "node": "node-b", "lastEpochClaimed": "0" }
                    ],
                    "unassigned": "0"
                }},
                "ZEC": { "fees": {
                    "epochs": [{ "amount": "30", "epoch": 2, "numNodes": 3 }],
                    "nodes": [],
                    "unassigned": "0"
                }},
                "FIL": { "fees": {
                    "epochs": [{ "amount": "30", "epoch": 2, "numNodes": 0 }],
                    "nodes": [],
                    "unassigned": "0"
                }}
            }}
        }))
        .unwrap()
    }

    #[test]
    fn test_current_and_previous_rewards() {
        let state = sample_state();

        assert_eq!(
            get_token_rewards_for_epoch("BTC", Epoch::Current, &state, false),
            BigDecimal::from(200)
        );
        assert_eq!(
            get_token_rewards_for_epoch("BTC", Epoch::Current, &state, true),
            BigDecimal::from(50)
        );
        assert_eq!(
            get_token_rewards_for_epoch("BTC", Epoch::Previous, &state, false),
            BigDecimal::from(100)
        );
        assert_eq!(
            get_token_rewards_for_epoch("BTC", Epoch::Previous, &state, true),
            BigDecimal::from(20)
        );
    }

    #[test]
    fn test_single_epoch_has_no_previous() {
        let state = sample_state();
        assert!(get_token_rewards_for_epoch("ZEC", Epoch::Previous, &state, false).is_zero());
        assert_eq!(
            get_token_rewards_for_epoch("ZEC", Epoch::Current, &state, true),
            BigDecimal::from(10)
        );
    }

    #[test]
    fn test_missing_asset_is_zero_not_error() {
        let state = sample_state();
        assert!(get_fees_for_asset("DOGE", &state).is_none());
        assert!(get_token_rewards_for_epoch("DOGE", Epoch::Current, &state, true).is_zero());
        assert!(get_fee_epochs("DOGE", &state).is_empty());
    }

    #[test]
    fn test_zero_nodes_per_node_is_zero() {
        let state = sample_state();
        assert!(get_token_rewards_for_epoch("FIL", Epoch::Current, &state, true).is_zero());
        assert_eq!(
            get_token_rewards_for_epoch("FIL", Epoch::Current, &state, false),
            BigDecimal::from(30)
        );
    }

    #[test]
    fn test_to_native_token_symbol() {
        assert_eq!(to_native_token_symbol("renBTC"), "BTC");
        assert_eq!(to_native_token_symbol("testZEC"), "ZEC");
        assert_eq!(to_native_token_symbol("devDOGE"), "DOGE");
        assert_eq!(to_native_token_symbol("BTC"), "BTC");
        assert_eq!(to_native_token_symbol("rentestdevFIL"), "FIL");
        assert_eq!(to_native_token_symbol("renrenBTC"), "renBTC");
    }

    #[test]
    fn test_node_lookups() {
        let state = sample_state();
        assert_eq!(get_node_entered_at("node-a", &state), Some(1));
        assert_eq!(get_node_entered_at("node-b", &state), None);
        assert_eq!(get_node_entered_at("node-z", &state), None);

        assert_eq!(get_last_epoch_claimed("node-a", "BTC", &state), Some(1));
        assert_eq!(get_last_epoch_claimed("node-b", "BTC", &state), None);
        assert_eq!(get_last_epoch_claimed("node-a", "DOGE", &state), None);
    }

    #[test]
    fn test_token_fee_amounts_without_prices() {
        let amount = get_token_fee_amounts(BigDecimal::from_str("12").unwrap(), "BTC", 8, None);
        assert_eq!(amount.symbol, "BTC");
        assert_eq!(amount.asset.decimals, 8);
        assert!(amount.amount_in_usd.is_zero());
    }

    #[test]
    fn test_unparsable_claimed_epoch_is_never_claimed() {
        let state: BlockState = serde_json::from_value(serde_json::json!({
            "state": { "v": {
                "BTC": { "fees": {
                    "epochs": [{ "amount": "100", "epoch": 3, "numNodes": 1 }],
                    "nodes": [
                        { "node": "n1", "lastEpochClaimed": "" },
                        { "node": "n2", "lastEpochClaimed": "abc" },
                        { "node": "n3", "lastEpochClaimed": null },
                        { "node": "n4", "lastEpochClaimed": "2" }
                    ],
                    "unassigned": "0"
                }}
            }}
        }))
        .unwrap();

        assert_eq!(get_last_epoch_claimed("n1", "BTC", &state), None);
        assert_eq!(get_last_epoch_claimed("n2", "BTC", &state), None);
        assert_eq!(get_last_epoch_claimed("n3", "BTC", &state), None);
        assert_eq!(get_last_epoch_claimed("n4", "BTC", &state), Some(2));
        assert_eq!(
            get_token_rewards_for_epoch("BTC", Epoch::Current, &state, false),
            BigDecimal::from(100)
        );
    }
}
