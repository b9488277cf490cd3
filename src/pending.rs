//! Pending (not yet claimed) rewards per token and per cycle

use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;

use crate::fees;
use crate::models::{AssetInfo, BlockState, Epoch, PendingRewards, TokenAmount};
use crate::prices::TokenPrices;

/// Sum two pending-reward mappings token by token
///
/// Keys come out in left order followed by the keys only the right side
/// has. A token missing (or `None`) on both sides stays `None`; otherwise
/// the amounts are summed with the missing side counted as zero and the
/// symbol and asset taken from the left side when it has them.
pub fn merge_fees(left: &PendingRewards, right: &PendingRewards) -> PendingRewards {
    let mut merged = PendingRewards::with_capacity(left.len() + right.len());

    for token in left.keys().chain(right.keys()) {
        if merged.contains_key(token) {
            continue;
        }

        let left_fee = left.get(token).and_then(Option::as_ref);
        let right_fee = right.get(token).and_then(Option::as_ref);

        let fee = match (left_fee, right_fee) {
            (None, None) => None,
            (l, r) => {
                let base = l.or(r);
                Some(TokenAmount {
                    symbol: base.map(|f| f.symbol.clone()).unwrap_or_default(),
                    asset: base.map(|f| f.asset).unwrap_or(AssetInfo { decimals: 0 }),
                    amount: sum_field(l, r, |f| &f.amount),
                    amount_in_eth: sum_field(l, r, |f| &f.amount_in_eth),
                    amount_in_usd: sum_field(l, r, |f| &f.amount_in_usd),
                })
            }
        };

        merged.insert(token.clone(), fee);
    }

    merged
}

fn sum_field(
    left: Option<&TokenAmount>,
    right: Option<&TokenAmount>,
    field: fn(&TokenAmount) -> &BigDecimal,
) -> BigDecimal {
    let mut total = BigDecimal::zero();
    for fee in left.into_iter().chain(right) {
        total += field(fee).clone();
    }
    total
}

/// Asset tracked by the CLI: symbol as reported by RenVM plus its precision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedAsset {
    pub symbol: String,
    pub decimals: u32,
}

/// Per-node rewards of every tracked asset for one epoch. Assets RenVM has
/// no fee data for map to `None`.
pub fn pending_rewards_for_epoch(
    state: &BlockState,
    epoch: Epoch,
    assets: &[TrackedAsset],
    token_prices: Option<&TokenPrices>,
) -> PendingRewards {
    assets
        .iter()
        .map(|asset| {
            let reward = fees::get_fees_for_asset(&asset.symbol, state).map(|_| {
                let amount =
                    fees::get_token_rewards_for_epoch(&asset.symbol, epoch, state, true);
                fees::get_token_fee_amounts(amount, &asset.symbol, asset.decimals, token_prices)
            });
            (asset.symbol.clone(), reward)
        })
        .collect()
}

/// Pending rewards keyed by cycle identifier
pub fn pending_rewards_by_cycle(
    state: &BlockState,
    current_cycle: Option<&str>,
    previous_cycle: Option<&str>,
    assets: &[TrackedAsset],
    token_prices: Option<&TokenPrices>,
) -> IndexMap<String, PendingRewards> {
    let mut by_cycle = IndexMap::new();
    if let Some(cycle) = previous_cycle {
        by_cycle.insert(
            cycle.to_string(),
            pending_rewards_for_epoch(state, Epoch::Previous, assets, token_prices),
        );
    }
    if let Some(cycle) = current_cycle {
        by_cycle.insert(
            cycle.to_string(),
            pending_rewards_for_epoch(state, Epoch::Current, assets, token_prices),
        );
    }
    by_cycle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(symbol: &str, base: i64, eth: i64, usd: i64) -> Option<TokenAmount> {
        Some(TokenAmount {
            symbol: symbol.to_string(),
            asset: AssetInfo { decimals: 8 },
            amount: BigDecimal::from(base),
            amount_in_eth: BigDecimal::from(eth),
            amount_in_usd: BigDecimal::from(usd),
        })
    }

    fn rewards(entries: Vec<(&str, Option<TokenAmount>)>) -> PendingRewards {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_merge_sums_shared_tokens() {
        let left = rewards(vec![("BTC", amount("BTC", 10, 1, 100))]);
        let right = rewards(vec![("BTC", amount("BTC", 5, 2, 50))]);

        let merged = merge_fees(&left, &right);
        let btc = merged["BTC"].as_ref().unwrap();
        assert_eq!(btc.amount, BigDecimal::from(15));
        assert_eq!(btc.amount_in_eth, BigDecimal::from(3));
        assert_eq!(btc.amount_in_usd, BigDecimal::from(150));
    }

    #[test]
    fn test_merge_key_order_is_left_then_new_right() {
        let left = rewards(vec![("ZEC", None), ("BTC", amount("BTC", 1, 0, 0))]);
        let right = rewards(vec![
            ("BTC", amount("BTC", 1, 0, 0)),
            ("DOGE", amount("DOGE", 3, 0, 0)),
            ("FIL", None),
        ]);

        let merged = merge_fees(&left, &right);
        let keys: Vec<_> = merged.keys().cloned().collect();
        assert_eq!(keys, vec!["ZEC", "BTC", "DOGE", "FIL"]);
        assert!(merged["ZEC"].is_none());
        assert!(merged["FIL"].is_none());
        assert_eq!(merged["DOGE"].as_ref().unwrap().symbol, "DOGE");
    }

    #[test]
    fn test_merge_is_commutative_for_sums() {
        let a = rewards(vec![
            ("BTC", amount("BTC", 7, 1, 70)),
            ("ZEC", amount("ZEC", 2, 0, 4)),
        ]);
        let b = rewards(vec![
            ("BTC", amount("BTC", 3, 2, 30)),
            ("DOGE", amount("DOGE", 9, 0, 1)),
            ("ZEC", None),
        ]);

        let ab = merge_fees(&a, &b);
        let ba = merge_fees(&b, &a);
        assert_eq!(ab.len(), ba.len());
        for (token, fee) in &ab {
            let other = &ba[token];
            match (fee, other) {
                (Some(x), Some(y)) => {
                    assert_eq!(x.amount, y.amount);
                    assert_eq!(x.amount_in_eth, y.amount_in_eth);
                    assert_eq!(x.amount_in_usd, y.amount_in_usd);
                }
                (None, None) => {}
                _ => panic!("presence differs for {}", token),
            }
        }
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let a = rewards(vec![("BTC", amount("BTC", 7, 1, 70)), ("ZEC", None)]);
        let merged = merge_fees(&a, &PendingRewards::new());
        assert_eq!(merged, a);
    }

    #[test]
    fn test_merge_does_not_touch_inputs() {
        let a = rewards(vec![("BTC", amount("BTC", 7, 1, 70))]);
        let b = rewards(vec![("BTC", amount("BTC", 3, 2, 30))]);
        let (a_before, b_before) = (a.clone(), b.clone());
        let _ = merge_fees(&a, &b);
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn test_pending_rewards_by_cycle() {
        let state: BlockState = serde_json::from_value(serde_json::json!({
            "state": { "v": {
                "BTC": { "fees": {
                    "epochs": [
                        { "amount": 100, "epoch": 1, "numNodes": 5 },
                        { "amount": 200, "epoch": 2, "numNodes": 4 }
                    ],
                    "nodes": [],
                    "unassigned": 0
                }}
            }}
        }))
        .unwrap();
        let assets = vec![
            TrackedAsset {
                symbol: "BTC".into(),
                decimals: 8,
            },
            TrackedAsset {
                symbol: "ZEC".into(),
                decimals: 8,
            },
        ];

        let by_cycle = pending_rewards_by_cycle(&state, Some("2"), Some("1"), &assets, None);
        assert_eq!(by_cycle.keys().cloned().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(
            by_cycle["1"]["BTC"].as_ref().unwrap().amount,
            BigDecimal::from(20)
        );
        assert_eq!(
            by_cycle["2"]["BTC"].as_ref().unwrap().amount,
            BigDecimal::from(50)
        );
        assert!(by_cycle["2"]["ZEC"].is_none());
    }
}
