//! Volume and locked-value analytics over subgraph snapshots
//!
//! A tracker response is a set of snapshots keyed by GraphQL alias: one
//! `s{timestamp}` entry per resolution point plus an `assets` entry that
//! carries asset metadata (decimals). Everything below is a pure
//! projection of that response.

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use indexmap::IndexMap;
use serde::Serialize;

use crate::models::{
    DisplayCurrency, PeriodType, Snapshot, SnapshotAmount, SnapshotAssetData, SnapshotRecords,
    TrackerChain, TrackerVolumeType,
};
use crate::numeric;
use crate::prices::{self, TokenPrices};

/// Alias of the asset metadata record in a tracker response
pub const ASSETS_KEY: &str = "assets";

/// Base resolution of the tracker, in seconds
pub const BASE_RESOLUTION: i64 = 80;

const HOUR: i64 = 3600;
const DAY: i64 = 24 * HOUR;

// ============================================================================
// SNAPSHOT SELECTION
// ============================================================================

/// All snapshots except the asset metadata record, in response order
pub fn get_snapshots(records: &SnapshotRecords) -> Vec<&Snapshot> {
    records
        .iter()
        .filter(|(key, _)| key.as_str() != ASSETS_KEY)
        .map(|(_, snapshot)| snapshot)
        .collect()
}

/// Asset metadata, without the `System` pseudo-asset
pub fn get_assets_data(records: &SnapshotRecords) -> Vec<SnapshotAssetData> {
    records
        .get(ASSETS_KEY)
        .map(|snapshot| {
            snapshot
                .prices
                .iter()
                .filter(|entry| entry.asset != "System")
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// First and last snapshot by position. The sequence is expected to be in
/// chronological order already.
pub fn get_first_and_last_snapshot<'a>(
    snapshots: &[&'a Snapshot],
) -> Option<(&'a Snapshot, &'a Snapshot)> {
    Some((*snapshots.first()?, *snapshots.last()?))
}

pub fn get_amounts_from_snapshot(
    snapshot: &Snapshot,
    volume_type: TrackerVolumeType,
) -> &[SnapshotAmount] {
    match volume_type {
        TrackerVolumeType::Locked => &snapshot.locked,
        TrackerVolumeType::Transacted => &snapshot.volume,
    }
}

pub fn get_amounts_for_chain(
    amounts: &[SnapshotAmount],
    chain: TrackerChain,
) -> Vec<&SnapshotAmount> {
    amounts
        .iter()
        .filter(|entry| entry.chain == chain.as_str())
        .collect()
}

pub fn get_chain_amounts_from_snapshot(
    snapshot: &Snapshot,
    volume_type: TrackerVolumeType,
    chain: TrackerChain,
) -> Vec<&SnapshotAmount> {
    get_amounts_for_chain(get_amounts_from_snapshot(snapshot, volume_type), chain)
}

// ============================================================================
// AMOUNTS
// ============================================================================

/// Project one snapshot entry into `currency`
pub fn get_amount(
    entry: &SnapshotAmount,
    currency: &DisplayCurrency,
    assets_data: &[SnapshotAssetData],
    token_prices: &TokenPrices,
) -> BigDecimal {
    match currency {
        DisplayCurrency::BaseUnits => entry.amount.clone(),
        DisplayCurrency::StandardUnits => {
            let decimals = assets_data
                .iter()
                .find(|data| data.asset == entry.asset)
                .map(|data| data.decimals)
                .unwrap_or(0);
            numeric::to_standard_amount(&entry.amount, decimals)
        }
        DisplayCurrency::Usd => entry.amount_in_usd.clone(),
        DisplayCurrency::Btc => entry.amount_in_btc.clone(),
        DisplayCurrency::Eth => entry.amount_in_eth.clone(),
        DisplayCurrency::Other(code) => {
            match prices::get_conversion_rate("usd", code, token_prices) {
                Some(rate) => entry.amount_in_usd.clone() * rate,
                None => {
                    tracing::warn!(
                        "No USD -> {} rate available, {} counted as 0",
                        code,
                        entry.asset
                    );
                    BigDecimal::zero()
                }
            }
        }
    }
}

pub fn sum_snapshot_amounts(
    snapshot: &Snapshot,
    volume_type: TrackerVolumeType,
    chain: TrackerChain,
    currency: &DisplayCurrency,
    assets_data: &[SnapshotAssetData],
    token_prices: &TokenPrices,
) -> BigDecimal {
    get_chain_amounts_from_snapshot(snapshot, volume_type, chain)
        .into_iter()
        .fold(BigDecimal::zero(), |acc, entry| {
            acc + get_amount(entry, currency, assets_data, token_prices)
        })
}

/// Per-asset change over the window plus the chain total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeData {
    #[serde(serialize_with = "serialize_amount_records")]
    pub amount_records: IndexMap<String, BigDecimal>,
    #[serde(serialize_with = "numeric::serialize_decimal")]
    pub difference: BigDecimal,
}

fn serialize_amount_records<S>(
    records: &IndexMap<String, BigDecimal>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(records.len()))?;
    for (asset, amount) in records {
        map.serialize_entry(asset, &amount.to_string())?;
    }
    map.end()
}

/// Change of locked/transacted value on `chain` between the first and the
/// last snapshot of the response
///
/// Per asset, in asset-metadata order: last minus first when both
/// snapshots carry the asset, the last value alone when only the last one
/// does, zero when only the first one does. Assets in neither are left out.
pub fn snapshot_data_to_volume_data(
    records: &SnapshotRecords,
    volume_type: TrackerVolumeType,
    chain: TrackerChain,
    currency: &DisplayCurrency,
    token_prices: &TokenPrices,
) -> VolumeData {
    let snapshots = get_snapshots(records);
    let assets_data = get_assets_data(records);

    let Some((first, last)) = get_first_and_last_snapshot(&snapshots) else {
        return VolumeData {
            amount_records: IndexMap::new(),
            difference: BigDecimal::zero(),
        };
    };

    let amount = |entry: &SnapshotAmount| get_amount(entry, currency, &assets_data, token_prices);

    let summed_start =
        sum_snapshot_amounts(first, volume_type, chain, currency, &assets_data, token_prices);
    let summed_end =
        sum_snapshot_amounts(last, volume_type, chain, currency, &assets_data, token_prices);
    let difference = summed_end - summed_start;

    let start_amounts = get_chain_amounts_from_snapshot(first, volume_type, chain);
    let end_amounts = get_chain_amounts_from_snapshot(last, volume_type, chain);

    let mut amount_records = IndexMap::new();
    for asset in assets_data.iter().map(|data| data.asset.as_str()) {
        let first_entry = start_amounts.iter().find(|entry| entry.asset == asset);
        let last_entry = end_amounts.iter().find(|entry| entry.asset == asset);

        let change = match (first_entry, last_entry) {
            (Some(f), Some(l)) => amount(*l) - amount(*f),
            (None, Some(l)) => amount(*l),
            (Some(_), None) => BigDecimal::zero(),
            (None, None) => continue,
        };
        amount_records.insert(asset.to_string(), change);
    }

    VolumeData {
        amount_records,
        difference,
    }
}

/// Sum of the per-chain differences over every tracked chain
pub fn snapshot_data_to_all_chain_volume_data(
    records: &SnapshotRecords,
    volume_type: TrackerVolumeType,
    currency: &DisplayCurrency,
    token_prices: &TokenPrices,
) -> BigDecimal {
    TrackerChain::ALL
        .iter()
        .map(|chain| {
            snapshot_data_to_volume_data(records, volume_type, *chain, currency, token_prices)
                .difference
        })
        .fold(BigDecimal::zero(), |acc, difference| acc + difference)
}

/// Chart series: `(timestamp in milliseconds, summed value)` per snapshot
pub fn snapshot_data_to_time_series(
    records: &SnapshotRecords,
    volume_type: TrackerVolumeType,
    chain: TrackerChain,
    currency: &DisplayCurrency,
    token_prices: &TokenPrices,
) -> Vec<(i64, f64)> {
    let assets_data = get_assets_data(records);
    get_snapshots(records)
        .into_iter()
        .map(|snapshot| {
            let value = sum_snapshot_amounts(
                snapshot,
                volume_type,
                chain,
                currency,
                &assets_data,
                token_prices,
            );
            (snapshot.timestamp * 1000, value.to_f64().unwrap_or(0.0))
        })
        .collect()
}

// ============================================================================
// TIME WINDOW
// ============================================================================

/// Length of the window covered by `period`, in seconds
pub fn get_period_timespan(period: PeriodType) -> i64 {
    match period {
        PeriodType::Hour => HOUR,
        PeriodType::Day => DAY,
        PeriodType::Week => 7 * DAY,
        PeriodType::Month => 30 * DAY,
        PeriodType::Year => 365 * DAY,
        PeriodType::All => 2 * 365 * DAY,
    }
}

/// Seconds between two fetched snapshots
pub fn get_resolution_interval(period: PeriodType) -> i64 {
    match period {
        PeriodType::Hour => BASE_RESOLUTION,
        PeriodType::Day => 30 * 60,
        PeriodType::Week => 2 * HOUR,
        PeriodType::Month => 12 * HOUR,
        PeriodType::Year => 5 * DAY,
        PeriodType::All => 6 * DAY,
    }
}

/// Number of snapshots fetched for `period`
pub fn get_resolution_points(period: PeriodType) -> i64 {
    let timespan = get_period_timespan(period);
    let interval = get_resolution_interval(period);
    (timespan + interval - 1) / interval
}

/// `now` (unix seconds) rounded down to a multiple of `resolution`
pub fn get_resolution_end_timestamp(resolution: i64, now: i64) -> i64 {
    now - now.rem_euclid(resolution)
}

const VOLUME_FIELDS: &str = "
            asset
            chain
            amount
            amountInUsd
            amountInBtc
            amountInEth";

fn volumes_fragment() -> String {
    format!(
        "
    fragment VolumesSnapshot on Snapshot {{
        id
        timestamp
        volume {{{fields}
        }}
        locked {{{fields}
        }}
    }}",
        fields = VOLUME_FIELDS
    )
}

fn snapshot_sub_query(timestamp: i64) -> String {
    format!(
        "
    s{ts}: Snapshot(timestamp: \"{ts}\") {{
        ...VolumesSnapshot
    }}",
        ts = timestamp
    )
}

/// Timestamps fetched for `period`, oldest first
pub fn get_resolution_timestamps(period: PeriodType, now: i64) -> Vec<i64> {
    let interval = get_resolution_interval(period);
    let end = get_resolution_end_timestamp(BASE_RESOLUTION, now);
    let mut timestamps: Vec<i64> = (0..get_resolution_points(period))
        .map(|i| end - i * interval)
        .collect();
    timestamps.reverse();
    timestamps
}

/// GraphQL query fetching every snapshot of the window plus asset metadata
pub fn build_tracker_query(period: PeriodType, now: i64) -> String {
    let end = get_resolution_end_timestamp(BASE_RESOLUTION, now);
    let sub_queries: Vec<String> = get_resolution_timestamps(period, now)
        .into_iter()
        .map(snapshot_sub_query)
        .collect();

    format!(
        "{fragment}
    query GetSnapshots {{
        {assets}: Snapshot(timestamp: \"{end}\") {{
            id,
            timestamp,
            prices {{
                asset,
                decimals
            }}
        }},
        {subs}
    }}",
        fragment = volumes_fragment(),
        assets = ASSETS_KEY,
        end = end,
        subs = sub_queries.join(",")
    )
}
