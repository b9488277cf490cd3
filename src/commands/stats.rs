//! Stats command - locked and transacted value across RenVM chains

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use colored::Colorize;
use serde::Serialize;

use crate::commands::{separator, spinner};
use crate::config::Config;
use crate::models::{DisplayCurrency, PeriodType, SnapshotRecords, TrackerChain, TrackerVolumeType};
use crate::network::LiveNetwork;
use crate::numeric;
use crate::prices::{self, TokenPrices};
use crate::tracker::{self, VolumeData};

/// Chains selected with `--chain`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSelection {
    All,
    Single(TrackerChain),
}

impl std::str::FromStr for ChainSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(ChainSelection::All);
        }
        s.parse().map(ChainSelection::Single)
    }
}

#[derive(Serialize)]
struct ChainReport {
    chain: String,
    #[serde(flatten)]
    volume: VolumeData,
}

#[derive(Serialize)]
struct StatsReport {
    volume_type: String,
    currency: String,
    #[serde(serialize_with = "numeric::serialize_decimal")]
    total_difference: BigDecimal,
    chains: Vec<ChainReport>,
}

/// Time series summed over every tracked chain
fn all_chain_time_series(
    records: &SnapshotRecords,
    volume_type: TrackerVolumeType,
    currency: &DisplayCurrency,
    token_prices: &TokenPrices,
) -> Vec<(i64, f64)> {
    let mut series: Vec<(i64, f64)> = Vec::new();
    for chain in TrackerChain::ALL {
        let points = tracker::snapshot_data_to_time_series(
            records,
            volume_type,
            chain,
            currency,
            token_prices,
        );
        if series.is_empty() {
            series = points;
            continue;
        }
        for (total, (_, value)) in series.iter_mut().zip(points) {
            total.1 += value;
        }
    }
    series
}

fn format_amount(value: &BigDecimal, currency: &DisplayCurrency) -> String {
    match currency {
        DisplayCurrency::BaseUnits => numeric::display(value, 0),
        DisplayCurrency::StandardUnits | DisplayCurrency::Btc | DisplayCurrency::Eth => {
            numeric::display(value, 8)
        }
        DisplayCurrency::Usd | DisplayCurrency::Other(_) => numeric::display(value, 2),
    }
}

pub async fn execute(
    config: Config,
    volume_type: String,
    period: String,
    chain: String,
    currency: Option<String>,
    series: bool,
    json: bool,
) -> Result<()> {
    let volume_type: TrackerVolumeType = volume_type.parse().map_err(anyhow::Error::msg)?;
    let period: PeriodType = period.parse().map_err(anyhow::Error::msg)?;
    let chain: ChainSelection = chain.parse().map_err(anyhow::Error::msg)?;
    let currency: DisplayCurrency = currency
        .unwrap_or_else(|| config.quote_currency.clone())
        .parse()
        .map_err(anyhow::Error::msg)?;

    let network = LiveNetwork::new(config, None)?;
    let now = chrono::Utc::now().timestamp();

    let pb = spinner("Querying network snapshots...");
    let records = network
        .subgraph()
        .query_snapshots(period, now)
        .await
        .context("Failed to query the analytics subgraph")?;

    let token_prices = match &currency {
        DisplayCurrency::Other(code) => {
            prices::fetch_token_prices(&network.config().price_api, &[], &[code.clone()])
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Conversion rates unavailable: {}", e);
                    TokenPrices::new()
                })
        }
        _ => TokenPrices::new(),
    };
    pb.finish_and_clear();

    tracing::debug!("{} snapshots received", tracker::get_snapshots(&records).len());

    if series {
        let points = match chain {
            ChainSelection::All => {
                all_chain_time_series(&records, volume_type, &currency, &token_prices)
            }
            ChainSelection::Single(chain) => tracker::snapshot_data_to_time_series(
                &records,
                volume_type,
                chain,
                &currency,
                &token_prices,
            ),
        };
        return print_series(&points, &currency, json);
    }

    let chains: Vec<TrackerChain> = match chain {
        ChainSelection::All => TrackerChain::ALL.to_vec(),
        ChainSelection::Single(chain) => vec![chain],
    };
    let reports: Vec<ChainReport> = chains
        .into_iter()
        .map(|chain| ChainReport {
            chain: chain.to_string(),
            volume: tracker::snapshot_data_to_volume_data(
                &records,
                volume_type,
                chain,
                &currency,
                &token_prices,
            ),
        })
        .collect();

    let total_difference = match chain {
        ChainSelection::All => tracker::snapshot_data_to_all_chain_volume_data(
            &records,
            volume_type,
            &currency,
            &token_prices,
        ),
        ChainSelection::Single(_) => reports
            .first()
            .map(|r| r.volume.difference.clone())
            .unwrap_or_default(),
    };

    if json {
        let report = StatsReport {
            volume_type: volume_type.to_string(),
            currency: currency.to_string(),
            total_difference,
            chains: reports,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let title = match volume_type {
        TrackerVolumeType::Locked => "Value Locked",
        TrackerVolumeType::Transacted => "Volume Transacted",
    };
    println!("{}", title.cyan().bold());
    println!();
    println!(
        "  {} {}",
        "Change:".bright_black(),
        format!("{} {}", format_amount(&total_difference, &currency), currency).green()
    );
    println!();

    for report in &reports {
        println!(
            "  {} {}",
            report.chain.cyan(),
            format!(
                "{} {}",
                format_amount(&report.volume.difference, &currency),
                currency
            )
            .bright_black()
        );
        println!("  {}", separator(40).bright_black());
        if report.volume.amount_records.is_empty() {
            println!("    {}", "No activity".bright_black());
        }
        for (asset, amount) in &report.volume.amount_records {
            println!("    {:<8} {:>24}", asset, format_amount(amount, &currency));
        }
        println!();
    }

    Ok(())
}

fn print_series(points: &[(i64, f64)], currency: &DisplayCurrency, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(points)?);
        return Ok(());
    }

    println!("{}", format!("Time Series ({})", currency).cyan().bold());
    println!();
    if points.is_empty() {
        println!("  {}", "No snapshots in this period".bright_black());
        return Ok(());
    }
    for (millis, value) in points {
        let time = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(*millis)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| millis.to_string());
        println!("  {} {:>20.2}", time.bright_black(), value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_selection() {
        assert_eq!("all".parse::<ChainSelection>(), Ok(ChainSelection::All));
        assert_eq!(
            "bsc".parse::<ChainSelection>(),
            Ok(ChainSelection::Single(TrackerChain::BinanceSmartChain))
        );
        assert!("solana".parse::<ChainSelection>().is_err());
    }

    #[test]
    fn test_all_chain_series_sums_chains() {
        let records: SnapshotRecords = serde_json::from_value(serde_json::json!({
            "assets": {
                "id": "assets",
                "timestamp": 200,
                "prices": [{ "asset": "BTC", "decimals": 8 }]
            },
            "s100": { "id": "a", "timestamp": 100, "locked": [
                { "asset": "BTC", "chain": "Ethereum", "amount": "1", "amountInUsd": "10" },
                { "asset": "BTC", "chain": "Fantom", "amount": "1", "amountInUsd": "5" }
            ]},
            "s200": { "id": "b", "timestamp": 200, "locked": [
                { "asset": "BTC", "chain": "Polygon", "amount": "1", "amountInUsd": "7" }
            ]}
        }))
        .unwrap();

        let series = all_chain_time_series(
            &records,
            TrackerVolumeType::Locked,
            &DisplayCurrency::Usd,
            &TokenPrices::new(),
        );
        assert_eq!(series, vec![(100_000, 15.0), (200_000, 7.0)]);
    }
}
