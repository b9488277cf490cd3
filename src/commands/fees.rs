//! Fees command - network fee rewards for the current and previous epoch

use anyhow::Result;
use colored::Colorize;
use indexmap::IndexMap;
use serde::Serialize;

use crate::commands::{separator, spinner};
use crate::config::Config;
use crate::fees;
use crate::models::{Epoch, TokenAmount};
use crate::network::LiveNetwork;
use crate::numeric;
use crate::pending::TrackedAsset;
use crate::prices;

#[derive(Debug, Serialize)]
struct AssetFees {
    current: TokenAmount,
    previous: TokenAmount,
}

fn selected_assets(config: &Config, asset: Option<&str>) -> Result<Vec<TrackedAsset>> {
    match asset {
        None => Ok(config.tracked_assets()),
        Some(symbol) => {
            let token = config.token(symbol).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown asset: {}. Add it to the tokens list in the config",
                    symbol
                )
            })?;
            Ok(vec![TrackedAsset {
                symbol: token.symbol.clone(),
                decimals: token.decimals,
            }])
        }
    }
}

pub async fn execute(
    config: Config,
    asset: Option<String>,
    per_node: bool,
    json: bool,
) -> Result<()> {
    let assets = selected_assets(&config, asset.as_deref())?;
    let quote = config.quote_currency.clone();
    let network = LiveNetwork::new(config, None)?;

    let pb = spinner("Querying RenVM block state...");
    let state = network.block_state().await?;
    let token_prices = network.token_prices().await;
    pb.finish_and_clear();

    let mut table: IndexMap<String, AssetFees> = IndexMap::new();
    for asset in &assets {
        if fees::get_fees_for_asset(&asset.symbol, &state).is_none() {
            tracing::debug!("No fee data for {}", asset.symbol);
            continue;
        }
        let reward = |epoch| {
            fees::get_token_fee_amounts(
                fees::get_token_rewards_for_epoch(&asset.symbol, epoch, &state, per_node),
                &asset.symbol,
                asset.decimals,
                token_prices.as_ref(),
            )
        };
        table.insert(
            asset.symbol.clone(),
            AssetFees {
                current: reward(Epoch::Current),
                previous: reward(Epoch::Previous),
            },
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    let title = if per_node { "Fees per Darknode" } else { "Network Fees" };
    println!("{}", title.cyan().bold());
    println!();

    if table.is_empty() {
        println!("  {}", "RenVM reports no fee data for the selected assets".yellow());
        return Ok(());
    }

    println!(
        "  {:<8} {:>20} {:>20} {:>14}",
        "Asset".bright_black(),
        "Current epoch".bright_black(),
        "Previous epoch".bright_black(),
        format!("Value ({})", quote.to_uppercase()).bright_black()
    );
    println!("  {}", separator(66).bright_black());

    for (symbol, fees) in &table {
        let current =
            numeric::to_standard_amount(&fees.current.amount, fees.current.asset.decimals);
        let previous =
            numeric::to_standard_amount(&fees.previous.amount, fees.previous.asset.decimals);
        let value = prices::quote_amount(&fees.current, &quote, token_prices.as_ref())
            .map(|v| numeric::display(&v, 2))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {:<8} {:>20} {:>20} {:>14}",
            symbol.green(),
            numeric::display(&current, 8),
            numeric::display(&previous, 8),
            value.yellow()
        );
    }

    if token_prices.is_none() {
        println!();
        println!("  {}", "Prices unavailable, values not shown".bright_black());
    }

    Ok(())
}
