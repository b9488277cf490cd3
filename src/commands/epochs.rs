//! Epochs command - fee epoch history of one asset

use anyhow::Result;
use colored::Colorize;

use crate::commands::{separator, spinner};
use crate::config::Config;
use crate::fees;
use crate::models::BlockState;
use crate::network::LiveNetwork;
use crate::numeric;

pub async fn execute(config: Config, asset: String, limit: u32, epoch: Option<u64>) -> Result<()> {
    let token = config
        .token(&asset)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Unknown asset: {}", asset))?;
    let network = LiveNetwork::new(config, None)?;

    let pb = spinner("Querying RenVM block state...");
    let state = network.block_state().await?;
    pb.finish_and_clear();

    match epoch {
        Some(number) => show_epoch_detail(&state, &token.symbol, token.decimals, number),
        None => show_epoch_list(&state, &token.symbol, token.decimals, limit),
    }
}

fn show_epoch_list(state: &BlockState, symbol: &str, decimals: u32, limit: u32) -> Result<()> {
    println!("{}", format!("{} Fee Epochs", symbol).cyan().bold());
    println!();

    let epochs = fees::get_fee_epochs(symbol, state);
    if epochs.is_empty() {
        println!("  {}", "No epochs found".bright_black());
        return Ok(());
    }

    println!(
        "  {:<10} {:>22} {:>8} {:>22}",
        "Epoch".bright_black(),
        "Total".bright_black(),
        "Nodes".bright_black(),
        "Per node".bright_black()
    );
    println!("  {}", separator(66).bright_black());

    let newest = epochs.len().saturating_sub(1);
    for (index, entry) in epochs.iter().enumerate().rev().take(limit as usize) {
        let label = match newest - index {
            0 => format!("{} (current)", entry.epoch),
            1 => format!("{} (previous)", entry.epoch),
            _ => entry.epoch.to_string(),
        };
        let per_node = fees::epoch_reward(entry, symbol, true);
        println!(
            "  {:<10} {:>22} {:>8} {:>22}",
            label.cyan(),
            numeric::display(&numeric::to_standard_amount(&entry.amount, decimals), 8),
            entry.num_nodes,
            numeric::display(&numeric::to_standard_amount(&per_node, decimals), 8).green()
        );
    }

    if let Some(data) = fees::get_fees_for_asset(symbol, state) {
        println!();
        println!(
            "  {} {}",
            "Unassigned:".bright_black(),
            numeric::display(&numeric::to_standard_amount(&data.unassigned, decimals), 8)
        );
    }

    println!();
    println!(
        "  {}",
        format!("View details: rcc epochs --asset {} --epoch <number>", symbol).bright_black()
    );

    Ok(())
}

fn show_epoch_detail(state: &BlockState, symbol: &str, decimals: u32, number: u64) -> Result<()> {
    let entry = fees::get_fee_epochs(symbol, state)
        .iter()
        .find(|e| e.epoch == number)
        .ok_or_else(|| anyhow::anyhow!("Epoch {} not found for {}", number, symbol))?;

    println!("{}", format!("{} Epoch {}", symbol, number).cyan().bold());
    println!();
    println!(
        "  {} {} {}",
        "Total fees:".bright_black(),
        numeric::display(&numeric::to_standard_amount(&entry.amount, decimals), 8).green(),
        symbol
    );
    println!("  {} {}", "Darknodes:".bright_black(), entry.num_nodes);
    let per_node = fees::epoch_reward(entry, symbol, true);
    println!(
        "  {} {} {}",
        "Per darknode:".bright_black(),
        numeric::display(&numeric::to_standard_amount(&per_node, decimals), 8).green(),
        symbol
    );

    if let Some(data) = fees::get_fees_for_asset(symbol, state) {
        let claimed = data
            .nodes
            .iter()
            .filter(|node| node.last_epoch_claimed.map_or(false, |c| c >= number))
            .count();
        println!();
        println!(
            "  {} {}/{}",
            "Claimed through this epoch:".bright_black(),
            claimed,
            data.nodes.len()
        );
    }

    Ok(())
}
