//! CLI command implementations
//!
//! Commands only read from the network, except `withdraw`, which signs
//! nothing until the inputs validate and the operator confirms.

pub mod darknode;
pub mod epochs;
pub mod fees;
pub mod stats;
pub mod watch;
pub mod withdraw;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::models::PendingRewards;
use crate::numeric;
use crate::prices::{self, TokenPrices};

/// Horizontal rule under table headers
pub fn separator(width: usize) -> String {
    "━".repeat(width)
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print a token -> amount table with values in `currency`
pub fn print_rewards(rewards: &PendingRewards, currency: &str, token_prices: Option<&TokenPrices>) {
    if rewards.values().all(Option::is_none) {
        println!("    {}", "No rewards".bright_black());
        return;
    }

    for (token, reward) in rewards {
        let Some(reward) = reward else {
            println!("    {:<8} {}", token, "-".bright_black());
            continue;
        };
        let standard = numeric::to_standard_amount(&reward.amount, reward.asset.decimals);
        let value = prices::quote_amount(reward, currency, token_prices)
            .map(|v| format!("{} {}", numeric::display(&v, 2), currency.to_uppercase()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "    {:<8} {:>20} {}",
            token,
            numeric::display(&standard, 8).green(),
            value.bright_black()
        );
    }
}
