//! Withdraw command - withdraw a darknode's rewards from the payment contract

use anyhow::{Context, Result};
use bigdecimal::Zero;
use colored::Colorize;
use dialoguer::Confirm;

use crate::commands::darknode::{load_overview, parse_id};
use crate::commands::spinner;
use crate::config::Config;
use crate::controller::{FeesController, WithdrawOutcome};
use crate::network::LiveNetwork;
use crate::numeric;
use crate::prices;
use crate::validate;

pub async fn execute(
    config: Config,
    id: String,
    token: String,
    token_address: Option<String>,
    key: Option<String>,
    yes: bool,
) -> Result<()> {
    println!("{}", "Withdraw Rewards".cyan().bold());
    println!();

    let private_key = key
        .or_else(|| std::env::var("RCC_PRIVATE_KEY").ok())
        .context("Private key required. Use --key or set RCC_PRIVATE_KEY")?;

    let token_config = config.token(&token).cloned();
    let token_address = token_address
        .or_else(|| token_config.as_ref().map(|t| t.address.clone()))
        .with_context(|| format!("No address known for {}. Use --token-address", token))?;
    let symbol = token_config
        .as_ref()
        .map(|t| t.symbol.clone())
        .unwrap_or_else(|| token.to_uppercase());

    validate::validate_withdrawal(&id, &token_address, &private_key).into_result()?;
    let darknode = parse_id(&id)?;
    config.darknode_payment()?;

    let quote = config.quote_currency.clone();
    let network = LiveNetwork::new(config, Some(private_key))?;

    let pb = spinner("Fetching balance...");
    let overview = load_overview(&network, &darknode).await?;
    let balance = overview
        .details
        .fees_earned
        .get(&symbol)
        .cloned()
        .flatten();
    let Some(balance) = balance.filter(|b| !b.amount.is_zero()) else {
        pb.finish_and_clear();
        println!("{}", format!("No {} balance available to withdraw", symbol).yellow());
        return Ok(());
    };

    let standard = numeric::to_standard_amount(&balance.amount, balance.asset.decimals);
    pb.finish_with_message(format!(
        "{} Available: {}",
        "✓".green(),
        format!("{} {}", numeric::display(&standard, 8), symbol).green()
    ));

    println!();
    println!("  {} {}", "Darknode:".bright_black(), darknode.to_base58());
    println!(
        "  {} {} {}",
        "Withdrawing:".bright_black(),
        numeric::display(&standard, 8),
        symbol
    );
    if let Some(value) = prices::quote_amount(&balance, &quote, overview.token_prices.as_ref()) {
        println!(
            "  {} {} {}",
            "Value:".bright_black(),
            numeric::display(&value, 2),
            quote.to_uppercase()
        );
    }
    println!("  {} {}", "Token:".bright_black(), token_address);
    println!();

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Send the withdrawal transaction?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", "Withdrawal cancelled".yellow());
            return Ok(());
        }
    }

    let mut controller = FeesController::new(network);
    controller.set_details(overview.details);

    let pb = spinner("Submitting withdrawal...");
    let outcome = controller.withdraw(&symbol, &token_address).await?;
    pb.finish_and_clear();

    match outcome {
        WithdrawOutcome::Submitted => {
            println!("{}", "✅ Withdrawal confirmed".green().bold());
            if let Some(remaining) = controller
                .withdrawable()
                .and_then(|earned| earned.get(&symbol).cloned().flatten())
            {
                let left = numeric::to_standard_amount(&remaining.amount, remaining.asset.decimals);
                println!(
                    "  {} {} {}",
                    "Remaining:".bright_black(),
                    numeric::display(&left, 8),
                    symbol
                );
            }
        }
        WithdrawOutcome::Disabled => {
            println!("{}", "A withdrawal was already sent for this cycle".yellow());
        }
        WithdrawOutcome::NoDarknode => {
            println!("{}", "Darknode details unavailable".yellow());
        }
    }

    Ok(())
}
