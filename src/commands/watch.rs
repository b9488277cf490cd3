//! Watch command - poll a darknode and warn about unclaimed rewards

use anyhow::Result;
use colored::Colorize;
use std::time::Duration;
use tokio::signal;

use crate::commands::darknode::{load_overview, parse_id, print_claim_warning};
use crate::commands::{separator, spinner};
use crate::config::Config;
use crate::controller::FeesController;
use crate::network::LiveNetwork;
use crate::numeric;
use crate::prices;

pub async fn execute(config: Config, id: String, interval: u64) -> Result<()> {
    let darknode = parse_id(&id)?;
    let quote = config.quote_currency.clone();
    let interval = Duration::from_secs(interval.max(10));

    println!("{}", "Darknode Watcher".cyan().bold());
    println!();
    println!("  {} {}", "Darknode:".bright_black(), darknode.to_base58().green());
    println!("  {} {}s", "Interval:".bright_black(), interval.as_secs());
    println!();

    let pb = spinner("Connecting to RenVM...");
    let network = LiveNetwork::new(config, None)?;
    let first = load_overview(&network, &darknode).await?;
    pb.finish_with_message(format!("{} Connected", "✓".green()));

    let mut controller = FeesController::new(network);
    let mut overview = first;

    println!();
    println!("{}", separator(60).bright_black());
    println!("  {}", "Press Ctrl+C to stop".bright_black());
    println!("{}", separator(60).bright_black());
    println!();

    let mut refreshes: u64 = 0;
    let mut warnings: u64 = 0;

    loop {
        controller.set_details(overview.details.clone());
        refreshes += 1;

        let pending = controller.pending_rewards(&overview.cycles, &overview.by_cycle);
        let total = pending
            .values()
            .flatten()
            .filter_map(|reward| {
                prices::quote_amount(reward, &quote, overview.token_prices.as_ref())
            })
            .fold(bigdecimal::BigDecimal::from(0), |acc, value| acc + value);

        let cycle = overview.cycles.current_cycle.as_deref().unwrap_or("-");
        println!(
            "  {} cycle {} {} pending {} {}",
            chrono::Local::now().format("%H:%M:%S").to_string().bright_black(),
            cycle.cyan(),
            "|".bright_black(),
            numeric::display(&total, 2).green(),
            quote.to_uppercase()
        );

        if controller.check_claim_warning(&overview.cycles) {
            warnings += 1;
            print_claim_warning();
            println!();
        }

        tokio::select! {
            _ = signal::ctrl_c() => {
                println!();
                println!("{}", "Stopping watcher...".yellow());
                break;
            }

            _ = tokio::time::sleep(interval) => {
                match load_overview(controller.network(), &darknode).await {
                    Ok(next) => overview = next,
                    Err(e) => {
                        // Keep the last overview and retry next tick
                        tracing::debug!("Refresh failed: {:#}", e);
                        eprintln!("  {} Refresh failed: {}", "⚠️".yellow(), e);
                    }
                }
            }
        }
    }

    println!();
    println!("{}", "Watch Session Summary".cyan().bold());
    println!("  {} {}", "Refreshes:".bright_black(), refreshes);
    println!("  {} {}", "Claim warnings:".bright_black(), warnings);
    println!();

    Ok(())
}
