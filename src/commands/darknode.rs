//! Darknode command - registration, claim status and rewards of one darknode

use anyhow::{Context, Result};
use colored::Colorize;
use indexmap::IndexMap;
use serde::Serialize;

use crate::commands::{print_rewards, separator, spinner};
use crate::config::Config;
use crate::controller::{FeesController, CLAIM_WARNING_THRESHOLD};
use crate::darknode_id::DarknodeId;
use crate::details::{CycleState, DarknodeDetails, DarknodeFeeStatus, RegistrationStatus};
use crate::models::PendingRewards;
use crate::network::{LiveNetwork, PaymentCycles};
use crate::pending;
use crate::prices::TokenPrices;

/// Everything shown about a darknode, fetched in one pass
pub struct DarknodeOverview {
    pub details: DarknodeDetails,
    pub cycles: CycleState,
    pub by_cycle: IndexMap<String, PendingRewards>,
    pub token_prices: Option<TokenPrices>,
}

pub async fn load_overview(network: &LiveNetwork, id: &DarknodeId) -> Result<DarknodeOverview> {
    let state = network.block_state().await?;
    let cycles = network.cycle_state(&state).await;
    let token_prices = network.token_prices().await;

    let details = network
        .darknode_details(id, &state, &cycles, token_prices.as_ref())
        .await?;
    let by_cycle = pending::pending_rewards_by_cycle(
        &state,
        cycles.current_cycle.as_deref(),
        cycles.previous_cycle.as_deref(),
        &network.config().tracked_assets(),
        token_prices.as_ref(),
    );

    Ok(DarknodeOverview {
        details,
        cycles,
        by_cycle,
        token_prices,
    })
}

pub fn parse_id(id: &str) -> Result<DarknodeId> {
    DarknodeId::parse(id).with_context(|| format!("Invalid darknode ID: {}", id))
}

#[derive(Serialize)]
struct DarknodeReport<'a> {
    hex: String,
    base58: String,
    renvm_id: String,
    details: &'a DarknodeDetails,
    cycles: &'a CycleState,
    payment_cycles: Option<PaymentCycles>,
    pending_rewards: PendingRewards,
    claim_warning: bool,
}

pub async fn execute(config: Config, id: String, json: bool) -> Result<()> {
    let id = parse_id(&id)?;
    let quote = config.quote_currency.clone();
    let network = LiveNetwork::new(config, None)?;

    let pb = spinner("Fetching darknode details...");
    let overview = load_overview(&network, &id).await?;
    let payment_cycles = network.payment_cycles().await;
    pb.finish_and_clear();

    let mut controller = FeesController::new(network);
    controller.set_details(overview.details.clone());
    let pending_rewards = controller.pending_rewards(&overview.cycles, &overview.by_cycle);
    let claim_warning = controller.check_claim_warning(&overview.cycles);

    if json {
        let report = DarknodeReport {
            hex: id.to_hex(),
            base58: id.to_base58(),
            renvm_id: id.to_renvm_id(),
            details: &overview.details,
            cycles: &overview.cycles,
            payment_cycles,
            pending_rewards,
            claim_warning,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let status_icon = match overview.details.registration_status {
        RegistrationStatus::Registered => "🟢",
        RegistrationStatus::DeregistrationPending => "🟡",
        RegistrationStatus::Unregistered => "🔴",
    };

    println!("{}", "Darknode".cyan().bold());
    println!();
    println!(
        "  {} {} {}",
        status_icon,
        id.to_base58().green(),
        format!("({})", overview.details.registration_status).bright_black()
    );
    println!("  {} {}", "Address:".bright_black(), id.to_hex());
    println!("  {} {}", "RenVM ID:".bright_black(), id.to_renvm_id());
    println!();

    println!("  {}", "Cycles".bright_black());
    println!("  {}", separator(40).bright_black());
    for (cycle, status) in &overview.details.cycle_status {
        let label = match status {
            DarknodeFeeStatus::NotClaimed => status.to_string().yellow(),
            DarknodeFeeStatus::Claimed => status.to_string().green(),
            DarknodeFeeStatus::Ineligible => status.to_string().bright_black(),
        };
        println!("    {} {:<8} {}", "Cycle".bright_black(), cycle, label);
    }
    if let Some(elapsed) = overview.cycles.time_since_last_epoch {
        println!(
            "    {} {}h {}m",
            "Since epoch:".bright_black(),
            elapsed / 3600,
            (elapsed % 3600) / 60
        );
    }
    if let Some(contract) = &payment_cycles {
        println!(
            "    {} {} {}",
            "Payment contract:".bright_black(),
            contract.current,
            format!("(previous {})", contract.previous).bright_black()
        );
    }
    if overview.cycles.subgraph_out_of_sync {
        println!(
            "    {}",
            "Subgraph is behind the chain, previous cycle hidden".yellow()
        );
    }
    println!();

    println!("  {}", "Pending Rewards".bright_black());
    println!("  {}", separator(40).bright_black());
    print_rewards(&pending_rewards, &quote, overview.token_prices.as_ref());
    println!();

    println!("  {}", "Withdrawable".bright_black());
    println!("  {}", separator(40).bright_black());
    print_rewards(&overview.details.fees_earned, &quote, overview.token_prices.as_ref());

    if !controller.earning_fees() {
        println!();
        println!("  {}", "This darknode is not earning fees".yellow());
    }

    if claim_warning {
        print_claim_warning();
    }

    Ok(())
}

pub fn print_claim_warning() {
    println!();
    println!(
        "  {} {}",
        "⚠️".yellow(),
        format!(
            "Previous cycle rewards still unclaimed {}h after the epoch. \
             Claim them before the next epoch.",
            CLAIM_WARNING_THRESHOLD / 3600
        )
        .yellow()
    );
}
