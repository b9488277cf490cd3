//! Ren Command Center CLI - RenVM darknode fees, rewards and network stats
//!
//! A command-line companion for darknode operators. Check fee rewards,
//! follow claim status, withdraw rewards and inspect network volume.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod config;
mod controller;
mod darknode_id;
mod details;
mod error;
mod ethereum;
mod fees;
mod models;
mod network;
mod numeric;
mod pending;
mod prices;
mod renvm;
mod subgraph;
mod tracker;
mod validate;

use commands::{darknode, epochs, fees as fees_cmd, stats, watch, withdraw};

/// Ren Command Center CLI - RenVM darknode fees, rewards and network stats
#[derive(Parser)]
#[command(name = "rcc")]
#[command(author = "Ren Command Center contributors")]
#[command(version = "0.1.0")]
#[command(about = "RenVM darknode operator companion", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// RenVM network (mainnet or testnet), overrides the config file
    #[arg(long, global = true, env = "RCC_NETWORK")]
    network: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show network fee rewards for the current and previous epoch
    Fees {
        /// Only show this asset (e.g. BTC)
        #[arg(long)]
        asset: Option<String>,

        /// Divide rewards by the number of darknodes
        #[arg(long)]
        per_node: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the fee epoch history of an asset
    Epochs {
        /// Asset symbol (e.g. BTC)
        #[arg(long)]
        asset: String,

        /// Number of recent epochs to show
        #[arg(long, default_value = "10")]
        limit: u32,

        /// Show a single epoch
        #[arg(long)]
        epoch: Option<u64>,
    },

    /// Show registration, claim status and rewards of a darknode
    Darknode {
        /// Darknode ID (hex address, base58 or RenVM ID)
        #[arg(long, env = "RCC_DARKNODE")]
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Withdraw a darknode's rewards to its operator
    Withdraw {
        /// Darknode ID (hex address, base58 or RenVM ID)
        #[arg(long, env = "RCC_DARKNODE")]
        id: String,

        /// Token to withdraw (e.g. BTC or renBTC)
        #[arg(long)]
        token: String,

        /// Token contract address, if not in the config
        #[arg(long)]
        token_address: Option<String>,

        /// Private key for signing (or use RCC_PRIVATE_KEY env)
        #[arg(long, env = "RCC_PRIVATE_KEY", hide_env_values = true)]
        key: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Watch a darknode and warn about unclaimed rewards
    Watch {
        /// Darknode ID (hex address, base58 or RenVM ID)
        #[arg(long, env = "RCC_DARKNODE")]
        id: String,

        /// Seconds between refreshes
        #[arg(long, default_value = "60")]
        interval: u64,
    },

    /// Show locked and transacted value across chains
    Stats {
        /// locked or transacted
        #[arg(long = "type", default_value = "locked")]
        volume_type: String,

        /// hour, day, week, month, year or all
        #[arg(long, default_value = "day")]
        period: String,

        /// all, or one of Ethereum, BinanceSmartChain, Polygon, Fantom, Avalanche
        #[arg(long, default_value = "all")]
        chain: String,

        /// USD, BTC, ETH, base, standard or any quote currency code
        #[arg(long)]
        currency: Option<String>,

        /// Print the time series instead of the change over the period
        #[arg(long)]
        series: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Validate the config file
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let json_output = matches!(
        cli.command,
        Commands::Fees { json: true, .. }
            | Commands::Darknode { json: true, .. }
            | Commands::Stats { json: true, .. }
    );
    if !json_output {
        print_banner();
    }

    let mut config = config::load_config()?;
    if let Some(network) = &cli.network {
        config = config.with_network(network);
    }

    match cli.command {
        Commands::Fees {
            asset,
            per_node,
            json,
        } => {
            fees_cmd::execute(config, asset, per_node, json).await?;
        }

        Commands::Epochs {
            asset,
            limit,
            epoch,
        } => {
            epochs::execute(config, asset, limit, epoch).await?;
        }

        Commands::Darknode { id, json } => {
            darknode::execute(config, id, json).await?;
        }

        Commands::Withdraw {
            id,
            token,
            token_address,
            key,
            yes,
        } => {
            withdraw::execute(config, id, token, token_address, key, yes).await?;
        }

        Commands::Watch { id, interval } => {
            watch::execute(config, id, interval).await?;
        }

        Commands::Stats {
            volume_type,
            period,
            chain,
            currency,
            series,
            json,
        } => {
            stats::execute(config, volume_type, period, chain, currency, series, json).await?;
        }

        Commands::Config { path, check } => {
            let config_path = config::get_config_path()?;
            if path {
                println!("{}", config_path.display());
            } else if check {
                let result = validate::validate_config(&config);
                if result.valid {
                    println!("{}", "✅ VALID".green().bold());
                } else {
                    println!("{}", "❌ INVALID".red().bold());
                    println!();
                    for error in &result.errors {
                        println!("    {} {}", "•".red(), error);
                    }
                    println!();
                    anyhow::bail!("Config validation failed");
                }
            } else {
                println!("Config file: {}", config_path.display());
                println!("\n{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn print_banner() {
    let banner = r#"
    ____  ______________
   / __ \/ ____/ ____/
  / /_/ / /   / /
 / _, _/ /___/ /___
/_/ |_|\____/\____/
                      "#;

    println!("{}", banner.cyan());
    println!("{}", "  Ren Command Center".bright_black());
    println!();
}
