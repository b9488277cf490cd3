//! Live network access: RenVM, the analytics subgraph, Ethereum and prices

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;
use crate::controller::DarknodeNetwork;
use crate::darknode_id::DarknodeId;
use crate::details::{self, CycleState, DarknodeDetails};
use crate::ethereum::{self, EthereumClient};
use crate::fees;
use crate::models::{BlockState, PendingRewards};
use crate::prices::{self, TokenPrices};
use crate::renvm::RenVmClient;
use crate::subgraph::SubgraphClient;

/// Cycle counters kept by the DarknodePayment contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentCycles {
    pub current: String,
    pub previous: String,
}

pub struct LiveNetwork {
    config: Config,
    renvm: RenVmClient,
    subgraph: SubgraphClient,
    ethereum: EthereumClient,
    private_key: Option<String>,
}

impl LiveNetwork {
    pub fn new(config: Config, private_key: Option<String>) -> Result<Self> {
        Ok(Self {
            renvm: RenVmClient::new(&config.renvm_rpc)?,
            subgraph: SubgraphClient::new(&config.subgraph_url)?,
            ethereum: EthereumClient::new(&config.ethereum_rpc)?,
            config,
            private_key,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subgraph(&self) -> &SubgraphClient {
        &self.subgraph
    }

    pub async fn block_state(&self) -> Result<BlockState> {
        self.renvm
            .query_block_state()
            .await
            .context("Failed to query RenVM block state")
    }

    /// Price table for the configured tokens. Pricing is best effort: a
    /// failed fetch leaves amounts unpriced.
    pub async fn token_prices(&self) -> Option<TokenPrices> {
        let symbols: Vec<String> = self.config.tokens.iter().map(|t| t.symbol.clone()).collect();
        match prices::fetch_token_prices(
            &self.config.price_api,
            &symbols,
            &[self.config.quote_currency.clone()],
        )
        .await
        {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::warn!("Token prices unavailable: {}", e);
                None
            }
        }
    }

    /// Whether the subgraph lags the chain. Unknown counts as in sync.
    pub async fn subgraph_out_of_sync(&self) -> bool {
        let (chain, indexed) =
            tokio::join!(self.ethereum.block_number(), self.subgraph.indexed_block());
        match (chain, indexed) {
            (Ok(chain), Ok(indexed)) => {
                let lagging = ethereum::is_subgraph_out_of_sync(
                    chain,
                    indexed,
                    self.config.subgraph_sync_tolerance,
                );
                if lagging {
                    tracing::warn!("Subgraph at block {} trails Ethereum at {}", indexed, chain);
                }
                lagging
            }
            (Err(e), _) => {
                tracing::warn!("Could not read Ethereum block number: {}", e);
                false
            }
            (_, Err(e)) => {
                tracing::warn!("Could not read subgraph indexing height: {}", e);
                false
            }
        }
    }

    /// Current and previous cycle of the payment contract. `None` when the
    /// contract is not configured or the calls fail.
    pub async fn payment_cycles(&self) -> Option<PaymentCycles> {
        let address = match self
            .config
            .darknode_payment()
            .and_then(ethereum::parse_address)
        {
            Ok(address) => address,
            Err(e) => {
                tracing::debug!("Skipping payment contract cycles: {}", e);
                return None;
            }
        };

        let payment = self.ethereum.payment(address);
        match tokio::join!(payment.current_cycle(), payment.previous_cycle()) {
            (Ok(current), Ok(previous)) => Some(PaymentCycles {
                current: current.to_string(),
                previous: previous.to_string(),
            }),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Payment contract cycles unavailable: {}", e);
                None
            }
        }
    }

    pub async fn cycle_state(&self, state: &BlockState) -> CycleState {
        let out_of_sync = self.subgraph_out_of_sync().await;
        CycleState::from_block_state(state, chrono::Utc::now().timestamp(), out_of_sync)
    }

    /// Withdrawable balances of every configured token
    pub async fn fees_earned(
        &self,
        id: &DarknodeId,
        token_prices: Option<&TokenPrices>,
    ) -> Result<PendingRewards> {
        let payment = self
            .ethereum
            .payment(ethereum::parse_address(self.config.darknode_payment()?)?);

        let mut earned = PendingRewards::new();
        for token in &self.config.tokens {
            let address = ethereum::parse_address(&token.address)?;
            let balance = match payment.darknode_balance(id, address).await {
                Ok(balance) => Some(fees::get_token_fee_amounts(
                    ethereum::u256_to_decimal(balance),
                    &token.symbol,
                    token.decimals,
                    token_prices,
                )),
                Err(e) => {
                    tracing::warn!("Balance of {} for {} unavailable: {}", token.symbol, id, e);
                    None
                }
            };
            earned.insert(token.symbol.clone(), balance);
        }
        Ok(earned)
    }

    async fn pending_deregistration(&self, id: &DarknodeId) -> bool {
        let Some(registry) = self.config.darknode_registry.as_deref() else {
            return false;
        };
        let result = match ethereum::parse_address(registry) {
            Ok(address) => self.ethereum.registry(address).is_pending_deregistration(id).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!("Deregistration status of {} unavailable: {}", id, e);
            false
        })
    }

    pub async fn darknode_details(
        &self,
        id: &DarknodeId,
        state: &BlockState,
        cycles: &CycleState,
        token_prices: Option<&TokenPrices>,
    ) -> Result<DarknodeDetails> {
        let fees_earned = self.fees_earned(id, token_prices).await?;
        let pending_deregistration = self.pending_deregistration(id).await;

        Ok(details::build_darknode_details(
            *id,
            state,
            cycles,
            &self.config.tracked_assets(),
            fees_earned,
            pending_deregistration,
        ))
    }
}

#[async_trait]
impl DarknodeNetwork for LiveNetwork {
    async fn withdraw_reward(
        &self,
        darknodes: &[DarknodeId],
        token_symbol: &str,
        token_address: &str,
    ) -> Result<()> {
        let key = self
            .private_key
            .as_deref()
            .context("Private key required. Use --key or set RCC_PRIVATE_KEY")?;
        let payment_address = ethereum::parse_address(self.config.darknode_payment()?)?;
        let token = ethereum::parse_address(token_address)?;

        let (payment, sender) = self.ethereum.signing_payment(payment_address, key).await?;
        tracing::info!("Withdrawing {} from {:?}", token_symbol, sender);

        let tx_hash = match darknodes {
            [] => anyhow::bail!("No darknodes to withdraw for"),
            [single] => payment.withdraw(single, token).await?,
            many => {
                let tokens = vec![token; many.len()];
                payment.withdraw_multiple(many, &tokens).await?
            }
        };
        tracing::info!("{} withdrawal confirmed in {:?}", token_symbol, tx_hash);
        Ok(())
    }

    async fn update_darknode_details(&self, darknode: &DarknodeId) -> Result<DarknodeDetails> {
        let state = self.block_state().await?;
        let cycles = self.cycle_state(&state).await;
        let token_prices = self.token_prices().await;
        self.darknode_details(darknode, &state, &cycles, token_prices.as_ref())
            .await
    }
}
