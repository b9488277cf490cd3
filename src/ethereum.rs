//! Ethereum bindings for the darknode payment and registry contracts

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use ethers::prelude::*;
use std::str::FromStr;
use std::sync::Arc;

use crate::darknode_id::DarknodeId;

abigen!(
    DarknodePayment,
    r#"[
        function withdraw(address _darknode, address _token) external
        function withdrawMultiple(address[] _darknodes, address[] _tokens) external
        function darknodeBalances(address _darknode, address _token) external view returns (uint256)
        function currentCycle() external view returns (uint256)
        function previousCycle() external view returns (uint256)
    ]"#
);

abigen!(
    DarknodeRegistry,
    r#"[
        function isPendingDeregistration(address _darknodeID) external view returns (bool)
    ]"#
);

pub type ReadClient = Provider<Http>;
pub type SigningClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Ethereum address of a darknode
pub fn darknode_address(id: &DarknodeId) -> Address {
    Address::from(*id.as_bytes())
}

pub fn parse_address(input: &str) -> Result<Address> {
    Address::from_str(input).with_context(|| format!("Invalid Ethereum address: {}", input))
}

pub fn u256_to_decimal(value: U256) -> BigDecimal {
    // U256 always renders as a plain base-10 integer
    BigDecimal::from_str(&value.to_string()).unwrap_or_default()
}

/// Parse a hex private key into a wallet bound to `chain_id`
pub fn wallet_from_key(private_key: &str, chain_id: u64) -> Result<LocalWallet> {
    let wallet: LocalWallet = private_key
        .trim()
        .trim_start_matches("0x")
        .parse()
        .context("Invalid private key format")?;
    Ok(wallet.with_chain_id(chain_id))
}

/// True when the subgraph trails the chain head by more than `tolerance` blocks
pub fn is_subgraph_out_of_sync(chain_block: u64, indexed_block: u64, tolerance: u64) -> bool {
    chain_block.saturating_sub(indexed_block) > tolerance
}

pub struct PaymentContract<M> {
    contract: DarknodePayment<M>,
}

impl<M: Middleware + 'static> PaymentContract<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self {
            contract: DarknodePayment::new(address, client),
        }
    }

    /// Withdrawable balance of `token` for `darknode`, in base units
    pub async fn darknode_balance(&self, darknode: &DarknodeId, token: Address) -> Result<U256> {
        self.contract
            .darknode_balances(darknode_address(darknode), token)
            .call()
            .await
            .map_err(|e| anyhow::anyhow!("darknodeBalances call failed: {}", e))
    }

    pub async fn current_cycle(&self) -> Result<U256> {
        self.contract
            .current_cycle()
            .call()
            .await
            .map_err(|e| anyhow::anyhow!("currentCycle call failed: {}", e))
    }

    pub async fn previous_cycle(&self) -> Result<U256> {
        self.contract
            .previous_cycle()
            .call()
            .await
            .map_err(|e| anyhow::anyhow!("previousCycle call failed: {}", e))
    }

    /// Withdraw one token for one darknode; returns the mined transaction hash
    pub async fn withdraw(&self, darknode: &DarknodeId, token: Address) -> Result<TxHash> {
        let call = self.contract.withdraw(darknode_address(darknode), token);
        let pending = call
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("withdraw failed: {}", e))?;
        let tx_hash = pending.tx_hash();
        tracing::info!("Withdraw transaction sent: {:?}", tx_hash);

        pending
            .await
            .context("Failed waiting for withdraw receipt")?
            .context("Withdraw transaction dropped from mempool")?;
        Ok(tx_hash)
    }

    /// Withdraw several (darknode, token) pairs in one transaction
    pub async fn withdraw_multiple(
        &self,
        darknodes: &[DarknodeId],
        tokens: &[Address],
    ) -> Result<TxHash> {
        anyhow::ensure!(
            darknodes.len() == tokens.len(),
            "withdrawMultiple needs one token per darknode ({} vs {})",
            darknodes.len(),
            tokens.len()
        );

        let nodes: Vec<Address> = darknodes.iter().map(darknode_address).collect();
        let call = self.contract.withdraw_multiple(nodes, tokens.to_vec());
        let pending = call
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("withdrawMultiple failed: {}", e))?;
        let tx_hash = pending.tx_hash();
        tracing::info!("WithdrawMultiple transaction sent: {:?}", tx_hash);

        pending
            .await
            .context("Failed waiting for withdrawMultiple receipt")?
            .context("WithdrawMultiple transaction dropped from mempool")?;
        Ok(tx_hash)
    }
}

pub struct RegistryContract<M> {
    contract: DarknodeRegistry<M>,
}

impl<M: Middleware + 'static> RegistryContract<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self {
            contract: DarknodeRegistry::new(address, client),
        }
    }

    pub async fn is_pending_deregistration(&self, darknode: &DarknodeId) -> Result<bool> {
        self.contract
            .is_pending_deregistration(darknode_address(darknode))
            .call()
            .await
            .map_err(|e| anyhow::anyhow!("isPendingDeregistration call failed: {}", e))
    }
}

/// Read-only connection to an Ethereum JSON-RPC endpoint
pub struct EthereumClient {
    provider: Arc<ReadClient>,
}

impl EthereumClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Invalid Ethereum RPC URL: {}", rpc_url))?;
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    pub async fn block_number(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block_number()
            .await
            .context("Failed to fetch Ethereum block number")?;
        Ok(block.as_u64())
    }

    pub fn payment(&self, address: Address) -> PaymentContract<ReadClient> {
        PaymentContract::new(address, self.provider.clone())
    }

    pub fn registry(&self, address: Address) -> RegistryContract<ReadClient> {
        RegistryContract::new(address, self.provider.clone())
    }

    /// Payment contract bound to a signer built from `private_key`
    pub async fn signing_payment(
        &self,
        address: Address,
        private_key: &str,
    ) -> Result<(PaymentContract<SigningClient>, Address)> {
        let chain_id = self
            .provider
            .get_chainid()
            .await
            .context("Failed to fetch chain id")?;
        let wallet = wallet_from_key(private_key, chain_id.as_u64())?;
        let sender = wallet.address();

        let client = SignerMiddleware::new(self.provider.as_ref().clone(), wallet);
        Ok((PaymentContract::new(address, Arc::new(client)), sender))
    }
}
