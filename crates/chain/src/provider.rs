//! Read-side RPC access.
//! Uses Alloy providers for typed contract calls.

use crate::contracts::IERC20;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// Wallet and chain reads the engine needs outside the lending adapters.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Latest block; doubles as the connectivity probe.
    async fn block_number(&self) -> Result<u64>;

    /// Native balance in wei.
    async fn native_balance(&self, account: Address) -> Result<U256>;

    /// ERC20 balance in base units.
    async fn token_balance(&self, token: Address, account: Address) -> Result<U256>;

    async fn token_decimals(&self, token: Address) -> Result<u8>;
}

/// HTTP provider manager.
///
/// Providers are built per call from the stored URL; alloy HTTP providers are
/// cheap to construct and this keeps the manager `Clone + Send + Sync`.
#[derive(Debug, Clone)]
pub struct ProviderManager {
    rpc_url: String,
    chain_id: u64,
}

impl ProviderManager {
    /// Create a manager without touching the network.
    pub fn new(rpc_url: impl Into<String>, chain_id: u64) -> Self {
        let rpc_url = rpc_url.into();
        info!(rpc = %rpc_url, chain_id, "Provider manager configured");
        Self { rpc_url, chain_id }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Current allowance `owner -> spender` on `token`.
    pub async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        let erc20 = IERC20::new(token, &provider);
        let allowance = erc20
            .allowance(owner, spender)
            .call()
            .await
            .with_context(|| format!("allowance({owner}, {spender}) on {token}"))?
            ._0;
        Ok(allowance)
    }

    /// Check the node answers and reports the configured chain.
    pub async fn health_check(&self) -> Result<u64> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        let remote_chain = provider.get_chain_id().await.context("eth_chainId")?;
        if remote_chain != self.chain_id {
            anyhow::bail!(
                "RPC reports chain {} but {} is configured",
                remote_chain,
                self.chain_id
            );
        }
        let block = self.block_number().await?;
        debug!(block, "Provider health check passed");
        Ok(block)
    }
}

#[async_trait]
impl ChainReader for ProviderManager {
    async fn block_number(&self) -> Result<u64> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        let block = provider.get_block_number().await.context("eth_blockNumber")?;
        Ok(block)
    }

    #[instrument(skip(self), level = "trace")]
    async fn native_balance(&self, account: Address) -> Result<U256> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        let balance = provider
            .get_balance(account)
            .await
            .with_context(|| format!("eth_getBalance({account})"))?;
        Ok(balance)
    }

    #[instrument(skip(self), level = "trace")]
    async fn token_balance(&self, token: Address, account: Address) -> Result<U256> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        let erc20 = IERC20::new(token, &provider);
        let balance = erc20
            .balanceOf(account)
            .call()
            .await
            .with_context(|| format!("balanceOf({account}) on {token}"))?
            ._0;
        Ok(balance)
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        let erc20 = IERC20::new(token, &provider);
        let decimals = erc20
            .decimals()
            .call()
            .await
            .with_context(|| format!("decimals() on {token}"))?
            ._0;
        Ok(decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_keeps_endpoint() {
        let manager = ProviderManager::new("https://rpc.hyperliquid.xyz/evm", 999);
        assert_eq!(manager.rpc_url(), "https://rpc.hyperliquid.xyz/evm");
        assert_eq!(manager.chain_id(), 999);
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_health_check_live() {
        let manager = ProviderManager::new("https://rpc.hyperliquid.xyz/evm", 999);
        assert!(manager.health_check().await.is_ok());
    }
}
