//! Legacy `gasPrice` strategy with a hard ceiling.

use super::{GasParams, GasStrategy};
use alloy::network::TransactionBuilder;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

/// Node-reported gas price, capped at `max_gas_price`.
///
/// Falls back to `default_gas_price` when the node does not answer.
#[derive(Debug, Clone)]
pub struct LegacyGasStrategy {
    default_gas_price: u128,
    max_gas_price: u128,
}

impl LegacyGasStrategy {
    pub fn new(default_gas_price: u128, max_gas_price: u128) -> Self {
        Self {
            default_gas_price,
            max_gas_price: max_gas_price.max(default_gas_price),
        }
    }

    /// Build from gwei values as they appear in configuration.
    pub fn from_gwei(default_gwei: f64, max_gwei: f64) -> Self {
        Self::new((default_gwei * 1e9) as u128, (max_gwei * 1e9) as u128)
    }

    fn cap(&self, gas_price: u128) -> u128 {
        gas_price.min(self.max_gas_price)
    }
}

impl Default for LegacyGasStrategy {
    fn default() -> Self {
        Self::from_gwei(1.0, 50.0)
    }
}

#[async_trait]
impl GasStrategy for LegacyGasStrategy {
    async fn fetch_params(&self, rpc_url: &str) -> Result<GasParams> {
        let provider = ProviderBuilder::new().on_http(rpc_url.parse()?);
        let gas_price = match provider.get_gas_price().await {
            Ok(price) => price,
            Err(e) => {
                warn!(error = %e, fallback = self.default_gas_price, "Gas price query failed");
                self.default_gas_price
            }
        };
        Ok(GasParams {
            gas_price: self.cap(gas_price),
        })
    }

    fn apply_gas(&self, tx: &mut TransactionRequest, params: &GasParams) {
        tx.set_gas_price(params.gas_price);
    }

    fn strategy_name(&self) -> &'static str {
        "Legacy"
    }
}
