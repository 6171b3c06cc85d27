//! USD price lookups.

use alloy::primitives::Address;
use anyhow::Result;
use async_trait::async_trait;
use hyperyield_api::GlueXRatesClient;

/// USD-comparable price source.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Price of one whole unit of `asset`.
    async fn price(&self, asset: Address, decimals: u8) -> Result<f64>;
}

/// Prices from the GlueX exchange-rate API.
#[derive(Debug, Clone)]
pub struct GlueXPriceOracle {
    rates: GlueXRatesClient,
}

impl GlueXPriceOracle {
    pub fn new(rates: GlueXRatesClient) -> Self {
        Self { rates }
    }
}

#[async_trait]
impl PriceOracle for GlueXPriceOracle {
    async fn price(&self, asset: Address, decimals: u8) -> Result<f64> {
        let price = self.rates.price(asset, decimals).await?;
        if !price.is_finite() || price <= 0.0 {
            anyhow::bail!("non-positive price {price} for {asset}");
        }
        Ok(price)
    }
}
