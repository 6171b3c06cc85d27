//! GlueX exchange-rate client with a short-lived in-memory cache.

use alloy::primitives::{address, Address};
use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Default exchange-rate endpoint.
pub const GLUEX_RATES_URL: &str = "https://exchange-rates.gluex.xyz/";

/// USDe, the quote currency every rate is expressed in.
pub const USD_QUOTE_TOKEN: Address = address!("5d3a1Ff2b6BAb83b63cd9AD0787074081a52ef34");

#[derive(Debug, Serialize)]
struct RatePair {
    domestic_blockchain: &'static str,
    domestic_token: Address,
    foreign_blockchain: &'static str,
    foreign_token: Address,
}

#[derive(Debug, Deserialize)]
struct RateEntry {
    price: serde_json::Value,
}

/// Exchange-rate client. Prices are cached per token for `ttl`.
#[derive(Debug, Clone)]
pub struct GlueXRatesClient {
    client: reqwest::Client,
    url: String,
    quote_token: Address,
    ttl: Duration,
    cache: Arc<DashMap<Address, (f64, Instant)>>,
}

impl GlueXRatesClient {
    pub fn new(url: impl Into<String>, timeout: Duration, ttl: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building exchange-rate HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
            quote_token: USD_QUOTE_TOKEN,
            ttl,
            cache: Arc::new(DashMap::new()),
        })
    }

    /// USD price of one whole unit of `token`.
    #[instrument(skip(self), fields(token = %token))]
    pub async fn price(&self, token: Address, decimals: u8) -> Result<f64> {
        if let Some(entry) = self.cache.get(&token) {
            let (price, fetched_at) = *entry;
            if fetched_at.elapsed() < self.ttl {
                return Ok(price);
            }
        }

        let body = [RatePair {
            domestic_blockchain: "hyperevm",
            domestic_token: token,
            foreign_blockchain: "hyperevm",
            foreign_token: self.quote_token,
        }];

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("exchange-rate request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("exchange-rate API error: {} - {}", status, body);
        }

        let entries: Vec<RateEntry> = response.json().await.context("decoding exchange rates")?;
        let raw = first_price(&entries)?;
        let price = scale_rate(raw, decimals);
        debug!(raw, price, decimals, "Fetched exchange rate");

        self.cache.insert(token, (price, Instant::now()));
        Ok(price)
    }

    /// Drop all cached rates.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn first_price(entries: &[RateEntry]) -> Result<f64> {
    let entry = entries.first().context("exchange-rate response was empty")?;
    match &entry.price {
        serde_json::Value::Number(n) => n.as_f64().context("price out of range"),
        serde_json::Value::String(s) => s.trim().parse::<f64>().context("unparseable price"),
        other => anyhow::bail!("unexpected price value: {other}"),
    }
}

/// Rates are quoted against an 18-decimal unit; tokens with fewer decimals
/// come back inflated by the difference.
pub fn scale_rate(raw: f64, decimals: u8) -> f64 {
    if decimals >= 18 {
        raw
    } else {
        raw / 10f64.powi(18 - decimals as i32)
    }
}
