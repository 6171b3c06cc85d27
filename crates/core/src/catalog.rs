//! Per-run asset snapshot.
//!
//! The catalog joins market terms from every lending protocol with prices,
//! wallet balances, positions and account summaries. It is built once per
//! run and never mutated afterwards; every decision in the run reads the
//! same numbers.

use crate::assets::{self, NATIVE_DECIMALS, NATIVE_SYMBOL, NATIVE_TOKEN, WHYPE};
use crate::error::{EngineError, EngineResult};
use crate::prices::PriceOracle;
use alloy::primitives::{Address, U256};
use hyperyield_chain::u256_math::to_human;
use hyperyield_chain::{
    AccountSummary, ChainReader, LendingProtocolAdapter, MarketData, ProtocolId, ReservePosition,
    RetryPolicy,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One protocol's terms for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ProtocolMarket {
    /// Percent
    pub supply_apy: f64,
    /// Percent
    pub borrow_apy: f64,
    /// Fraction
    pub ltv: f64,
    /// Fraction
    pub liquidation_threshold: f64,
    pub collateral_enabled: bool,
    pub borrow_enabled: bool,
}

impl From<&MarketData> for ProtocolMarket {
    fn from(m: &MarketData) -> Self {
        Self {
            supply_apy: m.supply_apy,
            borrow_apy: m.borrow_apy,
            ltv: m.ltv,
            liquidation_threshold: m.liquidation_threshold,
            collateral_enabled: m.collateral_enabled,
            borrow_enabled: m.borrow_enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogAsset {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    /// USD per whole unit
    pub price: f64,
    pub wallet_raw: U256,
    pub wallet: f64,
    /// Protocols listing this asset
    pub markets: BTreeMap<ProtocolId, ProtocolMarket>,
}

impl CatalogAsset {
    pub fn market(&self, protocol: ProtocolId) -> Option<&ProtocolMarket> {
        self.markets.get(&protocol)
    }

    pub fn wallet_value(&self) -> f64 {
        self.wallet * self.price
    }

    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN
    }
}

/// Supplied and borrowed amounts in one (protocol, asset) reserve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub protocol: ProtocolId,
    pub asset: Address,
    pub supplied_raw: U256,
    pub stable_debt_raw: U256,
    pub variable_debt_raw: U256,
    pub supplied: f64,
    /// Stable plus variable debt
    pub debt: f64,
    pub collateral_enabled: bool,
}

impl Position {
    pub fn from_reserve(protocol: ProtocolId, reserve: &ReservePosition, decimals: u8) -> Self {
        Self {
            protocol,
            asset: reserve.asset,
            supplied_raw: reserve.supplied,
            stable_debt_raw: reserve.stable_debt,
            variable_debt_raw: reserve.variable_debt,
            supplied: to_human(reserve.supplied, decimals),
            debt: to_human(reserve.total_debt(), decimals),
            collateral_enabled: reserve.collateral_enabled,
        }
    }

    pub fn debt_raw(&self) -> U256 {
        self.stable_debt_raw.saturating_add(self.variable_debt_raw)
    }
}

/// Frozen snapshot of everything the decision path reads.
#[derive(Debug, Clone, Serialize)]
pub struct AssetCatalog {
    pub account: Address,
    /// Protocols in evaluation order
    pub protocols: Vec<ProtocolId>,
    pub assets: Vec<CatalogAsset>,
    pub positions: Vec<Position>,
    pub summaries: BTreeMap<ProtocolId, AccountSummary>,
}

impl AssetCatalog {
    pub fn asset(&self, address: Address) -> Option<&CatalogAsset> {
        self.assets.iter().find(|a| a.address == address)
    }

    pub fn asset_by_symbol(&self, symbol: &str) -> Option<&CatalogAsset> {
        self.assets.iter().find(|a| a.symbol == symbol)
    }

    pub fn position(&self, protocol: ProtocolId, asset: Address) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.protocol == protocol && p.asset == asset)
    }

    /// Snapshot price, 1.0 for unknown assets.
    pub fn price(&self, address: Address) -> f64 {
        self.asset(address).map(|a| a.price).unwrap_or(1.0)
    }

    /// Snapshot decimals, 18 for unknown assets.
    pub fn decimals(&self, address: Address) -> u8 {
        self.asset(address).map(|a| a.decimals).unwrap_or(18)
    }

    pub fn native(&self) -> Option<&CatalogAsset> {
        self.asset(NATIVE_TOKEN)
    }

    /// Health factor per protocol; `None` means no debt.
    pub fn health_factors(&self) -> BTreeMap<ProtocolId, Option<f64>> {
        self.summaries
            .iter()
            .map(|(p, s)| (*p, s.health_factor))
            .collect()
    }
}

/// Gathers a catalog from the chain, the protocols and the price source.
pub struct CatalogBuilder {
    reader: Arc<dyn ChainReader>,
    adapters: Vec<Arc<dyn LendingProtocolAdapter>>,
    oracle: Arc<dyn PriceOracle>,
    retry: RetryPolicy,
}

impl CatalogBuilder {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        adapters: Vec<Arc<dyn LendingProtocolAdapter>>,
        oracle: Arc<dyn PriceOracle>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            reader,
            adapters,
            oracle,
            retry,
        }
    }

    /// Build the snapshot for `account`.
    ///
    /// Only the up-front connectivity check is fatal; every later read falls
    /// back to a default after its retries.
    #[instrument(skip(self), fields(account = %account))]
    pub async fn build(&self, account: Address) -> EngineResult<AssetCatalog> {
        let block = self
            .retry
            .run("block_number", || self.reader.block_number())
            .await
            .map_err(|e| EngineError::Connectivity(format!("{e:#}")))?;
        debug!(block, "Chain reachable");

        let mut protocols = Vec::with_capacity(self.adapters.len());
        let mut listings: Vec<(ProtocolId, Vec<MarketData>)> = Vec::new();
        let mut reserves: Vec<(ProtocolId, ReservePosition)> = Vec::new();
        let mut summaries = BTreeMap::new();

        for adapter in &self.adapters {
            let protocol = adapter.protocol();
            protocols.push(protocol);

            match self.retry.run("markets", || adapter.get_markets()).await {
                Ok(markets) => listings.push((protocol, markets)),
                Err(e) => {
                    warn!(protocol = %protocol, error = %e, "Market listing unavailable, treating as empty");
                    listings.push((protocol, Vec::new()));
                }
            }

            match self
                .retry
                .run("positions", || adapter.get_positions(account))
                .await
            {
                Ok(positions) => reserves.extend(positions.into_iter().map(|p| (protocol, p))),
                Err(e) => warn!(protocol = %protocol, error = %e, "Positions unavailable"),
            }

            match self
                .retry
                .run("account_summary", || adapter.get_account_summary(account))
                .await
            {
                Ok(summary) => {
                    summaries.insert(protocol, summary);
                }
                Err(e) => warn!(protocol = %protocol, error = %e, "Account summary unavailable"),
            }
        }

        let mut assets = self.collect_universe(&listings);

        let mut price_cache: HashMap<Address, f64> = HashMap::new();
        for asset in &mut assets {
            if asset.decimals == 0 {
                asset.decimals = self.resolve_decimals(asset.address).await;
            }

            // The native asset trades as its wrapper
            let price_token = if asset.is_native() { WHYPE } else { asset.address };
            let price_decimals = if asset.is_native() { NATIVE_DECIMALS } else { asset.decimals };
            asset.price = match price_cache.get(&price_token) {
                Some(p) => *p,
                None => {
                    let p = self
                        .retry
                        .run_or("price", 1.0, || self.oracle.price(price_token, price_decimals))
                        .await;
                    price_cache.insert(price_token, p);
                    p
                }
            };

            asset.wallet_raw = self.wallet_balance(asset.address, account).await;
            asset.wallet = to_human(asset.wallet_raw, asset.decimals);
        }

        let decimals: HashMap<Address, u8> = assets.iter().map(|a| (a.address, a.decimals)).collect();
        let positions = reserves
            .iter()
            .map(|(protocol, r)| {
                Position::from_reserve(*protocol, r, decimals.get(&r.asset).copied().unwrap_or(18))
            })
            .collect::<Vec<_>>();

        info!(
            assets = assets.len(),
            positions = positions.len(),
            protocols = protocols.len(),
            "Asset catalog built"
        );

        Ok(AssetCatalog {
            account,
            protocols,
            assets,
            positions,
            summaries,
        })
    }

    /// Market-listed assets in protocol order, then unlisted registry tokens.
    ///
    /// Decimals of 0 mark assets that still need an on-chain lookup.
    fn collect_universe(&self, listings: &[(ProtocolId, Vec<MarketData>)]) -> Vec<CatalogAsset> {
        let mut assets: Vec<CatalogAsset> = Vec::new();
        let mut seen: HashSet<Address> = HashSet::new();

        for (protocol, markets) in listings {
            for market in markets {
                if seen.insert(market.asset) {
                    let registry = assets::lookup(market.asset);
                    let decimals = if market.decimals > 0 {
                        market.decimals
                    } else {
                        registry.and_then(|t| t.decimals).unwrap_or(0)
                    };
                    // Registry symbols match the group tables; on-chain symbols may not
                    let symbol = registry
                        .map(|t| t.symbol.to_string())
                        .unwrap_or_else(|| market.symbol.clone());
                    assets.push(CatalogAsset {
                        address: market.asset,
                        symbol,
                        decimals,
                        price: 1.0,
                        wallet_raw: U256::ZERO,
                        wallet: 0.0,
                        markets: BTreeMap::new(),
                    });
                }
                if let Some(asset) = assets.iter_mut().find(|a| a.address == market.asset) {
                    asset.markets.insert(*protocol, ProtocolMarket::from(market));
                }
            }
        }

        for token in assets::REGISTRY {
            if seen.insert(token.address) {
                assets.push(CatalogAsset {
                    address: token.address,
                    symbol: token.symbol.to_string(),
                    decimals: token.decimals.unwrap_or(0),
                    price: 1.0,
                    wallet_raw: U256::ZERO,
                    wallet: 0.0,
                    markets: BTreeMap::new(),
                });
            }
        }

        debug_assert!(assets.iter().any(|a| a.address == NATIVE_TOKEN && a.symbol == NATIVE_SYMBOL));
        assets
    }

    async fn resolve_decimals(&self, token: Address) -> u8 {
        self.retry
            .run_or("decimals", 18, || self.reader.token_decimals(token))
            .await
    }

    async fn wallet_balance(&self, token: Address, account: Address) -> U256 {
        if token == NATIVE_TOKEN {
            self.retry
                .run_or("native_balance", U256::ZERO, || self.reader.native_balance(account))
                .await
        } else {
            self.retry
                .run_or("token_balance", U256::ZERO, || self.reader.token_balance(token, account))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> AssetCatalog {
        let reserve = ReservePosition {
            asset: WHYPE,
            supplied: U256::from(2_000_000_000_000_000_000u128),
            stable_debt: U256::ZERO,
            variable_debt: U256::from(500_000_000_000_000_000u128),
            collateral_enabled: true,
        };
        AssetCatalog {
            account: Address::ZERO,
            protocols: vec![ProtocolId::HyperLend],
            assets: vec![CatalogAsset {
                address: WHYPE,
                symbol: "WHYPE".into(),
                decimals: 18,
                price: 40.0,
                wallet_raw: U256::from(1_000_000_000_000_000_000u128),
                wallet: 1.0,
                markets: BTreeMap::new(),
            }],
            positions: vec![Position::from_reserve(ProtocolId::HyperLend, &reserve, 18)],
            summaries: BTreeMap::from([(
                ProtocolId::HyperLend,
                AccountSummary {
                    total_collateral: 80.0,
                    total_debt: 20.0,
                    health_factor: Some(3.4),
                },
            )]),
        }
    }

    #[test]
    fn test_position_human_amounts() {
        let catalog = sample_catalog();
        let pos = catalog.position(ProtocolId::HyperLend, WHYPE).unwrap();
        assert_eq!(pos.supplied, 2.0);
        assert_eq!(pos.debt, 0.5);
        assert_eq!(pos.debt_raw(), U256::from(500_000_000_000_000_000u128));
    }

    #[test]
    fn test_lookup_defaults() {
        let catalog = sample_catalog();
        assert_eq!(catalog.price(WHYPE), 40.0);
        assert_eq!(catalog.price(Address::repeat_byte(9)), 1.0);
        assert_eq!(catalog.decimals(Address::repeat_byte(9)), 18);
        assert_eq!(catalog.asset(WHYPE).unwrap().wallet_value(), 40.0);
        assert!(catalog.position(ProtocolId::HypurrFi, WHYPE).is_none());
    }

    #[test]
    fn test_health_factors() {
        let catalog = sample_catalog();
        assert_eq!(catalog.health_factors()[&ProtocolId::HyperLend], Some(3.4));
    }
}
