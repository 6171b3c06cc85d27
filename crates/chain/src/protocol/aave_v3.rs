//! Aave v3 adapter, shared by HyperLend and HypurrFi.
//!
//! Reads go through the protocol data provider; writes go through the pool.
//! The two forks differ only in addresses and in the name of the supply
//! entrypoint (`supply` vs the older `deposit` alias).

use super::{AccountSummary, Amount, LendingProtocolAdapter, MarketData, ProtocolId, ReservePosition};
use crate::contracts::{IAavePool, IPoolDataProvider, STABLE_RATE_MODE, VARIABLE_RATE_MODE};
use crate::erc20::ensure_allowance;
use crate::error::{ChainError, ChainResult};
use crate::provider::{ChainReader, ProviderManager};
use crate::signer::TransactionSender;
use crate::u256_math::{bps_to_fraction, ray_to_percent, to_f64, wad_to_f64};
use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::providers::ProviderBuilder;
use alloy::sol_types::SolCall;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Aave base currency uses 8 decimals.
const BASE_CURRENCY_UNIT: f64 = 1e8;

/// Pool entrypoint used for supplying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyEntrypoint {
    #[default]
    Supply,
    Deposit,
}

/// Addresses and call options for one Aave v3 deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AaveV3AdapterConfig {
    pub protocol: ProtocolId,
    pub pool: Address,
    pub data_provider: Address,
    #[serde(default)]
    pub entrypoint: SupplyEntrypoint,
    #[serde(default)]
    pub referral_code: u16,
}

impl AaveV3AdapterConfig {
    /// HyperLend on HyperEVM mainnet.
    pub fn hyperlend() -> Self {
        Self {
            protocol: ProtocolId::HyperLend,
            pool: address!("00A89d7a5A02160f20150EbEA7a2b5E4879A1A8b"),
            data_provider: address!("5481bf8d3946E6A3168640c1D7523eB59F055a29"),
            entrypoint: SupplyEntrypoint::Supply,
            referral_code: 0,
        }
    }

    /// HypurrFi on HyperEVM mainnet.
    pub fn hypurrfi() -> Self {
        Self {
            protocol: ProtocolId::HypurrFi,
            pool: address!("ceCcE0EB9DD2Ef7996e01e25DD70e461F918A14b"),
            data_provider: address!("895C799a5bbdCb63B80bEE5BD94E7b9138D977d6"),
            entrypoint: SupplyEntrypoint::Deposit,
            referral_code: 0,
        }
    }

    /// Built-in deployment for a protocol.
    pub fn for_protocol(protocol: ProtocolId) -> Self {
        match protocol {
            ProtocolId::HyperLend => Self::hyperlend(),
            ProtocolId::HypurrFi => Self::hypurrfi(),
        }
    }
}

/// Reserve flags relevant to write preconditions.
#[derive(Debug, Clone, Copy)]
struct ReserveFlags {
    borrowing_enabled: bool,
    is_active: bool,
    is_frozen: bool,
}

/// Aave v3 lending adapter.
#[derive(Debug)]
pub struct AaveV3Adapter {
    config: AaveV3AdapterConfig,
    provider: Arc<ProviderManager>,
    /// Absent for read-only use
    sender: Option<Arc<TransactionSender>>,
}

impl AaveV3Adapter {
    pub fn new(config: AaveV3AdapterConfig, provider: Arc<ProviderManager>) -> Self {
        Self {
            config,
            provider,
            sender: None,
        }
    }

    pub fn with_sender(mut self, sender: Arc<TransactionSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn config(&self) -> &AaveV3AdapterConfig {
        &self.config
    }

    fn sender(&self) -> ChainResult<&TransactionSender> {
        self.sender
            .as_deref()
            .ok_or_else(|| ChainError::precondition(format!("{} adapter is read-only", self.config.protocol)))
    }

    async fn reserve_tokens(&self) -> ChainResult<Vec<(Address, String)>> {
        let provider = ProviderBuilder::new().on_http(self.provider.rpc_url().parse().context("invalid RPC url")?);
        let data_provider = IPoolDataProvider::new(self.config.data_provider, &provider);
        let tokens = data_provider
            .getAllReservesTokens()
            .call()
            .await
            .context("getAllReservesTokens")?
            ._0;
        Ok(tokens
            .into_iter()
            .map(|t| (t.tokenAddress, t.symbol))
            .collect())
    }

    async fn reserve_flags(&self, asset: Address) -> ChainResult<ReserveFlags> {
        let provider = ProviderBuilder::new().on_http(self.provider.rpc_url().parse().context("invalid RPC url")?);
        let data_provider = IPoolDataProvider::new(self.config.data_provider, &provider);
        let cfg = data_provider
            .getReserveConfigurationData(asset)
            .call()
            .await
            .with_context(|| format!("getReserveConfigurationData({asset})"))?;
        Ok(ReserveFlags {
            borrowing_enabled: cfg.borrowingEnabled,
            is_active: cfg.isActive,
            is_frozen: cfg.isFrozen,
        })
    }

    async fn market_for(&self, asset: Address, symbol: String) -> ChainResult<Option<MarketData>> {
        let provider = ProviderBuilder::new().on_http(self.provider.rpc_url().parse().context("invalid RPC url")?);
        let data_provider = IPoolDataProvider::new(self.config.data_provider, &provider);

        let cfg = data_provider
            .getReserveConfigurationData(asset)
            .call()
            .await
            .with_context(|| format!("getReserveConfigurationData({asset})"))?;
        if !cfg.isActive {
            debug!(protocol = %self.config.protocol, asset = %asset, "Skipping inactive reserve");
            return Ok(None);
        }
        let data = data_provider
            .getReserveData(asset)
            .call()
            .await
            .with_context(|| format!("getReserveData({asset})"))?;

        Ok(Some(MarketData {
            asset,
            symbol,
            decimals: cfg.decimals.saturating_to::<u8>(),
            supply_apy: ray_to_percent(data.liquidityRate),
            borrow_apy: ray_to_percent(data.variableBorrowRate),
            ltv: bps_to_fraction(cfg.ltv),
            liquidation_threshold: bps_to_fraction(cfg.liquidationThreshold),
            collateral_enabled: cfg.usageAsCollateralEnabled && !cfg.isFrozen,
            borrow_enabled: cfg.borrowingEnabled && !cfg.isFrozen,
        }))
    }

    async fn ensure_writable(&self, asset: Address, borrowing: bool) -> ChainResult<()> {
        let flags = self.reserve_flags(asset).await?;
        if !flags.is_active || flags.is_frozen {
            return Err(ChainError::precondition(format!(
                "{} reserve {asset} is inactive or frozen",
                self.config.protocol
            )));
        }
        if borrowing && !flags.borrowing_enabled {
            return Err(ChainError::precondition(format!(
                "borrowing {asset} is disabled on {}",
                self.config.protocol
            )));
        }
        Ok(())
    }

    async fn submit(&self, label: &str, asset: Address, calldata: Vec<u8>) -> ChainResult<B256> {
        let sender = self.sender()?;
        let tx_hash = sender
            .send_transaction(self.config.pool, Bytes::from(calldata), U256::ZERO)
            .await?;
        info!(
            protocol = %self.config.protocol,
            action = label,
            asset = %asset,
            tx_hash = %tx_hash,
            "Lending call confirmed"
        );
        Ok(tx_hash)
    }
}

#[async_trait]
impl LendingProtocolAdapter for AaveV3Adapter {
    fn protocol(&self) -> ProtocolId {
        self.config.protocol
    }

    #[instrument(skip(self), fields(protocol = %self.config.protocol))]
    async fn get_markets(&self) -> ChainResult<Vec<MarketData>> {
        let tokens = self.reserve_tokens().await?;
        let mut markets = Vec::with_capacity(tokens.len());
        for (asset, symbol) in tokens {
            match self.market_for(asset, symbol).await {
                Ok(Some(market)) => markets.push(market),
                Ok(None) => {}
                Err(e) => warn!(asset = %asset, error = %e, "Failed to read reserve, skipping"),
            }
        }
        debug!(count = markets.len(), "Markets fetched");
        Ok(markets)
    }

    #[instrument(skip(self), fields(protocol = %self.config.protocol))]
    async fn get_positions(&self, account: Address) -> ChainResult<Vec<ReservePosition>> {
        let tokens = self.reserve_tokens().await?;
        let mut positions = Vec::new();
        for (asset, _) in tokens {
            match self.get_position(account, asset).await {
                Ok(position) if !position.is_empty() => positions.push(position),
                Ok(_) => {}
                Err(e) => warn!(asset = %asset, error = %e, "Failed to read user reserve, skipping"),
            }
        }
        debug!(count = positions.len(), "Positions fetched");
        Ok(positions)
    }

    async fn get_position(&self, account: Address, asset: Address) -> ChainResult<ReservePosition> {
        let provider = ProviderBuilder::new().on_http(self.provider.rpc_url().parse().context("invalid RPC url")?);
        let data_provider = IPoolDataProvider::new(self.config.data_provider, &provider);
        let data = data_provider
            .getUserReserveData(asset, account)
            .call()
            .await
            .with_context(|| format!("getUserReserveData({asset}, {account})"))?;
        Ok(ReservePosition {
            asset,
            supplied: data.currentATokenBalance,
            stable_debt: data.currentStableDebt,
            variable_debt: data.currentVariableDebt,
            collateral_enabled: data.usageAsCollateralEnabled,
        })
    }

    async fn get_account_summary(&self, account: Address) -> ChainResult<AccountSummary> {
        let provider = ProviderBuilder::new().on_http(self.provider.rpc_url().parse().context("invalid RPC url")?);
        let pool = IAavePool::new(self.config.pool, &provider);
        let data = pool
            .getUserAccountData(account)
            .call()
            .await
            .with_context(|| format!("getUserAccountData({account})"))?;
        Ok(AccountSummary {
            total_collateral: to_f64(data.totalCollateralBase) / BASE_CURRENCY_UNIT,
            total_debt: to_f64(data.totalDebtBase) / BASE_CURRENCY_UNIT,
            health_factor: (!data.totalDebtBase.is_zero()).then(|| wad_to_f64(data.healthFactor)),
        })
    }

    async fn supply(&self, asset: Address, amount: Amount) -> ChainResult<B256> {
        let sender = self.sender()?;
        self.ensure_writable(asset, false).await?;

        let balance = self.provider.token_balance(asset, sender.address).await?;
        let value = amount.exact().unwrap_or(balance);
        if value.is_zero() {
            return Err(ChainError::precondition(format!("nothing to supply for {asset}")));
        }
        if balance < value {
            return Err(ChainError::precondition(format!(
                "insufficient balance to supply {asset}: have {balance}, need {value}"
            )));
        }

        ensure_allowance(&self.provider, sender, asset, self.config.pool, value).await?;
        let calldata = match self.config.entrypoint {
            SupplyEntrypoint::Supply => IAavePool::supplyCall {
                asset,
                amount: value,
                onBehalfOf: sender.address,
                referralCode: self.config.referral_code,
            }
            .abi_encode(),
            SupplyEntrypoint::Deposit => IAavePool::depositCall {
                asset,
                amount: value,
                onBehalfOf: sender.address,
                referralCode: self.config.referral_code,
            }
            .abi_encode(),
        };
        self.submit("supply", asset, calldata).await
    }

    async fn withdraw(&self, asset: Address, amount: Amount) -> ChainResult<B256> {
        let sender = self.sender()?;
        let calldata = IAavePool::withdrawCall {
            asset,
            amount: amount.to_call_amount(),
            to: sender.address,
        }
        .abi_encode();
        self.submit("withdraw", asset, calldata).await
    }

    async fn borrow(&self, asset: Address, amount: Amount) -> ChainResult<B256> {
        let sender = self.sender()?;
        let value = amount
            .exact()
            .ok_or_else(|| ChainError::precondition("borrow needs an explicit amount"))?;
        self.ensure_writable(asset, true).await?;

        let calldata = IAavePool::borrowCall {
            asset,
            amount: value,
            interestRateMode: U256::from(VARIABLE_RATE_MODE),
            referralCode: self.config.referral_code,
            onBehalfOf: sender.address,
        }
        .abi_encode();
        self.submit("borrow", asset, calldata).await
    }

    async fn repay(&self, asset: Address, amount: Amount) -> ChainResult<B256> {
        let sender = self.sender()?;
        let position = self.get_position(sender.address, asset).await?;
        let legs = repay_legs(&position, amount);
        if legs.is_empty() {
            return Err(ChainError::precondition(format!("no {asset} debt to repay")));
        }

        let debt = position.total_debt();
        let needed = amount.exact().map_or(debt, |value| value.min(debt));
        if amount.exact().is_some() {
            let balance = self.provider.token_balance(asset, sender.address).await?;
            if balance < needed {
                return Err(ChainError::precondition(format!(
                    "insufficient balance to repay {asset}: have {balance}, need {needed}"
                )));
            }
        }

        ensure_allowance(&self.provider, sender, asset, self.config.pool, needed).await?;
        let mut tx_hash = B256::ZERO;
        for (mode, leg) in legs {
            let calldata = IAavePool::repayCall {
                asset,
                amount: leg.to_call_amount(),
                interestRateMode: U256::from(mode),
                onBehalfOf: sender.address,
            }
            .abi_encode();
            tx_hash = self.submit("repay", asset, calldata).await?;
        }
        Ok(tx_hash)
    }
}

/// Split a repayment across rate modes, variable debt first.
fn repay_legs(position: &ReservePosition, amount: Amount) -> Vec<(u64, Amount)> {
    let debts = [
        (VARIABLE_RATE_MODE, position.variable_debt),
        (STABLE_RATE_MODE, position.stable_debt),
    ];
    let mut legs = Vec::new();
    match amount {
        Amount::Full => {
            for (mode, debt) in debts {
                if !debt.is_zero() {
                    legs.push((mode, Amount::Full));
                }
            }
        }
        Amount::Exact(mut remaining) => {
            for (mode, debt) in debts {
                let part = remaining.min(debt);
                if part.is_zero() {
                    continue;
                }
                legs.push((mode, Amount::Exact(part)));
                remaining -= part;
            }
        }
    }
    legs
}
