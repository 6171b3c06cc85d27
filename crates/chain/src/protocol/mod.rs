//! Lending protocol abstraction.
//!
//! Every supported protocol implements [`LendingProtocolAdapter`], so the
//! engine reads markets and positions and sends lending calls without
//! knowing which fork it talks to.
//!
//! # Example
//!
//! ```rust,ignore
//! use hyperyield_chain::protocol::{AaveV3Adapter, AaveV3AdapterConfig, Amount, LendingProtocolAdapter};
//!
//! let adapter = AaveV3Adapter::new(AaveV3AdapterConfig::hyperlend(), provider).with_sender(sender);
//! let markets = adapter.get_markets().await?;
//! adapter.withdraw(asset, Amount::Full).await?;
//! ```

mod aave_v3;

pub use aave_v3::{AaveV3Adapter, AaveV3AdapterConfig, SupplyEntrypoint};

use crate::error::ChainResult;
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};

/// Lending protocols the engine allocates across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolId {
    HyperLend,
    HypurrFi,
}

impl ProtocolId {
    /// Enumeration order; candidate ordering depends on it.
    pub const ALL: [ProtocolId; 2] = [ProtocolId::HyperLend, ProtocolId::HypurrFi];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolId::HyperLend => "hyperlend",
            ProtocolId::HypurrFi => "hypurrfi",
        }
    }

    /// Parse from config strings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hyperlend" | "lend" => Some(Self::HyperLend),
            "hypurrfi" | "fi" => Some(Self::HypurrFi),
            _ => None,
        }
    }
}

impl Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount argument for lending calls and swaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Amount {
    /// Explicit base-unit amount
    Exact(U256),
    /// Resolve to the whole balance (or debt) when executed
    Full,
}

impl Amount {
    /// Value passed to Aave entrypoints, where `uint256.max` means "all".
    pub fn to_call_amount(self) -> U256 {
        match self {
            Amount::Exact(value) => value,
            Amount::Full => U256::MAX,
        }
    }

    pub fn exact(&self) -> Option<U256> {
        match self {
            Amount::Exact(value) => Some(*value),
            Amount::Full => None,
        }
    }
}

/// Market terms for one reserve, as listed by a protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub asset: Address,
    pub symbol: String,
    pub decimals: u8,
    /// Supply APY in percent
    pub supply_apy: f64,
    /// Variable borrow APY in percent
    pub borrow_apy: f64,
    /// Max loan-to-value as a fraction
    pub ltv: f64,
    /// Liquidation threshold as a fraction
    pub liquidation_threshold: f64,
    pub collateral_enabled: bool,
    pub borrow_enabled: bool,
}

/// One account's position in one reserve, raw base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReservePosition {
    pub asset: Address,
    pub supplied: U256,
    pub stable_debt: U256,
    pub variable_debt: U256,
    pub collateral_enabled: bool,
}

impl ReservePosition {
    pub fn total_debt(&self) -> U256 {
        self.stable_debt.saturating_add(self.variable_debt)
    }

    pub fn is_empty(&self) -> bool {
        self.supplied.is_zero() && self.total_debt().is_zero()
    }
}

/// Account-level aggregates reported by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Collateral in the pool's base currency
    pub total_collateral: f64,
    /// Debt in the pool's base currency
    pub total_debt: f64,
    /// `None` when the account has no debt
    pub health_factor: Option<f64>,
}

/// Unified interface over lending protocols.
///
/// Reads take the account explicitly; writes act for the adapter's signer.
/// Writes return the confirmed transaction hash, a precondition error when
/// the reserve flags or wallet balance rule the call out, or a revert.
#[async_trait]
pub trait LendingProtocolAdapter: Send + Sync + Debug {
    fn protocol(&self) -> ProtocolId;

    /// All active reserves with their current terms.
    async fn get_markets(&self) -> ChainResult<Vec<MarketData>>;

    /// Every non-empty reserve position held by `account`.
    async fn get_positions(&self, account: Address) -> ChainResult<Vec<ReservePosition>>;

    /// Fresh position in a single reserve.
    async fn get_position(&self, account: Address, asset: Address) -> ChainResult<ReservePosition>;

    async fn get_account_summary(&self, account: Address) -> ChainResult<AccountSummary>;

    async fn supply(&self, asset: Address, amount: Amount) -> ChainResult<B256>;

    async fn withdraw(&self, asset: Address, amount: Amount) -> ChainResult<B256>;

    async fn borrow(&self, asset: Address, amount: Amount) -> ChainResult<B256>;

    async fn repay(&self, asset: Address, amount: Amount) -> ChainResult<B256>;
}
