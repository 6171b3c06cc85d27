//! HyperEVM chain interaction layer.
//!
//! This crate provides:
//! - Read access to balances, decimals and block height
//! - Contract interfaces for Aave v3 pools, data providers, ERC20 and LoopedHYPE
//! - The `LendingProtocolAdapter` trait and its Aave v3 implementation
//! - Transaction signing and sending with legacy gas pricing
//! - Bounded retry for read-only lookups

pub mod contracts;
mod erc20;
mod error;
pub mod gas;
mod looped;
pub mod protocol;
mod provider;
pub mod retry;
mod signer;
pub mod u256_math;

pub use erc20::ensure_allowance;
pub use error::{ChainError, ChainResult};
pub use looped::{LoopedHypeClient, LoopedStaking, LOOPED_HYPE_DEPOSIT, LOOPED_HYPE_VAULT};
pub use protocol::{
    AaveV3Adapter, AaveV3AdapterConfig, AccountSummary, Amount, LendingProtocolAdapter, MarketData,
    ProtocolId, ReservePosition, SupplyEntrypoint,
};
pub use provider::{ChainReader, ProviderManager};
pub use retry::RetryPolicy;
pub use signer::{NonceManager, TransactionSender, TransactionSenderBuilder};
