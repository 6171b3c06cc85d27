//! Gas pricing for outgoing transactions.
//!
//! HyperEVM prices transactions with a single legacy `gasPrice`; the trait
//! stays as the seam so a fee-market strategy can be dropped in later.

mod legacy;

pub use legacy::LegacyGasStrategy;

use alloy::rpc::types::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// Gas price snapshot applied to one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasParams {
    /// Gas price in wei
    pub gas_price: u128,
}

impl GasParams {
    /// Gas price in gwei, for logging.
    pub fn gwei(&self) -> f64 {
        self.gas_price as f64 / 1e9
    }
}

/// Source of gas pricing for the transaction sender.
#[async_trait]
pub trait GasStrategy: Send + Sync + Debug {
    /// Query current pricing from the node.
    async fn fetch_params(&self, rpc_url: &str) -> Result<GasParams>;

    /// Write pricing fields into the request.
    fn apply_gas(&self, tx: &mut TransactionRequest, params: &GasParams);

    fn strategy_name(&self) -> &'static str;
}
