//! LoopedHYPE conversion: native HYPE in, LHYPE vault shares out.

use crate::contracts::ILoopedHypeDeposit;
use crate::error::{ChainError, ChainResult};
use crate::provider::{ChainReader, ProviderManager};
use crate::signer::TransactionSender;
use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::info;

/// LoopedHYPE deposit contract on HyperEVM mainnet.
pub const LOOPED_HYPE_DEPOSIT: Address = address!("6e358dd1204c3fb1D24e569DF0899f48faBE5337");

/// LHYPE vault share token on HyperEVM mainnet.
pub const LOOPED_HYPE_VAULT: Address = address!("5748ae796AE46A4F1348a1693de4b50560485562");

/// Converts native balance into the looped-staking derivative.
#[async_trait]
pub trait LoopedStaking: Send + Sync + Debug {
    /// Deposit `amount` wei of native balance.
    async fn convert(&self, amount: U256) -> ChainResult<B256>;
}

/// `depositNative` client that keeps a native reserve behind for gas.
#[derive(Debug)]
pub struct LoopedHypeClient {
    deposit_contract: Address,
    /// Native wei that must remain after the deposit
    reserve: U256,
    provider: Arc<ProviderManager>,
    sender: Arc<TransactionSender>,
}

impl LoopedHypeClient {
    pub fn new(
        deposit_contract: Address,
        reserve: U256,
        provider: Arc<ProviderManager>,
        sender: Arc<TransactionSender>,
    ) -> Self {
        Self {
            deposit_contract,
            reserve,
            provider,
            sender,
        }
    }
}

#[async_trait]
impl LoopedStaking for LoopedHypeClient {
    async fn convert(&self, amount: U256) -> ChainResult<B256> {
        if amount.is_zero() {
            return Err(ChainError::precondition("nothing to convert"));
        }
        let balance = self.provider.native_balance(self.sender.address).await?;
        let required = amount.saturating_add(self.reserve);
        if balance < required {
            return Err(ChainError::precondition(format!(
                "not enough native balance: need {amount} + reserve {}, have {balance}",
                self.reserve
            )));
        }

        let calldata = ILoopedHypeDeposit::depositNativeCall {
            depositAmount: amount,
            minimumMint: U256::ZERO,
            to: self.sender.address,
            communityCode: Bytes::new(),
        }
        .abi_encode();

        let tx_hash = self
            .sender
            .send_transaction(self.deposit_contract, calldata.into(), amount)
            .await?;
        info!(amount = %amount, tx_hash = %tx_hash, "Converted native balance to LHYPE");
        Ok(tx_hash)
    }
}
