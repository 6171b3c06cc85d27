//! Swap routing seam and its GlueX implementation.

use crate::error::{EngineError, EngineResult};
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use hyperyield_api::{GlueXClient, SwapQuote};
use hyperyield_chain::{ensure_allowance, ProviderManager, TransactionSender};
use std::sync::Arc;
use tracing::{info, instrument};

/// Quotes and executes token swaps for the engine's account.
#[async_trait]
pub trait SwapCollaborator: Send + Sync {
    async fn quote(
        &self,
        from: Address,
        to: Address,
        amount: U256,
        account: Address,
    ) -> EngineResult<SwapQuote>;

    async fn execute(&self, quote: &SwapQuote, account: Address) -> EngineResult<B256>;
}

/// GlueX router quotes sent through the account's own signer.
#[derive(Debug)]
pub struct GlueXSwapper {
    client: GlueXClient,
    provider: Arc<ProviderManager>,
    sender: Arc<TransactionSender>,
}

impl GlueXSwapper {
    pub fn new(client: GlueXClient, provider: Arc<ProviderManager>, sender: Arc<TransactionSender>) -> Self {
        Self {
            client,
            provider,
            sender,
        }
    }
}

#[async_trait]
impl SwapCollaborator for GlueXSwapper {
    async fn quote(
        &self,
        from: Address,
        to: Address,
        amount: U256,
        account: Address,
    ) -> EngineResult<SwapQuote> {
        self.client
            .quote(from, to, amount, account)
            .await
            .map_err(|e| EngineError::Execution(format!("swap quote failed: {e:#}")))
    }

    #[instrument(skip(self, quote), fields(router = %quote.router, input = %quote.input_token))]
    async fn execute(&self, quote: &SwapQuote, account: Address) -> EngineResult<B256> {
        if account != self.sender.address {
            return Err(EngineError::Precondition(format!(
                "swap for {account} but signer is {}",
                self.sender.address
            )));
        }

        if !quote.native_input {
            ensure_allowance(
                &self.provider,
                &self.sender,
                quote.input_token,
                quote.router,
                quote.input_amount,
            )
            .await?;
        }

        let tx_hash = self
            .sender
            .send_transaction(quote.router, quote.calldata.clone(), quote.tx_value())
            .await?;
        info!(
            tx_hash = %tx_hash,
            amount_in = %quote.input_amount,
            min_out = %quote.min_output_amount,
            "Swap executed"
        );
        Ok(tx_hash)
    }
}
