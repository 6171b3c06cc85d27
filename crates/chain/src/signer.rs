//! Transaction signing and submission.
//!
//! - Local nonce counter, resynced from chain after any failure
//! - Gas limit from `eth_estimateGas` plus headroom, with a fixed fallback
//! - Every send waits for the receipt and turns a failed status into [`ChainError::Reverted`]

use crate::error::{ChainError, ChainResult};
use crate::gas::{GasStrategy, LegacyGasStrategy};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Gas limit used when estimation fails.
const FALLBACK_GAS_LIMIT: u64 = 600_000;

/// Headroom over the estimate, in percent.
const GAS_HEADROOM_PCT: u64 = 15;

/// Locally tracked account nonce.
#[derive(Debug)]
pub struct NonceManager {
    next: AtomicU64,
}

impl NonceManager {
    pub fn new(initial_nonce: u64) -> Self {
        Self {
            next: AtomicU64::new(initial_nonce),
        }
    }

    /// Take the next nonce.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Overwrite with the chain's pending count.
    pub fn reset(&self, chain_nonce: u64) {
        self.next.store(chain_nonce, Ordering::SeqCst);
    }
}

/// Builder for [`TransactionSender`].
pub struct TransactionSenderBuilder {
    rpc_url: String,
    chain_id: u64,
    gas_strategy: Option<Box<dyn GasStrategy>>,
}

impl TransactionSenderBuilder {
    pub fn new(rpc_url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
            gas_strategy: None,
        }
    }

    pub fn gas_strategy(mut self, strategy: Box<dyn GasStrategy>) -> Self {
        self.gas_strategy = Some(strategy);
        self
    }

    /// Parse the key and fetch the starting nonce.
    pub async fn build(self, private_key: &str) -> Result<TransactionSender> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .trim_start_matches("0x")
            .parse()
            .context("PRIVATE_KEY is not a valid secp256k1 key")?;
        let address = signer.address();

        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        let initial_nonce = provider
            .get_transaction_count(address)
            .pending()
            .await
            .context("fetching initial nonce")?;

        let gas_strategy = self
            .gas_strategy
            .unwrap_or_else(|| Box::new(LegacyGasStrategy::default()));

        info!(
            address = %address,
            chain_id = self.chain_id,
            nonce = initial_nonce,
            gas_strategy = gas_strategy.strategy_name(),
            "Transaction sender ready"
        );

        Ok(TransactionSender {
            rpc_url: self.rpc_url,
            wallet: EthereumWallet::from(signer),
            address,
            chain_id: self.chain_id,
            nonce_manager: NonceManager::new(initial_nonce),
            gas_strategy,
        })
    }
}

/// Signs and submits transactions for the engine's single account.
pub struct TransactionSender {
    rpc_url: String,
    wallet: EthereumWallet,
    /// Signer address
    pub address: Address,
    chain_id: u64,
    nonce_manager: NonceManager,
    gas_strategy: Box<dyn GasStrategy>,
}

impl std::fmt::Debug for TransactionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSender")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("nonce", &self.nonce_manager.current())
            .finish_non_exhaustive()
    }
}

impl TransactionSender {
    /// Send a transaction and wait for its receipt.
    pub async fn send_transaction(&self, to: Address, calldata: Bytes, value: U256) -> ChainResult<B256> {
        let started = Instant::now();
        let gas = self.gas_strategy.fetch_params(&self.rpc_url).await?;
        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.parse().context("invalid RPC url")?);

        let nonce = self.nonce_manager.next();
        let mut tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(to)
            .with_input(calldata)
            .with_value(value)
            .with_nonce(nonce)
            .with_chain_id(self.chain_id);
        self.gas_strategy.apply_gas(&mut tx, &gas);

        let gas_limit = match provider.estimate_gas(tx.clone()).await {
            Ok(estimate) => estimate + estimate * GAS_HEADROOM_PCT / 100,
            Err(e) => {
                warn!(to = %to, error = %e, fallback = FALLBACK_GAS_LIMIT, "Gas estimation failed");
                FALLBACK_GAS_LIMIT
            }
        };
        tx.set_gas_limit(gas_limit);

        debug!(
            to = %to,
            nonce,
            gas_limit,
            gas_price_gwei = gas.gwei(),
            value = %value,
            "Sending transaction"
        );

        let pending = match provider.send_transaction(tx).await {
            Ok(pending) => pending,
            Err(e) => {
                self.sync_nonce().await;
                return Err(ChainError::rpc(e));
            }
        };
        let tx_hash = *pending.tx_hash();

        let receipt = match pending.get_receipt().await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.sync_nonce().await;
                return Err(ChainError::Rpc(
                    anyhow::Error::new(e).context(format!("waiting for receipt of {tx_hash}")),
                ));
            }
        };

        if receipt.status() {
            info!(
                tx_hash = %tx_hash,
                block = receipt.block_number.unwrap_or(0),
                gas_used = receipt.gas_used,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Transaction confirmed"
            );
            Ok(tx_hash)
        } else {
            warn!(tx_hash = %tx_hash, "Transaction reverted, syncing nonce");
            self.sync_nonce().await;
            Err(ChainError::Reverted { tx_hash })
        }
    }

    /// Reload the nonce from the node's pending count.
    pub async fn sync_nonce(&self) {
        let url = match self.rpc_url.parse() {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Cannot sync nonce, invalid RPC url");
                return;
            }
        };
        let provider = ProviderBuilder::new().on_http(url);
        match provider.get_transaction_count(self.address).pending().await {
            Ok(chain_nonce) => {
                self.nonce_manager.reset(chain_nonce);
                debug!(nonce = chain_nonce, "Nonce synced from chain");
            }
            Err(e) => warn!(error = %e, "Failed to sync nonce from chain"),
        }
    }
}
