//! Error type for chain reads and writes.

use alloy::primitives::B256;
use thiserror::Error;

/// Failure of a chain interaction.
///
/// Callers branch on the variant: a precondition is a domain refusal raised
/// before anything is submitted, a revert means the transaction was mined
/// and failed, and everything else is infrastructure.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Refused before submission (disabled reserve flag, insufficient balance, read-only adapter).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Mined but reverted.
    #[error("transaction reverted: {tx_hash}")]
    Reverted { tx_hash: B256 },

    /// Transport, encoding or RPC failure.
    #[error(transparent)]
    Rpc(#[from] anyhow::Error),
}

impl ChainError {
    /// Wrap any transport or contract error.
    pub fn rpc(err: impl Into<anyhow::Error>) -> Self {
        Self::Rpc(err.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }
}

pub type ChainResult<T> = std::result::Result<T, ChainError>;
