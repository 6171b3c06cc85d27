//! Engine error taxonomy.

use hyperyield_chain::ChainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error class recorded in the action log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataFetch,
    Connectivity,
    Precondition,
    Execution,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// A read failed after retries; callers usually fall back to a default.
    #[error("data fetch failed: {0}")]
    DataFetch(String),

    /// The chain is unreachable; the run cannot proceed.
    #[error("connectivity check failed: {0}")]
    Connectivity(String),

    /// Disabled reserve flag, short balance, flagged quote, or nothing to do.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A mutating call reverted or its RPC failed.
    #[error("execution failed: {0}")]
    Execution(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DataFetch(_) => ErrorKind::DataFetch,
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Execution(_) => ErrorKind::Execution,
        }
    }

    /// Aborts the run before any decisioning.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::DataFetch(m) | Self::Connectivity(m) | Self::Precondition(m) | Self::Execution(m) => m,
        }
    }

    pub(crate) fn data_fetch(e: impl std::fmt::Display) -> Self {
        Self::DataFetch(e.to_string())
    }
}

impl From<ChainError> for EngineError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Precondition(msg) => Self::Precondition(msg),
            ChainError::Reverted { tx_hash } => Self::Execution(format!("transaction {tx_hash} reverted")),
            ChainError::Rpc(e) => Self::Execution(format!("{e:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;

    #[test]
    fn test_chain_error_mapping() {
        let e: EngineError = ChainError::precondition("reserve frozen").into();
        assert_eq!(e.kind(), ErrorKind::Precondition);
        assert_eq!(e.message(), "reserve frozen");

        let e: EngineError = ChainError::Reverted { tx_hash: B256::ZERO }.into();
        assert_eq!(e.kind(), ErrorKind::Execution);
        assert!(e.message().contains("reverted"));

        let e: EngineError = ChainError::rpc(anyhow::anyhow!("timeout")).into();
        assert_eq!(e.kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_only_connectivity_is_fatal() {
        assert!(EngineError::Connectivity("down".into()).is_fatal());
        assert!(!EngineError::DataFetch("x".into()).is_fatal());
        assert!(!EngineError::Execution("x".into()).is_fatal());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::DataFetch).unwrap();
        assert_eq!(json, "\"data_fetch\"");
    }
}
