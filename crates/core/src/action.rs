//! Executable plan steps.

use alloy::primitives::Address;
use hyperyield_chain::{Amount, ProtocolId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Repay {
        protocol: ProtocolId,
        asset: Address,
        amount: Amount,
    },
    Withdraw {
        protocol: ProtocolId,
        asset: Address,
        amount: Amount,
    },
    Swap {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Supply {
        protocol: ProtocolId,
        asset: Address,
        amount: Amount,
    },
    Borrow {
        protocol: ProtocolId,
        asset: Address,
        amount: Amount,
    },
    ConvertLooped {
        amount: Amount,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Repay { .. } => "repay",
            Action::Withdraw { .. } => "withdraw",
            Action::Swap { .. } => "swap",
            Action::Supply { .. } => "supply",
            Action::Borrow { .. } => "borrow",
            Action::ConvertLooped { .. } => "convert_looped",
        }
    }

    /// Repay and withdraw release capital; everything else deploys it.
    pub fn is_unwind(&self) -> bool {
        matches!(self, Action::Repay { .. } | Action::Withdraw { .. })
    }

    pub fn amount(&self) -> Amount {
        match self {
            Action::Repay { amount, .. }
            | Action::Withdraw { amount, .. }
            | Action::Swap { amount, .. }
            | Action::Supply { amount, .. }
            | Action::Borrow { amount, .. }
            | Action::ConvertLooped { amount } => *amount,
        }
    }
}
