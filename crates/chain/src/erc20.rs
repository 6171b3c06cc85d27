//! ERC20 approval helper shared by the lending adapters and the swap path.

use crate::contracts::IERC20;
use crate::error::ChainResult;
use crate::provider::ProviderManager;
use crate::signer::TransactionSender;
use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolCall;
use tracing::{debug, info};

/// Approve `spender` for an unlimited amount if the current allowance is below `needed`.
///
/// Returns the approval hash when one was sent.
pub async fn ensure_allowance(
    provider: &ProviderManager,
    sender: &TransactionSender,
    token: Address,
    spender: Address,
    needed: U256,
) -> ChainResult<Option<B256>> {
    let current = provider.allowance(token, sender.address, spender).await?;
    if current >= needed {
        debug!(token = %token, spender = %spender, allowance = %current, "Allowance sufficient");
        return Ok(None);
    }

    info!(token = %token, spender = %spender, needed = %needed, "Approving spender");
    let calldata = IERC20::approveCall {
        spender,
        amount: U256::MAX,
    }
    .abi_encode();
    let tx_hash = sender
        .send_transaction(token, calldata.into(), U256::ZERO)
        .await?;
    Ok(Some(tx_hash))
}
