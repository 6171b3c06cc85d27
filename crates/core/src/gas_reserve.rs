//! Native gas floor maintenance.

use crate::action::Action;
use crate::assets::NATIVE_TOKEN;
use crate::catalog::AssetCatalog;
use crate::config::GasConfig;
use crate::groups::GAS_PRIORITY;
use alloy::primitives::{Address, U256};
use hyperyield_chain::u256_math::{from_human, to_human};
use hyperyield_chain::Amount;
use tracing::debug;

/// An asset that can be sold for gas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasSource {
    pub asset: Address,
    pub balance_raw: U256,
    pub decimals: u8,
    pub price: f64,
}

/// Priority sources present in the catalog, with snapshot balances.
pub fn gas_sources(catalog: &AssetCatalog) -> Vec<GasSource> {
    GAS_PRIORITY
        .iter()
        .filter_map(|symbol| catalog.asset_by_symbol(symbol))
        .map(|a| GasSource {
            asset: a.address,
            balance_raw: a.wallet_raw,
            decimals: a.decimals,
            price: a.price,
        })
        .collect()
}

/// At most one swap into native when the balance is under the floor.
///
/// Buys back up to the target plus a USD buffer, from the first priority
/// source holding anything. Nothing to sell is not an error.
pub fn plan_top_up(
    config: &GasConfig,
    native_balance: f64,
    native_price: f64,
    sources: &[GasSource],
) -> Option<Action> {
    if native_balance >= config.min_native {
        return None;
    }
    let native_price = if native_price > 0.0 { native_price } else { 1.0 };
    let needed = (config.target_native - native_balance) + config.usd_buffer / native_price;

    let source = sources.iter().find(|s| !s.balance_raw.is_zero())?;
    let source_price = if source.price > 0.0 { source.price } else { 1.0 };
    let balance = to_human(source.balance_raw, source.decimals);
    let amount_human = balance.min(needed * native_price / source_price);
    let amount = from_human(amount_human, source.decimals).min(source.balance_raw);
    if amount.is_zero() {
        return None;
    }

    debug!(
        native_balance,
        needed,
        source = %source.asset,
        amount = %amount,
        "Gas top-up required"
    );
    Some(Action::Swap {
        from: source.asset,
        to: NATIVE_TOKEN,
        amount: Amount::Exact(amount),
    })
}
