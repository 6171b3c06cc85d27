//! Turns a chosen strategy into an ordered action list.
//!
//! A switch runs in three phases: unwind every position in the group,
//! consolidate the freed balances into the target asset, then enter the
//! new strategy. All amounts come from the run's snapshot; the executor
//! resolves `Full` amounts and clamps supplies and swaps against live
//! balances.

use crate::action::Action;
use crate::assets::NATIVE_TOKEN;
use crate::catalog::AssetCatalog;
use crate::config::EngineConfig;
use crate::strategy::{StrategyCandidate, StrategyKind};
use alloy::primitives::{Address, U256};
use hyperyield_chain::u256_math::{from_human, to_human};
use hyperyield_chain::Amount;
use std::collections::HashMap;
use tracing::debug;

/// Actions that move a group from its current holdings into `candidate`.
pub fn plan_switch(
    catalog: &AssetCatalog,
    members: &[Address],
    candidate: &StrategyCandidate,
    equity: f64,
    config: &EngineConfig,
) -> Vec<Action> {
    let mut actions = Vec::new();
    let withdrawn = unwind(catalog, members, &mut actions);

    let Some(target) = candidate.target_asset() else {
        return actions;
    };

    consolidate(catalog, members, target, &withdrawn, config, &mut actions);

    match candidate.kind {
        StrategyKind::Unleveraged | StrategyKind::Leveraged => {
            enter_lending(catalog, members, candidate, target, equity, config, &mut actions);
        }
        StrategyKind::Looped => actions.push(Action::ConvertLooped { amount: Amount::Full }),
        StrategyKind::Hold => {}
    }

    debug!(
        kind = ?candidate.kind,
        target = %target,
        actions = actions.len(),
        "Switch plan generated"
    );
    actions
}

/// Supply the idle wallet balance of an unleveraged winner.
pub fn plan_idle_deploy(catalog: &AssetCatalog, candidate: &StrategyCandidate) -> Option<Action> {
    if candidate.kind != StrategyKind::Unleveraged {
        return None;
    }
    let protocol = candidate.protocol?;
    let asset = catalog.asset(candidate.supply_asset?)?;
    if asset.wallet_raw.is_zero() {
        return None;
    }
    Some(Action::Supply {
        protocol,
        asset: asset.address,
        amount: Amount::Exact(asset.wallet_raw),
    })
}

/// Repay and withdraw everything; returns withdrawn raw amounts per asset.
fn unwind(catalog: &AssetCatalog, members: &[Address], actions: &mut Vec<Action>) -> HashMap<Address, U256> {
    let mut withdrawn: HashMap<Address, U256> = HashMap::new();
    for protocol in &catalog.protocols {
        for asset in members {
            let Some(position) = catalog.position(*protocol, *asset) else { continue };
            if !position.debt_raw().is_zero() {
                actions.push(Action::Repay {
                    protocol: *protocol,
                    asset: *asset,
                    amount: Amount::Full,
                });
            }
            if !position.supplied_raw.is_zero() {
                actions.push(Action::Withdraw {
                    protocol: *protocol,
                    asset: *asset,
                    amount: Amount::Full,
                });
                let entry = withdrawn.entry(*asset).or_insert(U256::ZERO);
                *entry = entry.saturating_add(position.supplied_raw);
            }
        }
    }
    withdrawn
}

fn consolidate(
    catalog: &AssetCatalog,
    members: &[Address],
    target: Address,
    withdrawn: &HashMap<Address, U256>,
    config: &EngineConfig,
    actions: &mut Vec<Action>,
) {
    for address in members {
        if *address == target {
            continue;
        }
        let Some(asset) = catalog.asset(*address) else { continue };

        // Native only contributes what sits above the gas target
        let wallet = if asset.is_native() {
            asset
                .wallet_raw
                .saturating_sub(from_human(config.gas.target_native, asset.decimals))
        } else {
            asset.wallet_raw
        };
        let amount = wallet.saturating_add(withdrawn.get(address).copied().unwrap_or(U256::ZERO));
        if amount.is_zero() {
            continue;
        }
        actions.push(Action::Swap {
            from: *address,
            to: target,
            amount: Amount::Exact(amount),
        });
    }
}

fn enter_lending(
    catalog: &AssetCatalog,
    members: &[Address],
    candidate: &StrategyCandidate,
    target: Address,
    equity: f64,
    config: &EngineConfig,
    actions: &mut Vec<Action>,
) {
    let Some(protocol) = candidate.protocol else { return };
    let target_price = catalog.price(target);
    let target_decimals = catalog.decimals(target);

    let deployable = (equity - retained_gas_value(catalog, members, config)).max(0.0);
    let total = from_human(deployable / target_price, target_decimals);
    if total.is_zero() {
        return;
    }
    actions.push(Action::Supply {
        protocol,
        asset: target,
        amount: Amount::Exact(total),
    });

    if candidate.kind != StrategyKind::Leveraged {
        return;
    }
    let Some(borrow) = candidate.borrow_asset else { return };
    let ltv = catalog
        .asset(target)
        .and_then(|a| a.market(protocol))
        .map(|m| m.ltv)
        .unwrap_or(0.0);
    let effective_ltv = config.strategy.safety_factor * ltv;
    let borrow_price = catalog.price(borrow);
    let borrow_decimals = catalog.decimals(borrow);

    let mut supplied_value = to_human(total, target_decimals) * target_price;
    for _ in 0..config.strategy.leverage_iterations {
        // Each pass borrows half the usable LTV
        let borrow_value = supplied_value * effective_ltv / 2.0;
        let borrow_amount = from_human(borrow_value / borrow_price, borrow_decimals);
        if borrow_amount.is_zero() {
            break;
        }
        actions.push(Action::Borrow {
            protocol,
            asset: borrow,
            amount: Amount::Exact(borrow_amount),
        });
        if borrow != target {
            actions.push(Action::Swap {
                from: borrow,
                to: target,
                amount: Amount::Exact(borrow_amount),
            });
        }
        actions.push(Action::Supply {
            protocol,
            asset: target,
            amount: Amount::Exact(from_human(borrow_value / target_price, target_decimals)),
        });
        supplied_value += borrow_value;
    }
}

/// USD value of the native balance kept back for gas.
fn retained_gas_value(catalog: &AssetCatalog, members: &[Address], config: &EngineConfig) -> f64 {
    if !members.contains(&NATIVE_TOKEN) {
        return 0.0;
    }
    catalog
        .native()
        .map(|n| n.wallet.min(config.gas.target_native) * n.price)
        .unwrap_or(0.0)
}
