//! Current yield versus best candidate, with hysteresis.

use crate::catalog::AssetCatalog;
use crate::config::StrategyConfig;
use crate::groups::Group;
use crate::strategy::{self, StrategyCandidate};
use alloy::primitives::Address;
use hyperyield_chain::ProtocolId;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub group: Group,
    /// Blended APY of the live positions, percent
    pub current_apy: f64,
    /// Wallet plus supplied minus debt, USD
    pub current_equity: f64,
    pub best: StrategyCandidate,
    pub candidates: Vec<StrategyCandidate>,
    pub worth_switching: bool,
    /// Per-protocol health factor at decision time; `None` means no debt
    pub health_factors: BTreeMap<ProtocolId, Option<f64>>,
}

/// Blended APY (percent) and equity (USD) of a group's holdings.
pub fn current_position(members: &[Address], catalog: &AssetCatalog) -> (f64, f64) {
    let mut equity = 0.0;
    let mut net_yield = 0.0;

    for address in members {
        let Some(asset) = catalog.asset(*address) else { continue };
        equity += asset.wallet_value();

        for protocol in &catalog.protocols {
            let Some(position) = catalog.position(*protocol, *address) else { continue };
            let supplied_value = position.supplied * asset.price;
            let debt_value = position.debt * asset.price;
            equity += supplied_value - debt_value;

            if let Some(market) = asset.market(*protocol) {
                net_yield += market.supply_apy / 100.0 * supplied_value
                    - market.borrow_apy / 100.0 * debt_value;
            }
        }
    }

    let apy = if equity > 0.0 { net_yield / equity * 100.0 } else { 0.0 };
    (apy, equity)
}

/// Strict: an improvement exactly equal to the threshold does not switch.
pub fn worth_switching(best_apy: f64, current_apy: f64, threshold_pct: f64) -> bool {
    best_apy > current_apy + threshold_pct
}

/// Decide for one group. `None` when the group has no members.
pub fn decide(
    group: Group,
    members: &[Address],
    catalog: &AssetCatalog,
    config: &StrategyConfig,
) -> Option<Decision> {
    if members.is_empty() {
        return None;
    }
    let (current_apy, current_equity) = current_position(members, catalog);
    let candidates = strategy::enumerate(group, members, catalog, config);
    let best = strategy::select_best(&candidates)?.clone();

    Some(Decision {
        group,
        current_apy,
        current_equity,
        worth_switching: worth_switching(best.apy, current_apy, config.switch_threshold_pct),
        best,
        candidates,
        health_factors: catalog.health_factors(),
    })
}
