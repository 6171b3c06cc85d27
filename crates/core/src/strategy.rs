//! Candidate strategies for a group.

use crate::assets::NATIVE_TOKEN;
use crate::catalog::{AssetCatalog, CatalogAsset};
use crate::config::StrategyConfig;
use crate::groups::Group;
use alloy::primitives::Address;
use hyperyield_chain::ProtocolId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Unleveraged,
    Leveraged,
    Hold,
    Looped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyCandidate {
    pub kind: StrategyKind,
    pub protocol: Option<ProtocolId>,
    pub supply_asset: Option<Address>,
    pub borrow_asset: Option<Address>,
    /// Projected APY in percent
    pub apy: f64,
    /// Estimated health factor; `None` when unbounded
    pub health: Option<f64>,
}

impl StrategyCandidate {
    pub fn hold() -> Self {
        Self {
            kind: StrategyKind::Hold,
            protocol: None,
            supply_asset: None,
            borrow_asset: None,
            apy: 0.0,
            health: None,
        }
    }

    /// Asset the group is consolidated into; `None` for hold.
    pub fn target_asset(&self) -> Option<Address> {
        match self.kind {
            StrategyKind::Hold => None,
            StrategyKind::Looped => Some(NATIVE_TOKEN),
            StrategyKind::Unleveraged | StrategyKind::Leveraged => self.supply_asset,
        }
    }
}

/// Single-period carry of a loop at `effective_ltv`, floored at zero.
pub fn leveraged_apy(supply_apy: f64, borrow_apy: f64, effective_ltv: f64) -> f64 {
    ((supply_apy - borrow_apy * effective_ltv) / (1.0 - effective_ltv)).max(0.0)
}

/// Every admissible candidate for the group, in a fixed order:
/// unleveraged, leveraged, hold, then looped staking for the hype group.
pub fn enumerate(
    group: Group,
    members: &[Address],
    catalog: &AssetCatalog,
    config: &StrategyConfig,
) -> Vec<StrategyCandidate> {
    let assets: Vec<&CatalogAsset> = members.iter().filter_map(|a| catalog.asset(*a)).collect();
    let mut candidates = Vec::new();

    for protocol in &catalog.protocols {
        for asset in &assets {
            if let Some(market) = asset.market(*protocol) {
                candidates.push(StrategyCandidate {
                    kind: StrategyKind::Unleveraged,
                    protocol: Some(*protocol),
                    supply_asset: Some(asset.address),
                    borrow_asset: None,
                    apy: market.supply_apy,
                    health: None,
                });
            }
        }
    }

    for protocol in &catalog.protocols {
        for supply in &assets {
            let Some(s) = supply.market(*protocol) else { continue };
            if !s.collateral_enabled {
                continue;
            }
            for borrow in &assets {
                let Some(b) = borrow.market(*protocol) else { continue };
                if !b.borrow_enabled {
                    continue;
                }
                let effective_ltv = config.safety_factor * s.ltv;
                if effective_ltv <= 0.0 || effective_ltv >= 1.0 {
                    continue;
                }
                let health = s.liquidation_threshold / effective_ltv;
                if health < config.min_health {
                    continue;
                }
                candidates.push(StrategyCandidate {
                    kind: StrategyKind::Leveraged,
                    protocol: Some(*protocol),
                    supply_asset: Some(supply.address),
                    borrow_asset: Some(borrow.address),
                    apy: leveraged_apy(s.supply_apy, b.borrow_apy, effective_ltv),
                    health: Some(health),
                });
            }
        }
    }

    candidates.push(StrategyCandidate::hold());

    if group == Group::Hype {
        candidates.push(StrategyCandidate {
            kind: StrategyKind::Looped,
            protocol: None,
            supply_asset: Some(NATIVE_TOKEN),
            borrow_asset: None,
            apy: config.looped_apy_pct,
            health: None,
        });
    }

    candidates
}

/// Highest APY; the earliest candidate wins ties.
pub fn select_best(candidates: &[StrategyCandidate]) -> Option<&StrategyCandidate> {
    candidates
        .iter()
        .fold(None, |best: Option<&StrategyCandidate>, c| match best {
            Some(b) if b.apy >= c.apy => Some(b),
            _ => Some(c),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProtocolMarket;
    use alloy::primitives::U256;
    use std::collections::BTreeMap;

    fn asset(symbol: &str, byte: u8, markets: Vec<(ProtocolId, ProtocolMarket)>) -> CatalogAsset {
        CatalogAsset {
            address: Address::repeat_byte(byte),
            symbol: symbol.into(),
            decimals: 18,
            price: 1.0,
            wallet_raw: U256::ZERO,
            wallet: 0.0,
            markets: markets.into_iter().collect(),
        }
    }

    fn market(supply: f64, borrow: f64, ltv: f64, lt: f64) -> ProtocolMarket {
        ProtocolMarket {
            supply_apy: supply,
            borrow_apy: borrow,
            ltv,
            liquidation_threshold: lt,
            collateral_enabled: true,
            borrow_enabled: true,
        }
    }

    fn catalog(assets: Vec<CatalogAsset>) -> AssetCatalog {
        AssetCatalog {
            account: Address::ZERO,
            protocols: vec![ProtocolId::HyperLend, ProtocolId::HypurrFi],
            assets,
            positions: vec![],
            summaries: BTreeMap::new(),
        }
    }

    #[test]
    fn test_leveraged_apy_formula() {
        // (5 - 3*0.5) / 0.5 = 7
        assert!((leveraged_apy(5.0, 3.0, 0.5) - 7.0).abs() < 1e-12);
        // negative carry floors at zero
        assert_eq!(leveraged_apy(1.0, 10.0, 0.5), 0.0);
    }

    #[test]
    fn test_low_health_loop_excluded() {
        // eff 0.64, health 0.825 / 0.64 = 1.289 < 1.6
        let usde = asset("USDe", 1, vec![(ProtocolId::HyperLend, market(5.0, 3.0, 0.8, 0.825))]);
        let cat = catalog(vec![usde]);
        let members = vec![Address::repeat_byte(1)];
        let candidates = enumerate(Group::Stable, &members, &cat, &StrategyConfig::default());

        assert!(candidates.iter().all(|c| c.kind != StrategyKind::Leveraged));
        assert_eq!(candidates.len(), 2); // unleveraged + hold
    }

    #[test]
    fn test_admitted_loops_respect_min_health() {
        let a = asset(
            "USDe",
            1,
            vec![
                (ProtocolId::HyperLend, market(5.0, 2.0, 0.5, 0.9)),
                (ProtocolId::HypurrFi, market(4.0, 1.0, 0.7, 0.75)),
            ],
        );
        let b = asset("sUSDe", 2, vec![(ProtocolId::HyperLend, market(8.0, 4.0, 0.6, 0.8))]);
        let cat = catalog(vec![a, b]);
        let members = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let config = StrategyConfig::default();
        let candidates = enumerate(Group::Stable, &members, &cat, &config);

        let loops: Vec<_> = candidates
            .iter()
            .filter(|c| c.kind == StrategyKind::Leveraged)
            .collect();
        assert!(!loops.is_empty());
        for c in loops {
            assert!(c.health.unwrap() >= config.min_health);
        }
    }

    #[test]
    fn test_enumeration_order_and_looped_only_for_hype() {
        let whype = asset("WHYPE", 5, vec![(ProtocolId::HyperLend, market(2.0, 1.0, 0.0, 0.0))]);
        let cat = catalog(vec![whype]);
        let members = vec![Address::repeat_byte(5)];
        let config = StrategyConfig::default();

        let hype = enumerate(Group::Hype, &members, &cat, &config);
        let kinds: Vec<_> = hype.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![StrategyKind::Unleveraged, StrategyKind::Hold, StrategyKind::Looped]
        );
        assert_eq!(hype[2].target_asset(), Some(NATIVE_TOKEN));

        let stable = enumerate(Group::Stable, &members, &cat, &config);
        assert!(stable.iter().all(|c| c.kind != StrategyKind::Looped));
    }

    #[test]
    fn test_select_best_first_max_wins() {
        let mut a = StrategyCandidate::hold();
        a.kind = StrategyKind::Unleveraged;
        a.apy = 5.0;
        a.protocol = Some(ProtocolId::HyperLend);
        let mut b = a.clone();
        b.protocol = Some(ProtocolId::HypurrFi);
        let candidates = vec![StrategyCandidate::hold(), a, b];

        let best = select_best(&candidates).unwrap();
        assert_eq!(best.protocol, Some(ProtocolId::HyperLend));
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_enumeration_is_deterministic() {
        let a = asset("USDe", 1, vec![(ProtocolId::HyperLend, market(5.0, 2.0, 0.5, 0.9))]);
        let cat = catalog(vec![a]);
        let members = vec![Address::repeat_byte(1)];
        let config = StrategyConfig::default();
        assert_eq!(
            enumerate(Group::Stable, &members, &cat, &config),
            enumerate(Group::Stable, &members, &cat, &config)
        );
    }
}
