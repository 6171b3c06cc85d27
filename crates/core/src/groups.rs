//! Asset groups by static symbol membership.

use crate::catalog::AssetCatalog;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// Native HYPE and its liquid-staked wrappers
    Hype,
    Stable,
    Volatile,
}

const HYPE_SYMBOLS: &[&str] = &["HYPE", "WHYPE", "wstHYPE", "kHYPE", "LHYPE"];
const STABLE_SYMBOLS: &[&str] = &["USDe", "USD₮0", "sUSDe", "USDHL", "USR", "feUSD", "USDXL"];
const VOLATILE_SYMBOLS: &[&str] = &["UBTC", "UETH", "USOL"];

/// Assets sold for gas, most preferred first.
pub const GAS_PRIORITY: &[&str] = &["WHYPE", "wstHYPE", "kHYPE", "LHYPE"];

impl Group {
    pub const ALL: [Group; 3] = [Group::Hype, Group::Stable, Group::Volatile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Hype => "hype",
            Group::Stable => "stable",
            Group::Volatile => "volatile",
        }
    }

    pub fn symbols(&self) -> &'static [&'static str] {
        match self {
            Group::Hype => HYPE_SYMBOLS,
            Group::Stable => STABLE_SYMBOLS,
            Group::Volatile => VOLATILE_SYMBOLS,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group for a symbol, or `None` when it belongs to no table.
pub fn classify(symbol: &str) -> Option<Group> {
    Group::ALL.into_iter().find(|g| g.symbols().contains(&symbol))
}

/// Members of each non-empty group, in catalog order.
pub fn partition(catalog: &AssetCatalog) -> BTreeMap<Group, Vec<Address>> {
    let mut groups: BTreeMap<Group, Vec<Address>> = BTreeMap::new();
    for asset in &catalog.assets {
        if let Some(group) = classify(&asset.symbol) {
            groups.entry(group).or_default().push(asset.address);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("HYPE"), Some(Group::Hype));
        assert_eq!(classify("LHYPE"), Some(Group::Hype));
        assert_eq!(classify("USD₮0"), Some(Group::Stable));
        assert_eq!(classify("UBTC"), Some(Group::Volatile));
        assert_eq!(classify("PEPE"), None);
        // exact match only
        assert_eq!(classify("whype"), None);
    }

    #[test]
    fn test_tables_disjoint() {
        for a in Group::ALL {
            for b in Group::ALL {
                if a == b {
                    continue;
                }
                assert!(a.symbols().iter().all(|s| !b.symbols().contains(s)));
            }
        }
    }

    #[test]
    fn test_gas_priority_is_hype() {
        assert!(GAS_PRIORITY.iter().all(|s| classify(s) == Some(Group::Hype)));
    }

    #[test]
    fn test_group_serde() {
        assert_eq!(serde_json::to_string(&Group::Stable).unwrap(), "\"stable\"");
        let g: Group = serde_json::from_str("\"hype\"").unwrap();
        assert_eq!(g, Group::Hype);
    }
}
