//! Static token registry for HyperEVM.
//!
//! Lending markets only list what they support; the registry adds the
//! native gas asset and the wrappers (LHYPE, kHYPE, ...) that no market
//! lists but the engine still has to see in the wallet.

use alloy::primitives::{address, Address};

/// Sentinel address for the native gas asset.
pub const NATIVE_TOKEN: Address = address!("2222222222222222222222222222222222222222");

/// Wrapped HYPE. Also the price source for the native asset.
pub const WHYPE: Address = address!("5555555555555555555555555555555555555555");

pub const NATIVE_SYMBOL: &str = "HYPE";
pub const NATIVE_DECIMALS: u8 = 18;

/// Registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: &'static str,
    pub address: Address,
    /// Known decimals; `None` means ask the chain
    pub decimals: Option<u8>,
}

impl TokenInfo {
    const fn new(symbol: &'static str, address: Address, decimals: Option<u8>) -> Self {
        Self {
            symbol,
            address,
            decimals,
        }
    }
}

// ============================================================================
// HyperEVM tokens
// ============================================================================

pub const HYPE: TokenInfo = TokenInfo::new(NATIVE_SYMBOL, NATIVE_TOKEN, Some(NATIVE_DECIMALS));
pub const WHYPE_TOKEN: TokenInfo = TokenInfo::new("WHYPE", WHYPE, Some(18));
pub const KHYPE: TokenInfo = TokenInfo::new(
    "kHYPE",
    address!("fD739d4e423301CE9385c1fb8850539D657C296D"),
    Some(18),
);
pub const WSTHYPE: TokenInfo = TokenInfo::new(
    "wstHYPE",
    address!("94e8396e0869c9F2200760aF0621aFd240E1CF38"),
    Some(18),
);
pub const LHYPE: TokenInfo = TokenInfo::new(
    "LHYPE",
    address!("5748ae796AE46A4F1348a1693de4b50560485562"),
    Some(18),
);
pub const USDE: TokenInfo = TokenInfo::new(
    "USDe",
    address!("5d3a1Ff2b6BAb83b63cd9AD0787074081a52ef34"),
    Some(18),
);
pub const USDT0: TokenInfo = TokenInfo::new(
    "USD₮0",
    address!("B8CE59FC3717ada4C02eaDF9682A9e934F625ebb"),
    Some(6),
);
pub const USDHL: TokenInfo = TokenInfo::new(
    "USDHL",
    address!("b50A96253aBDF803D85efcDce07Ad8becBc52BD5"),
    None,
);
pub const SUSDE: TokenInfo = TokenInfo::new(
    "sUSDe",
    address!("211Cc4DD073734dA055fbF44a2b4667d5E5fE5d2"),
    Some(18),
);
pub const FEUSD: TokenInfo = TokenInfo::new(
    "feUSD",
    address!("02c6a2fA58cC01A18B8D9E00eA48d65E4dF26c70"),
    None,
);
pub const UBTC: TokenInfo = TokenInfo::new(
    "UBTC",
    address!("9FDBdA0A5e284c32744D2f17Ee5c74B284993463"),
    None,
);
pub const UETH: TokenInfo = TokenInfo::new(
    "UETH",
    address!("Be6727B535545C67d5cAa73dEa54865B92CF7907"),
    None,
);
pub const USOL: TokenInfo = TokenInfo::new(
    "USOL",
    address!("068f321Fa8Fb9f0D135f290Ef6a3e2813e1c8A29"),
    None,
);

/// Every registry token, native first.
pub const REGISTRY: &[TokenInfo] = &[
    HYPE,
    WHYPE_TOKEN,
    KHYPE,
    WSTHYPE,
    LHYPE,
    USDE,
    USDT0,
    USDHL,
    SUSDE,
    FEUSD,
    UBTC,
    UETH,
    USOL,
];

/// Find a registry token by address.
pub fn lookup(address: Address) -> Option<&'static TokenInfo> {
    REGISTRY.iter().find(|t| t.address == address)
}

/// Find a registry token by exact symbol.
pub fn lookup_symbol(symbol: &str) -> Option<&'static TokenInfo> {
    REGISTRY.iter().find(|t| t.symbol == symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_addresses_unique() {
        let addrs: HashSet<_> = REGISTRY.iter().map(|t| t.address).collect();
        assert_eq!(addrs.len(), REGISTRY.len());
    }

    #[test]
    fn test_native_first() {
        assert_eq!(REGISTRY[0].address, NATIVE_TOKEN);
        assert_eq!(REGISTRY[0].decimals, Some(18));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(WHYPE).map(|t| t.symbol), Some("WHYPE"));
        assert_eq!(lookup_symbol("LHYPE").map(|t| t.address), Some(LHYPE.address));
        assert!(lookup(Address::ZERO).is_none());
    }
}
