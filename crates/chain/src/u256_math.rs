//! Conversions between on-chain integers and the f64 values used for ranking.
//!
//! Amounts sent on-chain stay `U256`; APYs, prices and USD values are f64
//! because they only feed comparisons and sizing heuristics.

use alloy::primitives::U256;

/// WAD constant: 1e18, scale of Aave health factors
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Rates come as RAY (1e27) per year; dividing by 1e25 yields percent.
const RAY_TO_PERCENT: f64 = 1e25;

/// Basis points denominator (10000 = 100%)
const BPS: f64 = 10_000.0;

/// 10^exp as U256.
pub fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Lossy U256 -> f64 over all four limbs.
pub fn to_f64(value: U256) -> f64 {
    if value <= U256::from(u128::MAX) {
        let small: u128 = value.to();
        return small as f64;
    }
    let limb = u64::MAX as f64 + 1.0;
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, l| acc * limb + *l as f64)
}

/// Raw base units to human decimal.
pub fn to_human(raw: U256, decimals: u8) -> f64 {
    if raw.is_zero() {
        return 0.0;
    }
    to_f64(raw) / 10f64.powi(decimals as i32)
}

/// Human decimal to raw base units, flooring. Non-positive and non-finite input gives zero.
pub fn from_human(amount: f64, decimals: u8) -> U256 {
    if !amount.is_finite() || amount <= 0.0 {
        return U256::ZERO;
    }
    let scaled = (amount * 10f64.powi(decimals as i32)).floor();
    if scaled < u128::MAX as f64 {
        U256::from(scaled as u128)
    } else {
        U256::from(u128::MAX)
    }
}

/// Annual RAY rate to percent (5% = 5.0).
pub fn ray_to_percent(rate: U256) -> f64 {
    to_f64(rate) / RAY_TO_PERCENT
}

/// Basis points to a fraction (8000 -> 0.8).
pub fn bps_to_fraction(bps: U256) -> f64 {
    to_f64(bps) / BPS
}

/// WAD-scaled value to f64.
pub fn wad_to_f64(wad: U256) -> f64 {
    to_f64(wad) / 1e18
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow10() {
        assert_eq!(pow10(0), U256::from(1u64));
        assert_eq!(pow10(6), U256::from(1_000_000u64));
        assert_eq!(pow10(18), WAD);
    }

    #[test]
    fn test_human_conversions() {
        let raw = U256::from(1_500_000u64);
        assert!((to_human(raw, 6) - 1.5).abs() < 1e-12);
        assert_eq!(from_human(1.5, 6), raw);
        assert_eq!(from_human(0.1, 18), U256::from(100_000_000_000_000_000u128));
        assert_eq!(from_human(-1.0, 18), U256::ZERO);
        assert_eq!(from_human(f64::NAN, 18), U256::ZERO);
    }

    #[test]
    fn test_rate_conversions() {
        // 5% APY in RAY
        let rate = U256::from(50_000_000_000_000_000_000_000_000u128);
        assert!((ray_to_percent(rate) - 5.0).abs() < 1e-9);
        assert!((bps_to_fraction(U256::from(8250u64)) - 0.825).abs() < 1e-12);
    }

    #[test]
    fn test_to_f64_large_values() {
        let big = U256::from(u128::MAX) + U256::from(1u64);
        assert!((to_f64(big) - 2f64.powi(128)).abs() / 2f64.powi(128) < 1e-12);
        assert!(to_f64(U256::MAX) > 1e77);
    }
}
