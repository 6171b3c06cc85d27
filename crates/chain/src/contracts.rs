//! Inline contract interfaces.
//!
//! - `IERC20`: balances, decimals and approvals
//! - `IAavePool`: Aave v3 pool entrypoints (HyperLend uses `supply`, HypurrFi `deposit`)
//! - `IPoolDataProvider`: Aave v3 protocol data provider reads
//! - `ILoopedHypeDeposit`: LoopedHYPE native deposit entrypoint

use alloy::sol;

sol! {
    /// ERC20 subset used for balances and router/pool approvals
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

sol! {
    /// Aave v3 pool
    #[sol(rpc)]
    interface IAavePool {
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function deposit(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function withdraw(address asset, uint256 amount, address to) external returns (uint256);
        function borrow(address asset, uint256 amount, uint256 interestRateMode, uint16 referralCode, address onBehalfOf) external;
        function repay(address asset, uint256 amount, uint256 interestRateMode, address onBehalfOf) external returns (uint256);
        function getUserAccountData(address user) external view returns (
            uint256 totalCollateralBase,
            uint256 totalDebtBase,
            uint256 availableBorrowsBase,
            uint256 currentLiquidationThreshold,
            uint256 ltv,
            uint256 healthFactor
        );
    }
}

sol! {
    /// Reserve listing entry
    #[derive(Debug)]
    struct TokenData {
        string symbol;
        address tokenAddress;
    }

    /// Aave v3 protocol data provider
    #[sol(rpc)]
    interface IPoolDataProvider {
        function getAllReservesTokens() external view returns (TokenData[] memory);

        function getReserveConfigurationData(address asset) external view returns (
            uint256 decimals,
            uint256 ltv,
            uint256 liquidationThreshold,
            uint256 liquidationBonus,
            uint256 reserveFactor,
            bool usageAsCollateralEnabled,
            bool borrowingEnabled,
            bool stableBorrowRateEnabled,
            bool isActive,
            bool isFrozen
        );

        function getReserveData(address asset) external view returns (
            uint256 unbacked,
            uint256 accruedToTreasuryScaled,
            uint256 totalAToken,
            uint256 totalStableDebt,
            uint256 totalVariableDebt,
            uint256 liquidityRate,
            uint256 variableBorrowRate,
            uint256 stableBorrowRate,
            uint256 averageStableBorrowRate,
            uint256 liquidityIndex,
            uint256 variableBorrowIndex,
            uint40 lastUpdateTimestamp
        );

        function getUserReserveData(address asset, address user) external view returns (
            uint256 currentATokenBalance,
            uint256 currentStableDebt,
            uint256 currentVariableDebt,
            uint256 principalStableDebt,
            uint256 scaledVariableDebt,
            uint256 stableBorrowRate,
            uint256 liquidityRate,
            uint40 stableRateLastUpdated,
            bool usageAsCollateralEnabled
        );
    }
}

sol! {
    /// LoopedHYPE deposit contract
    #[sol(rpc)]
    interface ILoopedHypeDeposit {
        function depositNative(uint256 depositAmount, uint256 minimumMint, address to, bytes communityCode) external payable returns (uint256 shares);
    }
}

/// Aave stable interest rate mode. Only repayable on v3.1+ pools.
pub const STABLE_RATE_MODE: u64 = 1;
/// Aave variable interest rate mode.
pub const VARIABLE_RATE_MODE: u64 = 2;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use alloy::sol_types::SolCall;

    #[test]
    fn test_supply_and_deposit_share_layout() {
        let asset = Address::repeat_byte(0x11);
        let user = Address::repeat_byte(0x22);
        let supply = IAavePool::supplyCall {
            asset,
            amount: U256::from(5u64),
            onBehalfOf: user,
            referralCode: 0,
        }
        .abi_encode();
        let deposit = IAavePool::depositCall {
            asset,
            amount: U256::from(5u64),
            onBehalfOf: user,
            referralCode: 0,
        }
        .abi_encode();

        // Same argument encoding, different selector
        assert_eq!(supply[4..], deposit[4..]);
        assert_ne!(supply[..4], deposit[..4]);
    }
}
