//! Engine configuration with profile support.
//!
//! Provides the strategy thresholds, gas reserve bounds, execution pacing
//! and retry budget, with named profiles (default, conservative, testing).

use crate::groups::Group;
use hyperyield_chain::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Main configuration structure containing all engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    #[serde(default)]
    pub strategy: StrategyConfig,

    #[serde(default)]
    pub gas: GasConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Groups opted in by default
    #[serde(default)]
    pub groups: GroupToggles,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Candidate generation and switching thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Fraction of LTV actually used when looping
    #[serde(default = "default_safety_factor")]
    pub safety_factor: f64,

    /// Leveraged candidates below this estimated health are dropped
    #[serde(default = "default_min_health")]
    pub min_health: f64,

    /// Percentage points the best candidate must beat the current APY by
    #[serde(default = "default_switch_threshold")]
    pub switch_threshold_pct: f64,

    /// Fixed APY assumed for looped staking (percent)
    #[serde(default = "default_looped_apy")]
    pub looped_apy_pct: f64,

    /// Borrow/supply passes when entering a leveraged position
    #[serde(default = "default_leverage_iterations")]
    pub leverage_iterations: u32,
}

fn default_safety_factor() -> f64 {
    0.8
}
fn default_min_health() -> f64 {
    1.6
}
fn default_switch_threshold() -> f64 {
    1.0
}
fn default_looped_apy() -> f64 {
    0.1
}
fn default_leverage_iterations() -> u32 {
    2
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            safety_factor: default_safety_factor(),
            min_health: default_min_health(),
            switch_threshold_pct: default_switch_threshold(),
            looped_apy_pct: default_looped_apy(),
            leverage_iterations: default_leverage_iterations(),
        }
    }
}

/// Native gas reserve bounds, in whole native units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasConfig {
    /// Top up when the native balance falls below this
    #[serde(default = "default_gas_min")]
    pub min_native: f64,

    /// Top up to this balance
    #[serde(default = "default_gas_target")]
    pub target_native: f64,

    /// Extra USD worth of native bought on each top-up
    #[serde(default = "default_usd_buffer")]
    pub usd_buffer: f64,
}

fn default_gas_min() -> f64 {
    0.05
}
fn default_gas_target() -> f64 {
    0.1
}
fn default_usd_buffer() -> f64 {
    1.0
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            min_native: default_gas_min(),
            target_native: default_gas_target(),
            usd_buffer: default_usd_buffer(),
        }
    }
}

/// Executor pacing and repay handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Wait after each mutating call before dependent reads (milliseconds)
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Extra fraction bought on a repay shortfall swap
    #[serde(default = "default_repay_buffer")]
    pub repay_slippage_buffer: f64,

    /// Repay an `Exact` action amount instead of the freshly read debt
    #[serde(default)]
    pub repay_uses_action_amount: bool,

    /// Groups whose idle wallet balance is supplied when not switching
    #[serde(default = "default_idle_groups")]
    pub deploy_idle_groups: Vec<Group>,
}

fn default_settle_delay() -> u64 {
    10_000
}
fn default_repay_buffer() -> f64 {
    0.01
}
fn default_idle_groups() -> Vec<Group> {
    vec![Group::Hype]
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay(),
            repay_slippage_buffer: default_repay_buffer(),
            repay_uses_action_amount: false,
            deploy_idle_groups: default_idle_groups(),
        }
    }
}

impl ExecutionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn deploys_idle(&self, group: Group) -> bool {
        self.deploy_idle_groups.contains(&group)
    }
}

/// Read retry budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

/// Per-group opt-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupToggles {
    #[serde(default = "default_true")]
    pub hype: bool,
    #[serde(default = "default_true")]
    pub stable: bool,
    #[serde(default)]
    pub volatile: bool,
}

fn default_true() -> bool {
    true
}

impl Default for GroupToggles {
    fn default() -> Self {
        Self {
            hype: true,
            stable: true,
            volatile: false,
        }
    }
}

impl GroupToggles {
    pub fn enabled(&self) -> BTreeSet<Group> {
        Group::ALL
            .into_iter()
            .filter(|g| match g {
                Group::Hype => self.hype,
                Group::Stable => self.stable,
                Group::Volatile => self.volatile,
            })
            .collect()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            strategy: StrategyConfig::default(),
            gas: GasConfig::default(),
            execution: ExecutionConfig::default(),
            retry: RetryConfig::default(),
            groups: GroupToggles::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Wider health margin and a higher bar for switching.
    pub fn conservative() -> Self {
        Self {
            profile: "conservative".to_string(),
            strategy: StrategyConfig {
                safety_factor: 0.7,
                min_health: 2.0,
                switch_threshold_pct: 2.0,
                ..Default::default()
            },
            gas: GasConfig {
                min_native: 0.1,
                target_native: 0.2,
                usd_buffer: 2.0,
            },
            execution: ExecutionConfig {
                settle_delay_ms: 15_000,
                repay_slippage_buffer: 0.02,
                ..Default::default()
            },
            retry: RetryConfig {
                max_attempts: 5,
                base_delay_ms: 2000,
            },
            groups: GroupToggles::default(),
        }
    }

    /// No settle delay and fast retries.
    pub fn testing() -> Self {
        Self {
            profile: "testing".to_string(),
            execution: ExecutionConfig {
                settle_delay_ms: 0,
                ..Default::default()
            },
            retry: RetryConfig {
                max_attempts: 2,
                base_delay_ms: 0,
            },
            ..Default::default()
        }
    }

    /// Profile from ENGINE_PROFILE: a profile name or a path to a TOML file.
    pub fn from_env() -> anyhow::Result<Self> {
        let profile = std::env::var("ENGINE_PROFILE").unwrap_or_else(|_| "default".to_string());
        if profile.ends_with(".toml") {
            return Self::from_file(&profile);
        }
        Ok(match profile.to_lowercase().as_str() {
            "conservative" | "safe" => Self::conservative(),
            "testing" | "test" => Self::testing(),
            _ => Self::default(),
        })
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "Engine configuration loaded");
        tracing::info!(
            safety_factor = self.strategy.safety_factor,
            min_health = self.strategy.min_health,
            switch_threshold = self.strategy.switch_threshold_pct,
            looped_apy = self.strategy.looped_apy_pct,
            leverage_iterations = self.strategy.leverage_iterations,
            "Strategy thresholds"
        );
        tracing::info!(
            min_native = self.gas.min_native,
            target_native = self.gas.target_native,
            usd_buffer = self.gas.usd_buffer,
            "Gas reserve"
        );
        tracing::info!(
            settle_delay_ms = self.execution.settle_delay_ms,
            repay_buffer = self.execution.repay_slippage_buffer,
            repay_uses_action_amount = self.execution.repay_uses_action_amount,
            "Execution parameters"
        );
        tracing::info!(
            max_attempts = self.retry.max_attempts,
            base_delay_ms = self.retry.base_delay_ms,
            "Read retry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.strategy.safety_factor, 0.8);
        assert_eq!(config.strategy.min_health, 1.6);
        assert_eq!(config.gas.min_native, 0.05);
        assert_eq!(config.execution.settle_delay(), Duration::from_secs(10));
        assert!(config.execution.deploys_idle(Group::Hype));
        assert!(!config.execution.deploys_idle(Group::Stable));
    }

    #[test]
    fn test_conservative_profile() {
        let config = EngineConfig::conservative();
        assert_eq!(config.profile, "conservative");
        assert!(config.strategy.min_health > EngineConfig::default().strategy.min_health);
        assert!(config.strategy.switch_threshold_pct > 1.0);
    }

    #[test]
    fn test_testing_profile() {
        let config = EngineConfig::testing();
        assert_eq!(config.execution.settle_delay_ms, 0);
        assert_eq!(config.retry.policy().base_delay, Duration::ZERO);
    }

    #[test]
    fn test_group_toggles() {
        let enabled = GroupToggles::default().enabled();
        assert!(enabled.contains(&Group::Hype));
        assert!(enabled.contains(&Group::Stable));
        assert!(!enabled.contains(&Group::Volatile));
    }

    #[test]
    fn test_serialization() {
        let config = EngineConfig::conservative();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("profile = \"conservative\""));

        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: EngineConfig = toml::from_str(
            r#"
            [strategy]
            min_health = 1.8

            [groups]
            volatile = true
            "#,
        )
        .unwrap();
        assert_eq!(parsed.strategy.min_health, 1.8);
        assert_eq!(parsed.strategy.safety_factor, 0.8);
        assert!(parsed.groups.hype);
        assert!(parsed.groups.volatile);
        assert_eq!(parsed.execution.deploy_idle_groups, vec![Group::Hype]);
    }
}
