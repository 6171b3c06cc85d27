//! Deployment configuration: endpoints and contract addresses.
//!
//! Built-in defaults target HyperEVM mainnet. A TOML file can override any
//! section; string values may reference `${VAR}` environment variables.

use alloy::primitives::Address;
use hyperyield_api::{GLUEX_QUOTE_URL, GLUEX_RATES_URL};
use hyperyield_chain::{AaveV3AdapterConfig, LOOPED_HYPE_DEPOSIT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Full deployment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployment name (e.g., "hyperevm-mainnet")
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub chain: ChainSettings,
    /// Lending protocols, in evaluation order
    #[serde(default = "default_protocols")]
    pub protocols: Vec<AaveV3AdapterConfig>,
    #[serde(default)]
    pub gluex: GlueXSettings,
    #[serde(default)]
    pub looped: LoopedSettings,
    #[serde(default)]
    pub action_log: ActionLogSettings,
}

fn default_name() -> String {
    "hyperevm-mainnet".to_string()
}

fn default_protocols() -> Vec<AaveV3AdapterConfig> {
    vec![AaveV3AdapterConfig::hyperlend(), AaveV3AdapterConfig::hypurrfi()]
}

/// RPC endpoint and legacy gas pricing bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSettings {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_gas_price")]
    pub default_gas_price_gwei: f64,
    #[serde(default = "default_max_gas_price")]
    pub max_gas_price_gwei: f64,
}

fn default_rpc_url() -> String {
    "https://rpc.hyperliquid.xyz/evm".to_string()
}
fn default_chain_id() -> u64 {
    999
}
fn default_gas_price() -> f64 {
    1.0
}
fn default_max_gas_price() -> f64 {
    50.0
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: default_chain_id(),
            default_gas_price_gwei: default_gas_price(),
            max_gas_price_gwei: default_max_gas_price(),
        }
    }
}

/// GlueX router and exchange-rate endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlueXSettings {
    #[serde(default = "default_quote_url")]
    pub quote_url: String,
    #[serde(default = "default_rates_url")]
    pub rates_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_unique_pid")]
    pub unique_pid: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// How long a fetched price is reused
    #[serde(default = "default_rate_ttl")]
    pub rate_ttl_secs: u64,
}

fn default_quote_url() -> String {
    GLUEX_QUOTE_URL.to_string()
}
fn default_rates_url() -> String {
    GLUEX_RATES_URL.to_string()
}
fn default_api_key() -> String {
    "${GLUEX_API_KEY}".to_string()
}
fn default_unique_pid() -> String {
    "083b7cd68478935999b08b1bf9d7ea3a77e5d5de6072e209ec872574b372ed6b".to_string()
}
fn default_timeout() -> u64 {
    10
}
fn default_rate_ttl() -> u64 {
    30
}

impl Default for GlueXSettings {
    fn default() -> Self {
        Self {
            quote_url: default_quote_url(),
            rates_url: default_rates_url(),
            api_key: default_api_key(),
            unique_pid: default_unique_pid(),
            timeout_secs: default_timeout(),
            rate_ttl_secs: default_rate_ttl(),
        }
    }
}

impl GlueXSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rate_ttl(&self) -> Duration {
        Duration::from_secs(self.rate_ttl_secs)
    }

    /// API key, if one was resolved from the environment.
    pub fn api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        if key.is_empty() || key.contains("${") {
            None
        } else {
            Some(key)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopedSettings {
    #[serde(default = "default_deposit_contract")]
    pub deposit_contract: Address,
}

fn default_deposit_contract() -> Address {
    LOOPED_HYPE_DEPOSIT
}

impl Default for LoopedSettings {
    fn default() -> Self {
        Self {
            deposit_contract: default_deposit_contract(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogSettings {
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("actions_log.jsonl")
}

impl Default for ActionLogSettings {
    fn default() -> Self {
        Self {
            path: default_log_path(),
        }
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            chain: ChainSettings::default(),
            protocols: default_protocols(),
            gluex: GlueXSettings::default(),
            looped: LoopedSettings::default(),
            action_log: ActionLogSettings::default(),
        }
    }
}

impl DeploymentConfig {
    /// Load deployment config from a TOML file and expand `${VAR}` references.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: DeploymentConfig = toml::from_str(&content)?;
        config.expand_env_vars();
        Ok(config)
    }

    /// File named by DEPLOYMENT_CONFIG, or the built-in mainnet defaults.
    ///
    /// HYPEREVM_RPC_URL overrides the RPC endpoint either way.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = match std::env::var("DEPLOYMENT_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => {
                let mut config = Self::default();
                config.expand_env_vars();
                config
            }
        };
        if let Ok(url) = std::env::var("HYPEREVM_RPC_URL") {
            config.chain.rpc_url = url;
        }
        Ok(config)
    }

    /// Expand environment variables in config values.
    pub fn expand_env_vars(&mut self) {
        self.chain.rpc_url = expand_env(&self.chain.rpc_url);
        self.gluex.quote_url = expand_env(&self.gluex.quote_url);
        self.gluex.rates_url = expand_env(&self.gluex.rates_url);
        self.gluex.api_key = expand_env(&self.gluex.api_key);
        if let Some(path) = self.action_log.path.to_str() {
            self.action_log.path = PathBuf::from(expand_env(path));
        }
    }
}

/// Expand ${VAR_NAME} patterns with environment variable values.
///
/// Unset variables are left as written.
fn expand_env(s: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return s.to_string();
    };

    let mut result = s.to_string();
    for cap in re.captures_iter(s) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            if let Ok(value) = std::env::var(var_match.as_str()) {
                result = result.replace(full_match.as_str(), &value);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperyield_chain::{ProtocolId, SupplyEntrypoint};

    #[test]
    fn test_expand_env() {
        std::env::set_var("DEPLOYMENT_TEST_VAR", "test_value");
        assert_eq!(expand_env("${DEPLOYMENT_TEST_VAR}"), "test_value");
        assert_eq!(
            expand_env("https://${DEPLOYMENT_TEST_VAR}/rpc"),
            "https://test_value/rpc"
        );
        assert_eq!(expand_env("${DEPLOYMENT_UNSET_VAR}"), "${DEPLOYMENT_UNSET_VAR}");
        std::env::remove_var("DEPLOYMENT_TEST_VAR");
    }

    #[test]
    fn test_defaults_target_mainnet() {
        let config = DeploymentConfig::default();
        assert_eq!(config.chain.chain_id, 999);
        assert_eq!(config.protocols.len(), 2);
        assert_eq!(config.protocols[0].protocol, ProtocolId::HyperLend);
        assert_eq!(config.protocols[1].entrypoint, SupplyEntrypoint::Deposit);
        assert_eq!(config.action_log.path, PathBuf::from("actions_log.jsonl"));
    }

    #[test]
    fn test_unresolved_api_key_is_none() {
        let mut settings = GlueXSettings::default();
        settings.api_key = "${DEPLOYMENT_NEVER_SET_KEY}".to_string();
        assert!(settings.api_key().is_none());
        settings.api_key = "abc".to_string();
        assert_eq!(settings.api_key(), Some("abc"));
    }

    #[test]
    fn test_partial_toml() {
        let config: DeploymentConfig = toml::from_str(
            r#"
            name = "staging"

            [chain]
            rpc_url = "http://localhost:8545"

            [action_log]
            path = "/tmp/staging.jsonl"
            "#,
        )
        .unwrap();
        assert_eq!(config.name, "staging");
        assert_eq!(config.chain.chain_id, 999);
        assert_eq!(config.protocols.len(), 2);
        assert_eq!(config.gluex.timeout(), Duration::from_secs(10));
        assert_eq!(config.looped.deposit_contract, LOOPED_HYPE_DEPOSIT);
    }
}
