//! Configuration for the yield engine.
//!
//! This module provides:
//! - Engine runtime configuration (profiles, thresholds, pacing, retry)
//! - Deployment configuration (RPC, protocol contracts, GlueX endpoints, log path)

mod deployment;
mod engine;

pub use deployment::{
    ActionLogSettings, ChainSettings, DeploymentConfig, GlueXSettings, LoopedSettings,
};
pub use engine::{
    EngineConfig, ExecutionConfig, GasConfig, GroupToggles, RetryConfig, StrategyConfig,
};
