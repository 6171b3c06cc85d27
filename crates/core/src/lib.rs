//! HyperYield decision and execution engine.
//!
//! This crate provides:
//! - A frozen per-run asset catalog built from chain reads, lending markets and prices
//! - Group classification (HYPE, stable, volatile) and strategy enumeration
//! - Per-group decisions with a switch threshold
//! - Ordered action plans: unwind, consolidate, enter
//! - Gas reserve maintenance
//! - Sequential execution with failure isolation and an append-only action log

mod action;
mod action_log;
pub mod assets;
mod catalog;
pub mod config;
mod decision;
mod engine;
mod error;
mod executor;
mod gas_reserve;
mod groups;
mod planner;
mod prices;
mod strategy;
mod swap;

pub use action::Action;
pub use action_log::{ActionLog, JsonlActionLog, LogEntry, LogKind, MemoryActionLog, Outcome};
pub use catalog::{AssetCatalog, CatalogAsset, CatalogBuilder, Position, ProtocolMarket};
pub use config::{DeploymentConfig, EngineConfig};
pub use decision::{current_position, decide, worth_switching, Decision};
pub use engine::{RunContext, RunOutcome, RunPlan, YieldEngine};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use executor::{ExecutionReport, Executor, ExecutorState};
pub use gas_reserve::{gas_sources, plan_top_up, GasSource};
pub use groups::{classify, partition, Group, GAS_PRIORITY};
pub use planner::{plan_idle_deploy, plan_switch};
pub use prices::{GlueXPriceOracle, PriceOracle};
pub use strategy::{enumerate, leveraged_apy, select_best, StrategyCandidate, StrategyKind};
pub use swap::{GlueXSwapper, SwapCollaborator};
