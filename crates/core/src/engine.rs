//! Run orchestration: snapshot, decide, plan, execute.

use crate::action::Action;
use crate::action_log::ActionLog;
use crate::catalog::{AssetCatalog, CatalogBuilder};
use crate::config::EngineConfig;
use crate::decision::{decide, Decision};
use crate::error::EngineResult;
use crate::executor::{ExecutionReport, Executor};
use crate::gas_reserve::{gas_sources, plan_top_up};
use crate::groups::{partition, Group};
use crate::planner::{plan_idle_deploy, plan_switch};
use crate::prices::PriceOracle;
use crate::swap::SwapCollaborator;
use alloy::primitives::Address;
use hyperyield_chain::{ChainReader, LendingProtocolAdapter, LoopedStaking};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

/// Request-scoped inputs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub account: Address,
    /// Groups opted in for this run
    pub groups: BTreeSet<Group>,
    /// Plan only, never send transactions
    pub dry_run: bool,
}

impl RunContext {
    pub fn new(account: Address, groups: impl IntoIterator<Item = Group>) -> Self {
        Self {
            account,
            groups: groups.into_iter().collect(),
            dry_run: false,
        }
    }

    /// Opt-ins from the engine configuration.
    pub fn from_config(account: Address, config: &EngineConfig) -> Self {
        Self::new(account, config.groups.enabled())
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Decisions and the ordered action list for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub account: Address,
    pub decisions: Vec<Decision>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub plan: RunPlan,
    /// `None` for dry runs and empty plans
    pub report: Option<ExecutionReport>,
}

pub struct YieldEngine {
    config: EngineConfig,
    reader: Arc<dyn ChainReader>,
    adapters: Vec<Arc<dyn LendingProtocolAdapter>>,
    oracle: Arc<dyn PriceOracle>,
    swapper: Arc<dyn SwapCollaborator>,
    looped: Option<Arc<dyn LoopedStaking>>,
    log: Arc<dyn ActionLog>,
}

impl YieldEngine {
    pub fn new(
        config: EngineConfig,
        reader: Arc<dyn ChainReader>,
        adapters: Vec<Arc<dyn LendingProtocolAdapter>>,
        oracle: Arc<dyn PriceOracle>,
        swapper: Arc<dyn SwapCollaborator>,
        log: Arc<dyn ActionLog>,
    ) -> Self {
        Self {
            config,
            reader,
            adapters,
            oracle,
            swapper,
            looped: None,
            log,
        }
    }

    pub fn with_looped(mut self, looped: Arc<dyn LoopedStaking>) -> Self {
        self.looped = Some(looped);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the frozen snapshot for `account`.
    pub async fn snapshot(&self, account: Address) -> EngineResult<AssetCatalog> {
        CatalogBuilder::new(
            self.reader.clone(),
            self.adapters.clone(),
            self.oracle.clone(),
            self.config.retry.policy(),
        )
        .build(account)
        .await
    }

    /// Decide and plan against a snapshot. Pure.
    ///
    /// Gas top-up comes first, then each opted-in group in a fixed order.
    pub fn plan(&self, ctx: &RunContext, catalog: &AssetCatalog) -> RunPlan {
        let mut actions = Vec::new();
        let mut decisions = Vec::new();

        if let Some(native) = catalog.native() {
            if let Some(top_up) = plan_top_up(&self.config.gas, native.wallet, native.price, &gas_sources(catalog)) {
                actions.push(top_up);
            }
        }

        let groups = partition(catalog);
        for group in Group::ALL {
            if !ctx.groups.contains(&group) {
                continue;
            }
            let Some(members) = groups.get(&group) else { continue };
            let Some(decision) = decide(group, members, catalog, &self.config.strategy) else {
                continue;
            };

            info!(
                group = %group,
                current_apy = decision.current_apy,
                best_apy = decision.best.apy,
                best_kind = ?decision.best.kind,
                equity = decision.current_equity,
                worth_switching = decision.worth_switching,
                "Group decision"
            );

            if decision.worth_switching {
                actions.extend(plan_switch(
                    catalog,
                    members,
                    &decision.best,
                    decision.current_equity,
                    &self.config,
                ));
            } else if self.config.execution.deploys_idle(group) {
                if let Some(deploy) = plan_idle_deploy(catalog, &decision.best) {
                    info!(group = %group, "Deploying idle wallet balance");
                    actions.push(deploy);
                }
            }
            decisions.push(decision);
        }

        RunPlan {
            account: ctx.account,
            decisions,
            actions,
        }
    }

    /// Snapshot and plan without executing.
    #[instrument(skip(self, ctx), fields(account = %ctx.account))]
    pub async fn evaluate(&self, ctx: &RunContext) -> EngineResult<RunPlan> {
        let catalog = self.snapshot(ctx.account).await?;
        Ok(self.plan(ctx, &catalog))
    }

    /// Snapshot, plan, and unless `dry_run`, execute.
    #[instrument(skip(self, ctx), fields(account = %ctx.account, dry_run = ctx.dry_run))]
    pub async fn run(&self, ctx: &RunContext) -> EngineResult<RunOutcome> {
        let catalog = self.snapshot(ctx.account).await?;
        let plan = self.plan(ctx, &catalog);
        info!(
            decisions = plan.decisions.len(),
            actions = plan.actions.len(),
            "Run planned"
        );

        if ctx.dry_run || plan.actions.is_empty() {
            return Ok(RunOutcome { plan, report: None });
        }

        let mut executor = Executor::new(
            ctx.account,
            self.reader.clone(),
            self.swapper.clone(),
            self.log.clone(),
            self.config.clone(),
        );
        for adapter in &self.adapters {
            executor = executor.with_adapter(adapter.clone());
        }
        if let Some(looped) = &self.looped {
            executor = executor.with_looped(looped.clone());
        }

        let report = executor.execute(&plan.actions, &catalog).await;
        Ok(RunOutcome {
            plan,
            report: Some(report),
        })
    }
}
