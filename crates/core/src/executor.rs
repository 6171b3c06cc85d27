//! Sequential action execution with per-action failure isolation.
//!
//! Every action is attempted exactly once, in order. A failure is logged
//! and the next action still runs; nothing is rolled back. Repays may be
//! preceded by an inline swap covering a wallet shortfall, and every step
//! is followed by a gas reserve check that can insert a top-up swap.

use crate::action::Action;
use crate::action_log::{ActionLog, LogEntry, LogKind, Outcome};
use crate::assets::{NATIVE_DECIMALS, NATIVE_TOKEN};
use crate::catalog::AssetCatalog;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::gas_reserve::{gas_sources, plan_top_up};
use crate::groups::classify;
use crate::swap::SwapCollaborator;
use alloy::primitives::{Address, B256, U256};
use hyperyield_chain::u256_math::{from_human, to_human};
use hyperyield_chain::{Amount, ChainReader, LendingProtocolAdapter, LoopedStaking, ProtocolId, RetryPolicy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    /// Zero-based index of the planned action in flight
    Executing(usize),
    Done,
}

/// Everything written to the log during one execution, in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub entries: Vec<LogEntry>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Failed { .. }))
            .count()
    }

    pub fn of_kind(&self, kind: LogKind) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }
}

pub struct Executor {
    account: Address,
    reader: Arc<dyn ChainReader>,
    adapters: BTreeMap<ProtocolId, Arc<dyn LendingProtocolAdapter>>,
    swapper: Arc<dyn SwapCollaborator>,
    looped: Option<Arc<dyn LoopedStaking>>,
    log: Arc<dyn ActionLog>,
    config: EngineConfig,
    retry: RetryPolicy,
    state: ExecutorState,
}

impl Executor {
    pub fn new(
        account: Address,
        reader: Arc<dyn ChainReader>,
        swapper: Arc<dyn SwapCollaborator>,
        log: Arc<dyn ActionLog>,
        config: EngineConfig,
    ) -> Self {
        let retry = config.retry.policy();
        Self {
            account,
            reader,
            adapters: BTreeMap::new(),
            swapper,
            looped: None,
            log,
            config,
            retry,
            state: ExecutorState::Idle,
        }
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn LendingProtocolAdapter>) -> Self {
        self.adapters.insert(adapter.protocol(), adapter);
        self
    }

    pub fn with_looped(mut self, looped: Arc<dyn LoopedStaking>) -> Self {
        self.looped = Some(looped);
        self
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Attempt every action in order against live state.
    ///
    /// `catalog` supplies prices, decimals and group membership; balances
    /// and debts are always re-read.
    #[instrument(skip_all, fields(account = %self.account, actions = actions.len()))]
    pub async fn execute(&mut self, actions: &[Action], catalog: &AssetCatalog) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for (i, action) in actions.iter().enumerate() {
            self.state = ExecutorState::Executing(i);
            info!(step = i + 1, total = actions.len(), action = action.name(), "Executing action");

            let outcome = match self.dispatch(action, catalog, &mut report).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(action = action.name(), kind = ?e.kind(), error = %e, "Action failed");
                    Outcome::failed(&e)
                }
            };
            let sent = outcome.is_success();
            self.record(LogKind::Action, action.clone(), outcome, &mut report);
            if sent {
                self.settle().await;
            }

            self.maintain_gas(catalog, &mut report).await;
        }

        self.state = ExecutorState::Done;
        info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Execution finished"
        );
        report
    }

    async fn dispatch(
        &self,
        action: &Action,
        catalog: &AssetCatalog,
        report: &mut ExecutionReport,
    ) -> EngineResult<Outcome> {
        match action {
            Action::Repay {
                protocol,
                asset,
                amount,
            } => self.repay(*protocol, *asset, *amount, catalog, report).await,

            Action::Withdraw {
                protocol,
                asset,
                amount,
            } => {
                let tx_hash = self.adapter(*protocol)?.withdraw(*asset, *amount).await?;
                Ok(Outcome::Success { tx_hash })
            }

            Action::Swap { from, to, amount } => {
                // Earlier repays and top-ups can spend what the plan expected to swap
                let live = self.balance_of(*from).await?;
                let raw = match amount {
                    Amount::Full => live,
                    Amount::Exact(value) if *value > live => {
                        warn!(asset = %from, planned = %value, available = %live, "Clamping swap to wallet balance");
                        live
                    }
                    Amount::Exact(value) => *value,
                };
                if raw.is_zero() {
                    return Ok(skipped("nothing to swap"));
                }
                let tx_hash = self.swap(*from, *to, raw).await?;
                Ok(Outcome::Success { tx_hash })
            }

            Action::Supply {
                protocol,
                asset,
                amount,
            } => {
                let adapter = self.adapter(*protocol)?;
                let live = self.balance_of(*asset).await?;
                let raw = match amount {
                    Amount::Full => live,
                    Amount::Exact(value) if *value > live => {
                        warn!(asset = %asset, planned = %value, available = %live, "Clamping supply to wallet balance");
                        live
                    }
                    Amount::Exact(value) => *value,
                };
                if raw.is_zero() {
                    return Ok(skipped("no wallet balance to supply"));
                }
                let tx_hash = adapter.supply(*asset, Amount::Exact(raw)).await?;
                Ok(Outcome::Success { tx_hash })
            }

            Action::Borrow {
                protocol,
                asset,
                amount,
            } => {
                let tx_hash = self.adapter(*protocol)?.borrow(*asset, *amount).await?;
                Ok(Outcome::Success { tx_hash })
            }

            Action::ConvertLooped { amount } => {
                let looped = self
                    .looped
                    .as_ref()
                    .ok_or_else(|| EngineError::Precondition("looped staking not configured".into()))?;
                let raw = match amount {
                    Amount::Exact(value) => *value,
                    Amount::Full => {
                        let native = self.balance_of(NATIVE_TOKEN).await?;
                        native.saturating_sub(from_human(self.config.gas.min_native, NATIVE_DECIMALS))
                    }
                };
                if raw.is_zero() {
                    return Ok(skipped("native balance at or below gas reserve"));
                }
                let tx_hash = looped.convert(raw).await?;
                Ok(Outcome::Success { tx_hash })
            }
        }
    }

    /// Repay against freshly read debt, swapping in any shortfall first.
    async fn repay(
        &self,
        protocol: ProtocolId,
        asset: Address,
        amount: Amount,
        catalog: &AssetCatalog,
        report: &mut ExecutionReport,
    ) -> EngineResult<Outcome> {
        let adapter = self.adapter(protocol)?;
        let position = self
            .retry
            .run("position", || adapter.get_position(self.account, asset))
            .await
            .map_err(EngineError::data_fetch)?;

        let debt = position.total_debt();
        if debt.is_zero() {
            return Ok(skipped("no outstanding debt"));
        }

        let repay_amount = match amount {
            Amount::Exact(value) if self.config.execution.repay_uses_action_amount => value,
            _ => debt,
        };

        let wallet = self.balance_of(asset).await?;
        if wallet < repay_amount {
            self.cover_shortfall(asset, repay_amount - wallet, catalog, report)
                .await;
        }

        let tx_hash = adapter.repay(asset, Amount::Exact(repay_amount)).await?;
        Ok(Outcome::Success { tx_hash })
    }

    /// Swap another member of the asset's group into `asset`.
    async fn cover_shortfall(
        &self,
        asset: Address,
        shortfall: U256,
        catalog: &AssetCatalog,
        report: &mut ExecutionReport,
    ) {
        let buffer = 1.0 + self.config.execution.repay_slippage_buffer;
        let needed_usd = to_human(shortfall, catalog.decimals(asset)) * buffer * catalog.price(asset);

        let Some((from, live)) = self.shortfall_source(asset, catalog).await else {
            warn!(asset = %asset, shortfall = %shortfall, "No funded group member to cover repay shortfall");
            return;
        };

        let amount = from_human(needed_usd / catalog.price(from), catalog.decimals(from)).min(live);
        let action = Action::Swap {
            from,
            to: asset,
            amount: Amount::Exact(amount),
        };
        info!(from = %from, to = %asset, amount = %amount, "Swapping to cover repay shortfall");

        let outcome = match self.swap(from, asset, amount).await {
            Ok(tx_hash) => Outcome::Success { tx_hash },
            Err(e) => {
                error!(error = %e, "Repay shortfall swap failed");
                Outcome::failed(&e)
            }
        };
        let sent = outcome.is_success();
        self.record(LogKind::InlineRepaySwap, action, outcome, report);
        if sent {
            self.settle().await;
        }
    }

    /// First other member of the asset's group with a live balance.
    ///
    /// Native HYPE is never sold here; it backs the gas reserve.
    async fn shortfall_source(&self, asset: Address, catalog: &AssetCatalog) -> Option<(Address, U256)> {
        let group = catalog.asset(asset).and_then(|a| classify(&a.symbol))?;
        for candidate in &catalog.assets {
            if candidate.address == asset
                || candidate.address == NATIVE_TOKEN
                || classify(&candidate.symbol) != Some(group)
            {
                continue;
            }
            match self.balance_of(candidate.address).await {
                Ok(balance) if !balance.is_zero() => return Some((candidate.address, balance)),
                Ok(_) => {}
                Err(e) => warn!(asset = %candidate.address, error = %e, "Balance read failed"),
            }
        }
        None
    }

    /// Re-check the native floor against live balances and top up inline.
    async fn maintain_gas(&self, catalog: &AssetCatalog, report: &mut ExecutionReport) {
        let native = match self.balance_of(NATIVE_TOKEN).await {
            Ok(balance) => to_human(balance, NATIVE_DECIMALS),
            Err(e) => {
                warn!(error = %e, "Skipping gas check");
                return;
            }
        };
        if native >= self.config.gas.min_native {
            return;
        }

        let mut sources = gas_sources(catalog);
        for source in &mut sources {
            source.balance_raw = match self.balance_of(source.asset).await {
                Ok(balance) => balance,
                Err(e) => {
                    warn!(asset = %source.asset, error = %e, "Gas source balance unavailable");
                    U256::ZERO
                }
            };
        }

        let Some(action) = plan_top_up(&self.config.gas, native, catalog.price(NATIVE_TOKEN), &sources) else {
            debug!(native, "Gas below floor but no source to sell");
            return;
        };
        let Action::Swap { from, to, amount } = &action else { return };
        let raw = amount.exact().unwrap_or(U256::ZERO);

        info!(native, from = %from, amount = %raw, "Topping up gas reserve");
        let outcome = match self.swap(*from, *to, raw).await {
            Ok(tx_hash) => Outcome::Success { tx_hash },
            Err(e) => {
                error!(error = %e, "Gas top-up failed");
                Outcome::failed(&e)
            }
        };
        let sent = outcome.is_success();
        self.record(LogKind::GasTopUp, action, outcome, report);
        if sent {
            self.settle().await;
        }
    }

    /// Quote, refuse flagged quotes, execute.
    async fn swap(&self, from: Address, to: Address, amount: U256) -> EngineResult<B256> {
        let quote = self.swapper.quote(from, to, amount, self.account).await?;
        if quote.revert {
            return Err(EngineError::Precondition("swap simulation reverts".into()));
        }
        if quote.low_balance {
            return Err(EngineError::Precondition("insufficient balance for swap".into()));
        }
        self.swapper.execute(&quote, self.account).await
    }

    async fn balance_of(&self, asset: Address) -> EngineResult<U256> {
        let result = if asset == NATIVE_TOKEN {
            self.retry
                .run("native_balance", || self.reader.native_balance(self.account))
                .await
        } else {
            self.retry
                .run("token_balance", || self.reader.token_balance(asset, self.account))
                .await
        };
        result.map_err(|e| EngineError::DataFetch(format!("balance of {asset}: {e:#}")))
    }

    fn adapter(&self, protocol: ProtocolId) -> EngineResult<&Arc<dyn LendingProtocolAdapter>> {
        self.adapters
            .get(&protocol)
            .ok_or_else(|| EngineError::Precondition(format!("no adapter for {protocol}")))
    }

    fn record(&self, kind: LogKind, action: Action, outcome: Outcome, report: &mut ExecutionReport) {
        let entry = LogEntry::now(kind, action, outcome);
        if let Err(e) = self.log.append(&entry) {
            error!(error = %e, "Failed to append action log entry");
        }
        report.entries.push(entry);
    }

    async fn settle(&self) {
        let delay = self.config.execution.settle_delay();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "Waiting for state to settle");
            tokio::time::sleep(delay).await;
        }
    }
}

fn skipped(reason: &str) -> Outcome {
    Outcome::Skipped {
        reason: reason.to_string(),
    }
}
