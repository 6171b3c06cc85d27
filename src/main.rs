//! HyperYield engine
//!
//! Allocates an account's HyperEVM holdings across HyperLend, HypurrFi and
//! LoopedHYPE, one asset group at a time:
//! - Snapshots balances, markets, positions and prices
//! - Picks the best strategy per group and switches past a threshold
//! - Executes the plan sequentially with inline gas and repay coverage
//! - Appends every executed step to a JSONL action log

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hyperyield_api::{GlueXClient, GlueXRatesClient};
use hyperyield_chain::gas::LegacyGasStrategy;
use hyperyield_chain::u256_math::from_human;
use hyperyield_chain::{
    AaveV3Adapter, LendingProtocolAdapter, LoopedHypeClient, ProviderManager, TransactionSenderBuilder,
};
use hyperyield_core::assets::NATIVE_DECIMALS;
use hyperyield_core::{
    DeploymentConfig, EngineConfig, GlueXPriceOracle, GlueXSwapper, JsonlActionLog, RunContext, YieldEngine,
};

/// Environment variable names.
mod env {
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const DRY_RUN: &str = "DRY_RUN";
    pub const RUN_INTERVAL_SECS: &str = "RUN_INTERVAL_SECS";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    init_tracing();

    // ENGINE_PROFILE selects default, conservative, testing, or a TOML path
    let engine_config = EngineConfig::from_env()?;
    engine_config.log_config();

    // DEPLOYMENT_CONFIG points at the chain/protocol TOML, defaults otherwise
    let deployment = DeploymentConfig::from_env()?;
    info!(
        deployment = %deployment.name,
        chain_id = deployment.chain.chain_id,
        rpc = %deployment.chain.rpc_url,
        "Deployment loaded"
    );

    let dry_run = env_flag(env::DRY_RUN);
    let interval = std::env::var(env::RUN_INTERVAL_SECS)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    let (engine, ctx) = initialize(engine_config, deployment, dry_run).await?;

    let Some(interval) = interval else {
        return run_once(&engine, &ctx).await;
    };

    info!(interval_secs = interval.as_secs(), "Running on an interval");
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if let Err(e) = run_once(&engine, &ctx).await {
            error!(error = %e, "Run failed");
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyperyield_core=debug,hyperyield_chain=debug"));

    if std::env::var(env::LOG_FORMAT).is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

async fn initialize(
    engine_config: EngineConfig,
    deployment: DeploymentConfig,
    dry_run: bool,
) -> Result<(YieldEngine, RunContext)> {
    info!("Initializing components...");
    let chain = &deployment.chain;

    let private_key = std::env::var(env::PRIVATE_KEY)
        .map_err(|_| anyhow::anyhow!("Missing env var: {}", env::PRIVATE_KEY))?;

    let provider = Arc::new(ProviderManager::new(&chain.rpc_url, chain.chain_id));

    let sender = Arc::new(
        TransactionSenderBuilder::new(&chain.rpc_url, chain.chain_id)
            .gas_strategy(Box::new(LegacyGasStrategy::from_gwei(
                chain.default_gas_price_gwei,
                chain.max_gas_price_gwei,
            )))
            .build(&private_key)
            .await
            .context("initializing transaction sender")?,
    );
    let account = sender.address;
    info!(address = %account, "Transaction sender initialized");

    let adapters: Vec<Arc<dyn LendingProtocolAdapter>> = deployment
        .protocols
        .iter()
        .map(|p| {
            info!(protocol = %p.protocol, pool = %p.pool, "Lending adapter configured");
            Arc::new(AaveV3Adapter::new(p.clone(), provider.clone()).with_sender(sender.clone()))
                as Arc<dyn LendingProtocolAdapter>
        })
        .collect();

    let gluex = &deployment.gluex;
    let rates = GlueXRatesClient::new(&gluex.rates_url, gluex.timeout(), gluex.rate_ttl())?;
    let api_key = gluex.api_key().unwrap_or_else(|| {
        warn!("GLUEX_API_KEY not set, swap quotes will be rejected");
        ""
    });
    let quotes = GlueXClient::new(&gluex.quote_url, api_key, &gluex.unique_pid, gluex.timeout())?;

    let looped = LoopedHypeClient::new(
        deployment.looped.deposit_contract,
        from_human(engine_config.gas.min_native, NATIVE_DECIMALS),
        provider.clone(),
        sender.clone(),
    );

    let log = JsonlActionLog::new(deployment.action_log.path.clone());
    info!(path = %log.path().display(), "Action log ready");

    let ctx = RunContext::from_config(account, &engine_config).with_dry_run(dry_run);
    info!(
        groups = ?ctx.groups,
        dry_run,
        "Run context prepared"
    );

    let engine = YieldEngine::new(
        engine_config,
        provider.clone(),
        adapters,
        Arc::new(GlueXPriceOracle::new(rates)),
        Arc::new(GlueXSwapper::new(quotes, provider, sender)),
        Arc::new(log),
    )
    .with_looped(Arc::new(looped));

    info!("All components initialized");
    Ok((engine, ctx))
}

async fn run_once(engine: &YieldEngine, ctx: &RunContext) -> Result<()> {
    let outcome = engine.run(ctx).await.context("run aborted")?;

    if let Some(report) = &outcome.report {
        info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Run complete"
        );
    } else {
        info!(actions = outcome.plan.actions.len(), "Nothing executed");
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Print startup banner.
fn print_banner() {
    println!(r#"
    ╦ ╦┬ ┬┌─┐┌─┐┬─┐╦ ╦┬┌─┐┬  ┌┬┐
    ╠═╣└┬┘├─┘├┤ ├┬┘╚╦╝│├┤ │   ││
    ╩ ╩ ┴ ┴  └─┘┴└─ ╩ ┴└─┘┴─┘─┴┘
    Yield Engine v0.1.0
    "#);
}
