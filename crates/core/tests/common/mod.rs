//! In-memory chain, lending, swap and price doubles for engine tests.

#![allow(dead_code)]

use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use hyperyield_api::SwapQuote;
use hyperyield_chain::u256_math::{from_human, pow10};
use hyperyield_chain::{
    AccountSummary, Amount, ChainError, ChainReader, ChainResult, LendingProtocolAdapter,
    MarketData, ProtocolId, ReservePosition,
};
use hyperyield_core::assets::{TokenInfo, NATIVE_TOKEN};
use hyperyield_core::{
    AssetCatalog, CatalogAsset, EngineError, EngineResult, Position, PriceOracle, ProtocolMarket,
    SwapCollaborator,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const ACCOUNT: Address = Address::repeat_byte(0xAA);

static TX_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_hash() -> B256 {
    B256::left_padding_from(&TX_COUNTER.fetch_add(1, Ordering::Relaxed).to_be_bytes())
}

/// Wallet and reserve state shared by every double.
#[derive(Debug, Default)]
pub struct ChainState {
    pub balances: HashMap<Address, U256>,
    pub decimals: HashMap<Address, u8>,
    pub supplied: HashMap<(ProtocolId, Address), U256>,
    pub debts: HashMap<(ProtocolId, Address), U256>,
    /// Every mutating call, in order
    pub calls: Vec<String>,
}

pub type Shared = Arc<Mutex<ChainState>>;

pub fn shared() -> Shared {
    Arc::new(Mutex::new(ChainState::default()))
}

pub fn units(human: f64, decimals: u8) -> U256 {
    from_human(human, decimals)
}

pub fn set_balance(state: &Shared, token: &TokenInfo, human: f64) {
    let decimals = token.decimals.unwrap_or(18);
    let mut s = state.lock();
    s.decimals.insert(token.address, decimals);
    s.balances.insert(token.address, units(human, decimals));
}

pub fn balance(state: &Shared, token: Address) -> U256 {
    state.lock().balances.get(&token).copied().unwrap_or_default()
}

pub fn calls(state: &Shared) -> Vec<String> {
    state.lock().calls.clone()
}

// ============================================================================
// Chain reader
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct MockReader {
    pub state: Shared,
    pub offline: bool,
    pub failing_balances: HashSet<Address>,
    pub failing_decimals: bool,
}

impl MockReader {
    pub fn new(state: Shared) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ChainReader for MockReader {
    async fn block_number(&self) -> anyhow::Result<u64> {
        if self.offline {
            anyhow::bail!("connection refused");
        }
        Ok(1_000)
    }

    async fn native_balance(&self, account: Address) -> anyhow::Result<U256> {
        self.token_balance(NATIVE_TOKEN, account).await
    }

    async fn token_balance(&self, token: Address, _account: Address) -> anyhow::Result<U256> {
        if self.failing_balances.contains(&token) {
            anyhow::bail!("balanceOf reverted");
        }
        Ok(balance(&self.state, token))
    }

    async fn token_decimals(&self, token: Address) -> anyhow::Result<u8> {
        if self.failing_decimals {
            anyhow::bail!("decimals() unavailable");
        }
        self.state
            .lock()
            .decimals
            .get(&token)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("unknown token {token}"))
    }
}

// ============================================================================
// Lending adapter
// ============================================================================

#[derive(Debug)]
pub struct MockAdapter {
    pub protocol: ProtocolId,
    pub state: Shared,
    /// `None` makes the listing fail
    pub markets: Option<Vec<MarketData>>,
    /// Operation names that fail with an RPC error
    pub failing: HashSet<&'static str>,
}

impl MockAdapter {
    pub fn new(protocol: ProtocolId, state: Shared, markets: Vec<MarketData>) -> Self {
        Self {
            protocol,
            state,
            markets: Some(markets),
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, op: &'static str) -> Self {
        self.failing.insert(op);
        self
    }

    fn check(&self, op: &'static str) -> ChainResult<()> {
        if self.failing.contains(op) {
            return Err(ChainError::rpc(anyhow::anyhow!("{op} reverted in simulation")));
        }
        Ok(())
    }

    fn record(&self, op: &str, asset: Address) {
        self.state.lock().calls.push(format!("{}:{op}:{asset}", self.protocol));
    }
}

pub fn market(token: &TokenInfo, supply_apy: f64, borrow_apy: f64) -> MarketData {
    MarketData {
        asset: token.address,
        symbol: token.symbol.to_string(),
        decimals: token.decimals.unwrap_or(18),
        supply_apy,
        borrow_apy,
        ltv: 0.75,
        liquidation_threshold: 0.8,
        collateral_enabled: true,
        borrow_enabled: true,
    }
}

#[async_trait]
impl LendingProtocolAdapter for MockAdapter {
    fn protocol(&self) -> ProtocolId {
        self.protocol
    }

    async fn get_markets(&self) -> ChainResult<Vec<MarketData>> {
        self.markets
            .clone()
            .ok_or_else(|| ChainError::rpc(anyhow::anyhow!("getAllReservesTokens failed")))
    }

    async fn get_positions(&self, _account: Address) -> ChainResult<Vec<ReservePosition>> {
        let s = self.state.lock();
        let mut assets: Vec<Address> = s
            .supplied
            .keys()
            .chain(s.debts.keys())
            .filter(|(p, _)| *p == self.protocol)
            .map(|(_, a)| *a)
            .collect();
        assets.sort();
        assets.dedup();
        Ok(assets
            .into_iter()
            .map(|asset| ReservePosition {
                asset,
                supplied: s.supplied.get(&(self.protocol, asset)).copied().unwrap_or_default(),
                stable_debt: U256::ZERO,
                variable_debt: s.debts.get(&(self.protocol, asset)).copied().unwrap_or_default(),
                collateral_enabled: true,
            })
            .filter(|p| !p.is_empty())
            .collect())
    }

    async fn get_position(&self, _account: Address, asset: Address) -> ChainResult<ReservePosition> {
        self.check("get_position")?;
        let s = self.state.lock();
        Ok(ReservePosition {
            asset,
            supplied: s.supplied.get(&(self.protocol, asset)).copied().unwrap_or_default(),
            stable_debt: U256::ZERO,
            variable_debt: s.debts.get(&(self.protocol, asset)).copied().unwrap_or_default(),
            collateral_enabled: true,
        })
    }

    async fn get_account_summary(&self, _account: Address) -> ChainResult<AccountSummary> {
        let has_debt = self
            .state
            .lock()
            .debts
            .iter()
            .any(|((p, _), d)| *p == self.protocol && !d.is_zero());
        Ok(AccountSummary {
            total_collateral: 0.0,
            total_debt: 0.0,
            health_factor: has_debt.then_some(2.5),
        })
    }

    async fn supply(&self, asset: Address, amount: Amount) -> ChainResult<B256> {
        self.check("supply")?;
        self.record("supply", asset);
        let mut s = self.state.lock();
        let wallet = s.balances.get(&asset).copied().unwrap_or_default();
        let value = amount.exact().unwrap_or(wallet);
        if value > wallet {
            return Err(ChainError::precondition("supply exceeds wallet balance"));
        }
        s.balances.insert(asset, wallet - value);
        *s.supplied.entry((self.protocol, asset)).or_default() += value;
        Ok(next_hash())
    }

    async fn withdraw(&self, asset: Address, amount: Amount) -> ChainResult<B256> {
        self.check("withdraw")?;
        self.record("withdraw", asset);
        let mut s = self.state.lock();
        let supplied = s.supplied.get(&(self.protocol, asset)).copied().unwrap_or_default();
        let value = amount.exact().unwrap_or(supplied).min(supplied);
        s.supplied.insert((self.protocol, asset), supplied - value);
        *s.balances.entry(asset).or_default() += value;
        Ok(next_hash())
    }

    async fn borrow(&self, asset: Address, amount: Amount) -> ChainResult<B256> {
        self.check("borrow")?;
        self.record("borrow", asset);
        let Some(value) = amount.exact() else {
            return Err(ChainError::precondition("borrow needs an exact amount"));
        };
        let mut s = self.state.lock();
        *s.debts.entry((self.protocol, asset)).or_default() += value;
        *s.balances.entry(asset).or_default() += value;
        Ok(next_hash())
    }

    async fn repay(&self, asset: Address, amount: Amount) -> ChainResult<B256> {
        self.check("repay")?;
        self.record("repay", asset);
        let mut s = self.state.lock();
        let debt = s.debts.get(&(self.protocol, asset)).copied().unwrap_or_default();
        let wallet = s.balances.get(&asset).copied().unwrap_or_default();
        let value = amount.exact().unwrap_or(debt).min(debt);
        if value > wallet {
            return Err(ChainError::precondition("repay exceeds wallet balance"));
        }
        s.debts.insert((self.protocol, asset), debt - value);
        s.balances.insert(asset, wallet - value);
        Ok(next_hash())
    }
}

// ============================================================================
// Swapper
// ============================================================================

/// Swaps at 1:1 value, scaled between decimals.
#[derive(Debug, Default)]
pub struct MockSwapper {
    pub state: Shared,
    pub revert: bool,
    pub low_balance: bool,
    /// (from, to, amount in) of every executed swap
    pub executed: Mutex<Vec<(Address, Address, U256)>>,
}

impl MockSwapper {
    pub fn new(state: Shared) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    pub fn executed(&self) -> Vec<(Address, Address, U256)> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl SwapCollaborator for MockSwapper {
    async fn quote(
        &self,
        from: Address,
        to: Address,
        amount: U256,
        _account: Address,
    ) -> EngineResult<SwapQuote> {
        let (from_dec, to_dec) = {
            let s = self.state.lock();
            (
                s.decimals.get(&from).copied().unwrap_or(18),
                s.decimals.get(&to).copied().unwrap_or(18),
            )
        };
        let output = amount * pow10(to_dec) / pow10(from_dec);
        Ok(SwapQuote {
            input_token: from,
            output_token: to,
            input_amount: amount,
            output_amount: output,
            min_output_amount: output,
            router: Address::repeat_byte(0x77),
            calldata: Bytes::new(),
            value: U256::ZERO,
            native_input: from == NATIVE_TOKEN,
            revert: self.revert,
            low_balance: self.low_balance,
        })
    }

    async fn execute(&self, quote: &SwapQuote, _account: Address) -> EngineResult<B256> {
        let mut s = self.state.lock();
        let available = s.balances.get(&quote.input_token).copied().unwrap_or_default();
        if available < quote.input_amount {
            return Err(EngineError::Execution("swap input exceeds balance".into()));
        }
        s.balances.insert(quote.input_token, available - quote.input_amount);
        *s.balances.entry(quote.output_token).or_default() += quote.output_amount;
        s.calls.push(format!("swap:{}:{}", quote.input_token, quote.output_token));
        self.executed
            .lock()
            .push((quote.input_token, quote.output_token, quote.input_amount));
        Ok(next_hash())
    }
}

// ============================================================================
// Prices
// ============================================================================

#[derive(Debug, Default)]
pub struct MockOracle {
    pub prices: HashMap<Address, f64>,
    pub failing: HashSet<Address>,
}

impl MockOracle {
    pub fn with(mut self, token: Address, price: f64) -> Self {
        self.prices.insert(token, price);
        self
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn price(&self, asset: Address, _decimals: u8) -> anyhow::Result<f64> {
        if self.failing.contains(&asset) {
            anyhow::bail!("rate lookup failed");
        }
        self.prices
            .get(&asset)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no rate for {asset}"))
    }
}

// ============================================================================
// Hand-built catalogs
// ============================================================================

pub fn catalog_asset(token: &TokenInfo, price: f64, wallet: f64) -> CatalogAsset {
    let decimals = token.decimals.unwrap_or(18);
    CatalogAsset {
        address: token.address,
        symbol: token.symbol.to_string(),
        decimals,
        price,
        wallet_raw: units(wallet, decimals),
        wallet,
        markets: BTreeMap::new(),
    }
}

pub fn listed(mut asset: CatalogAsset, protocol: ProtocolId, supply_apy: f64, borrow_apy: f64) -> CatalogAsset {
    asset.markets.insert(
        protocol,
        ProtocolMarket {
            supply_apy,
            borrow_apy,
            ltv: 0.75,
            liquidation_threshold: 0.8,
            collateral_enabled: true,
            borrow_enabled: true,
        },
    );
    asset
}

pub fn supplied_position(protocol: ProtocolId, token: &TokenInfo, supplied: f64) -> Position {
    let decimals = token.decimals.unwrap_or(18);
    let reserve = ReservePosition {
        asset: token.address,
        supplied: units(supplied, decimals),
        ..Default::default()
    };
    Position::from_reserve(protocol, &reserve, decimals)
}

pub fn owing_position(protocol: ProtocolId, token: &TokenInfo, supplied: f64, debt: f64) -> Position {
    let decimals = token.decimals.unwrap_or(18);
    let reserve = ReservePosition {
        asset: token.address,
        supplied: units(supplied, decimals),
        variable_debt: units(debt, decimals),
        collateral_enabled: true,
        ..Default::default()
    };
    Position::from_reserve(protocol, &reserve, decimals)
}

pub fn catalog(assets: Vec<CatalogAsset>, positions: Vec<Position>) -> AssetCatalog {
    AssetCatalog {
        account: ACCOUNT,
        protocols: ProtocolId::ALL.to_vec(),
        assets,
        positions,
        summaries: BTreeMap::new(),
    }
}
