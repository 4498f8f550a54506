//! Shared fixtures for unit tests: a funded two-venue world with a known
//! profitable cycle, plus venues and hooks that misbehave on purpose.

use alloy::primitives::{address, Address, I256, U256};
use std::cell::RefCell;
use std::rc::Rc;

use crate::backrun::{BackrunRouter, PassThrough};
use crate::error::{LedgerError, VenueError};
use crate::ledger::Ledger;
use crate::oracle::StaticOracle;
use crate::revenue::RevenueConfig;
use crate::types::{BackrunTrigger, ExecutionOutcome, RouteQuote, VenueFlags, VenueKind};
use crate::venues::{get_amount_out, CallbackPool, ConstantProductPair, ReceiveHook, SwapHost, SwapRequest, Venue};

pub const TOKEN_A: Address = address!("00000000000000000000000000000000000000a1");
pub const TOKEN_B: Address = address!("00000000000000000000000000000000000000b2");
pub const TOKEN_C: Address = address!("00000000000000000000000000000000000000c3");

pub const PAIR_AB: Address = address!("1000000000000000000000000000000000000001");
pub const POOL_BA: Address = address!("1000000000000000000000000000000000000002");
pub const ROGUE: Address = address!("1000000000000000000000000000000000000bad");

pub const ENGINE: Address = address!("e000000000000000000000000000000000000001");
pub const OWNER: Address = address!("0000000000000000000000000000000000000001");
pub const TRADER: Address = address!("0000000000000000000000000000000000000002");
pub const TREASURY: Address = address!("0000000000000000000000000000000000000003");
pub const BENEFICIARY: Address = address!("0000000000000000000000000000000000000004");
pub const RECIPIENT_X: Address = address!("0000000000000000000000000000000000000005");
pub const RECIPIENT_Y: Address = address!("0000000000000000000000000000000000000006");

/// Reserve depth of each test venue (the pair holds twice as much B)
pub const POOL_DEPTH: u64 = 1_000_000_000;
pub const TRADE_SIZE: u64 = 1_000_000;
/// Working balance of each asset the engine starts with
pub const ENGINE_FLOAT: u64 = TRADE_SIZE * 10;

pub const FEE_BPS: u32 = 30;

pub fn u(n: u64) -> U256 {
    U256::from(n)
}

/// Trade of TRADE_SIZE A on the pair, dust to BENEFICIARY, default config
pub fn trigger() -> BackrunTrigger {
    BackrunTrigger::new(PAIR_AB, u(TRADE_SIZE), true, BENEFICIARY)
}

fn two_hop(first: (Address, u8), second: (Address, u8)) -> RouteQuote {
    RouteQuote {
        estimated_profit: I256::from_raw(U256::from(1_000)),
        venues: vec![first.0, second.0],
        venue_kinds: vec![first.1, second.1],
        venue_flags: vec![VenueFlags::default(); 2],
        assets: vec![TOKEN_A, TOKEN_B, TOKEN_A],
        start_hop_index: 0,
    }
}

/// A -> B on the pair (1 A = 2 B), B -> A on the pool (1 B = 1 A)
pub fn profitable_quote() -> RouteQuote {
    two_hop((PAIR_AB, VenueKind::DirectQuote.tag()), (POOL_BA, VenueKind::CallbackSettled.tag()))
}

/// The same cycle run backwards: loses about half
pub fn unprofitable_quote() -> RouteQuote {
    two_hop((POOL_BA, VenueKind::CallbackSettled.tag()), (PAIR_AB, VenueKind::DirectQuote.tag()))
}

/// A -> B on the pair, B -> A on the rogue venue
pub fn rogue_quote() -> RouteQuote {
    two_hop((PAIR_AB, VenueKind::DirectQuote.tag()), (ROGUE, VenueKind::CallbackSettled.tag()))
}

/// Positive estimate, one kind short
pub fn misaligned_quote() -> RouteQuote {
    let mut quote = profitable_quote();
    quote.venue_kinds.pop();
    quote
}

pub struct TestWorld {
    pub router: BackrunRouter,
    oracle: RefCell<StaticOracle>,
}

impl TestWorld {
    pub fn new() -> Self {
        let oracle = StaticOracle::new("test").with_quote(PAIR_AB, true, profitable_quote());
        let router = BackrunRouter::new(
            ENGINE,
            OWNER,
            Rc::new(oracle.clone()),
            RevenueConfig::sole_recipient(OWNER),
        )
        .unwrap();

        let world = Self {
            router,
            oracle: RefCell::new(oracle),
        };
        world.router.register_venue(Rc::new(world.pair_ab()));
        world.router.register_venue(Rc::new(world.pool_ba()));

        let seed = [
            (TOKEN_A, PAIR_AB, POOL_DEPTH),
            (TOKEN_B, PAIR_AB, POOL_DEPTH * 2),
            (TOKEN_B, POOL_BA, POOL_DEPTH),
            (TOKEN_A, POOL_BA, POOL_DEPTH),
            (TOKEN_A, ENGINE, ENGINE_FLOAT),
            (TOKEN_B, ENGINE, ENGINE_FLOAT),
        ];
        for (asset, holder, amount) in seed {
            world.router.credit(asset, holder, u(amount)).unwrap();
        }
        world
    }

    pub fn pair_ab(&self) -> ConstantProductPair {
        ConstantProductPair::new(PAIR_AB, TOKEN_A, TOKEN_B, FEE_BPS)
    }

    pub fn pool_ba(&self) -> CallbackPool {
        CallbackPool::new(POOL_BA, TOKEN_B, TOKEN_A, FEE_BPS)
    }

    /// Add or replace an oracle quote and reinstall the oracle
    pub fn set_quote(&self, source: Address, primary: bool, quote: RouteQuote) {
        self.oracle.borrow_mut().insert(source, primary, quote);
        let oracle = self.oracle.borrow().clone();
        self.router.set_oracle(OWNER, Rc::new(oracle)).unwrap();
    }

    pub fn snapshot(&self) -> Ledger {
        self.router.ledger().clone()
    }

    pub fn fund_rogue(&self) {
        self.router.credit(TOKEN_A, ROGUE, u(POOL_DEPTH)).unwrap();
        self.router.credit(TOKEN_B, ROGUE, u(POOL_DEPTH)).unwrap();
    }

    /// Register a callback-settled rogue at ROGUE trading B/A
    pub fn install_rogue(&self, behavior: RogueBehavior) {
        self.router
            .register_venue(Rc::new(RogueVenue::new(ROGUE, TOKEN_B, TOKEN_A, behavior)));
        self.fund_rogue();
    }

    /// Replace the pair with one that tries to skim the engine mid-swap
    pub fn install_skimming_pair(&self, skim: U256, propagate: bool) -> Rc<SkimmingPair> {
        let pair = Rc::new(SkimmingPair::new(self.pair_ab(), skim, propagate));
        self.router.register_venue(pair.clone());
        pair
    }

    /// Replace the pool with one that reenters the router mid-swap
    pub fn install_reentrant_pool(&self, triggers: Vec<BackrunTrigger>) -> Rc<ReentrantPool> {
        let pool = Rc::new(ReentrantPool {
            inner: self.pool_ba(),
            triggers,
            seen: RefCell::new(Vec::new()),
        });
        self.router.register_venue(pool.clone());
        pool
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RogueBehavior {
    NeverSettle,
    SettleTwice,
    /// Settle once under someone else's address, then as itself
    SettleAs(Address),
    /// Claim one unit too many, then the right amount
    Overclaim,
    /// Direct-quote venue that calls settle anyway
    DirectWithCallback,
}

/// Pays out like a pool, then misbehaves in settlement. Swallows every
/// settlement error it gets back.
pub struct RogueVenue {
    address: Address,
    asset0: Address,
    asset1: Address,
    behavior: RogueBehavior,
}

impl RogueVenue {
    pub fn new(address: Address, asset0: Address, asset1: Address, behavior: RogueBehavior) -> Self {
        Self {
            address,
            asset0,
            asset1,
            behavior,
        }
    }
}

impl Venue for RogueVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn kind(&self) -> VenueKind {
        match self.behavior {
            RogueBehavior::DirectWithCallback => VenueKind::DirectQuote,
            _ => VenueKind::CallbackSettled,
        }
    }

    fn assets(&self) -> (Address, Address) {
        (self.asset0, self.asset1)
    }

    fn quote(&self, host: &dyn SwapHost, asset_in: Address, amount_in: U256) -> Result<U256, VenueError> {
        let asset_out = self
            .counter_asset(asset_in)
            .ok_or(VenueError::UnsupportedAsset(asset_in))?;
        Ok(get_amount_out(
            amount_in,
            host.balance_of(asset_in, self.address),
            host.balance_of(asset_out, self.address),
            FEE_BPS,
        )
        .unwrap_or_default())
    }

    fn swap(&self, host: &dyn SwapHost, request: &SwapRequest) -> Result<U256, VenueError> {
        let amount_out = self.quote(host, request.asset_in, request.amount_in)?;
        host.transfer(request.asset_out, self.address, request.recipient, amount_out)?;

        let (asset, amount) = (request.asset_in, request.amount_in);
        match self.behavior {
            RogueBehavior::NeverSettle => {}
            RogueBehavior::SettleTwice => {
                let _ = host.settle(self.address, asset, amount);
                let _ = host.settle(self.address, asset, amount);
            }
            RogueBehavior::SettleAs(other) => {
                let _ = host.settle(other, asset, amount);
                let _ = host.settle(self.address, asset, amount);
            }
            RogueBehavior::Overclaim => {
                let _ = host.settle(self.address, asset, amount + U256::from(1));
                let _ = host.settle(self.address, asset, amount);
            }
            RogueBehavior::DirectWithCallback => {
                let _ = host.settle(self.address, asset, amount);
            }
        }
        Ok(amount_out)
    }
}

/// Callback pool that calls back into the router before swapping
pub struct ReentrantPool {
    inner: CallbackPool,
    triggers: Vec<BackrunTrigger>,
    seen: RefCell<Vec<ExecutionOutcome>>,
}

impl ReentrantPool {
    /// Outcomes of every nested call, singles first then the batch
    pub fn seen(&self) -> Vec<ExecutionOutcome> {
        self.seen.borrow().clone()
    }
}

impl Venue for ReentrantPool {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn kind(&self) -> VenueKind {
        self.inner.kind()
    }

    fn assets(&self) -> (Address, Address) {
        self.inner.assets()
    }

    fn quote(&self, host: &dyn SwapHost, asset_in: Address, amount_in: U256) -> Result<U256, VenueError> {
        self.inner.quote(host, asset_in, amount_in)
    }

    fn swap(&self, host: &dyn SwapHost, request: &SwapRequest) -> Result<U256, VenueError> {
        for trigger in &self.triggers {
            let outcome = host
                .backrun(trigger)
                .map_err(|e| VenueError::Reverted(e.to_string()))?;
            self.seen.borrow_mut().push(outcome);
        }
        let batch = host
            .backrun_batch(PassThrough::noop(), &self.triggers)
            .map_err(|e| VenueError::Reverted(e.to_string()))?;
        self.seen.borrow_mut().extend(batch);

        self.inner.swap(host, request)
    }
}

/// Direct-quote pair that, after swapping, tries to pull `skim` of the
/// engine's A through the counterparty transfer path
pub struct SkimmingPair {
    inner: ConstantProductPair,
    skim: U256,
    propagate: bool,
    attempts: RefCell<Vec<Result<(), LedgerError>>>,
}

impl SkimmingPair {
    /// `propagate` decides whether a refused skim fails the swap
    pub fn new(inner: ConstantProductPair, skim: U256, propagate: bool) -> Self {
        Self {
            inner,
            skim,
            propagate,
            attempts: RefCell::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<Result<(), LedgerError>> {
        self.attempts.borrow().clone()
    }
}

impl Venue for SkimmingPair {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn kind(&self) -> VenueKind {
        self.inner.kind()
    }

    fn assets(&self) -> (Address, Address) {
        self.inner.assets()
    }

    fn quote(&self, host: &dyn SwapHost, asset_in: Address, amount_in: U256) -> Result<U256, VenueError> {
        self.inner.quote(host, asset_in, amount_in)
    }

    fn swap(&self, host: &dyn SwapHost, request: &SwapRequest) -> Result<U256, VenueError> {
        let amount_out = self.inner.swap(host, request)?;
        let skimmed = host.transfer(TOKEN_A, host.address(), self.address(), self.skim);
        self.attempts.borrow_mut().push(skimmed.clone());
        if self.propagate {
            skimmed?;
        }
        Ok(amount_out)
    }
}

/// Receive hook that tries a backrun whenever its account is paid
pub struct ReentrantHook {
    trigger: BackrunTrigger,
    seen: RefCell<Vec<ExecutionOutcome>>,
}

impl ReentrantHook {
    pub fn new(trigger: BackrunTrigger) -> Self {
        Self {
            trigger,
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<ExecutionOutcome> {
        self.seen.borrow().clone()
    }
}

impl ReceiveHook for ReentrantHook {
    fn on_receive(&self, host: &dyn SwapHost, _: Address, _: Address, _: U256) -> Result<(), String> {
        let outcome = host.backrun(&self.trigger).map_err(|e| e.to_string())?;
        self.seen.borrow_mut().push(outcome);
        Ok(())
    }
}

/// Receive hook that refuses every transfer
pub struct RejectingHook;

impl ReceiveHook for RejectingHook {
    fn on_receive(&self, _: &dyn SwapHost, _: Address, _: Address, _: U256) -> Result<(), String> {
        Err("receiver rejects tokens".to_string())
    }
}
