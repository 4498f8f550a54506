//! Backrun Router
//!
//! The component callers talk to. Owns the revenue table, the graceful guard,
//! the venue registry and the simulated ledger, and exposes:
//!     - entry points: `backrun`, `backrun_batch` (orchestrator.rs)
//!     - route execution and the settlement callback (executor.rs)
//!     - the administrative surface (owner only)
//!
//! Everything runs on one thread through `&self`. State lives in `Cell` /
//! `RefCell`, and no borrow is held across a call into a venue, oracle,
//! receive hook or pass-through, so those can reenter freely.
//!
//! Units of work: `atomically` snapshots ledger, revenue table, owner, oracle
//! and journal length, and restores them if the body returns `Err`. Snapshots
//! are taken per entry point, trigger, route, admin call or top-level
//! transfer, never per token movement inside one.
//!
//! Engine funds only leave through `move_funds`, which counterparties cannot
//! reach: `SwapHost::transfer` refuses to debit the engine's account.

pub mod executor;
pub mod orchestrator;

pub use executor::{Route, RouteExecution, RouteExecutor};

use alloy::primitives::{Address, U256};
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{info, warn};

use crate::error::{ConfigError, EngineError, LedgerError, SettlementError};
use crate::events::EngineEvent;
use crate::guard::GracefulGuard;
use crate::ledger::Ledger;
use crate::oracle::Oracle;
use crate::revenue::{RevenueConfig, RevenueDistributor};
use crate::types::{BackrunTrigger, ConfigId, ExecutionOutcome};
use crate::venues::{ReceiveHook, SwapHost, Venue};

/// Arbitrary call the batch entry runs before its triggers
pub struct PassThrough {
    target: Address,
    call: Box<dyn FnOnce(&dyn SwapHost) -> Result<(), String>>,
}

impl PassThrough {
    pub fn new(target: Address, call: impl FnOnce(&dyn SwapHost) -> Result<(), String> + 'static) -> Self {
        Self {
            target,
            call: Box::new(call),
        }
    }

    /// Pass-through that does nothing
    pub fn noop() -> Self {
        Self::new(Address::ZERO, |_| Ok(()))
    }

    /// The caller's own token transfer, run ahead of the backruns
    pub fn transfer(asset: Address, from: Address, to: Address, amount: U256) -> Self {
        Self::new(asset, move |host| {
            host.transfer(asset, from, to, amount)
                .map_err(|err| err.to_string())
        })
    }

    pub fn target(&self) -> Address {
        self.target
    }

    pub(crate) fn invoke(self, host: &dyn SwapHost) -> Result<(), EngineError> {
        let target = self.target;
        (self.call)(host).map_err(|reason| EngineError::PassThrough { target, reason })
    }
}

impl fmt::Debug for PassThrough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassThrough").field("target", &self.target).finish()
    }
}

/// Marker for the hop currently in flight
#[derive(Debug, Clone)]
pub(crate) struct ActiveHop {
    pub venue: Address,
    pub asset_in: Address,
    pub amount_in: U256,
    pub expects_callback: bool,
    pub settlements: u32,
    pub poisoned: bool,
}

/// Restores the previous hop marker when dropped
pub(crate) struct HopScope<'a> {
    slot: &'a RefCell<Option<ActiveHop>>,
    previous: Option<ActiveHop>,
}

impl HopScope<'_> {
    /// Take the marker as the hop left it
    pub fn finish(self) -> Option<ActiveHop> {
        self.slot.borrow_mut().take()
    }
}

impl Drop for HopScope<'_> {
    fn drop(&mut self) {
        *self.slot.borrow_mut() = self.previous.take();
    }
}

struct Checkpoint {
    ledger: Ledger,
    distributor: RevenueDistributor,
    owner: Address,
    oracle: Rc<dyn Oracle>,
    journal_len: usize,
}

pub struct BackrunRouter {
    address: Address,
    owner: Cell<Address>,
    guard: GracefulGuard,
    oracle: RefCell<Rc<dyn Oracle>>,
    distributor: RefCell<RevenueDistributor>,
    venues: RefCell<HashMap<Address, Rc<dyn Venue>>>,
    hooks: RefCell<HashMap<Address, Rc<dyn ReceiveHook>>>,
    ledger: RefCell<Ledger>,
    journal: RefCell<Vec<EngineEvent>>,
    active_hop: RefCell<Option<ActiveHop>>,
}

impl BackrunRouter {
    /// Create a router at `address`, owned by `owner`, splitting with
    /// `default_config` whenever a trigger names no stored config.
    pub fn new(
        address: Address,
        owner: Address,
        oracle: Rc<dyn Oracle>,
        default_config: RevenueConfig,
    ) -> Result<Self, ConfigError> {
        let distributor = RevenueDistributor::new(default_config)?;
        info!(
            "BackrunRouter initialized: address={:?}, owner={:?}, oracle={}",
            address,
            owner,
            oracle.label()
        );

        Ok(Self {
            address,
            owner: Cell::new(owner),
            guard: GracefulGuard::new(),
            oracle: RefCell::new(oracle),
            distributor: RefCell::new(distributor),
            venues: RefCell::new(HashMap::new()),
            hooks: RefCell::new(HashMap::new()),
            ledger: RefCell::new(Ledger::new()),
            journal: RefCell::new(Vec::new()),
            active_hop: RefCell::new(None),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner.get()
    }

    /// True while a guarded entry point is running
    pub fn is_entered(&self) -> bool {
        self.guard.is_entered()
    }

    pub fn oracle_label(&self) -> String {
        self.oracle.borrow().label()
    }

    // ── Units of work ───────────────────────────────────────────────────────

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            ledger: self.ledger.borrow().clone(),
            distributor: self.distributor.borrow().clone(),
            owner: self.owner.get(),
            oracle: Rc::clone(&self.oracle.borrow()),
            journal_len: self.journal.borrow().len(),
        }
    }

    fn restore(&self, checkpoint: Checkpoint) {
        *self.ledger.borrow_mut() = checkpoint.ledger;
        *self.distributor.borrow_mut() = checkpoint.distributor;
        self.owner.set(checkpoint.owner);
        *self.oracle.borrow_mut() = checkpoint.oracle;
        self.journal.borrow_mut().truncate(checkpoint.journal_len);
    }

    /// Run `body` as one unit of work: if it returns Err, every state change it
    /// made (balances, configs, events) is undone.
    pub(crate) fn atomically<T, E>(&self, body: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let checkpoint = self.checkpoint();
        let result = body();
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }

    // ── Ledger ──────────────────────────────────────────────────────────────

    pub fn balance_of(&self, asset: Address, holder: Address) -> U256 {
        self.ledger.borrow().balance_of(asset, holder)
    }

    /// Seed a balance (simulation setup)
    pub fn credit(&self, asset: Address, holder: Address, amount: U256) -> Result<(), LedgerError> {
        self.ledger.borrow_mut().credit(asset, holder, amount)
    }

    /// Read-only view of the ledger
    pub fn ledger(&self) -> Ref<'_, Ledger> {
        self.ledger.borrow()
    }

    /// Counterparty transfer as one unit of work: moves `from`'s tokens and
    /// notifies the receiver's hook. Never debits the engine's own account.
    pub fn transfer(&self, asset: Address, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        self.atomically(|| self.counterparty_transfer(asset, from, to, amount))
    }

    /// `transfer` without its own unit of work. Counterparties only run inside
    /// an entry point or a top-level `transfer`, which already own one.
    fn counterparty_transfer(&self, asset: Address, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        if from == self.address {
            warn!("⚠️ Counterparty transfer tried to debit the engine: {} {:?} -> {:?}", amount, asset, to);
            return Err(LedgerError::ProtectedAccount { account: from });
        }
        self.move_funds(asset, from, to, amount)
    }

    /// Ledger move plus receiver hook. A rejecting hook gets the move itself
    /// reversed; anything the hook did is left to the enclosing unit of work.
    pub(crate) fn move_funds(&self, asset: Address, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }

        self.ledger.borrow_mut().transfer(asset, from, to, amount)?;
        let journal_len = self.journal.borrow().len();
        self.emit(EngineEvent::Transfer {
            asset,
            from,
            to,
            amount,
        });

        let hook = self.hooks.borrow().get(&to).cloned();
        if let Some(hook) = hook {
            if let Err(reason) = hook.on_receive(self, asset, from, amount) {
                if let Err(err) = self.ledger.borrow_mut().transfer(asset, to, from, amount) {
                    warn!("⚠️ Could not reverse rejected transfer to {:?}: {}", to, err);
                }
                self.journal.borrow_mut().truncate(journal_len);
                return Err(LedgerError::Rejected { receiver: to, reason });
            }
        }
        Ok(())
    }

    // ── Registry ────────────────────────────────────────────────────────────

    pub fn register_venue(&self, venue: Rc<dyn Venue>) {
        let address = venue.address();
        info!("Venue registered: {:?} ({})", address, venue.kind());
        self.venues.borrow_mut().insert(address, venue);
    }

    pub fn venue(&self, address: Address) -> Option<Rc<dyn Venue>> {
        self.venues.borrow().get(&address).cloned()
    }

    pub fn venue_count(&self) -> usize {
        self.venues.borrow().len()
    }

    /// Attach a hook that runs whenever `account` receives tokens
    pub fn set_receive_hook(&self, account: Address, hook: Rc<dyn ReceiveHook>) {
        self.hooks.borrow_mut().insert(account, hook);
    }

    pub fn clear_receive_hook(&self, account: Address) {
        self.hooks.borrow_mut().remove(&account);
    }

    // ── Hop marker ──────────────────────────────────────────────────────────

    pub(crate) fn begin_hop(
        &self,
        venue: Address,
        asset_in: Address,
        amount_in: U256,
        expects_callback: bool,
    ) -> HopScope<'_> {
        let previous = self.active_hop.borrow_mut().replace(ActiveHop {
            venue,
            asset_in,
            amount_in,
            expects_callback,
            settlements: 0,
            poisoned: false,
        });
        HopScope {
            slot: &self.active_hop,
            previous,
        }
    }

    // ── Events ──────────────────────────────────────────────────────────────

    pub(crate) fn emit(&self, event: EngineEvent) {
        self.journal.borrow_mut().push(event);
    }

    /// Snapshot of the event journal
    pub fn events(&self) -> Vec<EngineEvent> {
        self.journal.borrow().clone()
    }

    /// Take every journaled event, leaving the journal empty
    pub fn drain_events(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.journal.borrow_mut())
    }

    // ── Administration ──────────────────────────────────────────────────────

    fn only_owner(&self, caller: Address) -> Result<(), EngineError> {
        if caller != self.owner.get() {
            return Err(EngineError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Replace the revenue config stored under `id` (owner only)
    pub fn set_revenue_config(
        &self,
        caller: Address,
        id: ConfigId,
        config: RevenueConfig,
    ) -> Result<(), EngineError> {
        self.only_owner(caller)?;
        self.distributor.borrow_mut().set_config(id, config.clone())?;
        self.emit(EngineEvent::RevenueConfigUpdated {
            config_id: id,
            recipients: config.recipients,
            shares_bps: config.shares_bps,
            dust_share_bps: config.dust_share_bps,
        });
        Ok(())
    }

    /// Stored config for `id`, without falling back to the default
    pub fn revenue_config(&self, id: ConfigId) -> Option<RevenueConfig> {
        self.distributor.borrow().config(id).cloned()
    }

    pub fn default_revenue_config(&self) -> RevenueConfig {
        self.distributor.borrow().default_config().clone()
    }

    /// Point the router at a different oracle (owner only)
    pub fn set_oracle(&self, caller: Address, oracle: Rc<dyn Oracle>) -> Result<(), EngineError> {
        self.only_owner(caller)?;
        let label = oracle.label();
        *self.oracle.borrow_mut() = oracle;
        info!("Oracle updated: {}", label);
        self.emit(EngineEvent::OracleUpdated { label });
        Ok(())
    }

    /// Send engine-held `asset` to `to` (owner only). `None` withdraws the whole balance.
    pub fn withdraw(
        &self,
        caller: Address,
        asset: Address,
        to: Address,
        amount: Option<U256>,
    ) -> Result<U256, EngineError> {
        self.only_owner(caller)?;
        if to.is_zero() {
            return Err(EngineError::ZeroAddressDestination);
        }

        let amount = amount.unwrap_or_else(|| self.balance_of(asset, self.address));
        self.atomically(|| {
            self.move_funds(asset, self.address, to, amount)?;
            self.emit(EngineEvent::Withdrawal { asset, to, amount });
            Ok::<_, EngineError>(())
        })?;
        info!("Withdrawal: {} {:?} -> {:?}", amount, asset, to);
        Ok(amount)
    }

    /// Hand the administrative surface to `new_owner` (owner only)
    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), EngineError> {
        self.only_owner(caller)?;
        if new_owner.is_zero() {
            return Err(EngineError::ZeroAddressDestination);
        }
        let previous = self.owner.replace(new_owner);
        self.emit(EngineEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        });
        info!("Ownership transferred: {:?} -> {:?}", previous, new_owner);
        Ok(())
    }
}

impl SwapHost for BackrunRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, asset: Address, holder: Address) -> U256 {
        BackrunRouter::balance_of(self, asset, holder)
    }

    fn transfer(&self, asset: Address, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        self.counterparty_transfer(asset, from, to, amount)
    }

    fn settle(&self, caller: Address, asset: Address, amount: U256) -> Result<(), SettlementError> {
        self.settle_callback(caller, asset, amount)
    }

    fn backrun(&self, trigger: &BackrunTrigger) -> Result<ExecutionOutcome, EngineError> {
        BackrunRouter::backrun(self, trigger)
    }

    fn backrun_batch(
        &self,
        pass_through: PassThrough,
        triggers: &[BackrunTrigger],
    ) -> Result<Vec<ExecutionOutcome>, EngineError> {
        BackrunRouter::backrun_batch(self, pass_through, triggers)
    }
}
