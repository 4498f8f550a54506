//! Venue Adapters
//!
//! Liquidity venues the route executor dispatches hops to, and the host
//! interface the engine exposes back to them.
//!
//! Calling conventions (see `VenueKind`):
//!     - DirectQuote: executor quotes, pushes the input, calls `swap` with the
//!       quote as minimum output. The venue pays the output to the recipient.
//!     - CallbackSettled: executor calls `swap`; the venue pays the output,
//!       then calls `SwapHost::settle` once to pull the owed input.
//!
//! Counterparties (venues, receive hooks, pass-through calls) only ever see the
//! engine as `&dyn SwapHost`, which is also how they reenter it.

pub mod callback_pool;
pub mod constant_product;

pub use callback_pool::CallbackPool;
pub use constant_product::ConstantProductPair;

use alloy::primitives::{Address, U256};

use crate::backrun::PassThrough;
use crate::error::{EngineError, LedgerError, SettlementError, VenueError};
use crate::types::{BackrunTrigger, ExecutionOutcome, VenueFlags, VenueKind};

/// The engine as seen from a counterparty
pub trait SwapHost {
    /// The engine's own account
    fn address(&self) -> Address;

    fn balance_of(&self, asset: Address, holder: Address) -> U256;

    /// Move `from`'s tokens. The caller acts as `from`.
    fn transfer(&self, asset: Address, from: Address, to: Address, amount: U256) -> Result<(), LedgerError>;

    /// Settlement callback: `caller` claims `amount` of `asset` owed for the
    /// hop in flight. Only the venue currently mid-hop may claim, once.
    fn settle(&self, caller: Address, asset: Address, amount: U256) -> Result<(), SettlementError>;

    /// Single-trigger entry point
    fn backrun(&self, trigger: &BackrunTrigger) -> Result<ExecutionOutcome, EngineError>;

    /// Batch entry point
    fn backrun_batch(
        &self,
        pass_through: PassThrough,
        triggers: &[BackrunTrigger],
    ) -> Result<Vec<ExecutionOutcome>, EngineError>;
}

/// Called after a transfer credits the hooked account.
/// Returning Err rejects the transfer.
pub trait ReceiveHook {
    fn on_receive(
        &self,
        host: &dyn SwapHost,
        asset: Address,
        from: Address,
        amount: U256,
    ) -> Result<(), String>;
}

/// Parameters of one hop as handed to a venue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    pub asset_in: Address,
    pub asset_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
    pub flags: VenueFlags,
}

pub trait Venue {
    fn address(&self) -> Address;

    fn kind(&self) -> VenueKind;

    /// The venue's two assets, primary first
    fn assets(&self) -> (Address, Address);

    /// Output for `amount_in` of `asset_in` at current state
    fn quote(&self, host: &dyn SwapHost, asset_in: Address, amount_in: U256) -> Result<U256, VenueError>;

    /// Execute a swap under this venue's calling convention. Returns the output paid.
    fn swap(&self, host: &dyn SwapHost, request: &SwapRequest) -> Result<U256, VenueError>;

    /// The asset on the other side of `asset`, if the venue trades it
    fn counter_asset(&self, asset: Address) -> Option<Address> {
        let (a0, a1) = self.assets();
        if asset == a0 {
            Some(a1)
        } else if asset == a1 {
            Some(a0)
        } else {
            None
        }
    }
}

/// Constant product output with a fee in bps.
///
/// Formula: amount_out = (amount_in * (10000 - fee) * reserve_out) / (reserve_in * 10000 + amount_in * (10000 - fee))
///
/// Returns None on arithmetic overflow.
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee_bps: u32) -> Option<U256> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return Some(U256::ZERO);
    }

    let fee_factor = U256::from(10_000u32.saturating_sub(fee_bps));
    let amount_in_with_fee = amount_in.checked_mul(fee_factor)?;
    let numerator = amount_in_with_fee.checked_mul(reserve_out)?;
    let denominator = reserve_in
        .checked_mul(U256::from(10_000u32))?
        .checked_add(amount_in_with_fee)?;

    Some(numerator / denominator)
}
