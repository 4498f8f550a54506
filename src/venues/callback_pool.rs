//! Callback-settled constant product pool
//!
//! Pays the output first, then calls back into the host for the owed input and
//! checks it arrived, the way concentrated-liquidity pools settle swaps.

use alloy::primitives::{Address, U256};
use tracing::debug;

use super::{get_amount_out, SwapHost, SwapRequest, Venue};
use crate::error::VenueError;
use crate::types::VenueKind;

#[derive(Debug, Clone)]
pub struct CallbackPool {
    address: Address,
    asset0: Address,
    asset1: Address,
    fee_bps: u32,
}

impl CallbackPool {
    pub fn new(address: Address, asset0: Address, asset1: Address, fee_bps: u32) -> Self {
        Self {
            address,
            asset0,
            asset1,
            fee_bps,
        }
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }
}

impl Venue for CallbackPool {
    fn address(&self) -> Address {
        self.address
    }

    fn kind(&self) -> VenueKind {
        VenueKind::CallbackSettled
    }

    fn assets(&self) -> (Address, Address) {
        (self.asset0, self.asset1)
    }

    fn quote(&self, host: &dyn SwapHost, asset_in: Address, amount_in: U256) -> Result<U256, VenueError> {
        let asset_out = self
            .counter_asset(asset_in)
            .ok_or(VenueError::UnsupportedAsset(asset_in))?;
        let reserve_in = host.balance_of(asset_in, self.address);
        let reserve_out = host.balance_of(asset_out, self.address);

        get_amount_out(amount_in, reserve_in, reserve_out, self.fee_bps)
            .ok_or_else(|| VenueError::Reverted("amount overflow".to_string()))
    }

    fn swap(&self, host: &dyn SwapHost, request: &SwapRequest) -> Result<U256, VenueError> {
        if self.counter_asset(request.asset_in) != Some(request.asset_out) {
            return Err(VenueError::UnsupportedAsset(request.asset_in));
        }

        let amount_out = self.quote(host, request.asset_in, request.amount_in)?;
        if amount_out.is_zero() {
            return Err(VenueError::InsufficientLiquidity);
        }
        if amount_out < request.min_amount_out {
            return Err(VenueError::InsufficientOutput {
                available: amount_out,
                minimum: request.min_amount_out,
            });
        }

        host.transfer(request.asset_out, self.address, request.recipient, amount_out)?;

        let before = host.balance_of(request.asset_in, self.address);
        host.settle(self.address, request.asset_in, request.amount_in)?;
        let received = host
            .balance_of(request.asset_in, self.address)
            .saturating_sub(before);
        if received < request.amount_in {
            return Err(VenueError::InputNotSettled {
                expected: request.amount_in,
                received,
            });
        }

        debug!(
            "Pool {:?}: {} {:?} -> {} {:?} (settled by callback)",
            self.address, request.amount_in, request.asset_in, amount_out, request.asset_out
        );
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettlementError;
    use crate::test_utils::*;

    #[test]
    fn test_swap_outside_hop_fails_settlement() {
        // Called directly, not through the executor: no hop is in flight
        let world = TestWorld::new();
        let pool = world.pool_ba();
        let request = SwapRequest {
            asset_in: TOKEN_B,
            asset_out: TOKEN_A,
            amount_in: U256::from(1_000),
            min_amount_out: U256::ZERO,
            recipient: TRADER,
            flags: Default::default(),
        };
        assert_eq!(
            pool.swap(&world.router, &request),
            Err(VenueError::Settlement(SettlementError::NoActiveHop { caller: POOL_BA }))
        );
    }

    #[test]
    fn test_quote_rejects_foreign_asset() {
        let world = TestWorld::new();
        let pool = world.pool_ba();
        assert_eq!(
            pool.quote(&world.router, TOKEN_C, U256::from(1)),
            Err(VenueError::UnsupportedAsset(TOKEN_C))
        );
    }
}
