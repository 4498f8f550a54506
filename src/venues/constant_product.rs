//! Direct-quote constant product pair
//!
//! Reserves are whatever the pair holds in the ledger. The caller pushes the
//! input before calling `swap`, so the pre-swap input reserve is
//! `balance - amount_in`.

use alloy::primitives::{Address, U256};
use tracing::debug;

use super::{get_amount_out, SwapHost, SwapRequest, Venue};
use crate::error::VenueError;
use crate::types::VenueKind;

#[derive(Debug, Clone)]
pub struct ConstantProductPair {
    address: Address,
    asset0: Address,
    asset1: Address,
    fee_bps: u32,
}

impl ConstantProductPair {
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

    fn check_pair(&self, asset_in: Address, asset_out: Address) -> Result<(), VenueError> {
        match self.counter_asset(asset_in) {
            Some(other) if other == asset_out => Ok(()),
            Some(_) => Err(VenueError::UnsupportedAsset(asset_out)),
            None => Err(VenueError::UnsupportedAsset(asset_in)),
        }
    }
}

impl Venue for ConstantProductPair {
    fn address(&self) -> Address {
        self.address
    }

    fn kind(&self) -> VenueKind {
        VenueKind::DirectQuote
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
        self.check_pair(request.asset_in, request.asset_out)?;

        let balance_in = host.balance_of(request.asset_in, self.address);
        let reserve_in = balance_in
            .checked_sub(request.amount_in)
            .ok_or(VenueError::InputNotSettled {
                expected: request.amount_in,
                received: balance_in,
            })?;
        let reserve_out = host.balance_of(request.asset_out, self.address);

        let amount_out = get_amount_out(request.amount_in, reserve_in, reserve_out, self.fee_bps)
            .ok_or_else(|| VenueError::Reverted("amount overflow".to_string()))?;
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
        debug!(
            "Pair {:?}: {} {:?} -> {} {:?}",
            self.address, request.amount_in, request.asset_in, amount_out, request.asset_out
        );
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_quote_uses_ledger_reserves() {
        let world = TestWorld::new();
        let pair = world.pair_ab();
        let quoted = pair.quote(&world.router, TOKEN_A, U256::from(1_000)).unwrap();
        let expected = get_amount_out(U256::from(1_000), u(POOL_DEPTH), u(POOL_DEPTH * 2), 30).unwrap();
        assert_eq!(quoted, expected);
    }

    #[test]
    fn test_swap_requires_pushed_input() {
        let world = TestWorld::new();
        let pair = world.pair_ab();
        let request = SwapRequest {
            asset_in: TOKEN_A,
            asset_out: TOKEN_B,
            amount_in: u(POOL_DEPTH * 2),
            min_amount_out: U256::ZERO,
            recipient: TRADER,
            flags: Default::default(),
        };
        assert!(matches!(
            pair.swap(&world.router, &request),
            Err(VenueError::InputNotSettled { .. })
        ));
    }

    #[test]
    fn test_swap_pays_recipient() {
        let world = TestWorld::new();
        let pair = world.pair_ab();
        let amount_in = U256::from(1_000);
        let quoted = pair.quote(&world.router, TOKEN_A, amount_in).unwrap();

        world.router.credit(TOKEN_A, TRADER, amount_in).unwrap();
        world.router.transfer(TOKEN_A, TRADER, PAIR_AB, amount_in).unwrap();
        let request = SwapRequest {
            asset_in: TOKEN_A,
            asset_out: TOKEN_B,
            amount_in,
            min_amount_out: quoted,
            recipient: TRADER,
            flags: Default::default(),
        };
        assert_eq!(pair.swap(&world.router, &request).unwrap(), quoted);
        assert_eq!(world.router.balance_of(TOKEN_B, TRADER), quoted);
    }

    #[test]
    fn test_swap_rejects_foreign_asset() {
        let world = TestWorld::new();
        let pair = world.pair_ab();
        let request = SwapRequest {
            asset_in: TOKEN_C,
            asset_out: TOKEN_B,
            amount_in: U256::from(1),
            min_amount_out: U256::ZERO,
            recipient: TRADER,
            flags: Default::default(),
        };
        assert_eq!(
            pair.swap(&world.router, &request),
            Err(VenueError::UnsupportedAsset(TOKEN_C))
        );
    }
}
