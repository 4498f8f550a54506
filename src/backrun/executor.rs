//! Route Executor
//!
//! Validates an oracle quote into a `Route` and walks it hop by hop, moving the
//! engine's balance through each venue under that venue's calling convention.
//!
//! Every hop runs under a hop marker (`ActiveHop`). The settlement callback
//! only pays the venue named in the marker, only once, and only up to the
//! owed input. Any other callback poisons the marker, and a poisoned hop fails
//! the whole route even if the venue swallowed the error it got back.
//!
//! Hop output is measured as the engine's balance delta of the hop's output
//! asset, never taken from what the venue claims it paid.

use alloy::primitives::{Address, U256};
use tracing::{debug, warn};

use super::BackrunRouter;
use crate::error::{ExecutionError, SettlementError};
use crate::types::{Hop, RouteQuote, VenueKind};
use crate::venues::{SwapRequest, Venue};

/// A quote that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    start: usize,
    hops: Vec<Hop>,
}

impl Route {
    /// Check the quote's parallel arrays and build the hops from
    /// `start_hop_index` onward. The route must return to its first asset.
    pub fn from_quote(quote: &RouteQuote) -> Result<Self, ExecutionError> {
        let n = quote.venues.len();
        if quote.venue_kinds.len() != n || quote.venue_flags.len() != n || quote.assets.len() != n + 1 {
            return Err(ExecutionError::MisalignedQuote {
                venues: n,
                kinds: quote.venue_kinds.len(),
                flags: quote.venue_flags.len(),
                assets: quote.assets.len(),
            });
        }
        if n == 0 {
            return Err(ExecutionError::EmptyRoute);
        }

        let start = quote.start_hop_index;
        if start >= n {
            return Err(ExecutionError::StartHopOutOfRange { start, hops: n });
        }

        let hops = (start..n)
            .map(|index| {
                let tag = quote.venue_kinds[index];
                let kind = VenueKind::from_tag(tag).ok_or(ExecutionError::UnknownVenueKind { index, tag })?;
                let asset_in = quote.assets[index];
                let asset_out = quote.assets[index + 1];
                if asset_in == asset_out {
                    return Err(ExecutionError::DegenerateHop { index });
                }
                Ok(Hop {
                    venue: quote.venues[index],
                    kind,
                    flags: quote.venue_flags[index],
                    asset_in,
                    asset_out,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (first, last) = (quote.assets[start], quote.assets[n]);
        if first != last {
            return Err(ExecutionError::RouteNotCyclic { start: first, end: last });
        }

        Ok(Self { start, hops })
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Quote index of the first executed hop
    pub fn start_index(&self) -> usize {
        self.start
    }

    /// Asset the route starts from and returns to
    pub fn input_asset(&self) -> Address {
        self.hops[0].asset_in
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}

/// What a completed route produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteExecution {
    pub final_amount: U256,
    pub profit: U256,
}

pub struct RouteExecutor<'a> {
    router: &'a BackrunRouter,
}

impl<'a> RouteExecutor<'a> {
    pub fn new(router: &'a BackrunRouter) -> Self {
        Self { router }
    }

    /// Run every hop of `route` starting with `amount_in` of `asset_in`.
    ///
    /// Profit must be strictly positive: ending with `amount_in` or less
    /// returns `Unprofitable`. The engine's balance of `asset_in` must also
    /// have grown by the profit, whatever happened mid-route. The caller owns
    /// the unit of work; this does not roll anything back itself.
    pub fn execute(
        &self,
        route: &Route,
        amount_in: U256,
        asset_in: Address,
    ) -> Result<RouteExecution, ExecutionError> {
        if route.input_asset() != asset_in {
            return Err(ExecutionError::InputAssetMismatch {
                expected: asset_in,
                found: route.input_asset(),
            });
        }

        let engine = self.router.address();
        let held_before = self.router.balance_of(asset_in, engine);

        let mut amount = amount_in;
        for (offset, hop) in route.hops().iter().enumerate() {
            amount = self.run_hop(route.start_index() + offset, hop, amount)?;
        }

        if amount <= amount_in {
            return Err(ExecutionError::Unprofitable {
                input: amount_in,
                output: amount,
            });
        }

        let profit = amount - amount_in;
        let expected = held_before.saturating_add(profit);
        let held_after = self.router.balance_of(asset_in, engine);
        if held_after < expected {
            warn!(
                "⚠️ Route reported {} profit but engine {:?} went {} -> {}",
                profit, asset_in, held_before, held_after
            );
            return Err(ExecutionError::BalanceShortfall {
                asset: asset_in,
                expected,
                actual: held_after,
            });
        }

        Ok(RouteExecution {
            final_amount: amount,
            profit,
        })
    }

    fn run_hop(&self, index: usize, hop: &Hop, amount_in: U256) -> Result<U256, ExecutionError> {
        let venue = self
            .router
            .venue(hop.venue)
            .ok_or(ExecutionError::UnknownVenue { index, venue: hop.venue })?;
        if venue.kind() != hop.kind {
            return Err(ExecutionError::VenueKindMismatch {
                index,
                quoted: hop.kind,
                actual: venue.kind(),
            });
        }

        let engine = self.router.address();
        let before = self.router.balance_of(hop.asset_out, engine);

        let scope = self
            .router
            .begin_hop(hop.venue, hop.asset_in, amount_in, hop.kind.needs_callback());
        match hop.kind {
            VenueKind::DirectQuote => self.dispatch_direct(index, venue.as_ref(), hop, amount_in)?,
            VenueKind::CallbackSettled => self.dispatch_callback(index, venue.as_ref(), hop, amount_in)?,
        }
        let marker = scope.finish();

        let settlements = marker.as_ref().map_or(0, |m| m.settlements);
        if marker.as_ref().map_or(true, |m| m.poisoned) {
            return Err(ExecutionError::UnexpectedCallback { index });
        }
        if hop.kind.needs_callback() && settlements != 1 {
            return Err(ExecutionError::MissingSettlement {
                index,
                count: settlements,
            });
        }

        let after = self.router.balance_of(hop.asset_out, engine);
        let received = after.saturating_sub(before);
        if received.is_zero() {
            return Err(ExecutionError::EmptyHop { index });
        }

        debug!(
            "Hop {} via {:?} ({}): {} {:?} -> {} {:?}",
            index, hop.venue, hop.kind, amount_in, hop.asset_in, received, hop.asset_out
        );
        Ok(received)
    }

    /// Quote, push the input, swap for at least the quote
    fn dispatch_direct(
        &self,
        index: usize,
        venue: &dyn Venue,
        hop: &Hop,
        amount_in: U256,
    ) -> Result<(), ExecutionError> {
        let quoted = venue
            .quote(self.router, hop.asset_in, amount_in)
            .map_err(|source| ExecutionError::Venue { index, source })?;
        if quoted.is_zero() {
            return Err(ExecutionError::EmptyHop { index });
        }

        self.router
            .move_funds(hop.asset_in, self.router.address(), hop.venue, amount_in)?;
        venue
            .swap(self.router, &self.request(hop, amount_in, quoted))
            .map_err(|source| ExecutionError::Venue { index, source })?;
        Ok(())
    }

    /// Swap and let the venue pull the input through `settle`
    fn dispatch_callback(
        &self,
        index: usize,
        venue: &dyn Venue,
        hop: &Hop,
        amount_in: U256,
    ) -> Result<(), ExecutionError> {
        venue
            .swap(self.router, &self.request(hop, amount_in, U256::ZERO))
            .map_err(|source| ExecutionError::Venue { index, source })?;
        Ok(())
    }

    fn request(&self, hop: &Hop, amount_in: U256, min_amount_out: U256) -> SwapRequest {
        SwapRequest {
            asset_in: hop.asset_in,
            asset_out: hop.asset_out,
            amount_in,
            min_amount_out,
            recipient: self.router.address(),
            flags: hop.flags,
        }
    }
}

impl BackrunRouter {
    /// Settlement callback. Pays `caller` the owed input of the hop in flight.
    pub(crate) fn settle_callback(
        &self,
        caller: Address,
        asset: Address,
        amount: U256,
    ) -> Result<(), SettlementError> {
        {
            let mut slot = self.active_hop.borrow_mut();
            let hop = match slot.as_mut() {
                Some(hop) => hop,
                None => {
                    warn!("⚠️ Settlement callback from {:?} with no hop in flight", caller);
                    return Err(SettlementError::NoActiveHop { caller });
                }
            };

            if !hop.expects_callback {
                hop.poisoned = true;
                warn!("⚠️ Settlement callback from {:?} during a direct-quote hop", caller);
                return Err(SettlementError::NoActiveHop { caller });
            }
            if caller != hop.venue {
                hop.poisoned = true;
                warn!(
                    "⚠️ Settlement callback from {:?}, hop venue is {:?}",
                    caller, hop.venue
                );
                return Err(SettlementError::UnexpectedSource {
                    expected: hop.venue,
                    actual: caller,
                });
            }
            if hop.settlements > 0 {
                hop.poisoned = true;
                hop.settlements += 1;
                return Err(SettlementError::Duplicate { venue: caller });
            }
            if asset != hop.asset_in || amount > hop.amount_in {
                hop.poisoned = true;
                return Err(SettlementError::ExcessiveClaim {
                    asset,
                    amount,
                    owed_asset: hop.asset_in,
                    owed: hop.amount_in,
                });
            }
            hop.settlements += 1;
        }

        self.move_funds(asset, self.address(), caller, amount)?;
        Ok(())
    }
}
