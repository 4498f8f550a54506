//! Token Ledger
//!
//! In-process stand-in for the token contracts the engine moves value through.
//! Balances are keyed by (asset, holder). The router snapshots the whole ledger
//! at the start of a unit of work and restores it on failure, which is what
//! makes route execution all-or-nothing.
//!
//! Created: 2026-10-19

use alloy::primitives::{Address, U256};
use std::collections::HashMap;

use crate::error::LedgerError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    balances: HashMap<(Address, Address), U256>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, asset: Address, holder: Address) -> U256 {
        self.balances
            .get(&(asset, holder))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Mint `amount` of `asset` to `holder`. Used to seed balances.
    pub fn credit(&mut self, asset: Address, holder: Address, amount: U256) -> Result<(), LedgerError> {
        let balance = self.balances.entry((asset, holder)).or_insert(U256::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { holder })?;
        Ok(())
    }

    /// Move `amount` of `asset` from `from` to `to`. Zero amounts are a no-op.
    pub fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        if to.is_zero() {
            return Err(LedgerError::ZeroAddressRecipient);
        }

        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                asset,
                holder: from,
                needed: amount,
                available,
            });
        }

        // Check the credit side first so a failed transfer leaves no trace
        let to_balance = self.balance_of(asset, to);
        if from != to {
            to_balance
                .checked_add(amount)
                .ok_or(LedgerError::Overflow { holder: to })?;
        }

        self.balances.insert((asset, from), available - amount);
        let to_balance = self.balance_of(asset, to);
        self.balances.insert((asset, to), to_balance + amount);
        Ok(())
    }

    /// Number of (asset, holder) entries with a recorded balance
    pub fn entry_count(&self) -> usize {
        self.balances.len()
    }
}
