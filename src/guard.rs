//! Graceful Reentrancy Guard
//!
//! Like a reentrancy lock, except that a nested call is not an error: it gets
//! `None` back and the body never runs. The outer call carries on unaffected.
//!
//! The flag is released by a drop ticket, so it is cleared on normal return,
//! on `Err` bodies and on panics alike.

use std::cell::Cell;
use tracing::debug;

#[derive(Debug, Default)]
pub struct GracefulGuard {
    entered: Cell<bool>,
}

/// Clears the flag when dropped
struct GuardTicket<'a> {
    entered: &'a Cell<bool>,
}

impl Drop for GuardTicket<'_> {
    fn drop(&mut self) {
        self.entered.set(false);
    }
}

impl GracefulGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }

    /// Run `body` unless a guarded call is already in flight.
    /// Returns None, without running `body`, on reentry.
    pub fn run<R>(&self, body: impl FnOnce() -> R) -> Option<R> {
        if self.entered.get() {
            debug!("Guard: nested call rejected");
            return None;
        }

        self.entered.set(true);
        let _ticket = GuardTicket {
            entered: &self.entered,
        };
        Some(body())
    }
}
