//! Pricing Oracle Interface
//!
//! The oracle is an opaque collaborator: given the venue that just traded and
//! which of its assets to start from, it proposes a corrective route and a
//! profit estimate. Route discovery is its business, not ours; everything it
//! returns is treated as untrusted and validated before execution.

use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use tracing::debug;

use crate::error::OracleError;
use crate::types::RouteQuote;

pub trait Oracle {
    /// Propose a backrun route for a trade on `source_venue`
    fn get_quote(
        &self,
        source_venue: Address,
        input_is_primary_asset: bool,
        input_amount: U256,
    ) -> Result<RouteQuote, OracleError>;

    /// Short name for logs and events
    fn label(&self) -> String {
        "oracle".to_string()
    }
}

/// Table-driven oracle: one fixed quote per (source venue, direction).
/// Queries with no entry report no opportunity.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    label: String,
    quotes: HashMap<(Address, bool), RouteQuote>,
}

impl StaticOracle {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            quotes: HashMap::new(),
        }
    }

    pub fn with_quote(mut self, source_venue: Address, input_is_primary_asset: bool, quote: RouteQuote) -> Self {
        self.insert(source_venue, input_is_primary_asset, quote);
        self
    }

    pub fn insert(&mut self, source_venue: Address, input_is_primary_asset: bool, quote: RouteQuote) {
        self.quotes.insert((source_venue, input_is_primary_asset), quote);
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.len()
    }
}

impl Oracle for StaticOracle {
    fn get_quote(
        &self,
        source_venue: Address,
        input_is_primary_asset: bool,
        input_amount: U256,
    ) -> Result<RouteQuote, OracleError> {
        match self.quotes.get(&(source_venue, input_is_primary_asset)) {
            Some(quote) => Ok(quote.clone()),
            None => {
                debug!(
                    "StaticOracle: no quote for {:?} primary={} amount={}",
                    source_venue, input_is_primary_asset, input_amount
                );
                Ok(RouteQuote::no_opportunity())
            }
        }
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// Oracle that fails every query
#[derive(Debug, Clone, Default)]
pub struct UnavailableOracle;

impl Oracle for UnavailableOracle {
    fn get_quote(&self, _: Address, _: bool, _: U256) -> Result<RouteQuote, OracleError> {
        Err(OracleError::Unavailable("no oracle configured".to_string()))
    }

    fn label(&self) -> String {
        "unavailable".to_string()
    }
}
