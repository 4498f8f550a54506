//! Core data structures shared by the router, executor and distributor.
//!
//! Triggers come in from callers, quotes come in from the oracle (untrusted),
//! and outcomes go back out. Addresses and amounts use alloy primitives.
//!
//! Created: 2026-10-19

use alloy::primitives::{keccak256, Address, B256, I256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest input amount the venue adapters can encode (signed 128-bit amounts)
pub const MAX_INPUT_AMOUNT: u128 = i128::MAX as u128;

/// Identifier of a stored revenue configuration. Zero selects the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigId(pub u64);

impl ConfigId {
    /// Reserved id of the deployer-owned default configuration
    pub const DEFAULT: ConfigId = ConfigId(0);

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_default() {
            write!(f, "default")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Venue calling conventions the executor knows how to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VenueKind {
    /// Quote first, push the input, then swap for at least the quoted output
    DirectQuote,
    /// Venue pushes output, then pulls the owed input through a settlement callback
    CallbackSettled,
}

impl VenueKind {
    /// Decode the wire tag the oracle uses. Unknown tags return None.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(VenueKind::DirectQuote),
            1 => Some(VenueKind::CallbackSettled),
            _ => None,
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            VenueKind::DirectQuote => 0,
            VenueKind::CallbackSettled => 1,
        }
    }

    /// Returns true if hops on this venue need a settlement callback
    pub fn needs_callback(&self) -> bool {
        matches!(self, VenueKind::CallbackSettled)
    }
}

impl fmt::Display for VenueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VenueKind::DirectQuote => write!(f, "DirectQuote"),
            VenueKind::CallbackSettled => write!(f, "CallbackSettled"),
        }
    }
}

/// Adapter-specific hop flags, passed through to the venue untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueFlags(pub u32);

/// Description of a trade that just happened and may leave a backrun opportunity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackrunTrigger {
    /// Venue whose trade created the opportunity
    pub source_venue: Address,
    /// Size of the backrun input, in raw units of the starting asset
    pub input_amount: U256,
    /// true = start from the venue's first asset, false = its second
    pub input_is_primary_asset: bool,
    /// Receives the dust/remainder share of the profit
    pub beneficiary: Address,
    /// Revenue configuration to split with (ConfigId::DEFAULT for the default)
    #[serde(default)]
    pub config_id: ConfigId,
}

impl BackrunTrigger {
    pub fn new(
        source_venue: Address,
        input_amount: U256,
        input_is_primary_asset: bool,
        beneficiary: Address,
    ) -> Self {
        Self {
            source_venue,
            input_amount,
            input_is_primary_asset,
            beneficiary,
            config_id: ConfigId::DEFAULT,
        }
    }

    pub fn with_config(mut self, config_id: ConfigId) -> Self {
        self.config_id = config_id;
        self
    }

    /// Deterministic identifier used in emitted records
    pub fn id(&self) -> B256 {
        let mut buf = Vec::with_capacity(20 + 32 + 1 + 20 + 8);
        buf.extend_from_slice(self.source_venue.as_slice());
        buf.extend_from_slice(&self.input_amount.to_be_bytes::<32>());
        buf.push(self.input_is_primary_asset as u8);
        buf.extend_from_slice(self.beneficiary.as_slice());
        buf.extend_from_slice(&self.config_id.0.to_be_bytes());
        keccak256(buf)
    }

    /// Returns true if the input fits the venue amount encoding
    pub fn input_in_range(&self) -> bool {
        self.input_amount <= U256::from(MAX_INPUT_AMOUNT)
    }
}

/// Route proposal returned by the oracle.
///
/// Parallel arrays straight off the wire: nothing here has been checked yet.
/// `venues`, `venue_kinds` and `venue_flags` carry one entry per hop, `assets`
/// carries one more (the asset held before and after each hop).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteQuote {
    pub estimated_profit: I256,
    pub venues: Vec<Address>,
    pub venue_kinds: Vec<u8>,
    pub venue_flags: Vec<VenueFlags>,
    pub assets: Vec<Address>,
    pub start_hop_index: usize,
}

impl RouteQuote {
    /// Quote that reports no opportunity
    pub fn no_opportunity() -> Self {
        Self {
            estimated_profit: I256::ZERO,
            venues: Vec::new(),
            venue_kinds: Vec::new(),
            venue_flags: Vec::new(),
            assets: Vec::new(),
            start_hop_index: 0,
        }
    }

    pub fn is_profitable(&self) -> bool {
        self.estimated_profit.is_positive()
    }
}

/// One validated leg of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub venue: Address,
    pub kind: VenueKind,
    pub flags: VenueFlags,
    pub asset_in: Address,
    pub asset_out: Address,
}

/// Result of a backrun as seen by the caller.
///
/// `none()` covers "no opportunity", "guard rejection" and "isolated failure"
/// alike; callers cannot tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub realized_profit: U256,
    pub profit_asset: Option<Address>,
}

impl ExecutionOutcome {
    pub fn none() -> Self {
        Self {
            realized_profit: U256::ZERO,
            profit_asset: None,
        }
    }

    pub fn settled(realized_profit: U256, profit_asset: Address) -> Self {
        Self {
            realized_profit,
            profit_asset: Some(profit_asset),
        }
    }

    pub fn is_none(&self) -> bool {
        self.profit_asset.is_none() && self.realized_profit.is_zero()
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.profit_asset {
            Some(asset) => write!(f, "{} of {:?}", self.realized_profit, asset),
            None => write!(f, "none"),
        }
    }
}
