//! Error types for the backrun engine
//!
//! Layered from the ledger up: ledger and settlement errors feed venue errors,
//! venue errors feed execution errors, and everything surfaces to callers of
//! the router as `EngineError`.

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::types::VenueKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance of {asset:?} for {holder:?}: need {needed}, have {available}")]
    InsufficientBalance {
        asset: Address,
        holder: Address,
        needed: U256,
        available: U256,
    },
    #[error("transfer to the zero address")]
    ZeroAddressRecipient,
    #[error("balance overflow crediting {holder:?}")]
    Overflow { holder: Address },
    #[error("transfer rejected by receiver {receiver:?}: {reason}")]
    Rejected { receiver: Address, reason: String },
    #[error("{account:?} cannot be debited by a counterparty transfer")]
    ProtectedAccount { account: Address },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("settlement callback from {caller:?} while no settlement is owed")]
    NoActiveHop { caller: Address },
    #[error("settlement callback from {actual:?}, expected {expected:?}")]
    UnexpectedSource { expected: Address, actual: Address },
    #[error("duplicate settlement callback from {venue:?}")]
    Duplicate { venue: Address },
    #[error("settlement claim of {amount} {asset:?} exceeds owed {owed} {owed_asset:?}")]
    ExcessiveClaim {
        asset: Address,
        amount: U256,
        owed_asset: Address,
        owed: U256,
    },
    #[error("settlement transfer failed: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    #[error("venue does not trade {0:?}")]
    UnsupportedAsset(Address),
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    #[error("output {available} below minimum {minimum}")]
    InsufficientOutput { available: U256, minimum: U256 },
    #[error("input not settled: expected {expected}, received {received}")]
    InputNotSettled { expected: U256, received: U256 },
    #[error("settlement failed: {0}")]
    Settlement(#[from] SettlementError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("venue reverted: {0}")]
    Reverted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("route has no hops")]
    EmptyRoute,
    #[error("misaligned quote: {venues} venues, {kinds} kinds, {flags} flags, {assets} assets")]
    MisalignedQuote {
        venues: usize,
        kinds: usize,
        flags: usize,
        assets: usize,
    },
    #[error("start hop {start} out of range for {hops} hops")]
    StartHopOutOfRange { start: usize, hops: usize },
    #[error("route starts at {found:?}, input asset is {expected:?}")]
    InputAssetMismatch { expected: Address, found: Address },
    #[error("route ends at {end:?}, not back at {start:?}")]
    RouteNotCyclic { start: Address, end: Address },
    #[error("hop {index} swaps an asset for itself")]
    DegenerateHop { index: usize },
    #[error("hop {index} has unknown venue kind tag {tag}")]
    UnknownVenueKind { index: usize, tag: u8 },
    #[error("hop {index} venue {venue:?} is not registered")]
    UnknownVenue { index: usize, venue: Address },
    #[error("hop {index} quoted as {quoted} but venue is {actual}")]
    VenueKindMismatch {
        index: usize,
        quoted: VenueKind,
        actual: VenueKind,
    },
    #[error("hop {index} venue error: {source}")]
    Venue {
        index: usize,
        #[source]
        source: VenueError,
    },
    #[error("hop {index} saw an unexpected settlement callback")]
    UnexpectedCallback { index: usize },
    #[error("hop {index} expected exactly one settlement callback, got {count}")]
    MissingSettlement { index: usize, count: u32 },
    #[error("hop {index} produced no output")]
    EmptyHop { index: usize },
    #[error("route unprofitable: {input} in, {output} out")]
    Unprofitable { input: U256, output: U256 },
    #[error("engine {asset:?} balance {actual} after route, expected at least {expected}")]
    BalanceShortfall {
        asset: Address,
        expected: U256,
        actual: U256,
    },
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle rejected query: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{recipients} recipients but {shares} shares")]
    LengthMismatch { recipients: usize, shares: usize },
    #[error("recipient {index} is the zero address")]
    ZeroAddressRecipient { index: usize },
    #[error("recipient {index} has a zero share")]
    ZeroShare { index: usize },
    #[error("shares plus dust total {total} bps, expected 10000")]
    ShareTotal { total: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("caller {caller:?} is not authorized")]
    Unauthorized { caller: Address },
    #[error("isolated backrun reached outside a guarded batch")]
    UnauthorizedSelfCall,
    #[error("input amount {amount} exceeds venue encoding")]
    InputAmountOutOfRange { amount: U256 },
    #[error("source venue {0:?} is not registered")]
    UnknownSourceVenue(Address),
    #[error("zero address destination")]
    ZeroAddressDestination,
    #[error("oracle: {0}")]
    Oracle(#[from] OracleError),
    #[error("execution: {0}")]
    Execution(#[from] ExecutionError),
    #[error("transfer: {0}")]
    Transfer(#[from] LedgerError),
    #[error("revenue config: {0}")]
    Config(#[from] ConfigError),
    #[error("pass-through call to {target:?} failed: {reason}")]
    PassThrough { target: Address, reason: String },
}
