//! Backrun Engine Library
//!
//! Executes corrective backrun routes after a trade moves a venue's price,
//! settles callback-based venues safely, and splits realized profit between
//! configured recipients with exact dust accounting.
//!
//! Created: 2026-10-19

pub mod backrun;
pub mod config;
pub mod error;
pub mod events;
pub mod guard;
pub mod ledger;
pub mod oracle;
pub mod revenue;
pub mod scenario;
pub mod types;
pub mod venues;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use backrun::{BackrunRouter, PassThrough, Route, RouteExecution, RouteExecutor};
pub use config::EngineSettings;
pub use error::{ConfigError, EngineError, ExecutionError, LedgerError, OracleError, SettlementError, VenueError};
pub use events::{BackrunRecord, BackrunStatus, EngineEvent, EventLog, SkipReason, SplitRecord};
pub use guard::GracefulGuard;
pub use oracle::{Oracle, StaticOracle};
pub use revenue::{RevenueConfig, RevenueDistributor, SplitPlan};
pub use types::{BackrunTrigger, ConfigId, ExecutionOutcome, Hop, RouteQuote, VenueFlags, VenueKind};
pub use venues::{CallbackPool, ConstantProductPair, ReceiveHook, SwapHost, SwapRequest, Venue};
