//! Engine Events and JSONL Event Log
//!
//! Records the router emits for monitoring: one per settled or skipped backrun,
//! one per revenue split, one per token movement, plus administrative changes. The router keeps them in
//! an in-memory journal that rolls back with the unit of work; `EventLog`
//! persists drained events as JSON lines.
//!
//! Created: 2026-10-19

use alloy::primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::types::ConfigId;

/// Terminal state of a backrun
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackrunStatus {
    Settled,
    Skipped,
}

impl fmt::Display for BackrunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackrunStatus::Settled => write!(f, "SETTLED"),
            BackrunStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Why a backrun was skipped. Monitoring only: callers always see (0, none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SkipReason {
    ZeroInput,
    NoOpportunity,
    Unprofitable,
    Fault(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ZeroInput => write!(f, "zero input"),
            SkipReason::NoOpportunity => write!(f, "no opportunity"),
            SkipReason::Unprofitable => write!(f, "unprofitable"),
            SkipReason::Fault(reason) => write!(f, "fault: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackrunRecord {
    pub trigger_id: B256,
    pub source_venue: Address,
    pub input_amount: U256,
    pub input_is_primary_asset: bool,
    pub status: BackrunStatus,
    pub skip_reason: Option<SkipReason>,
    pub realized_profit: U256,
    pub profit_asset: Option<Address>,
    pub beneficiary: Address,
    pub config_id: ConfigId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub config_id: ConfigId,
    pub asset: Address,
    pub total: U256,
    pub recipients: Vec<Address>,
    pub amounts: Vec<U256>,
    pub dust_recipient: Address,
    pub dust_amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    BackrunExecuted(BackrunRecord),
    RevenueSplit(SplitRecord),
    Transfer {
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
    RevenueConfigUpdated {
        config_id: ConfigId,
        recipients: Vec<Address>,
        shares_bps: Vec<u32>,
        dust_share_bps: u32,
    },
    OracleUpdated {
        label: String,
    },
    Withdrawal {
        asset: Address,
        to: Address,
        amount: U256,
    },
    OwnershipTransferred {
        previous: Address,
        new: Address,
    },
}

impl EngineEvent {
    pub fn as_backrun(&self) -> Option<&BackrunRecord> {
        match self {
            EngineEvent::BackrunExecuted(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_split(&self) -> Option<&SplitRecord> {
        match self {
            EngineEvent::RevenueSplit(record) => Some(record),
            _ => None,
        }
    }
}

/// One line of the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: EngineEvent,
}

/// Append-only JSONL log of engine events
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    /// Open (or prepare to create) the log at `path`, creating parent directories
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create event log directory: {:?}", parent))?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append events, one JSON object per line, all stamped with the same time
    pub fn append(&mut self, events: &[EngineEvent]) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open event log: {:?}", self.path))?;

        let timestamp = Utc::now();
        for event in events {
            let line = LoggedEvent {
                timestamp,
                event: event.clone(),
            };
            let json = serde_json::to_string(&line).context("Failed to serialize engine event")?;
            writeln!(file, "{}", json)?;
        }

        Ok(events.len())
    }

    /// Read every logged event back
    pub fn read_all(&self) -> Result<Vec<LoggedEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: LoggedEvent = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse event line: {}", line))?;
            events.push(event);
        }
        Ok(events)
    }
}
